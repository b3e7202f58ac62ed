//! Cache behavior properties: round-trip counts across the two tiers.

use std::sync::Arc;
use std::thread;
use strata_session::{Invalidator, UnitOfWork};
use strata_storage::{BackingStore, IdentityCache, MemoryStore};
use strata_test_utils::{catalog_store, seed_catalog, Book, FetchMode, Language};

fn setup() -> (Arc<MemoryStore>, IdentityCache) {
    let store = Arc::new(catalog_store());
    seed_catalog(&store).unwrap();
    (store, IdentityCache::in_memory())
}

/// A by-id load of an identity already resolved in the identity
/// cache issues zero backing-store calls.
#[test]
fn cache_hit_avoids_store_access() {
    let (store, cache) = setup();

    let mut warmer = UnitOfWork::open(Arc::clone(&store), cache.clone()).unwrap();
    let _: Vec<Language> = warmer.load_all(FetchMode::Eager).unwrap();
    warmer.close().unwrap();
    let baseline = store.stats().total_fetches();

    let mut uow = UnitOfWork::open(Arc::clone(&store), cache).unwrap();
    for id in 1..=3 {
        let lang: Language = uow.load_by_id(id).unwrap();
        assert_eq!(lang.id, id);
    }
    uow.close().unwrap();

    assert_eq!(store.stats().total_fetches(), baseline);
}

/// An eager load-all is exactly one backing-store query, no matter
/// how many associations the type declares, and the associations it
/// materialized resolve without further queries.
#[test]
fn eager_load_all_is_single_round_trip() {
    let (store, cache) = setup();

    let mut uow = UnitOfWork::open(Arc::clone(&store), cache).unwrap();
    let books: Vec<Book> = uow.load_all(FetchMode::Eager).unwrap();
    assert_eq!(books.len(), 2);
    assert_eq!(store.stats().fetch_all_calls, 1);
    assert_eq!(store.stats().fetch_by_id_calls, 0);

    for book in &books {
        let languages: Vec<Language> = uow.resolve_association(book, "languages").unwrap();
        assert_eq!(languages.len(), book.languages.len());
    }
    uow.close().unwrap();

    assert_eq!(store.stats().total_fetches(), 1);
}

/// A lazy load-all followed by touching every association issues one
/// query per distinct uncached member and zero per cached member.
#[test]
fn lazy_traversal_queries_each_uncached_member_once() {
    let (store, cache) = setup();

    let mut uow = UnitOfWork::open(Arc::clone(&store), cache).unwrap();
    let books: Vec<Book> = uow.load_all(FetchMode::Lazy).unwrap();
    assert_eq!(store.stats().fetch_all_calls, 1);

    for book in &books {
        let languages: Vec<Language> = uow.resolve_association(book, "languages").unwrap();
        assert_eq!(languages.len(), book.languages.len());
    }
    // Three distinct languages across both books; the shared one is
    // fetched once, not once per (book, language) pair.
    assert_eq!(store.stats().fetch_by_id_calls, 3);

    for book in &books {
        let _: Vec<Language> = uow.resolve_association(book, "languages").unwrap();
    }
    uow.close().unwrap();
    assert_eq!(store.stats().fetch_by_id_calls, 3);
}

/// After invalidation the cache is empty, not just logically stale;
/// the next by-id load goes back to the store.
#[test]
fn invalidation_empties_cache_and_forces_refetch() {
    let (store, cache) = setup();

    let mut uow = UnitOfWork::open(Arc::clone(&store), cache.clone()).unwrap();
    let _: Language = uow.load_by_id(1).unwrap();
    uow.close().unwrap();
    assert_eq!(store.stats().fetch_by_id_calls, 1);

    Invalidator::new(cache.clone()).invalidate_all().unwrap();
    assert_eq!(cache.stats().unwrap().entry_count, 0);

    let mut uow = UnitOfWork::open(Arc::clone(&store), cache).unwrap();
    let _: Language = uow.load_by_id(1).unwrap();
    uow.close().unwrap();
    assert_eq!(store.stats().fetch_by_id_calls, 2);
}

/// Concurrently open units of work share the identity cache but not
/// their session-local state.
#[test]
fn sessions_are_isolated_but_share_identity_cache() {
    let (store, cache) = setup();

    let mut first = UnitOfWork::open(Arc::clone(&store), cache.clone()).unwrap();
    let mut second = UnitOfWork::open(Arc::clone(&store), cache).unwrap();

    let from_first: Language = first.load_by_id(1).unwrap();
    let fetches = store.stats().fetch_by_id_calls;

    // The second unit of work starts with an empty session cache but
    // sees the identity cache the first one just populated.
    let from_second: Language = second.load_by_id(1).unwrap();
    assert_eq!(store.stats().fetch_by_id_calls, fetches);
    assert_eq!(from_first, from_second);

    first.close().unwrap();
    second.close().unwrap();
}

/// Within one unit of work, repeated loads of the same identity return
/// the identical value without consulting the shared tier again.
#[test]
fn repeated_load_within_session_is_stable() {
    let (store, cache) = setup();

    let mut uow = UnitOfWork::open(Arc::clone(&store), cache.clone()).unwrap();
    let first: Language = uow.load_by_id(2).unwrap();
    let shared_reads = {
        let stats = cache.stats().unwrap();
        stats.hits + stats.misses
    };

    let second: Language = uow.load_by_id(2).unwrap();
    assert_eq!(first, second);
    let stats = cache.stats().unwrap();
    assert_eq!(stats.hits + stats.misses, shared_reads);
    uow.close().unwrap();
}

/// For any sequence of by-id loads, the store is queried at most once
/// per distinct identity; repeats are cache hits.
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_store_queried_once_per_distinct_identity(
            ids in proptest::collection::vec(1i64..=3, 1..20)
        ) {
            let (store, cache) = setup();
            let mut uow = UnitOfWork::open(Arc::clone(&store), cache).unwrap();
            for id in &ids {
                let lang: Language = uow.load_by_id(*id).unwrap();
                prop_assert_eq!(lang.id, *id);
            }
            uow.close().unwrap();

            let distinct: std::collections::BTreeSet<_> = ids.iter().collect();
            prop_assert_eq!(store.stats().fetch_by_id_calls, distinct.len() as u64);
        }
    }
}

/// Concurrent units of work on separate threads resolve the same records
/// correctly; the identity cache owns its own synchronization.
#[test]
fn concurrent_units_of_work_resolve_consistently() {
    let (store, cache) = setup();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let store = Arc::clone(&store);
            let cache = cache.clone();
            thread::spawn(move || {
                let mut uow = UnitOfWork::open(store, cache).unwrap();
                let mut names = Vec::new();
                for id in 1..=3 {
                    let lang: Language = uow.load_by_id(id).unwrap();
                    names.push(lang.name);
                }
                uow.close().unwrap();
                names
            })
        })
        .collect();

    for handle in handles {
        let names = handle.join().unwrap();
        assert_eq!(names, vec!["Albanian", "Arabic", "Armenian"]);
    }
    assert_eq!(store.stats().open_transactions, 0);
}
