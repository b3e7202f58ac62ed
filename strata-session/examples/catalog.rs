//! Catalog walkthrough: seed, invalidate, then watch the two cache tiers
//! absorb the load traffic.
//!
//! Run with `RUST_LOG=debug cargo run --example catalog` to see the
//! loader's cache decisions.

use std::sync::Arc;
use strata_session::{Invalidator, UnitOfWork};
use strata_storage::{BackingStore, IdentityCache, MemoryStore};
use strata_test_utils::{catalog_store, seed_catalog, Book, FetchMode, Language};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let store = Arc::new(catalog_store());
    let cache = IdentityCache::in_memory();

    seed_catalog(&store)?;
    tracing::info!("catalog seeded");

    Invalidator::new(cache.clone()).invalidate_all()?;

    // One eager query materializes every language.
    let mut uow = UnitOfWork::open(Arc::clone(&store), cache.clone())?;
    let languages: Vec<Language> = uow.load_all(FetchMode::Eager)?;
    uow.commit()?;
    uow.close()?;
    tracing::info!(count = languages.len(), "loaded languages");

    // By-id finds now resolve from the identity cache.
    let mut uow = UnitOfWork::open(Arc::clone(&store), cache.clone())?;
    for id in 1..=3 {
        let lang: Language = uow.load_by_id(id)?;
        tracing::info!(id, code = %lang.code, name = %lang.name, "found language");
    }
    uow.commit()?;
    uow.close()?;

    // Lazy book traversal: every language is already cached, so touching
    // each book's association costs no further store queries.
    let mut uow = UnitOfWork::open(Arc::clone(&store), cache.clone())?;
    let books: Vec<Book> = uow.load_all(FetchMode::Lazy)?;
    for book in &books {
        let languages: Vec<Language> = uow.resolve_association(book, "languages")?;
        let codes: Vec<&str> = languages.iter().map(|l| l.code.as_str()).collect();
        tracing::info!(book = %book.name, ?codes, "resolved book languages");
    }
    uow.commit()?;
    uow.close()?;

    let store_stats = store.stats();
    let cache_stats = cache.stats()?;
    println!(
        "store queries: {} ({} load-all, {} by-id)",
        store_stats.total_fetches(),
        store_stats.fetch_all_calls,
        store_stats.fetch_by_id_calls,
    );
    println!(
        "cache: {} entries, {:.0}% hit rate",
        cache_stats.entry_count,
        cache_stats.hit_rate() * 100.0,
    );
    Ok(())
}
