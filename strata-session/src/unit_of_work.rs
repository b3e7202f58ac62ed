//! Unit of work: one operation's session over the store and the caches.

use crate::loader::{Loader, SessionCache};
use std::fmt;
use std::sync::Arc;
use strata_core::{FetchMode, Record, RecordId, SessionError, StrataResult};
use strata_storage::{BackingStore, IdentityCache, TransactionToken};

/// Lifecycle state of a unit of work.
///
/// `Open → Committed | RolledBack → Closed`. Loads are only valid while
/// `Open`; anything else is a programming-contract violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Open,
    Committed,
    RolledBack,
    Closed,
}

impl SessionState {
    /// The state name, as used in error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "Open",
            Self::Committed => "Committed",
            Self::RolledBack => "RolledBack",
            Self::Closed => "Closed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A short-lived, single-operation session.
///
/// Wraps a store transaction and a session-scoped cache around the
/// loader. Created, used, and closed entirely within one logical
/// operation's call stack; never shared across threads. `close()` is
/// mandatory on every exit path: it releases the store transaction
/// (rolling back if the caller never committed) and discards the session
/// cache, while the shared identity cache stays populated for subsequent
/// operations.
pub struct UnitOfWork<S: BackingStore> {
    loader: Loader<S>,
    store: Arc<S>,
    session: SessionCache,
    tx: TransactionToken,
    state: SessionState,
}

impl<S: BackingStore> UnitOfWork<S> {
    /// Open a unit of work, beginning a store transaction.
    pub fn open(store: Arc<S>, cache: IdentityCache) -> StrataResult<Self> {
        let tx = store.begin_transaction()?;
        tracing::debug!(%tx, "unit of work opened");
        Ok(Self {
            loader: Loader::new(Arc::clone(&store), cache),
            store,
            session: SessionCache::new(),
            tx,
            state: SessionState::Open,
        })
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The store transaction this unit of work holds.
    pub fn transaction(&self) -> TransactionToken {
        self.tx
    }

    /// The shared identity cache this unit of work consults.
    pub fn identity_cache(&self) -> &IdentityCache {
        self.loader.identity_cache()
    }

    fn ensure_open(&self, operation: &'static str) -> StrataResult<()> {
        if self.state == SessionState::Open {
            Ok(())
        } else {
            Err(SessionError::InvalidState {
                operation,
                state: self.state.as_str(),
            }
            .into())
        }
    }

    /// Load one record by identifier. Associations stay lazy references;
    /// use [`Self::load_by_id_with`] to request eager materialization.
    pub fn load_by_id<T: Record>(&mut self, id: RecordId) -> StrataResult<T> {
        self.ensure_open("load_by_id")?;
        self.loader
            .load_by_id(&mut self.session, id, FetchMode::Lazy)
    }

    /// Load one record by identifier with an explicit fetch mode.
    pub fn load_by_id_with<T: Record>(&mut self, id: RecordId, mode: FetchMode) -> StrataResult<T> {
        self.ensure_open("load_by_id")?;
        self.loader.load_by_id(&mut self.session, id, mode)
    }

    /// Load every record of a type in one backing-store query. Eager
    /// mode materializes all associations in that same query.
    pub fn load_all<T: Record>(&mut self, mode: FetchMode) -> StrataResult<Vec<T>> {
        self.ensure_open("load_all")?;
        self.loader.load_all(&mut self.session, mode)
    }

    /// Resolve an association's members into peer records, one explicit
    /// by-identity load per member not already cached.
    pub fn resolve_association<T: Record, P: Record>(
        &mut self,
        record: &T,
        attribute: &str,
    ) -> StrataResult<Vec<P>> {
        self.ensure_open("resolve_association")?;
        self.loader
            .resolve_association(&mut self.session, record, attribute)
    }

    /// Commit the store transaction.
    pub fn commit(&mut self) -> StrataResult<()> {
        self.ensure_open("commit")?;
        self.store.commit(self.tx)?;
        self.state = SessionState::Committed;
        tracing::debug!(tx = %self.tx, "unit of work committed");
        Ok(())
    }

    /// Roll back the store transaction.
    pub fn rollback(&mut self) -> StrataResult<()> {
        self.ensure_open("rollback")?;
        self.store.rollback(self.tx)?;
        self.state = SessionState::RolledBack;
        tracing::debug!(tx = %self.tx, "unit of work rolled back");
        Ok(())
    }

    /// Close the unit of work. Mandatory on every exit path.
    ///
    /// Rolls the store transaction back if the caller never committed,
    /// discards the session cache, and transitions to `Closed`. Closing
    /// an already terminal unit of work is a no-op.
    pub fn close(&mut self) -> StrataResult<()> {
        let result = match self.state {
            SessionState::Open => self.store.rollback(self.tx),
            _ => Ok(()),
        };
        self.session.clear();
        self.state = SessionState::Closed;
        tracing::debug!(tx = %self.tx, "unit of work closed");
        result
    }
}

impl<S: BackingStore> Drop for UnitOfWork<S> {
    fn drop(&mut self) {
        if self.state != SessionState::Closed {
            tracing::warn!(
                tx = %self.tx,
                state = self.state.as_str(),
                "unit of work dropped without close, releasing transaction"
            );
            if self.state == SessionState::Open {
                let _ = self.store.rollback(self.tx);
            }
        }
    }
}
