//! STRATA Session - Load Orchestration
//!
//! The control layer over the backing store and the identity cache: fetch
//! plans built from attribute manifests, the loader's cache-first load
//! algorithm, the unit-of-work state machine with its session-scoped
//! cache, and global cache invalidation.
//!
//! A unit of work is created, used, and closed within one logical
//! operation's call stack; it is never shared across threads. The
//! identity cache it consults is the process-wide shared tier and safely
//! outlives every unit of work.

pub mod fetch_graph;
pub mod invalidator;
pub mod loader;
pub mod unit_of_work;

pub use fetch_graph::FetchGraphBuilder;
pub use invalidator::Invalidator;
pub use loader::{Loader, Selector, SessionCache};
pub use unit_of_work::{SessionState, UnitOfWork};
