/* src/holder/mod.rs */

//!
//! Atomic snapshot storage.
//!
//! Readers load the current [`Snapshot`] without locking; writers replace it
//! with a single reference swap and announce the change as a [`ReloadEvent`].

mod entry;
mod event;
mod meta;
mod snapshot;
mod store;

pub use entry::Entry;
pub use event::ReloadEvent;
pub use meta::Meta;
pub use snapshot::Snapshot;
pub use store::{DEFAULT_EVENT_CAPACITY, SnapshotStore};
