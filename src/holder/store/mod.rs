/* src/holder/store/mod.rs */

mod read;
mod write;

use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::time::Instant;

use arc_swap::ArcSwap;
use tokio::sync::broadcast;

use super::{Entry, Meta, ReloadEvent, Snapshot};

/// Default event channel capacity.
pub const DEFAULT_EVENT_CAPACITY: usize = 100;

/// Holder of the current snapshot of one provider.
///
/// Uses an RCU style `ArcSwap` so reads are wait-free and a publish is a single
/// atomic pointer replacement: a reader never observes a partially built map.
pub struct SnapshotStore {
	pub(crate) inner: ArcSwap<Entry>,
	pub(crate) version: AtomicU64,
	pub(crate) events: broadcast::Sender<ReloadEvent>,
	pub(crate) source: String,
}

impl SnapshotStore {
	/// Creates a store holding an empty snapshot, with default event channel capacity.
	pub fn new(source: impl Into<String>) -> Self {
		Self::with_event_capacity(source, DEFAULT_EVENT_CAPACITY)
	}

	/// Creates a store with custom event channel capacity.
	///
	/// Note: Events may be dropped if subscribers process slower than
	/// the reload rate and the channel fills up.
	pub fn with_event_capacity(source: impl Into<String>, capacity: usize) -> Self {
		let source = source.into();
		let entry = Entry {
			value: Arc::new(Snapshot::new()),
			meta: Meta {
				source: source.clone(),
				loaded_at: Instant::now(),
				version: 0,
			},
		};
		Self {
			inner: ArcSwap::from_pointee(entry),
			version: AtomicU64::new(0),
			events: broadcast::channel(capacity.max(1)).0,
			source,
		}
	}

	/// Name of the provider owning this store.
	pub fn source(&self) -> &str {
		&self.source
	}
}

impl std::fmt::Debug for SnapshotStore {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let entry = self.inner.load();
		f.debug_struct("SnapshotStore")
			.field("source", &self.source)
			.field("version", &entry.meta.version)
			.field("len", &entry.value.len())
			.finish_non_exhaustive()
	}
}
