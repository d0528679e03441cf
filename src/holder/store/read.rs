/* src/holder/store/read.rs */

use std::sync::Arc;

use tokio::sync::broadcast;

use super::super::{Entry, Meta, ReloadEvent, Snapshot};
use super::SnapshotStore;

impl SnapshotStore {
	/// Returns the current snapshot. This is a wait-free operation.
	pub fn load(&self) -> Arc<Snapshot> {
		Arc::clone(&self.inner.load().value)
	}

	/// Returns the current snapshot together with its metadata.
	pub fn entry(&self) -> Arc<Entry> {
		self.inner.load_full()
	}

	/// Gets a single value from the current snapshot, ignoring key case.
	pub fn get(&self, key: &str) -> Option<String> {
		let entry = self.inner.load();
		entry.value.get(key).map(str::to_string)
	}

	/// Metadata of the current snapshot.
	pub fn meta(&self) -> Meta {
		self.inner.load().meta.clone()
	}

	/// Version of the current snapshot; 0 until the first store.
	pub fn version(&self) -> u64 {
		self.inner.load().meta.version
	}

	pub fn len(&self) -> usize {
		self.inner.load().value.len()
	}

	pub fn is_empty(&self) -> bool {
		self.inner.load().value.is_empty()
	}

	/// Subscribes to reload events.
	pub fn subscribe(&self) -> broadcast::Receiver<ReloadEvent> {
		self.events.subscribe()
	}
}
