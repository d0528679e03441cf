/* src/holder/store/write.rs */

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Instant;

use super::super::{Entry, Meta, ReloadEvent, Snapshot};
use super::SnapshotStore;

impl SnapshotStore {
	fn swap(&self, snapshot: Snapshot) -> (Arc<Entry>, Arc<Entry>) {
		let version = self.version.fetch_add(1, Ordering::SeqCst) + 1;
		let entry = Arc::new(Entry {
			value: Arc::new(snapshot),
			meta: Meta {
				source: self.source.clone(),
				loaded_at: Instant::now(),
				version,
			},
		});
		let old = self.inner.swap(Arc::clone(&entry));
		(old, entry)
	}

	/// Stores a snapshot without emitting an event (initial load).
	pub fn set(&self, snapshot: Snapshot) -> Meta {
		let (_, entry) = self.swap(snapshot);
		entry.meta.clone()
	}

	/// Atomically replaces the snapshot and emits [`ReloadEvent::Reloaded`].
	///
	/// The event is sent after the swap, so a subscriber reading the store on
	/// receipt sees at least this version.
	pub fn publish(&self, snapshot: Snapshot) -> Arc<Entry> {
		let (old, entry) = self.swap(snapshot);
		let _ = self.events.send(ReloadEvent::Reloaded {
			old: Arc::clone(&old.value),
			new: Arc::clone(&entry.value),
			meta: entry.meta.clone(),
		});
		entry
	}

	/// Emits [`ReloadEvent::Failed`] without touching the snapshot.
	pub fn report_failure(&self, error: impl ToString) {
		let _ = self.events.send(ReloadEvent::Failed {
			source: self.source.clone(),
			error: error.to_string(),
		});
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn snapshot(items: &[(&str, &str)]) -> Snapshot {
		items
			.iter()
			.map(|(k, v)| (k.to_string(), v.to_string()))
			.collect()
	}

	#[test]
	fn test_set_does_not_emit() {
		let store = SnapshotStore::new("test");
		let mut rx = store.subscribe();
		let meta = store.set(snapshot(&[("A", "1")]));
		assert_eq!(meta.version, 1);
		assert_eq!(store.get("a").as_deref(), Some("1"));
		assert!(rx.try_recv().is_err());
	}

	#[test]
	fn test_publish_emits_old_and_new() {
		let store = SnapshotStore::new("test");
		store.set(snapshot(&[("A", "1")]));
		let mut rx = store.subscribe();

		let entry = store.publish(snapshot(&[("A", "2")]));
		assert_eq!(entry.meta.version, 2);

		match rx.try_recv().unwrap() {
			ReloadEvent::Reloaded { old, new, meta } => {
				assert_eq!(old.get("A"), Some("1"));
				assert_eq!(new.get("A"), Some("2"));
				assert_eq!(meta.version, 2);
				assert_eq!(meta.source, "test");
			}
			other => panic!("unexpected event {other:?}"),
		}
	}

	#[test]
	fn test_readers_keep_their_snapshot() {
		let store = SnapshotStore::new("test");
		store.set(snapshot(&[("A", "1"), ("B", "1")]));
		let held = store.load();
		store.publish(snapshot(&[("A", "2")]));
		assert_eq!(held.len(), 2);
		assert_eq!(held.get("A"), Some("1"));
		assert_eq!(store.load().len(), 1);
	}

	#[test]
	fn test_report_failure() {
		let store = SnapshotStore::new("test");
		let mut rx = store.subscribe();
		store.report_failure("boom");
		match rx.try_recv().unwrap() {
			ReloadEvent::Failed { source, error } => {
				assert_eq!(source, "test");
				assert_eq!(error, "boom");
			}
			other => panic!("unexpected event {other:?}"),
		}
		assert_eq!(store.version(), 0);
	}
}
