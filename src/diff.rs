/* src/diff.rs */

//!
//! Change detection between two fetches of the same source.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::holder::Snapshot;

/// What the differ compares between two fetches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fingerprint {
	/// Set of published `(key, value)` pairs, order ignored.
	Pairs(BTreeSet<(String, String)>),
	/// Raw document text before flattening. `None` when nothing has been received yet.
	Document(Option<Arc<str>>),
}

impl Fingerprint {
	/// Pair fingerprint of a built snapshot.
	pub fn pairs(snapshot: &Snapshot) -> Self {
		Fingerprint::Pairs(
			snapshot
				.iter()
				.map(|(k, v)| (k.to_string(), v.to_string()))
				.collect(),
		)
	}

	pub fn document(text: Option<Arc<str>>) -> Self {
		Fingerprint::Document(text)
	}
}

/// Outcome of comparing a fresh fetch with the last published one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
	/// First successful fetch: set the snapshot, do not notify.
	Initial,
	/// Same content as before: keep the current snapshot.
	Unchanged,
	/// Different content: swap the snapshot and notify once.
	Changed,
}

impl Change {
	/// True when the fresh snapshot has to be stored.
	pub fn stores(self) -> bool {
		!matches!(self, Change::Unchanged)
	}

	/// True when subscribers have to be notified.
	pub fn notifies(self) -> bool {
		matches!(self, Change::Changed)
	}
}

/// Compares the previous fingerprint (if any) with the fresh one.
pub fn compare(previous: Option<&Fingerprint>, next: &Fingerprint) -> Change {
	match previous {
		None => Change::Initial,
		Some(previous) if previous == next => Change::Unchanged,
		Some(_) => Change::Changed,
	}
}
