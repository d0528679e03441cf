/* src/holder/snapshot.rs */

use std::collections::{BTreeMap, HashMap};

/// An immutable configuration map as of one fetch cycle.
///
/// Keys are compared case-insensitively; the casing of the first insertion is
/// kept for iteration. Iteration is ordered by the folded key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
	entries: BTreeMap<String, (String, String)>,
}

fn fold(key: &str) -> String {
	key.to_lowercase()
}

impl Snapshot {
	/// Creates an empty snapshot.
	pub fn new() -> Self {
		Self::default()
	}

	/// Gets a value by key, ignoring case.
	pub fn get(&self, key: &str) -> Option<&str> {
		self.entries.get(&fold(key)).map(|(_, v)| v.as_str())
	}

	pub fn contains_key(&self, key: &str) -> bool {
		self.entries.contains_key(&fold(key))
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Iterates over `(key, value)` pairs.
	pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
		self.entries.values().map(|(k, v)| (k.as_str(), v.as_str()))
	}

	pub fn keys(&self) -> impl Iterator<Item = &str> {
		self.entries.values().map(|(k, _)| k.as_str())
	}

	/// Copies the entries into a plain map.
	pub fn to_map(&self) -> HashMap<String, String> {
		self.iter()
			.map(|(k, v)| (k.to_string(), v.to_string()))
			.collect()
	}

	/// Inserts while the snapshot is being built. Returns the replaced value.
	pub(crate) fn insert(&mut self, key: String, value: String) -> Option<String> {
		match self.entries.get_mut(&fold(&key)) {
			Some(slot) => Some(std::mem::replace(&mut slot.1, value)),
			None => {
				self.entries.insert(fold(&key), (key, value));
				None
			}
		}
	}
}

impl FromIterator<(String, String)> for Snapshot {
	fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
		let mut snapshot = Snapshot::new();
		for (key, value) in iter {
			snapshot.insert(key, value);
		}
		snapshot
	}
}
