/* src/holder/meta.rs */

use std::time::Instant;

/// Metadata associated with a published snapshot.
#[derive(Debug, Clone)]
pub struct Meta {
	/// Name of the provider that produced the snapshot.
	pub source: String,
	/// Timestamp when the snapshot was stored.
	pub loaded_at: Instant,
	/// Version number, incremented on each store.
	pub version: u64,
}
