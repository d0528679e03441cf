/* src/holder/entry.rs */

use std::sync::Arc;

use super::{Meta, Snapshot};

/// The current snapshot together with its metadata.
#[derive(Debug, Clone)]
pub struct Entry {
	/// The snapshot wrapped in Arc for cheap sharing with readers.
	pub value: Arc<Snapshot>,
	/// Metadata about this snapshot.
	pub meta: Meta,
}
