/* src/holder/event.rs */

use std::sync::Arc;

use super::{Meta, Snapshot};

/// Events emitted by a snapshot store.
#[derive(Debug, Clone)]
pub enum ReloadEvent {
	/// A newer snapshot replaced the previous one.
	Reloaded {
		old: Arc<Snapshot>,
		new: Arc<Snapshot>,
		meta: Meta,
	},
	/// A background refresh failed; the previous snapshot is still current.
	Failed { source: String, error: String },
}

impl ReloadEvent {
	/// Name of the provider the event belongs to.
	pub fn source(&self) -> &str {
		match self {
			ReloadEvent::Reloaded { meta, .. } => &meta.source,
			ReloadEvent::Failed { source, .. } => source,
		}
	}
}
