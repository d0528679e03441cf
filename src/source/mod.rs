/* src/source/mod.rs */

//!
//! Configuration sources backed by the remote stores.
//!
//! A [`Source`] fetches a [`Payload`] through its client and turns it into a
//! [`Snapshot`] with its own [`KeyDeriver`]:
//!
//! - [`SecretsSource`] - Secrets Manager secrets
//! - [`ParameterStoreSource`] - Parameter Store paths or single keys
//! - [`AppConfigSource`] - AppConfig freeform profiles
//! - [`FeatureFlagSource`] - AppConfig feature flag profiles

mod appconfig;
mod parameters;
mod secrets;
pub mod session;

pub use appconfig::{AppConfigSource, AppConfigSourceBuilder, FeatureFlagSource};
pub use parameters::{ParameterSelection, ParameterStoreSource, ParameterStoreSourceBuilder};
pub use secrets::{SecretFilterFn, SecretSelection, SecretsSource, SecretsSourceBuilder};
pub use session::{SESSION_LIFETIME, SessionState, SessionTracker};

use std::sync::Arc;

#[cfg(feature = "logging")]
use log::warn;

use crate::client::ClientError;
use crate::controller::ProviderError;
use crate::diff::Fingerprint;
use crate::flatten::{FlattenedEntry, Flattener, FormatError, Node, flatten_document};
use crate::holder::Snapshot;
use crate::keys::KeyDeriver;

/// How the value of a [`RawEntry`] is turned into a value tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
	/// Published verbatim.
	Scalar,
	/// Comma separated; published as indexed entries.
	StringList,
	/// Parsed as JSON, falling back to a scalar when it does not parse.
	JsonDocument,
}

/// One named value as returned by a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry {
	pub name: String,
	/// Replaces the derived root key when set.
	pub alias: Option<String>,
	pub value: Option<String>,
	pub kind: EntryKind,
}

impl RawEntry {
	pub fn new(name: impl Into<String>, value: impl Into<String>, kind: EntryKind) -> Self {
		Self {
			name: name.into(),
			alias: None,
			value: Some(value.into()),
			kind,
		}
	}

	pub fn with_alias(mut self, alias: Option<String>) -> Self {
		self.alias = alias;
		self
	}
}

/// What a source fetch produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
	/// Independent entries, compared as a set of published pairs.
	Entries(Vec<RawEntry>),
	/// One document, compared by its raw text. `None` before any content arrived.
	Document(Option<Arc<str>>),
}

/// A fetched payload turned into a snapshot, with the basis for diffing it.
#[derive(Debug, Clone)]
pub struct Fetched {
	pub snapshot: Snapshot,
	pub fingerprint: Fingerprint,
}

/// A configuration source of one provider.
#[derive(Debug)]
pub enum Source {
	Secrets(SecretsSource),
	ParameterStore(ParameterStoreSource),
	AppConfig(AppConfigSource),
	FeatureFlags(FeatureFlagSource),
}

impl Source {
	/// Human readable identification, used in events and logs.
	pub fn name(&self) -> String {
		match self {
			Source::Secrets(s) => s.name(),
			Source::ParameterStore(s) => s.name(),
			Source::AppConfig(s) => s.name(),
			Source::FeatureFlags(s) => s.name(),
		}
	}

	pub fn keys(&self) -> &KeyDeriver {
		match self {
			Source::Secrets(s) => s.keys(),
			Source::ParameterStore(s) => s.keys(),
			Source::AppConfig(s) => s.keys(),
			Source::FeatureFlags(s) => s.keys(),
		}
	}

	/// Fetches the raw payload from the store.
	pub async fn fetch(&self) -> Result<Payload, ClientError> {
		match self {
			Source::Secrets(s) => s.fetch().await,
			Source::ParameterStore(s) => s.fetch().await,
			Source::AppConfig(s) => s.fetch().await,
			Source::FeatureFlags(s) => s.fetch().await,
		}
	}

	/// Flattens and keys a payload.
	pub fn build(&self, payload: &Payload) -> Result<Snapshot, FormatError> {
		let keys = self.keys();
		match payload {
			Payload::Entries(entries) => build_entries(keys, entries),
			Payload::Document(text) => build_document(keys, text.as_deref()),
		}
	}

	/// Fingerprint of a fetch that produced nothing.
	pub fn empty_fingerprint(&self) -> Fingerprint {
		match self {
			Source::Secrets(_) | Source::ParameterStore(_) => Fingerprint::pairs(&Snapshot::new()),
			Source::AppConfig(_) | Source::FeatureFlags(_) => Fingerprint::document(None),
		}
	}

	/// Fetches and builds in one step.
	pub async fn fetch_snapshot(&self) -> Result<Fetched, ProviderError> {
		let payload = self.fetch().await?;
		let snapshot = self.build(&payload)?;
		let fingerprint = match payload {
			Payload::Entries(_) => Fingerprint::pairs(&snapshot),
			Payload::Document(text) => Fingerprint::document(text),
		};
		Ok(Fetched {
			snapshot,
			fingerprint,
		})
	}
}

impl From<SecretsSource> for Source {
	fn from(source: SecretsSource) -> Self {
		Source::Secrets(source)
	}
}

impl From<ParameterStoreSource> for Source {
	fn from(source: ParameterStoreSource) -> Self {
		Source::ParameterStore(source)
	}
}

impl From<AppConfigSource> for Source {
	fn from(source: AppConfigSource) -> Self {
		Source::AppConfig(source)
	}
}

impl From<FeatureFlagSource> for Source {
	fn from(source: FeatureFlagSource) -> Self {
		Source::FeatureFlags(source)
	}
}

/// True when a value should be tried as JSON.
pub(crate) fn looks_like_json(value: &str) -> bool {
	matches!(value.trim_start().chars().next(), Some('{' | '['))
}

/// Builds a snapshot from independent entries.
///
/// Entries without a value are skipped. Keys must stay unique across all
/// entries of the fetch.
pub fn build_entries(keys: &KeyDeriver, entries: &[RawEntry]) -> Result<Snapshot, FormatError> {
	let mut flattener = Flattener::new();
	for entry in entries {
		let Some(value) = entry.value.as_deref() else {
			continue;
		};
		let root = keys.root_key(&entry.name, entry.alias.as_deref());
		let prefix = if root.is_empty() {
			Vec::new()
		} else {
			vec![root]
		};
		flattener.push(&prefix, &entry_node(entry, value)?)?;
	}
	publish(keys, flattener.finish())
}

/// Builds a snapshot from one JSON document whose root must be an object.
pub fn build_document(keys: &KeyDeriver, text: Option<&str>) -> Result<Snapshot, FormatError> {
	match text {
		Some(text) => publish(keys, flatten_document(text)?),
		None => Ok(Snapshot::new()),
	}
}

fn entry_node(entry: &RawEntry, value: &str) -> Result<Node, FormatError> {
	match entry.kind {
		EntryKind::Scalar => Ok(Node::String(value.to_string())),
		EntryKind::StringList => Ok(Node::from_list(value)),
		// Only text that is not JSON at all is kept as an opaque string.
		EntryKind::JsonDocument => match Node::parse(value) {
			Ok(node) => Ok(node),
			Err(FormatError::Parse(_err)) => {
				#[cfg(feature = "logging")]
				warn!(
					"Entry '{}' is not valid JSON, loading it as a plain string: {}",
					entry.name, _err
				);
				Ok(Node::String(value.to_string()))
			}
			Err(e) => Err(e),
		},
	}
}

/// Derives the published keys. Two leaves publishing the same key fail the
/// build instead of overwriting each other.
fn publish(keys: &KeyDeriver, entries: Vec<FlattenedEntry>) -> Result<Snapshot, FormatError> {
	let mut snapshot = Snapshot::new();
	for entry in &entries {
		let published = keys.publish(entry);
		#[cfg(feature = "logging")]
		if published.is_empty() {
			warn!("Dropping value with an empty key (path {:?})", entry.path);
		}
		for (key, value) in published {
			if snapshot.contains_key(&key) {
				return Err(FormatError::DuplicateKey { key });
			}
			snapshot.insert(key, value);
		}
	}
	Ok(snapshot)
}
