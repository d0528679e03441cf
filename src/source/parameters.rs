/* src/source/parameters.rs */

use std::fmt;
use std::sync::Arc;

#[cfg(feature = "logging")]
use log::{error, info};

use super::{EntryKind, Payload, RawEntry, looks_like_json};
use crate::client::{ClientError, Parameter, ParameterStoreClient, ParameterType};
use crate::controller::ProviderError;
use crate::keys::KeyDeriver;

/// Which parameters a [`ParameterStoreSource`] loads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterSelection {
	/// Every parameter below the path, recursively. The path is stripped from keys.
	Path(String),
	/// A single parameter, optionally published under an alias.
	Key { name: String, alias: Option<String> },
}

/// Loads parameters from Parameter Store.
pub struct ParameterStoreSource {
	client: Arc<dyn ParameterStoreClient>,
	selection: ParameterSelection,
	keys: KeyDeriver,
}

impl fmt::Debug for ParameterStoreSource {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ParameterStoreSource")
			.field("selection", &self.selection)
			.field("keys", &self.keys)
			.finish_non_exhaustive()
	}
}

/// Builder for [`ParameterStoreSource`].
pub struct ParameterStoreSourceBuilder {
	client: Arc<dyn ParameterStoreClient>,
	path: Option<String>,
	key: Option<String>,
	alias: Option<String>,
}

impl ParameterStoreSourceBuilder {
	/// Loads every parameter below `path`.
	pub fn path(mut self, path: impl Into<String>) -> Self {
		self.path = Some(path.into());
		self
	}

	/// Loads the single parameter `name`.
	pub fn key(mut self, name: impl Into<String>) -> Self {
		self.key = Some(name.into());
		self
	}

	/// Publishes a single key under `alias` instead of its name.
	pub fn alias(mut self, alias: impl Into<String>) -> Self {
		self.alias = Some(alias.into());
		self
	}

	pub fn build(self) -> Result<ParameterStoreSource, ProviderError> {
		let selection = match (self.path, self.key) {
			(Some(_), Some(_)) => {
				return Err(ProviderError::Builder(
					"path and key are mutually exclusive".to_string(),
				));
			}
			(None, None) => {
				return Err(ProviderError::Builder("path or key is required".to_string()));
			}
			(Some(_), None) if self.alias.is_some() => {
				return Err(ProviderError::Builder(
					"alias is only supported for single keys".to_string(),
				));
			}
			(Some(path), None) if !path.is_empty() => ParameterSelection::Path(path),
			(None, Some(name)) if !name.is_empty() => ParameterSelection::Key {
				name,
				alias: self.alias,
			},
			_ => {
				return Err(ProviderError::Builder(
					"parameter path or key must not be empty".to_string(),
				));
			}
		};

		let mut keys = KeyDeriver::builder().rewrite_separators(true);
		if let ParameterSelection::Path(path) = &selection {
			keys = keys.strip_prefix(path.clone());
		}

		Ok(ParameterStoreSource {
			client: self.client,
			selection,
			keys: keys.build()?,
		})
	}
}

impl ParameterStoreSource {
	pub fn builder(client: Arc<dyn ParameterStoreClient>) -> ParameterStoreSourceBuilder {
		ParameterStoreSourceBuilder {
			client,
			path: None,
			key: None,
			alias: None,
		}
	}

	pub fn selection(&self) -> &ParameterSelection {
		&self.selection
	}

	pub fn keys(&self) -> &KeyDeriver {
		&self.keys
	}

	pub fn name(&self) -> String {
		match &self.selection {
			ParameterSelection::Path(path) => format!("ssm:{path}"),
			ParameterSelection::Key { name, .. } => format!("ssm:{name}"),
		}
	}

	pub(crate) async fn fetch(&self) -> Result<Payload, ClientError> {
		let entries = match &self.selection {
			ParameterSelection::Path(path) => {
				let mut entries = Vec::new();
				let mut next_token = None;
				loop {
					let page = self
						.client
						.get_parameters_by_path(path, next_token)
						.await?;
					entries.extend(page.parameters.into_iter().map(|p| to_entry(p, None)));
					match page.next_token {
						Some(token) => next_token = Some(token),
						None => break,
					}
				}

				#[cfg(feature = "logging")]
				info!("Loaded {} parameters below '{}'", entries.len(), path);
				entries
			}
			ParameterSelection::Key { name, alias } => {
				match self.client.get_parameter(name).await {
					Ok(parameter) => vec![to_entry(parameter, alias.clone())],
					Err(ClientError::NotFound(_)) => {
						#[cfg(feature = "logging")]
						error!("Parameter '{}' not found, skipping", name);
						Vec::new()
					}
					Err(e) => return Err(e),
				}
			}
		};
		Ok(Payload::Entries(entries))
	}
}

fn to_entry(parameter: Parameter, alias: Option<String>) -> RawEntry {
	let kind = match parameter.kind {
		ParameterType::String => EntryKind::Scalar,
		ParameterType::StringList => EntryKind::StringList,
		ParameterType::SecureString => match &parameter.value {
			Some(value) if looks_like_json(value) => EntryKind::JsonDocument,
			_ => EntryKind::Scalar,
		},
	};
	RawEntry {
		name: parameter.name,
		alias,
		value: parameter.value,
		kind,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::client::MemoryParameterStore;
	use crate::holder::Snapshot;
	use crate::source::build_entries;

	async fn load(source: &ParameterStoreSource) -> Snapshot {
		match source.fetch().await.unwrap() {
			Payload::Entries(entries) => build_entries(source.keys(), &entries).unwrap(),
			other => panic!("unexpected payload {other:?}"),
		}
	}

	#[tokio::test]
	async fn test_path_selection_maps_types() {
		let client = Arc::new(MemoryParameterStore::new().with_page_size(2));
		client.put_string("/myapp/Logging/Level", "Debug");
		client.put("/myapp/Hosts", "a,b,c", ParameterType::StringList);
		client.put(
			"/myapp/Db",
			r#"{"user/name":"admin","password":"x"}"#,
			ParameterType::SecureString,
		);
		client.put("/myapp/Token", "plain-secret", ParameterType::SecureString);
		client.put_string("/other/Ignored", "1");

		let source = ParameterStoreSource::builder(client.clone())
			.path("/myapp")
			.build()
			.unwrap();
		let snapshot = load(&source).await;

		assert_eq!(snapshot.get("Logging:Level"), Some("Debug"));
		assert_eq!(snapshot.get("Hosts:2"), Some("c"));
		assert_eq!(snapshot.get("Db:User:Name"), Some("admin"));
		assert_eq!(snapshot.get("Db:Password"), Some("x"));
		assert_eq!(snapshot.get("Token"), Some("plain-secret"));
		assert!(!snapshot.contains_key("Other:Ignored"));
		assert_eq!(client.path_calls(), 2);
	}

	#[tokio::test]
	async fn test_single_key_with_alias() {
		let client = Arc::new(MemoryParameterStore::new());
		client.put_string("/shared/db/connection", "Server=db");

		let source = ParameterStoreSource::builder(client.clone())
			.key("/shared/db/connection")
			.alias("ConnectionStrings:Main")
			.build()
			.unwrap();
		let snapshot = load(&source).await;
		assert_eq!(snapshot.get("ConnectionStrings:Main"), Some("Server=db"));
		assert_eq!(snapshot.len(), 1);

		let plain = ParameterStoreSource::builder(client)
			.key("/shared/db/connection")
			.build()
			.unwrap();
		assert_eq!(load(&plain).await.get("Shared:Db:Connection"), Some("Server=db"));
	}

	#[tokio::test]
	async fn test_missing_key_is_skipped() {
		let client = Arc::new(MemoryParameterStore::new());
		let source = ParameterStoreSource::builder(client)
			.key("/missing")
			.build()
			.unwrap();
		assert!(load(&source).await.is_empty());
	}

	#[test]
	fn test_builder_validation() {
		let client: Arc<dyn ParameterStoreClient> = Arc::new(MemoryParameterStore::new());
		assert!(
			ParameterStoreSource::builder(client.clone())
				.path("/a")
				.key("/b")
				.build()
				.is_err()
		);
		assert!(
			ParameterStoreSource::builder(client.clone())
				.path("/a")
				.alias("x")
				.build()
				.is_err()
		);
		assert!(ParameterStoreSource::builder(client).build().is_err());
	}
}
