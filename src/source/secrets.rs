/* src/source/secrets.rs */

use std::fmt;
use std::sync::Arc;

#[cfg(feature = "logging")]
use log::{debug, error, info};

use super::{EntryKind, Payload, RawEntry, looks_like_json};
use crate::client::{
	ClientError, ListSecretsRequest, SecretListEntry, SecretsFilter, SecretsManagerClient,
};
use crate::controller::ProviderError;
use crate::keys::KeyDeriver;

/// Predicate deciding whether a listed secret is loaded.
pub type SecretFilterFn = Arc<dyn Fn(&SecretListEntry) -> bool + Send + Sync>;

/// Which secrets a [`SecretsSource`] loads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretSelection {
	/// Every secret the client can list.
	All,
	/// Secrets whose name starts with the prefix. The prefix is stripped from keys.
	Prefix(String),
	/// Exactly these secrets, without listing.
	Arns(Vec<String>),
}

/// Loads secrets from Secrets Manager.
pub struct SecretsSource {
	client: Arc<dyn SecretsManagerClient>,
	selection: SecretSelection,
	filter: Option<SecretFilterFn>,
	keys: KeyDeriver,
}

impl fmt::Debug for SecretsSource {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("SecretsSource")
			.field("selection", &self.selection)
			.field("filtered", &self.filter.is_some())
			.field("keys", &self.keys)
			.finish_non_exhaustive()
	}
}

/// Builder for [`SecretsSource`].
pub struct SecretsSourceBuilder {
	client: Arc<dyn SecretsManagerClient>,
	selections: Vec<SecretSelection>,
	strip: Vec<String>,
	filter: Option<SecretFilterFn>,
}

impl SecretsSourceBuilder {
	/// Loads every secret.
	pub fn load_all(mut self) -> Self {
		self.selections.push(SecretSelection::All);
		self
	}

	/// Loads the secrets whose name starts with `prefix`.
	pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
		self.selections.push(SecretSelection::Prefix(prefix.into()));
		self
	}

	/// Loads exactly the given secrets. Listing is skipped.
	pub fn arns<I, S>(mut self, arns: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.selections.push(SecretSelection::Arns(
			arns.into_iter().map(Into::into).collect(),
		));
		self
	}

	/// Strips an extra prefix from secret names, after the selection prefix.
	pub fn strip_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.strip.push(prefix.into());
		self
	}

	/// Only loads the secrets accepted by `filter`.
	pub fn filter<F>(mut self, filter: F) -> Self
	where
		F: Fn(&SecretListEntry) -> bool + Send + Sync + 'static,
	{
		self.filter = Some(Arc::new(filter));
		self
	}

	pub fn build(mut self) -> Result<SecretsSource, ProviderError> {
		let selection = match self.selections.len() {
			0 => {
				return Err(ProviderError::Builder(
					"one of load_all, prefix or arns is required".to_string(),
				));
			}
			1 => self.selections.remove(0),
			_ => {
				return Err(ProviderError::Builder(
					"load_all, prefix and arns are mutually exclusive".to_string(),
				));
			}
		};

		match &selection {
			SecretSelection::Prefix(prefix) if prefix.is_empty() => {
				return Err(ProviderError::Builder("prefix must not be empty".to_string()));
			}
			SecretSelection::Arns(arns) if arns.is_empty() => {
				return Err(ProviderError::Builder("arns must not be empty".to_string()));
			}
			_ => {}
		}

		let mut keys = KeyDeriver::builder().rewrite_separators(true);
		if let SecretSelection::Prefix(prefix) = &selection {
			keys = keys.strip_prefix(prefix.clone());
		}
		for prefix in self.strip {
			keys = keys.strip_prefix(prefix);
		}

		Ok(SecretsSource {
			client: self.client,
			selection,
			filter: self.filter,
			keys: keys.build()?,
		})
	}
}

impl SecretsSource {
	pub fn builder(client: Arc<dyn SecretsManagerClient>) -> SecretsSourceBuilder {
		SecretsSourceBuilder {
			client,
			selections: Vec::new(),
			strip: Vec::new(),
			filter: None,
		}
	}

	pub fn selection(&self) -> &SecretSelection {
		&self.selection
	}

	pub fn keys(&self) -> &KeyDeriver {
		&self.keys
	}

	pub fn name(&self) -> String {
		match &self.selection {
			SecretSelection::All => "secretsmanager:*".to_string(),
			SecretSelection::Prefix(prefix) => format!("secretsmanager:{prefix}*"),
			SecretSelection::Arns(arns) => format!("secretsmanager:[{} arns]", arns.len()),
		}
	}

	async fn list(&self, prefix: Option<&str>) -> Result<Vec<SecretListEntry>, ClientError> {
		let filters: Vec<SecretsFilter> = prefix.map(SecretsFilter::name).into_iter().collect();
		let mut secrets = Vec::new();
		let mut next_token = None;
		loop {
			let page = self
				.client
				.list_secrets(ListSecretsRequest {
					filters: filters.clone(),
					next_token,
				})
				.await?;
			secrets.extend(page.secrets);
			match page.next_token {
				Some(token) => next_token = Some(token),
				None => return Ok(secrets),
			}
		}
	}

	pub(crate) async fn fetch(&self) -> Result<Payload, ClientError> {
		let listed = match &self.selection {
			SecretSelection::All => self.list(None).await?,
			SecretSelection::Prefix(prefix) => self.list(Some(prefix)).await?,
			SecretSelection::Arns(arns) => arns
				.iter()
				.map(|arn| SecretListEntry {
					arn: arn.clone(),
					name: arn.clone(),
				})
				.collect(),
		};

		let mut entries = Vec::with_capacity(listed.len());
		for secret in &listed {
			if let Some(filter) = &self.filter
				&& !filter(secret)
			{
				continue;
			}

			let value = match self.client.get_secret_value(&secret.arn).await {
				Ok(value) => value,
				Err(ClientError::NotFound(_)) => {
					#[cfg(feature = "logging")]
					error!("Secret '{}' ({}) not found, skipping", secret.name, secret.arn);
					continue;
				}
				Err(e) => return Err(e),
			};

			// Listed names are authoritative; explicit ARNs only know theirs after the read.
			let name = match &self.selection {
				SecretSelection::Arns(_) => value.name,
				_ => secret.name.clone(),
			};
			let Some(secret_string) = value.secret_string else {
				continue;
			};
			let kind = if looks_like_json(&secret_string) {
				EntryKind::JsonDocument
			} else {
				EntryKind::Scalar
			};
			entries.push(RawEntry::new(name, secret_string, kind));

			#[cfg(feature = "logging")]
			debug!("Loaded secret '{}'", secret.arn);
		}

		#[cfg(feature = "logging")]
		info!("Loaded {} secrets", listed.len());

		Ok(Payload::Entries(entries))
	}
}
