/* src/client/mod.rs */

//!
//! Contracts of the remote stores read by the sources.
//!
//! Transport is not part of this crate: SDK wrappers implement these traits.
//! In-memory implementations are provided for tests and embedded use, and the
//! `lambda` feature adds a client for the AppConfig Lambda extension.

mod error;
#[cfg(feature = "lambda")]
mod lambda;
mod memory;

pub use error::ClientError;
#[cfg(feature = "lambda")]
pub use lambda::{DEFAULT_EXTENSION_PORT, EXTENSION_PORT_VAR, LambdaExtensionClient};
pub use memory::{MemoryAppConfig, MemoryParameterStore, MemorySecretsManager};

use std::fmt;

use async_trait::async_trait;

/// Filter applied when listing secrets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretsFilter {
	pub key: String,
	pub values: Vec<String>,
}

impl SecretsFilter {
	/// Matches secrets whose name starts with `prefix`.
	pub fn name(prefix: impl Into<String>) -> Self {
		Self {
			key: "name".to_string(),
			values: vec![prefix.into()],
		}
	}
}

#[derive(Debug, Clone, Default)]
pub struct ListSecretsRequest {
	pub filters: Vec<SecretsFilter>,
	pub next_token: Option<String>,
}

/// A secret as returned by the listing call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretListEntry {
	pub arn: String,
	pub name: String,
}

/// One page of a secrets listing.
#[derive(Debug, Clone, Default)]
pub struct SecretsPage {
	pub secrets: Vec<SecretListEntry>,
	pub next_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretValue {
	pub arn: String,
	pub name: String,
	/// `None` for binary secrets.
	pub secret_string: Option<String>,
}

/// Secrets Manager operations used by the secrets source.
#[async_trait]
pub trait SecretsManagerClient: Send + Sync {
	async fn list_secrets(&self, request: ListSecretsRequest) -> Result<SecretsPage, ClientError>;

	/// Gets the current value of a secret by ARN or name.
	async fn get_secret_value(&self, secret_id: &str) -> Result<SecretValue, ClientError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParameterType {
	#[default]
	String,
	StringList,
	SecureString,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
	pub name: String,
	pub value: Option<String>,
	pub kind: ParameterType,
}

/// One page of a by-path parameter listing.
#[derive(Debug, Clone, Default)]
pub struct ParameterPage {
	pub parameters: Vec<Parameter>,
	pub next_token: Option<String>,
}

/// Parameter Store operations used by the parameter source.
#[async_trait]
pub trait ParameterStoreClient: Send + Sync {
	/// Lists decrypted parameters below `path`, recursively.
	async fn get_parameters_by_path(
		&self,
		path: &str,
		next_token: Option<String>,
	) -> Result<ParameterPage, ClientError>;

	/// Gets a single decrypted parameter.
	async fn get_parameter(&self, name: &str) -> Result<Parameter, ClientError>;
}

/// Identifies one AppConfig configuration profile deployment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionParams {
	pub application: String,
	pub environment: String,
	pub profile: String,
}

impl SessionParams {
	pub fn new(
		application: impl Into<String>,
		environment: impl Into<String>,
		profile: impl Into<String>,
	) -> Self {
		Self {
			application: application.into(),
			environment: environment.into(),
			profile: profile.into(),
		}
	}
}

impl fmt::Display for SessionParams {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}/{}/{}", self.application, self.environment, self.profile)
	}
}

/// Response of a get-latest-configuration call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LatestConfiguration {
	/// Token to pass on the next call.
	pub next_token: String,
	/// Configuration content; empty when unchanged since the previous call.
	pub content: String,
}

/// AppConfigData long-poll operations used by the AppConfig sources.
#[async_trait]
pub trait AppConfigDataClient: Send + Sync {
	/// Starts a configuration session and returns the initial token.
	async fn start_session(&self, params: &SessionParams) -> Result<String, ClientError>;

	async fn get_latest(&self, token: &str) -> Result<LatestConfiguration, ClientError>;
}
