/* src/settings/build.rs */

use std::fmt;
use std::sync::Arc;

#[cfg(feature = "logging")]
use log::info;

use super::{AwsSettings, SettingsError};
use crate::client::{
	AppConfigDataClient, ParameterStoreClient, SecretsManagerClient, SessionParams,
};
use crate::controller::Provider;
use crate::source::{AppConfigSource, ParameterStoreSource, SecretsSource};

/// Store clients used by the providers built from settings.
///
/// Only the clients a settings file actually needs have to be supplied.
#[derive(Clone, Default)]
pub struct Clients {
	pub secrets_manager: Option<Arc<dyn SecretsManagerClient>>,
	pub parameter_store: Option<Arc<dyn ParameterStoreClient>>,
	pub app_config: Option<Arc<dyn AppConfigDataClient>>,
	/// Client for `UseLambdaCacheLayer`. With the `lambda` feature a
	/// [`LambdaExtensionClient`](crate::client::LambdaExtensionClient) is
	/// created when none is given.
	pub lambda_cache: Option<Arc<dyn AppConfigDataClient>>,
}

impl fmt::Debug for Clients {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Clients")
			.field("secrets_manager", &self.secrets_manager.is_some())
			.field("parameter_store", &self.parameter_store.is_some())
			.field("app_config", &self.app_config.is_some())
			.field("lambda_cache", &self.lambda_cache.is_some())
			.finish()
	}
}

impl Clients {
	fn parameter_store(&self) -> Result<Arc<dyn ParameterStoreClient>, SettingsError> {
		self.parameter_store
			.clone()
			.ok_or(SettingsError::MissingClient("parameter store"))
	}

	fn secrets_manager(&self) -> Result<Arc<dyn SecretsManagerClient>, SettingsError> {
		self.secrets_manager
			.clone()
			.ok_or(SettingsError::MissingClient("secrets manager"))
	}

	fn app_config(&self, lambda: bool) -> Result<Arc<dyn AppConfigDataClient>, SettingsError> {
		if !lambda {
			return self
				.app_config
				.clone()
				.ok_or(SettingsError::MissingClient("appconfig data"));
		}
		match &self.lambda_cache {
			Some(client) => Ok(client.clone()),
			None => lambda_client(),
		}
	}
}

#[cfg(feature = "lambda")]
fn lambda_client() -> Result<Arc<dyn AppConfigDataClient>, SettingsError> {
	let client = crate::client::LambdaExtensionClient::new(reqwest::Client::new())
		.map_err(crate::controller::ProviderError::from)?;
	Ok(Arc::new(client))
}

#[cfg(not(feature = "lambda"))]
fn lambda_client() -> Result<Arc<dyn AppConfigDataClient>, SettingsError> {
	Err(SettingsError::MissingClient("appconfig lambda extension"))
}

/// Builds one provider per configured path, key, secret selection and profile.
///
/// Providers are returned unloaded, in that order. Secret names additionally
/// have `"<environment>/"` stripped, and profiles are read for `environment`.
pub fn build_providers(
	settings: &AwsSettings,
	environment: &str,
	clients: &Clients,
) -> Result<Vec<Provider>, SettingsError> {
	let reload_after = settings.reload_after;
	let mut providers = Vec::new();

	for path in &settings.parameter_store.paths {
		let source = ParameterStoreSource::builder(clients.parameter_store()?)
			.path(path.clone())
			.build()?;
		providers.push(provider(source, reload_after, false)?);

		#[cfg(feature = "logging")]
		info!(
			"Added AWS Parameter Store using path: {} and reloading after: {:?}",
			path, reload_after
		);
	}

	for key in &settings.parameter_store.keys {
		let mut builder =
			ParameterStoreSource::builder(clients.parameter_store()?).key(key.path.clone());
		if let Some(alias) = &key.alias {
			builder = builder.alias(alias.clone());
		}
		providers.push(provider(builder.build()?, reload_after, key.optional)?);

		#[cfg(feature = "logging")]
		info!(
			"Added AWS Parameter Store key: {} and reloading after: {:?}",
			key.path, reload_after
		);
	}

	let secrets = &settings.secrets_manager;
	if secrets.is_enabled() {
		let mut builder = SecretsSource::builder(clients.secrets_manager()?);
		builder = match &secrets.prefix {
			Some(prefix) => builder.prefix(prefix.clone()),
			None if !secrets.accepted_secret_arns.is_empty() => {
				builder.arns(secrets.accepted_secret_arns.iter().cloned())
			}
			None => builder.load_all(),
		};
		if !environment.is_empty() {
			builder = builder.strip_prefix(format!("{environment}/"));
		}
		let source = builder.build()?;

		#[cfg(feature = "logging")]
		info!(
			"Added AWS Secrets Manager using {} and reloading after: {:?}",
			source.name(),
			reload_after
		);
		providers.push(provider(source, reload_after, secrets.optional)?);
	}

	let app_config = &settings.app_config;
	for profile in &app_config.configuration_profiles {
		let params = SessionParams::new(
			app_config.application_identifier.clone(),
			environment,
			profile.identifier.clone(),
		);
		let client = clients.app_config(app_config.use_lambda_cache_layer)?;

		#[cfg(feature = "logging")]
		info!(
			"Added AWS AppConfig configuration {} and reloading after {:?}",
			params, reload_after
		);

		let source = AppConfigSource::builder(client, params).build()?;
		providers.push(provider(source, reload_after, profile.optional)?);
	}

	Ok(providers)
}

fn provider(
	source: impl Into<crate::source::Source>,
	reload_after: Option<std::time::Duration>,
	optional: bool,
) -> Result<Provider, SettingsError> {
	let mut builder = Provider::builder(source).optional(optional);
	if let Some(interval) = reload_after {
		builder = builder.reload_after(interval);
	}
	Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::client::{MemoryAppConfig, MemoryParameterStore, MemorySecretsManager};
	use crate::settings::AnyFormat;

	fn settings(json: &str) -> AwsSettings {
		AwsSettings::parse(json.as_bytes(), AnyFormat::Json).unwrap()
	}

	#[test]
	fn test_missing_client_is_reported() {
		let settings = settings(r#"{ "AwsSettings": { "ParameterStore": { "Paths": [ "/app" ] } } }"#);
		let err = build_providers(&settings, "prod", &Clients::default()).unwrap_err();
		assert!(matches!(err, SettingsError::MissingClient("parameter store")));
	}

	#[test]
	fn test_one_provider_per_entry() {
		let settings = settings(
			r#"{ "AwsSettings": {
				"ParameterStore": { "Paths": [ "/a", "/b" ], "Keys": [ { "Path": "/c", "Optional": true } ] },
				"SecretsManager": { "LoadAll": true },
				"AppConfig": { "ApplicationIdentifier": "app", "ConfigurationProfiles": [ { "Identifier": "main" } ] },
				"ReloadAfter": "00:01:00"
			} }"#,
		);
		let clients = Clients {
			secrets_manager: Some(Arc::new(MemorySecretsManager::new())),
			parameter_store: Some(Arc::new(MemoryParameterStore::new())),
			app_config: Some(Arc::new(MemoryAppConfig::new())),
			lambda_cache: None,
		};

		let providers = build_providers(&settings, "prod", &clients).unwrap();
		let names: Vec<_> = providers.iter().map(|p| p.name().to_string()).collect();
		assert_eq!(
			names,
			vec![
				"ssm:/a",
				"ssm:/b",
				"ssm:/c",
				"secretsmanager:*",
				"appconfig:app/prod/main"
			]
		);
		assert!(providers[2].is_optional());
		assert!(
			providers
				.iter()
				.all(|p| p.reload_after() == Some(std::time::Duration::from_secs(60)))
		);
	}
}
