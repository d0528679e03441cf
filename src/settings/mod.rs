/* src/settings/mod.rs */

//!
//! Declarative provider settings.
//!
//! An `AwsSettings` section (PascalCase keys, as in an `appsettings.json`)
//! describes which Parameter Store paths and keys, which secrets and which
//! AppConfig profiles to load, and how often to poll them. Settings are read
//! from JSON, TOML or YAML files, validated, and turned into providers by
//! [`build_providers`].

mod build;
mod duration;
mod error;
pub mod format;

pub use build::{Clients, build_providers};
pub use duration::parse_time_span;
pub use error::SettingsError;
pub use format::{AnyFormat, Format};

use std::borrow::Cow;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use validator::{Validate, ValidationError};

/// Root of the settings model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Validate)]
#[serde(rename_all = "PascalCase", default)]
pub struct AwsSettings {
	#[validate(nested)]
	pub parameter_store: ParameterStoreSettings,
	#[validate(nested)]
	pub app_config: AppConfigSettings,
	#[validate(nested)]
	pub secrets_manager: SecretsManagerSettings,
	/// Polling interval shared by every provider. `None` disables polling.
	#[serde(deserialize_with = "duration::deserialize")]
	pub reload_after: Option<Duration>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Validate)]
#[serde(rename_all = "PascalCase", default)]
pub struct ParameterStoreSettings {
	/// Every parameter below each path is loaded, with the path stripped from keys.
	#[validate(custom(function = "validate_paths"))]
	pub paths: Vec<String>,
	#[validate(nested)]
	pub keys: Vec<ParameterStoreKeySettings>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Validate)]
#[serde(rename_all = "PascalCase")]
pub struct ParameterStoreKeySettings {
	#[validate(length(min = 1))]
	pub path: String,
	#[serde(default)]
	pub alias: Option<String>,
	#[serde(default)]
	pub optional: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Validate)]
#[serde(rename_all = "PascalCase", default)]
#[validate(schema(function = "validate_app_config"))]
pub struct AppConfigSettings {
	pub application_identifier: String,
	/// Reads profiles through the AppConfig Lambda extension instead of AppConfigData.
	pub use_lambda_cache_layer: bool,
	#[validate(nested)]
	pub configuration_profiles: Vec<AppConfigProfileSettings>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Validate)]
#[serde(rename_all = "PascalCase")]
pub struct AppConfigProfileSettings {
	#[validate(length(min = 1))]
	pub identifier: String,
	#[serde(default)]
	pub optional: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Validate)]
#[serde(rename_all = "PascalCase", default)]
#[validate(schema(function = "validate_secrets_manager"))]
pub struct SecretsManagerSettings {
	pub load_all: bool,
	pub accepted_secret_arns: Vec<String>,
	pub prefix: Option<String>,
	pub optional: bool,
}

impl SecretsManagerSettings {
	/// True when any secrets are to be loaded.
	pub fn is_enabled(&self) -> bool {
		self.load_all || !self.accepted_secret_arns.is_empty() || self.prefix.is_some()
	}
}

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
	ValidationError::new(code).with_message(Cow::Borrowed(message))
}

fn validate_paths(paths: &[String]) -> Result<(), ValidationError> {
	if paths.iter().any(|p| p.trim().is_empty()) {
		return Err(invalid("empty_path", "parameter store paths must not be empty"));
	}
	Ok(())
}

fn validate_app_config(settings: &AppConfigSettings) -> Result<(), ValidationError> {
	if !settings.configuration_profiles.is_empty() && settings.application_identifier.is_empty() {
		return Err(invalid(
			"missing_application",
			"ApplicationIdentifier is required when profiles are configured",
		));
	}
	Ok(())
}

// An explicit ARN list, a prefix and LoadAll are alternative selections.
fn validate_secrets_manager(settings: &SecretsManagerSettings) -> Result<(), ValidationError> {
	let selected = [
		settings.load_all,
		!settings.accepted_secret_arns.is_empty(),
		settings.prefix.is_some(),
	]
	.into_iter()
	.filter(|s| *s)
	.count();
	if selected > 1 {
		return Err(invalid(
			"conflicting_selection",
			"LoadAll, AcceptedSecretArns and Prefix are mutually exclusive",
		));
	}
	if settings.prefix.as_deref().is_some_and(str::is_empty) {
		return Err(invalid("empty_prefix", "Prefix must not be empty"));
	}
	Ok(())
}

#[derive(Debug, Default, Deserialize)]
struct Document {
	#[serde(rename = "AwsSettings", default)]
	aws_settings: AwsSettings,
}

impl AwsSettings {
	/// Parses the `AwsSettings` section of a settings document and validates it.
	///
	/// A document without the section yields default (empty) settings.
	pub fn parse(input: &[u8], format: AnyFormat) -> Result<Self, SettingsError> {
		let document: Document = format.parse(input)?;
		document.aws_settings.validate()?;
		Ok(document.aws_settings)
	}

	/// Reads a settings file, picking the format from its extension.
	pub async fn load_file(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
		let path = path.as_ref();
		let format = AnyFormat::from_path(path)
			.ok_or_else(|| SettingsError::UnsupportedFormat(path.display().to_string()))?;
		let bytes = tokio::fs::read(path).await?;
		Self::parse(&bytes, format)
	}
}
