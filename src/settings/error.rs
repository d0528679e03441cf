/* src/settings/error.rs */

use thiserror::Error;

use crate::controller::ProviderError;

/// Errors raised while loading settings or building providers from them.
#[derive(Debug, Error)]
pub enum SettingsError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	#[error("Parse error: {0}")]
	Parse(String),

	#[error("Unsupported settings format: {0}")]
	UnsupportedFormat(String),

	#[error("Validation failed: {0}")]
	Validation(#[from] validator::ValidationErrors),

	#[error("No {0} client was supplied")]
	MissingClient(&'static str),

	#[error("Provider error: {0}")]
	Provider(#[from] ProviderError),
}
