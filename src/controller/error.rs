/* src/controller/error.rs */

use thiserror::Error;

use crate::client::ClientError;
use crate::flatten::FormatError;

/// Errors that can occur while building or refreshing a provider.
#[derive(Debug, Error)]
pub enum ProviderError {
	#[error("Client error: {0}")]
	Client(#[from] ClientError),

	#[error("Format error: {0}")]
	Format(#[from] FormatError),

	#[error("Key pattern error: {0}")]
	Pattern(#[from] fancy_regex::Error),

	#[error("Builder error: {0}")]
	Builder(String),

	#[error("Provider not loaded yet. Call load() first.")]
	NotLoaded,
}
