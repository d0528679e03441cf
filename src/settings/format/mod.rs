/* src/settings/format/mod.rs */

use std::path::Path;

use serde::de::DeserializeOwned;

use super::SettingsError;

mod json;
pub use json::Json;

#[cfg(feature = "toml")]
mod toml;
#[cfg(feature = "toml")]
pub use toml::Toml;

#[cfg(feature = "yaml")]
mod yaml;
#[cfg(feature = "yaml")]
pub use yaml::Yaml;

/// Settings file parser that converts bytes into a structured object.
pub trait Format: Send + Sync {
	/// List of supported extensions.
	fn extensions(&self) -> &'static [&'static str];

	/// Parse the raw bytes into the target type.
	fn parse<T: DeserializeOwned>(&self, input: &[u8]) -> Result<T, SettingsError>;
}

/// An enum wrapper for all enabled formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnyFormat {
	Json,
	#[cfg(feature = "toml")]
	Toml,
	#[cfg(feature = "yaml")]
	Yaml,
}

impl AnyFormat {
	/// Every enabled format.
	pub fn all() -> &'static [AnyFormat] {
		&[
			AnyFormat::Json,
			#[cfg(feature = "toml")]
			AnyFormat::Toml,
			#[cfg(feature = "yaml")]
			AnyFormat::Yaml,
		]
	}

	/// Picks the format matching the file extension, ignoring case.
	pub fn from_path(path: &Path) -> Option<AnyFormat> {
		let ext = path.extension()?.to_str()?.to_ascii_lowercase();
		Self::all()
			.iter()
			.copied()
			.find(|format| format.extensions().contains(&ext.as_str()))
	}
}

impl Format for AnyFormat {
	fn extensions(&self) -> &'static [&'static str] {
		match self {
			Self::Json => Json.extensions(),
			#[cfg(feature = "toml")]
			Self::Toml => Toml.extensions(),
			#[cfg(feature = "yaml")]
			Self::Yaml => Yaml.extensions(),
		}
	}

	fn parse<T: DeserializeOwned>(&self, input: &[u8]) -> Result<T, SettingsError> {
		match self {
			Self::Json => Json.parse(input),
			#[cfg(feature = "toml")]
			Self::Toml => Toml.parse(input),
			#[cfg(feature = "yaml")]
			Self::Yaml => Yaml.parse(input),
		}
	}
}
