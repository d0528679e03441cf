/* src/settings/format/json.rs */

use super::super::SettingsError;
use super::Format;
use serde::de::DeserializeOwned;

/// JSON format parser using `serde_json`.
pub struct Json;

impl Format for Json {
	fn extensions(&self) -> &'static [&'static str] {
		&["json"]
	}

	fn parse<T: DeserializeOwned>(&self, input: &[u8]) -> Result<T, SettingsError> {
		serde_json::from_slice(input).map_err(|e| SettingsError::Parse(e.to_string()))
	}
}
