/* src/source/appconfig.rs */

//! AppConfig profiles fetched through a tracked configuration session.

use std::sync::Arc;

#[cfg(feature = "logging")]
use log::debug;
use tokio::sync::Mutex;

use super::Payload;
use super::session::SessionTracker;
use crate::client::{AppConfigDataClient, ClientError, SessionParams};
use crate::controller::ProviderError;
use crate::keys::KeyDeriver;

#[derive(Debug)]
struct DocumentSource {
	params: SessionParams,
	tracker: Mutex<SessionTracker>,
	keys: KeyDeriver,
}

impl DocumentSource {
	fn new(
		client: Arc<dyn AppConfigDataClient>,
		params: SessionParams,
		feature_flags: bool,
	) -> Result<Self, ProviderError> {
		for (field, value) in [
			("application", &params.application),
			("environment", &params.environment),
			("profile", &params.profile),
		] {
			if value.is_empty() {
				return Err(ProviderError::Builder(format!("{field} must not be empty")));
			}
		}

		let keys = KeyDeriver::builder().feature_flags(feature_flags).build()?;
		Ok(Self {
			tracker: Mutex::new(SessionTracker::new(client, params.clone())),
			params,
			keys,
		})
	}

	async fn fetch(&self) -> Result<Payload, ClientError> {
		let content = self.tracker.lock().await.fetch().await?;

		#[cfg(feature = "logging")]
		debug!(
			"Fetched profile '{}' ({} bytes)",
			self.params,
			content.as_ref().map_or(0, |c| c.len())
		);

		Ok(Payload::Document(content))
	}
}

/// Loads an AppConfig freeform JSON profile.
#[derive(Debug)]
pub struct AppConfigSource {
	inner: DocumentSource,
}

/// Builder for [`AppConfigSource`].
pub struct AppConfigSourceBuilder {
	client: Arc<dyn AppConfigDataClient>,
	params: SessionParams,
	feature_flags: bool,
}

impl AppConfigSourceBuilder {
	/// Publishes `FeatureManagement` companions for flag shaped keys. On by default.
	pub fn feature_flags(mut self, enabled: bool) -> Self {
		self.feature_flags = enabled;
		self
	}

	pub fn build(self) -> Result<AppConfigSource, ProviderError> {
		Ok(AppConfigSource {
			inner: DocumentSource::new(self.client, self.params, self.feature_flags)?,
		})
	}
}

impl AppConfigSource {
	pub fn builder(
		client: Arc<dyn AppConfigDataClient>,
		params: SessionParams,
	) -> AppConfigSourceBuilder {
		AppConfigSourceBuilder {
			client,
			params,
			feature_flags: true,
		}
	}

	pub fn params(&self) -> &SessionParams {
		&self.inner.params
	}

	pub fn keys(&self) -> &KeyDeriver {
		&self.inner.keys
	}

	pub fn name(&self) -> String {
		format!("appconfig:{}", self.inner.params)
	}

	pub(crate) async fn fetch(&self) -> Result<Payload, ClientError> {
		self.inner.fetch().await
	}
}

/// Loads an AppConfig feature flag profile.
#[derive(Debug)]
pub struct FeatureFlagSource {
	inner: DocumentSource,
}

impl FeatureFlagSource {
	pub fn new(
		client: Arc<dyn AppConfigDataClient>,
		params: SessionParams,
	) -> Result<Self, ProviderError> {
		Ok(Self {
			inner: DocumentSource::new(client, params, true)?,
		})
	}

	pub fn params(&self) -> &SessionParams {
		&self.inner.params
	}

	pub fn keys(&self) -> &KeyDeriver {
		&self.inner.keys
	}

	pub fn name(&self) -> String {
		format!("featureflags:{}", self.inner.params)
	}

	pub(crate) async fn fetch(&self) -> Result<Payload, ClientError> {
		self.inner.fetch().await
	}
}
