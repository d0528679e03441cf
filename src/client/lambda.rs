/* src/client/lambda.rs */

//! AppConfig Lambda extension client.
//!
//! The extension keeps its own cache of the deployed configuration and serves
//! the full document on every request, so the "session token" is simply the
//! resolved profile URL and every poll returns content.

use super::{AppConfigDataClient, ClientError, LatestConfiguration, SessionParams};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{StatusCode, Url};

/// Port the extension listens on when the environment does not override it.
pub const DEFAULT_EXTENSION_PORT: u16 = 2772;

/// Environment variable holding the extension port.
pub const EXTENSION_PORT_VAR: &str = "AWS_APPCONFIG_EXTENSION_HTTP_PORT";

const JSON_CONTENT_TYPE: &str = "application/json";

#[derive(Debug, Clone)]
pub struct LambdaExtensionClient {
	http: reqwest::Client,
	base_url: Url,
}

impl LambdaExtensionClient {
	/// Targets `localhost` on the port from [`EXTENSION_PORT_VAR`], or
	/// [`DEFAULT_EXTENSION_PORT`] when unset or invalid.
	pub fn new(http: reqwest::Client) -> Result<Self, ClientError> {
		let port = std::env::var(EXTENSION_PORT_VAR)
			.ok()
			.and_then(|value| value.trim().parse::<u16>().ok())
			.unwrap_or(DEFAULT_EXTENSION_PORT);
		let base_url = Url::parse(&format!("http://localhost:{port}/"))
			.map_err(|e| ClientError::Transport(e.to_string()))?;
		Ok(Self { http, base_url })
	}

	/// Targets an explicit base URL.
	pub fn with_base_url(http: reqwest::Client, base_url: &str) -> Result<Self, ClientError> {
		let base_url = Url::parse(base_url).map_err(|e| ClientError::Transport(e.to_string()))?;
		Ok(Self { http, base_url })
	}

	pub fn base_url(&self) -> &Url {
		&self.base_url
	}

	fn profile_url(&self, params: &SessionParams) -> Result<Url, ClientError> {
		let mut url = self.base_url.clone();
		url.path_segments_mut()
			.map_err(|_| ClientError::Transport(format!("cannot extend base url '{}'", self.base_url)))?
			.pop_if_empty()
			.extend([
				"applications",
				params.application.as_str(),
				"environments",
				params.environment.as_str(),
				"configurations",
				params.profile.as_str(),
			]);
		Ok(url)
	}
}

#[async_trait]
impl AppConfigDataClient for LambdaExtensionClient {
	async fn start_session(&self, params: &SessionParams) -> Result<String, ClientError> {
		Ok(self.profile_url(params)?.to_string())
	}

	async fn get_latest(&self, token: &str) -> Result<LatestConfiguration, ClientError> {
		let response = self.http.get(token).send().await?;

		match response.status() {
			StatusCode::NOT_FOUND => return Err(ClientError::NotFound(token.to_string())),
			StatusCode::TOO_MANY_REQUESTS => {
				return Err(ClientError::Throttled(token.to_string()));
			}
			status if !status.is_success() => {
				return Err(ClientError::Service(format!("{status} from {token}")));
			}
			_ => {}
		}

		let content_type = response
			.headers()
			.get(CONTENT_TYPE)
			.and_then(|value| value.to_str().ok())
			.unwrap_or_default()
			.to_string();
		if !content_type
			.split(';')
			.next()
			.is_some_and(|mime| mime.trim().eq_ignore_ascii_case(JSON_CONTENT_TYPE))
		{
			return Err(ClientError::UnsupportedContent(content_type));
		}

		let content = response.text().await?;
		Ok(LatestConfiguration {
			next_token: token.to_string(),
			content,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_profile_url_layout() {
		let client =
			LambdaExtensionClient::with_base_url(reqwest::Client::new(), "http://localhost:2772/")
				.unwrap();
		let url = client
			.profile_url(&SessionParams::new("app", "prod", "flags"))
			.unwrap();
		assert_eq!(
			url.as_str(),
			"http://localhost:2772/applications/app/environments/prod/configurations/flags"
		);
	}

	#[test]
	fn test_profile_url_escapes_segments() {
		let client =
			LambdaExtensionClient::with_base_url(reqwest::Client::new(), "http://localhost:2772")
				.unwrap();
		let url = client
			.profile_url(&SessionParams::new("my app", "prod", "a/b"))
			.unwrap();
		assert!(url.as_str().ends_with("/applications/my%20app/environments/prod/configurations/a%2Fb"));
	}
}
