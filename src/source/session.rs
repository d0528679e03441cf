/* src/source/session.rs */

//!
//! Session token tracking for AppConfigData long-poll fetches.
//!
//! A session is started lazily and replaced shortly before the service would
//! expire it. Every fetch advances the token to the one returned by the
//! service; empty payloads mean "unchanged" and resolve to the last content.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::client::{AppConfigDataClient, ClientError, SessionParams};

/// How long a started session is trusted. The service expires tokens after 24
/// hours; the margin keeps the tracker ahead of it.
pub const SESSION_LIFETIME: Duration = Duration::from_secs(23 * 60 * 60 + 59 * 60);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionState {
	#[default]
	NoToken,
	HasToken { token: String, expires_at: Instant },
}

pub struct SessionTracker {
	client: Arc<dyn AppConfigDataClient>,
	params: SessionParams,
	state: SessionState,
	last_content: Option<Arc<str>>,
}

impl fmt::Debug for SessionTracker {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("SessionTracker")
			.field("params", &self.params)
			.field("state", &self.state)
			.field("has_content", &self.last_content.is_some())
			.finish_non_exhaustive()
	}
}

impl SessionTracker {
	pub fn new(client: Arc<dyn AppConfigDataClient>, params: SessionParams) -> Self {
		Self {
			client,
			params,
			state: SessionState::NoToken,
			last_content: None,
		}
	}

	pub fn params(&self) -> &SessionParams {
		&self.params
	}

	pub fn state(&self) -> &SessionState {
		&self.state
	}

	/// Last non-empty content received, if any.
	pub fn last_content(&self) -> Option<&Arc<str>> {
		self.last_content.as_ref()
	}

	/// Fetches the latest content, or the last known content when unchanged.
	pub async fn fetch(&mut self) -> Result<Option<Arc<str>>, ClientError> {
		self.fetch_at(Instant::now()).await
	}

	/// Same as [`fetch`](Self::fetch) with an explicit clock reading.
	///
	/// A reused token rejected as expired resets the session and the fetch is
	/// retried once with a fresh one.
	pub async fn fetch_at(&mut self, now: Instant) -> Result<Option<Arc<str>>, ClientError> {
		let (token, fresh) = self.token(now).await?;
		match self.poll(&token).await {
			Err(ClientError::ExpiredToken) if !fresh => {
				self.state = SessionState::NoToken;
				let (token, _) = self.token(now).await?;
				self.poll(&token).await
			}
			other => other,
		}
	}

	async fn token(&mut self, now: Instant) -> Result<(String, bool), ClientError> {
		if let SessionState::HasToken { token, expires_at } = &self.state
			&& now < *expires_at
		{
			return Ok((token.clone(), false));
		}

		let token = self.client.start_session(&self.params).await?;
		self.state = SessionState::HasToken {
			token: token.clone(),
			expires_at: now + SESSION_LIFETIME,
		};
		Ok((token, true))
	}

	async fn poll(&mut self, token: &str) -> Result<Option<Arc<str>>, ClientError> {
		let latest = self.client.get_latest(token).await?;

		if let SessionState::HasToken { token, .. } = &mut self.state {
			*token = latest.next_token;
		}
		// A blank payload, whitespace included, means "unchanged".
		if !latest.content.trim().is_empty() {
			self.last_content = Some(Arc::from(latest.content));
		}
		Ok(self.last_content.clone())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::client::MemoryAppConfig;

	fn setup() -> (Arc<MemoryAppConfig>, SessionTracker, SessionParams) {
		let client = Arc::new(MemoryAppConfig::new());
		let params = SessionParams::new("app", "prod", "main");
		client.deploy(&params, "{\"a\":\"1\"}");
		let tracker = SessionTracker::new(client.clone(), params.clone());
		(client, tracker, params)
	}

	fn token_of(state: &SessionState) -> Option<&str> {
		match state {
			SessionState::HasToken { token, .. } => Some(token),
			SessionState::NoToken => None,
		}
	}

	#[tokio::test]
	async fn test_starts_session_lazily() {
		let (client, mut tracker, _) = setup();
		assert_eq!(tracker.state(), &SessionState::NoToken);

		let content = tracker.fetch().await.unwrap();
		assert_eq!(content.as_deref(), Some("{\"a\":\"1\"}"));
		assert_eq!(client.start_calls(), 1);
		assert!(token_of(tracker.state()).is_some());
	}

	#[tokio::test]
	async fn test_empty_payload_keeps_content_and_advances_token() {
		let (client, mut tracker, _) = setup();
		let first = tracker.fetch().await.unwrap();
		let token_before = token_of(tracker.state()).map(str::to_string);

		let second = tracker.fetch().await.unwrap();
		let token_after = token_of(tracker.state()).map(str::to_string);

		assert_eq!(first, second);
		assert_ne!(token_before, token_after);
		assert_eq!(client.start_calls(), 1);
		assert_eq!(client.latest_calls(), 2);
	}

	#[tokio::test]
	async fn test_new_deployment_replaces_content() {
		let (client, mut tracker, params) = setup();
		tracker.fetch().await.unwrap();
		client.deploy(&params, "{\"a\":\"2\"}");
		let content = tracker.fetch().await.unwrap();
		assert_eq!(content.as_deref(), Some("{\"a\":\"2\"}"));
	}

	#[tokio::test]
	async fn test_session_restarts_after_lifetime() {
		let (client, mut tracker, _) = setup();
		let start = Instant::now();
		tracker.fetch_at(start).await.unwrap();

		tracker
			.fetch_at(start + SESSION_LIFETIME - Duration::from_secs(1))
			.await
			.unwrap();
		assert_eq!(client.start_calls(), 1);

		tracker.fetch_at(start + SESSION_LIFETIME).await.unwrap();
		assert_eq!(client.start_calls(), 2);
		match tracker.state() {
			SessionState::HasToken { expires_at, .. } => {
				assert_eq!(*expires_at, start + SESSION_LIFETIME + SESSION_LIFETIME);
			}
			SessionState::NoToken => panic!("expected a token"),
		}
	}

	#[tokio::test]
	async fn test_expired_token_retries_with_new_session() {
		let (client, mut tracker, _) = setup();
		tracker.fetch().await.unwrap();
		client.expire_tokens();

		let content = tracker.fetch().await.unwrap();
		assert_eq!(content.as_deref(), Some("{\"a\":\"1\"}"));
		assert_eq!(client.start_calls(), 2);
	}

	#[tokio::test]
	async fn test_missing_profile_fails() {
		let client = Arc::new(MemoryAppConfig::new());
		let mut tracker = SessionTracker::new(client, SessionParams::new("app", "prod", "none"));
		assert!(tracker.fetch().await.unwrap_err().is_not_found());
		assert_eq!(tracker.state(), &SessionState::NoToken);
	}

	#[tokio::test]
	async fn test_whitespace_payload_keeps_content() {
		let (client, mut tracker, params) = setup();
		let first = tracker.fetch().await.unwrap();
		client.deploy(&params, " \n\t");
		let token_before = token_of(tracker.state()).map(str::to_string);

		let second = tracker.fetch().await.unwrap();
		assert_eq!(first, second);
		assert_ne!(token_of(tracker.state()).map(str::to_string), token_before);
	}
}
