/* src/client/error.rs */

/// Errors returned by remote store clients.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
	/// The entry, secret or session target does not exist.
	#[error("resource not found: {0}")]
	NotFound(String),

	/// The long-poll configuration token is no longer accepted.
	#[error("configuration token expired")]
	ExpiredToken,

	/// The service rejected the request because of rate limits.
	#[error("request throttled: {0}")]
	Throttled(String),

	/// Any other error reported by the service.
	#[error("service error: {0}")]
	Service(String),

	/// The request did not reach the service.
	#[error("transport error: {0}")]
	Transport(String),

	/// The response carried a payload type the source cannot handle.
	#[error("unsupported content type: {0}")]
	UnsupportedContent(String),

	/// HTTP client error.
	#[cfg(feature = "lambda")]
	#[error("HTTP error: {0}")]
	Http(#[from] reqwest::Error),
}

impl ClientError {
	pub fn is_not_found(&self) -> bool {
		matches!(self, ClientError::NotFound(_))
	}
}
