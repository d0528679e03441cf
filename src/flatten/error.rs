/* src/flatten/error.rs */

/// Errors raised while turning a payload into flat entries.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
	/// The payload is not valid JSON.
	#[error("parse error: {0}")]
	Parse(String),

	/// Two leaves resolved to the same configuration path.
	#[error("a duplicate key '{key}' was found")]
	DuplicateKey { key: String },

	/// The value tree holds a node that cannot be flattened at this position.
	#[error("unsupported node '{kind}' was found")]
	UnsupportedNode { kind: &'static str },
}
