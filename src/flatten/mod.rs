/* src/flatten/mod.rs */

//!
//! Flattening of value trees into `path -> string` entries.
//!
//! Objects contribute their property names and arrays their indices as path
//! segments; every scalar leaf becomes one entry. Paths are compared
//! case-insensitively and must be unique within one [`Flattener`].

mod error;
mod node;

pub use error::FormatError;
pub use node::Node;

use std::collections::HashSet;

use crate::keys::KEY_DELIMITER;

/// A single leaf of a flattened value tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlattenedEntry {
	/// Path segments from the root to the leaf.
	pub path: Vec<String>,
	/// Stringified scalar value.
	pub value: String,
}

impl FlattenedEntry {
	/// Returns the path joined with the key delimiter.
	pub fn key(&self) -> String {
		self.path.join(KEY_DELIMITER)
	}
}

/// Accumulates flattened entries across several trees of one fetch.
#[derive(Debug, Default)]
pub struct Flattener {
	entries: Vec<FlattenedEntry>,
	seen: HashSet<String>,
}

impl Flattener {
	pub fn new() -> Self {
		Self::default()
	}

	/// Flattens `node` below `prefix` and appends the resulting entries.
	///
	/// On error the entries emitted before the failing leaf are kept, but the
	/// caller is expected to drop the whole flattener.
	pub fn push(&mut self, prefix: &[String], node: &Node) -> Result<(), FormatError> {
		let mut path = prefix.to_vec();
		self.visit(&mut path, node)
	}

	fn visit(&mut self, path: &mut Vec<String>, node: &Node) -> Result<(), FormatError> {
		match node {
			Node::Object(props) => {
				for (name, value) in props {
					path.push(name.clone());
					self.visit(path, value)?;
					path.pop();
				}
				Ok(())
			}
			Node::Array(items) => {
				for (index, value) in items.iter().enumerate() {
					path.push(index.to_string());
					self.visit(path, value)?;
					path.pop();
				}
				Ok(())
			}
			Node::String(s) | Node::Number(s) => self.emit(path, s.clone()),
			Node::Bool(b) => self.emit(path, b.to_string()),
			Node::Null => self.emit(path, String::new()),
		}
	}

	fn emit(&mut self, path: &[String], value: String) -> Result<(), FormatError> {
		let key = path.join(KEY_DELIMITER);
		if !self.seen.insert(key.to_lowercase()) {
			return Err(FormatError::DuplicateKey { key });
		}
		self.entries.push(FlattenedEntry {
			path: path.to_vec(),
			value,
		});
		Ok(())
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Consumes the flattener and returns the entries in emission order.
	pub fn finish(self) -> Vec<FlattenedEntry> {
		self.entries
	}
}

/// Flattens a single tree below `prefix`.
pub fn flatten(node: &Node, prefix: &[String]) -> Result<Vec<FlattenedEntry>, FormatError> {
	let mut flattener = Flattener::new();
	flattener.push(prefix, node)?;
	Ok(flattener.finish())
}

/// Parses and flattens a whole JSON document. The root must be an object.
pub fn flatten_document(text: &str) -> Result<Vec<FlattenedEntry>, FormatError> {
	let node = Node::parse(text)?;
	match node {
		Node::Object(_) => flatten(&node, &[]),
		other => Err(FormatError::UnsupportedNode { kind: other.kind() }),
	}
}
