/* src/flatten/node.rs */

use std::fmt;
use std::marker::PhantomData;

use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};
use serde_json::value::RawValue;

use super::FormatError;

/// A parsed value tree.
///
/// Objects keep their properties in document order, duplicates included, so the
/// flattener can reject a repeated property instead of keeping the last one.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
	Object(Vec<(String, Node)>),
	Array(Vec<Node>),
	String(String),
	/// Number in its decimal text form.
	Number(String),
	Bool(bool),
	Null,
}

impl Node {
	/// Parses a JSON document into a value tree.
	///
	/// Numbers keep their literal text, so `1.10` stays `1.10`.
	pub fn parse(text: &str) -> Result<Self, FormatError> {
		let raw: &RawValue = serde_json::from_str(text).map_err(parse_error)?;
		Self::from_raw(raw)
	}

	fn from_raw(raw: &RawValue) -> Result<Self, FormatError> {
		let text = raw.get().trim();
		match text.as_bytes().first() {
			Some(b'{') => {
				let Members(props) = serde_json::from_str(text).map_err(parse_error)?;
				props
					.into_iter()
					.map(|(name, value)| Self::from_raw(value).map(|node| (name, node)))
					.collect::<Result<_, FormatError>>()
					.map(Node::Object)
			}
			Some(b'[') => {
				let items: Vec<&RawValue> = serde_json::from_str(text).map_err(parse_error)?;
				items
					.into_iter()
					.map(Self::from_raw)
					.collect::<Result<_, FormatError>>()
					.map(Node::Array)
			}
			Some(b'"') => serde_json::from_str(text).map(Node::String).map_err(parse_error),
			Some(b't' | b'f') => serde_json::from_str(text).map(Node::Bool).map_err(parse_error),
			Some(b'n') => Ok(Node::Null),
			_ => Ok(Node::Number(text.to_string())),
		}
	}

	/// Builds an array of strings from a comma separated list.
	pub fn from_list(list: &str) -> Self {
		Node::Array(
			list.split(',')
				.map(|item| Node::String(item.to_string()))
				.collect(),
		)
	}

	/// Name of the node kind, used in error messages.
	pub fn kind(&self) -> &'static str {
		match self {
			Node::Object(_) => "object",
			Node::Array(_) => "array",
			Node::String(_) => "string",
			Node::Number(_) => "number",
			Node::Bool(_) => "bool",
			Node::Null => "null",
		}
	}

	/// Number of scalar leaves below (and including) this node.
	pub fn leaf_count(&self) -> usize {
		match self {
			Node::Object(props) => props.iter().map(|(_, v)| v.leaf_count()).sum(),
			Node::Array(items) => items.iter().map(Node::leaf_count).sum(),
			_ => 1,
		}
	}
}

fn parse_error(e: serde_json::Error) -> FormatError {
	FormatError::Parse(e.to_string())
}

impl From<serde_json::Value> for Node {
	fn from(value: serde_json::Value) -> Self {
		use serde_json::Value;

		match value {
			Value::Object(map) => Node::Object(map.into_iter().map(|(k, v)| (k, v.into())).collect()),
			Value::Array(items) => Node::Array(items.into_iter().map(Node::from).collect()),
			Value::String(s) => Node::String(s),
			Value::Number(n) => Node::Number(n.to_string()),
			Value::Bool(b) => Node::Bool(b),
			Value::Null => Node::Null,
		}
	}
}

/// Object members in document order, values still unparsed.
struct Members<'a>(Vec<(String, &'a RawValue)>);

impl<'de: 'a, 'a> Deserialize<'de> for Members<'a> {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		deserializer.deserialize_map(MembersVisitor(PhantomData))
	}
}

struct MembersVisitor<'a>(PhantomData<&'a ()>);

impl<'de: 'a, 'a> Visitor<'de> for MembersVisitor<'a> {
	type Value = Members<'a>;

	fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("a JSON object")
	}

	fn visit_map<A>(self, mut map: A) -> Result<Members<'a>, A::Error>
	where
		A: MapAccess<'de>,
	{
		let mut props = Vec::with_capacity(map.size_hint().unwrap_or(0));
		while let Some((name, value)) = map.next_entry::<String, &'a RawValue>()? {
			props.push((name, value));
		}
		Ok(Members(props))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_parse_keeps_duplicate_properties() {
		let node = Node::parse(r#"{"a": 1, "a": 2}"#).unwrap();
		match node {
			Node::Object(props) => {
				assert_eq!(props.len(), 2);
				assert_eq!(props[0], ("a".to_string(), Node::Number("1".to_string())));
				assert_eq!(props[1], ("a".to_string(), Node::Number("2".to_string())));
			}
			other => panic!("expected object, got {}", other.kind()),
		}
	}

	#[test]
	fn test_parse_scalars() {
		assert_eq!(Node::parse("true").unwrap(), Node::Bool(true));
		assert_eq!(Node::parse("null").unwrap(), Node::Null);
		assert_eq!(Node::parse("-7").unwrap(), Node::Number("-7".to_string()));
		assert_eq!(Node::parse("1.5").unwrap(), Node::Number("1.5".to_string()));
		assert_eq!(
			Node::parse(r#""text""#).unwrap(),
			Node::String("text".to_string())
		);
	}

	#[test]
	fn test_numbers_keep_their_text() {
		let node =
			Node::parse(r#"{"Version":1.10,"Ratio":1.0,"Big":123456789012345678901234567890,"Exp":1e3}"#)
				.unwrap();
		let Node::Object(props) = node else {
			panic!("expected object");
		};
		let numbers: Vec<_> = props
			.iter()
			.map(|(name, value)| (name.as_str(), value.clone()))
			.collect();
		assert_eq!(
			numbers,
			vec![
				("Version", Node::Number("1.10".to_string())),
				("Ratio", Node::Number("1.0".to_string())),
				("Big", Node::Number("123456789012345678901234567890".to_string())),
				("Exp", Node::Number("1e3".to_string())),
			]
		);
	}

	#[test]
	fn test_parse_nested_with_whitespace() {
		let node = Node::parse(" { \"a\" : [ 1 , \"x\\\"y\" , null ] } ").unwrap();
		assert_eq!(
			node,
			Node::Object(vec![(
				"a".to_string(),
				Node::Array(vec![
					Node::Number("1".to_string()),
					Node::String("x\"y".to_string()),
					Node::Null,
				])
			)])
		);
	}

	#[test]
	fn test_parse_invalid() {
		assert!(matches!(Node::parse("{\"a\":"), Err(FormatError::Parse(_))));
	}

	#[test]
	fn test_from_list() {
		let node = Node::from_list("a,b,,c");
		assert_eq!(node.leaf_count(), 4);
	}
}
