/* src/keys.rs */

//!
//! Derivation of published configuration keys from raw entry paths.
//!
//! A [`KeyDeriver`] is compiled once per provider. It strips known source
//! prefixes, applies aliases, adds `FeatureManagement:` companions for feature
//! flag entries and title-cases every published key.

use fancy_regex::Regex;

use crate::flatten::FlattenedEntry;

/// Delimiter between the segments of a configuration key.
pub const KEY_DELIMITER: &str = ":";

/// Root section under which feature flag companions are published.
pub const FEATURE_MANAGEMENT_ROOT: &str = "FeatureManagement";

/// Separator used by remote stores inside entry names.
pub const PATH_SEPARATOR: char = '/';

const FEATURE_FLAG_PATTERN: &str = "^[^:]+:enabled$|^[^:]+:enabledFor(:.*)?$";
const ENABLED_SUFFIX: &str = ":enabled";

#[derive(Debug, Clone)]
struct PrefixMatcher {
	prefix: String,
	regex: Regex,
}

impl PrefixMatcher {
	fn new(prefix: String) -> Result<Self, fancy_regex::Error> {
		let regex = Regex::new(&format!("(?i){}", fancy_regex::escape(&prefix)))?;
		Ok(Self { prefix, regex })
	}

	/// Removes the first occurrence of the prefix, if any.
	fn strip(&self, raw: &str) -> String {
		match self.regex.find(raw) {
			Ok(Some(m)) => {
				let mut out = String::with_capacity(raw.len() - m.as_str().len());
				out.push_str(&raw[..m.start()]);
				out.push_str(&raw[m.end()..]);
				out
			}
			_ => raw.to_string(),
		}
	}
}

/// Builder for [`KeyDeriver`].
#[derive(Debug, Clone, Default)]
pub struct KeyDeriverBuilder {
	prefixes: Vec<String>,
	feature_flags: bool,
	rewrite_separators: bool,
}

impl KeyDeriverBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds a prefix to strip. Prefixes are applied in the order they are added.
	/// Empty prefixes are ignored.
	pub fn strip_prefix(mut self, prefix: impl Into<String>) -> Self {
		let prefix = prefix.into();
		if !prefix.is_empty() {
			self.prefixes.push(prefix);
		}
		self
	}

	/// Publishes `FeatureManagement:<flag>` companions for flag entries.
	pub fn feature_flags(mut self, enabled: bool) -> Self {
		self.feature_flags = enabled;
		self
	}

	/// Replaces `/` in entry names with the key delimiter.
	pub fn rewrite_separators(mut self, enabled: bool) -> Self {
		self.rewrite_separators = enabled;
		self
	}

	pub fn build(self) -> Result<KeyDeriver, fancy_regex::Error> {
		let prefixes = self
			.prefixes
			.into_iter()
			.map(PrefixMatcher::new)
			.collect::<Result<Vec<_>, _>>()?;

		let feature_flags = if self.feature_flags {
			Some(Regex::new(FEATURE_FLAG_PATTERN)?)
		} else {
			None
		};

		Ok(KeyDeriver {
			prefixes,
			feature_flags,
			rewrite_separators: self.rewrite_separators,
		})
	}
}

/// Maps raw entry names and flattened paths to published keys.
#[derive(Debug, Clone)]
pub struct KeyDeriver {
	prefixes: Vec<PrefixMatcher>,
	feature_flags: Option<Regex>,
	rewrite_separators: bool,
}

impl KeyDeriver {
	pub fn builder() -> KeyDeriverBuilder {
		KeyDeriverBuilder::new()
	}

	/// A deriver that only title-cases.
	pub fn plain() -> Self {
		Self {
			prefixes: Vec::new(),
			feature_flags: None,
			rewrite_separators: false,
		}
	}

	/// Configured prefixes, in stripping order.
	pub fn prefixes(&self) -> impl Iterator<Item = &str> {
		self.prefixes.iter().map(|m| m.prefix.as_str())
	}

	/// Strips every configured prefix once and rewrites path separators.
	pub fn strip(&self, raw: &str) -> String {
		let mut key = raw.to_string();
		for matcher in &self.prefixes {
			key = matcher.strip(&key);
		}
		if self.rewrite_separators {
			key = key
				.trim_start_matches(PATH_SEPARATOR)
				.replace(PATH_SEPARATOR, KEY_DELIMITER);
		}
		key
	}

	/// Root key for an entry: the alias when configured, otherwise the stripped name.
	pub fn root_key(&self, name: &str, alias: Option<&str>) -> String {
		match alias {
			Some(alias) => alias.to_string(),
			None => self.strip(name),
		}
	}

	/// Published `(key, value)` pairs for one flattened entry.
	///
	/// Returns the title-cased key and, for feature flag entries, the
	/// `FeatureManagement` companion. An empty key yields nothing.
	pub fn publish(&self, entry: &FlattenedEntry) -> Vec<(String, String)> {
		let raw = if self.rewrite_separators {
			entry
				.path
				.iter()
				.map(|segment| segment.replace(PATH_SEPARATOR, KEY_DELIMITER))
				.collect::<Vec<_>>()
				.join(KEY_DELIMITER)
		} else {
			entry.key()
		};

		if raw.is_empty() {
			return Vec::new();
		}

		let mut published = Vec::with_capacity(2);
		if let Some(flag) = self.feature_flag_name(&raw) {
			let key = format!("{FEATURE_MANAGEMENT_ROOT}{KEY_DELIMITER}{flag}");
			published.push((title_case(&key), entry.value.clone()));
		}
		published.push((title_case(&raw), entry.value.clone()));
		published
	}

	/// Flag name for keys shaped like `<flag>:enabled` or `<flag>:enabledFor...`.
	pub fn feature_flag_name<'a>(&self, raw: &'a str) -> Option<&'a str> {
		let pattern = self.feature_flags.as_ref()?;
		match pattern.is_match(raw) {
			Ok(true) => Some(strip_enabled_suffix(raw)),
			_ => None,
		}
	}
}

impl Default for KeyDeriver {
	fn default() -> Self {
		Self::plain()
	}
}

/// Removes a trailing `:enabled`, compared case-insensitively.
pub fn strip_enabled_suffix(key: &str) -> &str {
	let Some(split) = key.len().checked_sub(ENABLED_SUFFIX.len()) else {
		return key;
	};
	match key.get(split..) {
		Some(tail) if tail.eq_ignore_ascii_case(ENABLED_SUFFIX) => &key[..split],
		_ => key,
	}
}

/// Upper-cases the first character of the key and every character that follows
/// a space or the key delimiter. Other characters are left unchanged.
pub fn title_case(key: &str) -> String {
	let mut out = String::with_capacity(key.len());
	let mut new_word = true;
	for c in key.chars() {
		if new_word {
			out.extend(c.to_uppercase());
			new_word = false;
		} else {
			out.push(c);
		}
		if c == ' ' || c == ':' {
			new_word = true;
		}
	}
	out
}
