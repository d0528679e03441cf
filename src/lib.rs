/* src/lib.rs */

//!
//! Live configuration providers for AWS Secrets Manager, Systems Manager
//! Parameter Store and AppConfig.
//!
//! Each [`Provider`] owns one [`Source`], turns whatever the store returns
//! (plain strings, string lists, nested JSON, feature flag documents) into one
//! flat `:`-delimited key space, and keeps it live by polling:
//!
//! - **flatten**: value trees to `path -> string` entries.
//! - **keys**: prefix stripping, aliases, feature flag rewriting and title-casing.
//! - **diff**: deciding whether a fresh fetch is a change.
//! - **holder**: atomic snapshot storage with change events.
//! - **client**: async store client traits, in-memory and Lambda extension clients.
//! - **source**: Secrets Manager, Parameter Store, AppConfig and feature flag sources.
//! - **controller**: the [`Provider`] and its poll loop.
//! - **settings**: building providers from an `AwsSettings` file section.
//!
//! ## Feature Flags
//!
//! - `full`: Enables all features.
//! - `logging`: Logs loads, reloads and polling errors through `log` (default).
//! - `settings`: The `settings` module with JSON support (default).
//! - `toml`, `yaml`: Additional settings file formats.
//! - `lambda`: The AppConfig Lambda extension client (`reqwest`).
//!
//! ## Basic Usage
//!
//! See `demos/basic.rs` for a complete example.

pub mod client;
pub mod controller;
pub mod diff;
pub mod flatten;
pub mod holder;
pub mod keys;
#[cfg(feature = "settings")]
pub mod settings;
pub mod source;

pub use controller::{Provider, ProviderBuilder, ProviderError};
pub use holder::{ReloadEvent, Snapshot};
pub use source::Source;
