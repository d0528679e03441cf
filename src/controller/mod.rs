/* src/controller/mod.rs */

//!
//! Providers keeping one source's snapshot live.
//!
//! - [`Provider`] - Initial load, forced reloads and change events
//! - `poll` - The background refresh loop behind [`ProviderBuilder::reload_after`]

mod error;
mod poll;
mod provider;

pub use error::ProviderError;
pub use provider::{ChangeFn, ErrorFn, Provider, ProviderBuilder, ReloadStream};
