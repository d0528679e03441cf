/* src/client/memory.rs */

//! In-memory store clients useful for testing and embedded environments.

use super::{
	AppConfigDataClient, ClientError, LatestConfiguration, ListSecretsRequest, Parameter,
	ParameterPage, ParameterStoreClient, ParameterType, SecretListEntry, SecretValue,
	SecretsManagerClient, SecretsPage, SessionParams,
};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

const ARN_PREFIX: &str = "arn:aws:secretsmanager:local:000000000000:secret:";

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
	mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Splits `items` into a page starting at the offset encoded in `token`.
fn paginate<T: Clone>(
	items: &[T],
	page_size: usize,
	token: Option<&str>,
) -> Result<(Vec<T>, Option<String>), ClientError> {
	let start = match token {
		Some(token) => token
			.parse::<usize>()
			.map_err(|_| ClientError::Service(format!("invalid next token '{token}'")))?,
		None => 0,
	};
	let start = start.min(items.len());
	let end = if page_size == 0 {
		items.len()
	} else {
		(start + page_size).min(items.len())
	};
	let next = (end < items.len()).then(|| end.to_string());
	Ok((items[start..end].to_vec(), next))
}

/// Secrets held in memory, addressable by name or by a synthetic ARN.
#[derive(Debug, Default)]
pub struct MemorySecretsManager {
	secrets: Mutex<BTreeMap<String, Option<String>>>,
	page_size: usize,
	list_calls: AtomicUsize,
	get_calls: AtomicUsize,
}

impl MemorySecretsManager {
	pub fn new() -> Self {
		Self::default()
	}

	/// Limits listing pages to `page_size` secrets.
	pub fn with_page_size(mut self, page_size: usize) -> Self {
		self.page_size = page_size;
		self
	}

	/// The ARN reported for the secret called `name`.
	pub fn arn_for(name: &str) -> String {
		format!("{ARN_PREFIX}{name}")
	}

	/// Inserts or replaces a string secret.
	pub fn insert(&self, name: &str, value: impl Into<String>) {
		lock(&self.secrets).insert(name.to_string(), Some(value.into()));
	}

	/// Inserts a secret without a string value.
	pub fn insert_binary(&self, name: &str) {
		lock(&self.secrets).insert(name.to_string(), None);
	}

	pub fn remove(&self, name: &str) -> bool {
		lock(&self.secrets).remove(name).is_some()
	}

	pub fn list_calls(&self) -> usize {
		self.list_calls.load(Ordering::SeqCst)
	}

	pub fn get_calls(&self) -> usize {
		self.get_calls.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl SecretsManagerClient for MemorySecretsManager {
	async fn list_secrets(&self, request: ListSecretsRequest) -> Result<SecretsPage, ClientError> {
		self.list_calls.fetch_add(1, Ordering::SeqCst);
		let prefixes: Vec<String> = request
			.filters
			.iter()
			.filter(|filter| filter.key == "name")
			.flat_map(|filter| filter.values.iter().map(|value| value.to_lowercase()))
			.collect();

		let matching: Vec<SecretListEntry> = lock(&self.secrets)
			.keys()
			.filter(|name| {
				let lower = name.to_lowercase();
				prefixes.is_empty() || prefixes.iter().any(|prefix| lower.starts_with(prefix))
			})
			.map(|name| SecretListEntry {
				arn: Self::arn_for(name),
				name: name.clone(),
			})
			.collect();

		let (secrets, next_token) =
			paginate(&matching, self.page_size, request.next_token.as_deref())?;
		Ok(SecretsPage {
			secrets,
			next_token,
		})
	}

	async fn get_secret_value(&self, secret_id: &str) -> Result<SecretValue, ClientError> {
		self.get_calls.fetch_add(1, Ordering::SeqCst);
		let name = secret_id.strip_prefix(ARN_PREFIX).unwrap_or(secret_id);
		let secrets = lock(&self.secrets);
		let value = secrets
			.get(name)
			.ok_or_else(|| ClientError::NotFound(secret_id.to_string()))?;
		Ok(SecretValue {
			arn: Self::arn_for(name),
			name: name.to_string(),
			secret_string: value.clone(),
		})
	}
}

/// Parameters held in memory, keyed by their full path.
#[derive(Debug, Default)]
pub struct MemoryParameterStore {
	parameters: Mutex<BTreeMap<String, Parameter>>,
	page_size: usize,
	path_calls: AtomicUsize,
	get_calls: AtomicUsize,
}

impl MemoryParameterStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_page_size(mut self, page_size: usize) -> Self {
		self.page_size = page_size;
		self
	}

	/// Inserts or replaces a parameter.
	pub fn put(&self, name: &str, value: impl Into<String>, kind: ParameterType) {
		lock(&self.parameters).insert(
			name.to_string(),
			Parameter {
				name: name.to_string(),
				value: Some(value.into()),
				kind,
			},
		);
	}

	/// Inserts or replaces a `String` parameter.
	pub fn put_string(&self, name: &str, value: impl Into<String>) {
		self.put(name, value, ParameterType::String);
	}

	pub fn remove(&self, name: &str) -> bool {
		lock(&self.parameters).remove(name).is_some()
	}

	pub fn path_calls(&self) -> usize {
		self.path_calls.load(Ordering::SeqCst)
	}

	pub fn get_calls(&self) -> usize {
		self.get_calls.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl ParameterStoreClient for MemoryParameterStore {
	async fn get_parameters_by_path(
		&self,
		path: &str,
		next_token: Option<String>,
	) -> Result<ParameterPage, ClientError> {
		self.path_calls.fetch_add(1, Ordering::SeqCst);
		let mut root = path.to_string();
		if !root.ends_with('/') {
			root.push('/');
		}

		let matching: Vec<Parameter> = lock(&self.parameters)
			.values()
			.filter(|parameter| root == "/" || parameter.name.starts_with(&root))
			.cloned()
			.collect();

		let (parameters, next_token) = paginate(&matching, self.page_size, next_token.as_deref())?;
		Ok(ParameterPage {
			parameters,
			next_token,
		})
	}

	async fn get_parameter(&self, name: &str) -> Result<Parameter, ClientError> {
		self.get_calls.fetch_add(1, Ordering::SeqCst);
		lock(&self.parameters)
			.get(name)
			.cloned()
			.ok_or_else(|| ClientError::NotFound(name.to_string()))
	}
}

#[derive(Debug)]
struct Deployment {
	content: String,
	version: u64,
}

#[derive(Debug, Default)]
struct AppConfigState {
	deployments: HashMap<SessionParams, Deployment>,
	// token -> (session target, version already delivered on that token chain)
	tokens: HashMap<String, (SessionParams, u64)>,
	issued: u64,
}

impl AppConfigState {
	fn issue(&mut self, params: SessionParams, delivered: u64) -> String {
		self.issued += 1;
		let token = format!("token-{}", self.issued);
		self.tokens.insert(token.clone(), (params, delivered));
		token
	}
}

/// An AppConfigData emulation.
///
/// Each token is single use. Content is returned only when a newer deployment
/// exists than the one already delivered on the token chain, and is empty
/// otherwise.
#[derive(Debug, Default)]
pub struct MemoryAppConfig {
	state: Mutex<AppConfigState>,
	start_calls: AtomicUsize,
	latest_calls: AtomicUsize,
}

impl MemoryAppConfig {
	pub fn new() -> Self {
		Self::default()
	}

	/// Deploys new content for a profile.
	pub fn deploy(&self, params: &SessionParams, content: impl Into<String>) {
		let mut state = lock(&self.state);
		let version = state
			.deployments
			.get(params)
			.map_or(1, |deployment| deployment.version + 1);
		state.deployments.insert(
			params.clone(),
			Deployment {
				content: content.into(),
				version,
			},
		);
	}

	/// Invalidates every outstanding token.
	pub fn expire_tokens(&self) {
		lock(&self.state).tokens.clear();
	}

	pub fn start_calls(&self) -> usize {
		self.start_calls.load(Ordering::SeqCst)
	}

	pub fn latest_calls(&self) -> usize {
		self.latest_calls.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl AppConfigDataClient for MemoryAppConfig {
	async fn start_session(&self, params: &SessionParams) -> Result<String, ClientError> {
		self.start_calls.fetch_add(1, Ordering::SeqCst);
		let mut state = lock(&self.state);
		if !state.deployments.contains_key(params) {
			return Err(ClientError::NotFound(params.to_string()));
		}
		Ok(state.issue(params.clone(), 0))
	}

	async fn get_latest(&self, token: &str) -> Result<LatestConfiguration, ClientError> {
		self.latest_calls.fetch_add(1, Ordering::SeqCst);
		let mut state = lock(&self.state);
		let (params, delivered) = state
			.tokens
			.remove(token)
			.ok_or(ClientError::ExpiredToken)?;

		let (content, delivered) = match state.deployments.get(&params) {
			Some(deployment) if deployment.version > delivered => {
				(deployment.content.clone(), deployment.version)
			}
			Some(_) => (String::new(), delivered),
			None => return Err(ClientError::NotFound(params.to_string())),
		};

		let next_token = state.issue(params, delivered);
		Ok(LatestConfiguration {
			next_token,
			content,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::client::SecretsFilter;

	#[tokio::test]
	async fn test_secrets_listing_pages_and_filters() {
		let client = MemorySecretsManager::new().with_page_size(2);
		client.insert("prod/a", "1");
		client.insert("prod/b", "2");
		client.insert("Prod/c", "3");
		client.insert("dev/a", "4");

		let request = ListSecretsRequest {
			filters: vec![SecretsFilter::name("prod/")],
			next_token: None,
		};
		let first = client.list_secrets(request.clone()).await.unwrap();
		assert_eq!(first.secrets.len(), 2);
		let token = first.next_token.clone();
		assert!(token.is_some());

		let second = client
			.list_secrets(ListSecretsRequest {
				next_token: token,
				..request
			})
			.await
			.unwrap();
		assert_eq!(second.secrets.len(), 1);
		assert!(second.next_token.is_none());
		assert_eq!(client.list_calls(), 2);
	}

	#[tokio::test]
	async fn test_secret_lookup_by_arn_and_name() {
		let client = MemorySecretsManager::new();
		client.insert("db", "secret");

		let by_name = client.get_secret_value("db").await.unwrap();
		let by_arn = client
			.get_secret_value(&MemorySecretsManager::arn_for("db"))
			.await
			.unwrap();
		assert_eq!(by_name, by_arn);
		assert!(
			client
				.get_secret_value("missing")
				.await
				.unwrap_err()
				.is_not_found()
		);
	}

	#[tokio::test]
	async fn test_parameters_by_path_is_scoped() {
		let client = MemoryParameterStore::new();
		client.put_string("/app/a", "1");
		client.put_string("/app/b/c", "2");
		client.put_string("/application/x", "3");

		let page = client.get_parameters_by_path("/app", None).await.unwrap();
		let names: Vec<_> = page.parameters.iter().map(|p| p.name.as_str()).collect();
		assert_eq!(names, vec!["/app/a", "/app/b/c"]);
	}

	#[tokio::test]
	async fn test_appconfig_delivers_content_once_per_deployment() {
		let client = MemoryAppConfig::new();
		let params = SessionParams::new("app", "prod", "main");
		client.deploy(&params, "{\"a\":1}");

		let token = client.start_session(&params).await.unwrap();
		let first = client.get_latest(&token).await.unwrap();
		assert_eq!(first.content, "{\"a\":1}");

		let second = client.get_latest(&first.next_token).await.unwrap();
		assert!(second.content.is_empty());

		client.deploy(&params, "{\"a\":2}");
		let third = client.get_latest(&second.next_token).await.unwrap();
		assert_eq!(third.content, "{\"a\":2}");

		// Tokens are single use.
		assert!(matches!(
			client.get_latest(&token).await,
			Err(ClientError::ExpiredToken)
		));
	}

	#[tokio::test]
	async fn test_appconfig_unknown_profile_is_not_found() {
		let client = MemoryAppConfig::new();
		let params = SessionParams::new("app", "prod", "missing");
		assert!(client.start_session(&params).await.unwrap_err().is_not_found());
	}
}
