/* src/controller/provider.rs */

//!
//! A live configuration provider over one [`Source`].

use std::fmt;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::task::{Context, Poll};
use std::time::Duration;

#[cfg(feature = "logging")]
use log::{info, warn};
use futures_util::Stream;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

use super::ProviderError;
use super::poll::PollLoop;
use crate::diff::{self, Change, Fingerprint};
use crate::holder::{DEFAULT_EVENT_CAPACITY, Entry, Meta, ReloadEvent, Snapshot, SnapshotStore};
use crate::source::Source;

/// Callback invoked with the new entry after every published change.
pub type ChangeFn = Arc<dyn Fn(&Entry) + Send + Sync>;

/// Callback invoked with errors of background refreshes.
pub type ErrorFn = Arc<dyn Fn(ProviderError) + Send + Sync>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
	mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct Inner {
	name: String,
	source: Source,
	store: SnapshotStore,
	optional: bool,
	loaded: AtomicBool,
	reload_after: Mutex<Option<Duration>>,
	on_change: Option<ChangeFn>,
	on_error: Option<ErrorFn>,
	// Serializes refresh cycles and holds the basis of the last stored snapshot.
	cycle: tokio::sync::Mutex<Option<Fingerprint>>,
	poll: Mutex<Option<PollLoop>>,
}

impl Inner {
	/// Runs one fetch, diff and publish cycle.
	async fn refresh(&self) -> Result<Change, ProviderError> {
		let mut last = self.cycle.lock().await;
		let fetched = self.source.fetch_snapshot().await?;
		let change = diff::compare(last.as_ref(), &fetched.fingerprint);

		match change {
			Change::Initial => {
				#[cfg(feature = "logging")]
				info!(
					"Loaded provider '{}' with {} entries",
					self.name,
					fetched.snapshot.len()
				);
				self.store.set(fetched.snapshot);
			}
			Change::Changed => {
				#[cfg(feature = "logging")]
				info!(
					"Provider '{}' changed, now {} entries",
					self.name,
					fetched.snapshot.len()
				);
				let entry = self.store.publish(fetched.snapshot);
				if let Some(cb) = &self.on_change {
					cb(&entry);
				}
			}
			Change::Unchanged => {}
		}

		if change.stores() {
			*last = Some(fetched.fingerprint);
		}
		Ok(change)
	}

	/// Stores an empty snapshot as the baseline of a provider whose initial
	/// load failed, so the first fetch with data is published as a change.
	async fn start_empty(&self) {
		let mut last = self.cycle.lock().await;
		if last.is_none() {
			self.store.set(Snapshot::new());
			*last = Some(self.source.empty_fingerprint());
		}
	}

	/// Background refresh: failures are reported, never propagated.
	async fn poll_once(&self) {
		if let Err(e) = self.refresh().await {
			#[cfg(feature = "logging")]
			warn!("Error polling provider '{}' for changes: {}", self.name, e);
			self.store.report_failure(&e);
			if let Some(cb) = &self.on_error {
				cb(e);
			}
		}
	}
}

impl Drop for Inner {
	fn drop(&mut self) {
		let poll = self.poll.get_mut().unwrap_or_else(PoisonError::into_inner);
		// Dropping the loop cancels it.
		poll.take();
	}
}

/// A configuration provider: one source, one live snapshot.
///
/// Cloning is cheap and every clone shares the same snapshot and poll loop.
/// The loop only holds a weak reference, so dropping the last clone stops it.
#[derive(Clone)]
pub struct Provider {
	inner: Arc<Inner>,
}

impl fmt::Debug for Provider {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Provider")
			.field("name", &self.inner.name)
			.field("source", &self.inner.source)
			.field("store", &self.inner.store)
			.field("optional", &self.inner.optional)
			.field("reload_after", &*lock(&self.inner.reload_after))
			.finish_non_exhaustive()
	}
}

/// Builder for [`Provider`].
pub struct ProviderBuilder {
	source: Source,
	name: Option<String>,
	reload_after: Option<Duration>,
	optional: bool,
	on_change: Option<ChangeFn>,
	on_error: Option<ErrorFn>,
	event_capacity: usize,
}

impl ProviderBuilder {
	/// Name used in events and logs. Defaults to the source name.
	pub fn name(mut self, name: impl Into<String>) -> Self {
		self.name = Some(name.into());
		self
	}

	/// Polling interval. Without one the provider loads once and never polls.
	pub fn reload_after(mut self, interval: Duration) -> Self {
		self.reload_after = Some(interval);
		self
	}

	/// An optional provider starts empty instead of failing when the initial load fails.
	pub fn optional(mut self, optional: bool) -> Self {
		self.optional = optional;
		self
	}

	pub fn on_change<F>(mut self, f: F) -> Self
	where
		F: Fn(&Entry) + Send + Sync + 'static,
	{
		self.on_change = Some(Arc::new(f));
		self
	}

	pub fn on_error<F>(mut self, f: F) -> Self
	where
		F: Fn(ProviderError) + Send + Sync + 'static,
	{
		self.on_error = Some(Arc::new(f));
		self
	}

	/// Capacity of the event channel. Slow subscribers miss events beyond it.
	pub fn event_capacity(mut self, capacity: usize) -> Self {
		self.event_capacity = capacity;
		self
	}

	pub fn build(self) -> Result<Provider, ProviderError> {
		if self.reload_after.is_some_and(|d| d.is_zero()) {
			return Err(ProviderError::Builder(
				"reload_after must be greater than zero".to_string(),
			));
		}
		if self.event_capacity == 0 {
			return Err(ProviderError::Builder(
				"event_capacity must be greater than zero".to_string(),
			));
		}

		let name = self.name.unwrap_or_else(|| self.source.name());
		Ok(Provider {
			inner: Arc::new(Inner {
				store: SnapshotStore::with_event_capacity(name.clone(), self.event_capacity),
				name,
				source: self.source,
				optional: self.optional,
				loaded: AtomicBool::new(false),
				reload_after: Mutex::new(self.reload_after),
				on_change: self.on_change,
				on_error: self.on_error,
				cycle: tokio::sync::Mutex::new(None),
				poll: Mutex::new(None),
			}),
		})
	}
}

impl Provider {
	pub fn builder(source: impl Into<Source>) -> ProviderBuilder {
		ProviderBuilder {
			source: source.into(),
			name: None,
			reload_after: None,
			optional: false,
			on_change: None,
			on_error: None,
			event_capacity: DEFAULT_EVENT_CAPACITY,
		}
	}

	pub fn name(&self) -> &str {
		&self.inner.name
	}

	pub fn source(&self) -> &Source {
		&self.inner.source
	}

	pub fn is_optional(&self) -> bool {
		self.inner.optional
	}

	/// Performs the initial load and starts polling when an interval is set.
	///
	/// Calling it again refetches and restarts the poll loop.
	pub async fn load(&self) -> Result<(), ProviderError> {
		match self.inner.refresh().await {
			Ok(_) => {}
			Err(_e) if self.inner.optional => {
				#[cfg(feature = "logging")]
				warn!(
					"Optional provider '{}' failed to load, starting empty: {}",
					self.inner.name, _e
				);
				self.inner.start_empty().await;
			}
			Err(e) => return Err(e),
		}
		self.inner.loaded.store(true, Ordering::SeqCst);
		self.restart_polling().await;
		Ok(())
	}

	/// Forces a refresh. Returns whether a change was published.
	pub async fn reload(&self) -> Result<bool, ProviderError> {
		if !self.is_loaded() {
			return Err(ProviderError::NotLoaded);
		}
		Ok(self.inner.refresh().await?.notifies())
	}

	pub fn is_loaded(&self) -> bool {
		self.inner.loaded.load(Ordering::SeqCst)
	}

	/// The current snapshot.
	pub fn snapshot(&self) -> Arc<Snapshot> {
		self.inner.store.load()
	}

	/// The current snapshot with its metadata.
	pub fn entry(&self) -> Arc<Entry> {
		self.inner.store.entry()
	}

	/// Looks up one key, ignoring case.
	pub fn get(&self, key: &str) -> Option<String> {
		self.inner.store.get(key)
	}

	pub fn meta(&self) -> Meta {
		self.inner.store.meta()
	}

	pub fn version(&self) -> u64 {
		self.inner.store.version()
	}

	/// Subscribes to reload events.
	pub fn subscribe(&self) -> broadcast::Receiver<ReloadEvent> {
		self.inner.store.subscribe()
	}

	/// Reload events as a [`futures_util::Stream`].
	pub fn stream(&self) -> ReloadStream {
		ReloadStream {
			inner: BroadcastStream::new(self.subscribe()),
		}
	}

	pub fn reload_after(&self) -> Option<Duration> {
		*lock(&self.inner.reload_after)
	}

	/// Changes the polling interval. A loaded provider restarts its loop.
	pub async fn set_reload_after(&self, interval: Option<Duration>) -> Result<(), ProviderError> {
		if interval.is_some_and(|d| d.is_zero()) {
			return Err(ProviderError::Builder(
				"reload_after must be greater than zero".to_string(),
			));
		}
		*lock(&self.inner.reload_after) = interval;
		if self.is_loaded() {
			self.restart_polling().await;
		}
		Ok(())
	}

	pub fn is_polling(&self) -> bool {
		lock(&self.inner.poll)
			.as_ref()
			.is_some_and(PollLoop::is_running)
	}

	/// Interval of the running poll loop, if any.
	pub fn polling_interval(&self) -> Option<Duration> {
		lock(&self.inner.poll).as_ref().map(PollLoop::interval)
	}

	/// Stops polling and waits for an in-flight refresh to be abandoned.
	///
	/// The last snapshot stays readable.
	pub async fn dispose(&self) {
		self.stop_polling().await;
		#[cfg(feature = "logging")]
		info!("Provider '{}' disposed", self.inner.name);
	}

	async fn stop_polling(&self) {
		let previous = lock(&self.inner.poll).take();
		if let Some(poll) = previous {
			poll.stop().await;
		}
	}

	async fn restart_polling(&self) {
		self.stop_polling().await;
		let Some(interval) = self.reload_after() else {
			return;
		};

		let weak: Weak<Inner> = Arc::downgrade(&self.inner);
		let poll = PollLoop::spawn(interval, move || {
			let weak = weak.clone();
			async move {
				let Some(inner) = weak.upgrade() else {
					return false;
				};
				inner.poll_once().await;
				true
			}
		});
		// A concurrent restart may have raced us; the replaced loop is cancelled on drop.
		lock(&self.inner.poll).replace(poll);
	}
}

/// A stream of [`ReloadEvent`]s.
pub struct ReloadStream {
	inner: BroadcastStream<ReloadEvent>,
}

impl Stream for ReloadStream {
	type Item = Result<ReloadEvent, BroadcastStreamRecvError>;

	fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
		Pin::new(&mut self.inner).poll_next(cx)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::client::{MemoryParameterStore, MemorySecretsManager};
	use crate::source::{ParameterStoreSource, SecretsSource};
	use std::sync::atomic::AtomicUsize;

	fn parameters() -> (Arc<MemoryParameterStore>, ParameterStoreSource) {
		let client = Arc::new(MemoryParameterStore::new());
		client.put_string("/app/a", "1");
		let source = ParameterStoreSource::builder(client.clone())
			.path("/app")
			.build()
			.unwrap();
		(client, source)
	}

	#[tokio::test]
	async fn test_load_sets_without_event() {
		let (_client, source) = parameters();
		let provider = Provider::builder(source).build().unwrap();
		let mut rx = provider.subscribe();

		provider.load().await.unwrap();
		assert_eq!(provider.get("A"), Some("1".to_string()));
		assert_eq!(provider.version(), 1);
		assert!(rx.try_recv().is_err());
		assert!(!provider.is_polling());
	}

	#[tokio::test]
	async fn test_reload_notifies_only_on_change() {
		let (client, source) = parameters();
		let changes = Arc::new(AtomicUsize::new(0));
		let counter = changes.clone();
		let provider = Provider::builder(source)
			.on_change(move |_| {
				counter.fetch_add(1, Ordering::SeqCst);
			})
			.build()
			.unwrap();

		provider.load().await.unwrap();
		assert!(!provider.reload().await.unwrap());
		assert_eq!(changes.load(Ordering::SeqCst), 0);

		client.put_string("/app/a", "2");
		assert!(provider.reload().await.unwrap());
		assert_eq!(changes.load(Ordering::SeqCst), 1);
		assert_eq!(provider.get("a"), Some("2".to_string()));
		assert_eq!(provider.version(), 2);
	}

	#[tokio::test]
	async fn test_reload_before_load_fails() {
		let (_client, source) = parameters();
		let provider = Provider::builder(source).build().unwrap();
		assert!(matches!(
			provider.reload().await,
			Err(ProviderError::NotLoaded)
		));
	}

	fn colliding_secrets() -> SecretsSource {
		let client = Arc::new(MemorySecretsManager::new());
		client.insert("bad/one", "x");
		client.insert("Bad/One", "y");
		SecretsSource::builder(client).load_all().build().unwrap()
	}

	#[tokio::test]
	async fn test_required_provider_fails_to_load() {
		let provider = Provider::builder(colliding_secrets()).build().unwrap();
		assert!(matches!(
			provider.load().await,
			Err(ProviderError::Format(_))
		));
		assert!(!provider.is_loaded());
	}

	#[tokio::test]
	async fn test_optional_provider_starts_empty() {
		let provider = Provider::builder(colliding_secrets())
			.optional(true)
			.build()
			.unwrap();
		provider.load().await.unwrap();
		assert!(provider.is_loaded());
		assert!(provider.snapshot().is_empty());
		assert_eq!(provider.version(), 1);
	}

	#[tokio::test]
	async fn test_optional_provider_publishes_first_data_as_change() {
		let client = Arc::new(MemorySecretsManager::new());
		client.insert("bad/one", "x");
		client.insert("Bad/One", "y");
		let changes = Arc::new(AtomicUsize::new(0));
		let counter = changes.clone();
		let source = SecretsSource::builder(client.clone()).load_all().build().unwrap();
		let provider = Provider::builder(source)
			.optional(true)
			.on_change(move |_| {
				counter.fetch_add(1, Ordering::SeqCst);
			})
			.build()
			.unwrap();
		let mut rx = provider.subscribe();

		provider.load().await.unwrap();
		assert!(provider.snapshot().is_empty());

		client.remove("Bad/One");
		assert!(provider.reload().await.unwrap());
		assert_eq!(changes.load(Ordering::SeqCst), 1);
		assert!(matches!(rx.try_recv(), Ok(ReloadEvent::Reloaded { .. })));
		assert_eq!(provider.get("Bad:One"), Some("x".to_string()));
		assert_eq!(provider.version(), 2);
	}

	#[tokio::test]
	async fn test_builder_rejects_zero_interval() {
		let (_client, source) = parameters();
		let err = Provider::builder(source)
			.reload_after(Duration::ZERO)
			.build()
			.unwrap_err();
		assert!(matches!(err, ProviderError::Builder(_)));
	}

	#[tokio::test]
	async fn test_name_defaults_to_source() {
		let (_client, source) = parameters();
		let provider = Provider::builder(source).build().unwrap();
		assert_eq!(provider.name(), "ssm:/app");
		assert_eq!(provider.meta().source, "ssm:/app");
	}
}
