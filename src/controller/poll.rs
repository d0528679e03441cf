/* src/controller/poll.rs */

//!
//! Background refresh loop of one provider.

use std::future::Future;
use std::time::Duration;

#[cfg(feature = "logging")]
use log::error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// A running poll loop: sleep, refresh, repeat until cancelled.
///
/// Both the sleep and the refresh race the cancellation token, so cancelling
/// drops an in-flight refresh and its result is never applied. Dropping the
/// loop cancels it without waiting for the task.
#[derive(Debug)]
pub(crate) struct PollLoop {
	interval: Duration,
	cancel: CancellationToken,
	handle: JoinHandle<()>,
}

impl PollLoop {
	/// Spawns the loop. `tick` runs one refresh and returns `false` once the
	/// owner is gone, which ends the loop.
	pub(crate) fn spawn<F, Fut>(interval: Duration, mut tick: F) -> Self
	where
		F: FnMut() -> Fut + Send + 'static,
		Fut: Future<Output = bool> + Send,
	{
		let cancel = CancellationToken::new();
		let token = cancel.clone();
		let handle = tokio::spawn(async move {
			loop {
				tokio::select! {
					_ = token.cancelled() => break,
					_ = tokio::time::sleep(interval) => {}
				}
				let alive = tokio::select! {
					_ = token.cancelled() => break,
					alive = tick() => alive,
				};
				if !alive {
					break;
				}
			}
		});

		Self {
			interval,
			cancel,
			handle,
		}
	}

	pub(crate) fn interval(&self) -> Duration {
		self.interval
	}

	pub(crate) fn is_running(&self) -> bool {
		!self.cancel.is_cancelled() && !self.handle.is_finished()
	}

	/// Cancels the loop and waits for the task to finish.
	pub(crate) async fn stop(mut self) {
		self.cancel.cancel();
		match (&mut self.handle).await {
			Ok(()) => {}
			Err(e) if e.is_cancelled() => {}
			Err(_e) => {
				#[cfg(feature = "logging")]
				error!("Poll task ended abnormally: {}", _e);
			}
		}
	}
}

impl Drop for PollLoop {
	fn drop(&mut self) {
		self.cancel.cancel();
	}
}
