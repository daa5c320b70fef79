use std::future::Future;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::Result;

/// Owns the pipeline tasks and the token that stops them.
///
/// A task that fails cancels the token, so one broken channel stops the whole pipeline.
pub struct Supervisor {
	pub shutdown: CancellationToken,
	pub tasks: JoinSet<Result<()>>,
}

impl Supervisor {
	pub fn new() -> Self {
		Self {
			shutdown: CancellationToken::new(),
			tasks: JoinSet::new(),
		}
	}

	pub fn token(&self) -> CancellationToken {
		self.shutdown.clone()
	}

	pub fn spawn<F>(&mut self, name: &'static str, fut: F)
	where
		F: Future<Output = Result<()>> + Send + 'static,
	{
		let shutdown = self.shutdown.clone();
		self.tasks.spawn(async move {
			let res = fut.await;
			if let Err(e) = &res {
				error!("{name} failed: {e}");
				shutdown.cancel();
			}
			res
		});
	}

	pub async fn shutdown(mut self) -> Result<()> {
		info!("Supervisor shutdown starting");
		self.shutdown.cancel();

		let mut first_err = None;
		while let Some(res) = self.tasks.join_next().await {
			if let Err(e) = res? {
				first_err.get_or_insert(e);
			}
		}
		info!("Supervisor shutdown complete");

		match first_err {
			Some(e) => Err(e),
			None => Ok(()),
		}
	}
}

// region:    --- Tests

#[cfg(test)]
mod tests {
	type Result<T> = core::result::Result<T, Box<dyn std::error::Error>>; // For tests.

	use super::*;
	use crate::Error;

	#[tokio::test]
	async fn failing_task_cancels_token() -> Result<()> {
		// -- Setup & Fixtures
		let mut supervisor = Supervisor::new();
		let token = supervisor.token();

		// -- Exec
		supervisor.spawn("broken", async { Err(Error::custom("boom")) });
		token.cancelled().await;
		let res = supervisor.shutdown().await;

		// -- Check
		assert!(matches!(res, Err(Error::Custom(msg)) if msg == "boom"));
		Ok(())
	}

	#[tokio::test]
	async fn shutdown_stops_waiting_tasks() -> Result<()> {
		// -- Setup & Fixtures
		let mut supervisor = Supervisor::new();
		let token = supervisor.token();

		// -- Exec
		supervisor.spawn("idle", async move {
			token.cancelled().await;
			Ok(())
		});
		supervisor.shutdown().await?;

		Ok(())
	}
}

// endregion: --- Tests
