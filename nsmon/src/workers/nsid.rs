use std::time::{Duration, Instant};

use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{
	event::{Arrived, SourceEvent},
	nsid::NotificationSource,
	trx::Tx,
	Result,
};

/// Receives NSID multicast datagrams and forwards each notification to the correlator.
pub struct NsidWorker<S> {
	source: S,
	tx: Tx<SourceEvent>,
	shutdown: CancellationToken,
	poll_timeout: Duration,
}

impl<S: NotificationSource> NsidWorker<S> {
	pub fn start(source: S, tx: Tx<SourceEvent>, shutdown: CancellationToken, poll_timeout: Duration) -> Result<Self> {
		Ok(NsidWorker {
			source,
			tx,
			shutdown,
			poll_timeout,
		})
	}

	pub async fn run(mut self) -> Result<()> {
		loop {
			let batch = tokio::select! {
				_ = self.shutdown.cancelled() => {
					break;
				}

				res = timeout(self.poll_timeout, self.source.receive()) => match res {
					Ok(batch) => batch?,
					Err(_elapsed) => continue,
				}
			};

			let arrived_at = Instant::now();
			if batch.notifications.is_empty() {
				debug!("NSID datagram without notifications (nsid {:?})", batch.nsid);
			}
			for notification in batch.notifications {
				self.tx.send_sync(Arrived::at(notification, arrived_at))?;
			}
		}

		Ok(())
	}
}

// region:    --- Tests

#[cfg(test)]
mod tests {
	type Result<T> = core::result::Result<T, Box<dyn std::error::Error>>; // For tests.

	use super::*;
	use crate::{
		nsid::{NsidBatch, NsidChange, NsidNotification, NsidSocket},
		trx::new_channel,
		Error,
	};

	/// Hands out queued batches, then pends like an idle socket.
	struct FxSource(flume::Receiver<crate::Result<NsidBatch>>);

	impl NotificationSource for FxSource {
		async fn receive(&mut self) -> crate::Result<NsidBatch> {
			match self.0.recv_async().await {
				Ok(batch) => batch,
				Err(_) => std::future::pending().await,
			}
		}
	}

	fn fx_notification(change: NsidChange, nsid: u32) -> NsidNotification {
		NsidNotification {
			change,
			nsid: Some(nsid),
			body_nsid: Some(nsid as i32),
		}
	}

	#[tokio::test]
	async fn forwards_every_notification_of_a_batch() -> Result<()> {
		// -- Setup & Fixtures
		let (batch_tx, batch_rx) = flume::unbounded();
		let (tx, rx) = new_channel::<SourceEvent>("nsid");
		let shutdown = CancellationToken::new();
		let worker = NsidWorker::start(FxSource(batch_rx), tx, shutdown.clone(), Duration::from_millis(10))?;
		let handle = tokio::spawn(worker.run());

		// -- Exec
		batch_tx.send(Ok(NsidBatch {
			nsid: Some(2),
			notifications: vec![
				fx_notification(NsidChange::Assigned, 2),
				fx_notification(NsidChange::Removed, 2),
			],
		}))?;
		let first = rx.recv().await?;
		let second = rx.recv().await?;
		shutdown.cancel();
		handle.await??;

		// -- Check
		match (first, second) {
			(SourceEvent::Namespace(a), SourceEvent::Namespace(b)) => {
				assert_eq!(a.value.change, NsidChange::Assigned);
				assert_eq!(b.value.change, NsidChange::Removed);
				assert_eq!(a.arrived_at, b.arrived_at);
			}
			other => return Err(format!("unexpected {other:?}").into()),
		}
		Ok(())
	}

	#[tokio::test]
	async fn stops_within_one_poll_interval() -> Result<()> {
		// -- Setup & Fixtures
		let (_batch_tx, batch_rx) = flume::unbounded();
		let (tx, _rx) = new_channel::<SourceEvent>("nsid");
		let shutdown = CancellationToken::new();
		let worker = NsidWorker::start(FxSource(batch_rx), tx, shutdown.clone(), Duration::from_millis(20))?;
		let handle = tokio::spawn(worker.run());

		// -- Exec
		tokio::time::sleep(Duration::from_millis(30)).await;
		shutdown.cancel();
		let res = timeout(Duration::from_millis(500), handle).await?;

		// -- Check
		res??;
		Ok(())
	}

	#[tokio::test]
	async fn receive_failure_ends_the_worker() -> Result<()> {
		let (batch_tx, batch_rx) = flume::unbounded();
		let (tx, _rx) = new_channel::<SourceEvent>("nsid");
		let worker = NsidWorker::start(FxSource(batch_rx), tx, CancellationToken::new(), Duration::from_millis(10))?;

		batch_tx.send(Err(Error::custom("socket gone")))?;
		let res = timeout(Duration::from_secs(1), worker.run()).await?;

		assert!(matches!(res, Err(Error::Custom(msg)) if msg == "socket gone"));
		Ok(())
	}

	#[tokio::test]
	async fn idle_socket_stops_on_cancel() -> Result<()> {
		// -- Setup & Fixtures
		// Listening on all namespaces needs CAP_NET_BROADCAST.
		let socket = match NsidSocket::open() {
			Ok(socket) => socket,
			Err(Error::ChannelSetup { step, cause }) => {
				eprintln!("skipping, NSID socket unavailable at {step}: {cause}");
				return Ok(());
			}
			Err(e) => return Err(e.into()),
		};
		let (tx, _rx) = new_channel::<SourceEvent>("nsid");
		let shutdown = CancellationToken::new();
		let worker = NsidWorker::start(socket, tx, shutdown.clone(), Duration::from_millis(20))?;
		let handle = tokio::spawn(worker.run());

		// -- Exec
		shutdown.cancel();
		let res = timeout(Duration::from_secs(1), handle).await?;

		// -- Check
		res??;
		Ok(())
	}
}

// endregion: --- Tests
