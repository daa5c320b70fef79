use std::time::{Duration, Instant};

use nsmon_common::Event;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{
	event::{Arrived, SourceEvent},
	transport::RecordSource,
	trx::Tx,
	Result,
};

/// Drains a ring transport, decoding every record into the correlator's input channel.
pub struct RingBufWorker<S> {
	source: S,
	tx: Tx<SourceEvent>,
	shutdown: CancellationToken,
	poll_timeout: Duration,
}

impl<S: RecordSource> RingBufWorker<S> {
	pub fn start(source: S, tx: Tx<SourceEvent>, shutdown: CancellationToken, poll_timeout: Duration) -> Result<Self> {
		Ok(RingBufWorker {
			source,
			tx,
			shutdown,
			poll_timeout,
		})
	}

	pub async fn run(mut self) -> Result<()> {
		let mut total = 0usize;

		loop {
			tokio::select! {
				_ = self.shutdown.cancelled() => {
					break;
				}

				res = timeout(self.poll_timeout, self.source.wait_readable()) => {
					// An elapsed timeout still drains, in case a wakeup was missed.
					if let Ok(ready) = res {
						ready?;
					}
				}
			}

			let tx = &self.tx;
			total += self.source.drain(&mut |data: &[u8]| forward(tx, data))?;
		}

		info!("ring drain stopped after {total} records");
		Ok(())
	}
}

fn forward(tx: &Tx<SourceEvent>, data: &[u8]) -> Result<()> {
	let arrived_at = Instant::now();

	match Event::decode(data) {
		Ok(evt) => tx.send_sync(Arrived::at(evt, arrived_at)),
		Err(e) => {
			debug!("rejected ring record: {e}");
			tx.send_sync(Arrived::at(e, arrived_at))
		}
	}
}

// region:    --- Tests

#[cfg(test)]
mod tests {
	type Result<T> = core::result::Result<T, Box<dyn std::error::Error>>; // For tests.

	use nsmon_common::{command_from, EventKind, RawEvent, SchemaError};
	use zerocopy::IntoBytes;

	use super::*;
	use crate::{
		supervisor::Supervisor,
		transport::{ring_buffer, Submit},
		trx::new_channel,
		Error,
	};

	#[tokio::test]
	async fn decodes_and_rejects_records() -> Result<()> {
		// -- Setup & Fixtures
		let (producer, consumer) = ring_buffer(4096)?;
		let (tx, rx) = new_channel::<SourceEvent>("ring");
		let shutdown = CancellationToken::new();
		let worker = RingBufWorker::start(consumer, tx, shutdown.clone(), Duration::from_millis(10))?;
		let handle = tokio::spawn(worker.run());

		let good = RawEvent::new(EventKind::Exec, (42u64 << 32) | 43, 1000, 7, command_from(b"sh"));
		let mut bad = good;
		bad.kind = 77;

		// -- Exec
		assert_eq!(producer.submit(good.as_bytes()), Submit::Accepted);
		assert_eq!(producer.submit(bad.as_bytes()), Submit::Accepted);
		assert_eq!(producer.submit(&[1, 2, 3]), Submit::Accepted);

		let first = rx.recv().await?;
		let second = rx.recv().await?;
		let third = rx.recv().await?;
		shutdown.cancel();
		handle.await??;

		// -- Check
		match first {
			SourceEvent::Process(a) => {
				assert_eq!(a.value.kind, EventKind::Exec);
				assert_eq!(a.value.pid, 42);
				assert_eq!(a.value.tid, 43);
				assert_eq!(a.value.parent_pid, 7);
			}
			other => return Err(format!("unexpected {other:?}").into()),
		}
		assert!(matches!(second, SourceEvent::Rejected(a) if a.value == SchemaError::UnknownKind(77)));
		assert!(matches!(
			third,
			SourceEvent::Rejected(a) if matches!(a.value, SchemaError::Length { actual: 3, .. })
		));
		Ok(())
	}

	#[tokio::test]
	async fn stops_within_one_poll_interval() -> Result<()> {
		// -- Setup & Fixtures
		let (_producer, consumer) = ring_buffer(1024)?;
		let (tx, _rx) = new_channel::<SourceEvent>("ring");
		let shutdown = CancellationToken::new();
		let worker = RingBufWorker::start(consumer, tx, shutdown.clone(), Duration::from_millis(20))?;
		let handle = tokio::spawn(worker.run());

		// -- Exec
		shutdown.cancel();
		let res = timeout(Duration::from_secs(1), handle).await?;

		// -- Check
		res??;
		Ok(())
	}

	#[tokio::test]
	async fn desync_stops_the_pipeline() -> Result<()> {
		// -- Setup & Fixtures
		let (producer, consumer) = ring_buffer(256)?;
		let (tx, rx) = new_channel::<SourceEvent>("ring");
		let mut supervisor = Supervisor::new();
		let token = supervisor.token();
		let worker = RingBufWorker::start(consumer, tx, token.clone(), Duration::from_millis(10))?;

		let sibling = token.clone();
		supervisor.spawn("idle", async move {
			sibling.cancelled().await;
			Ok(())
		});

		// -- Exec
		producer.submit(&[1, 2, 3, 4, 5, 6, 7, 8]);
		producer.overwrite_word(0, 0xdead_beef);
		supervisor.spawn("ring", worker.run());
		timeout(Duration::from_secs(1), token.cancelled()).await?;
		let res = supervisor.shutdown().await;

		// -- Check
		assert!(matches!(res, Err(Error::TransportDesync { position: 0, .. })));
		assert!(rx.recv().await.is_err());
		Ok(())
	}
}

// endregion: --- Tests
