use std::future::Future;

use aya::maps::{MapData, RingBuf};
use tokio::io::unix::AsyncFd;

use crate::{transport::RingConsumer, Result};

/// The reading end of a ring transport, as seen by the drain worker.
pub trait RecordSource: Send {
	/// Resolves once records may be available. The only place the drain loop suspends.
	fn wait_readable(&mut self) -> impl Future<Output = Result<()>> + Send;

	/// Hands every record currently available to `sink`, in ring order.
	fn drain(&mut self, sink: &mut dyn FnMut(&[u8]) -> Result<()>) -> Result<usize>;
}

impl RecordSource for AsyncFd<RingBuf<MapData>> {
	async fn wait_readable(&mut self) -> Result<()> {
		// Cleared before draining, so anything committed after this point wakes us again.
		let mut guard = self.readable_mut().await?;
		guard.clear_ready();
		Ok(())
	}

	fn drain(&mut self, sink: &mut dyn FnMut(&[u8]) -> Result<()>) -> Result<usize> {
		let ring_buf = self.get_mut();

		let mut count = 0;
		while let Some(item) = ring_buf.next() {
			let data: &[u8] = &item;
			sink(data)?;
			count += 1;
		}

		Ok(count)
	}
}

impl RecordSource for RingConsumer {
	async fn wait_readable(&mut self) -> Result<()> {
		self.readable().await;
		Ok(())
	}

	fn drain(&mut self, sink: &mut dyn FnMut(&[u8]) -> Result<()>) -> Result<usize> {
		let mut count = 0;
		while let Some(record) = self.next()? {
			sink(&record)?;
			count += 1;
		}

		Ok(count)
	}
}
