use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::{
	correlator::Correlator,
	event::{CorrelatedEntry, SourceEvent},
	trx::{Rx, Tx},
	Result,
};

/// Feeds both channels' arrivals through the correlator, in arrival order.
pub struct CorrelatorWorker {
	correlator: Correlator,
	rx: Rx<SourceEvent>,
	tx: Tx<CorrelatedEntry>,
	shutdown: CancellationToken,
}

impl CorrelatorWorker {
	pub fn start(
		correlator: Correlator,
		rx: Rx<SourceEvent>,
		tx: Tx<CorrelatedEntry>,
		shutdown: CancellationToken,
	) -> Result<Self> {
		Ok(CorrelatorWorker {
			correlator,
			rx,
			tx,
			shutdown,
		})
	}

	pub async fn run(mut self) -> Result<()> {
		loop {
			tokio::select! {
				_ = self.shutdown.cancelled() => {
					break;
				}

				evt = self.rx.recv() => {
					match evt {
						Ok(evt) => {
							let entry = self.correlator.accept(evt);
							self.tx.send(entry).await?;
						}
						Err(e) => {
							info!("{} channel closed: {:?}", self.rx.name(), e);
							break;
						}
					}
				}
			}
		}

		Ok(())
	}
}

// region:    --- Tests


// endregion: --- Tests
