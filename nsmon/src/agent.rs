use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
	event::{CorrelatedEntry, EntryKind},
	trx::Rx,
	Result,
};

/// Logs every correlated entry until cancelled or the stream ends.
pub async fn run_agent_sink(rx: Rx<CorrelatedEntry>, shutdown: CancellationToken) -> Result<()> {
	let mut count = 0u64;

	loop {
		tokio::select! {
			_ = shutdown.cancelled() => {
				break;
			}

			entry = rx.recv() => {
				match entry {
					Ok(entry) => {
						count += 1;
						print_entry(&entry);
					}
					Err(e) => {
						info!("{} channel closed: {:?}", rx.name(), e);
						break;
					}
				}
			}
		}
	}

	info!("{count} entries reported");
	Ok(())
}

fn print_entry(entry: &CorrelatedEntry) {
	match entry.kind {
		EntryKind::DecodeFailure(_) => warn!("{entry}"),
		_ => info!("{entry}"),
	}
}
