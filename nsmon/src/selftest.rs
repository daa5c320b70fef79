//! Synthetic producers for the in-process ring, so the pipeline can be exercised
//! on hosts where tracepoints cannot be attached.

use std::{thread, time::Duration};

use nsmon_common::{command_from, EventKind, RawEvent};
use tracing::{info, warn};
use zerocopy::IntoBytes;

use crate::{
	event::{Arrived, SourceEvent},
	nsid::{NsId, NsidChange, NsidNotification},
	transport::{RingProducer, Submit},
	trx::Tx,
	Error, Result,
};

const FORK_PIDS: [u32; 3] = [100, 101, 102];
const CLONE_PID: u32 = 200;
const SYNTHETIC_NSID: NsId = 5;
const CLONE_DELAY: Duration = Duration::from_millis(10);

/// Three concurrent FORKs, then an NSID assignment followed shortly by a CLONE.
pub async fn run_selftest(producer: RingProducer, tx: Tx<SourceEvent>) -> Result<()> {
	let forks: Vec<_> = FORK_PIDS
		.into_iter()
		.map(|pid| {
			let producer = producer.clone();
			thread::spawn(move || producer.submit(fx_raw(EventKind::Fork, pid, 1, b"bash").as_bytes()))
		})
		.collect();

	let mut dropped = 0;
	for fork in forks {
		let res = fork.join().map_err(|_| Error::custom("selftest producer panicked"))?;
		if res == Submit::Dropped {
			dropped += 1;
		}
	}

	tx.send(Arrived::now(NsidNotification {
		change: NsidChange::Assigned,
		nsid: Some(SYNTHETIC_NSID),
		body_nsid: Some(SYNTHETIC_NSID as i32),
	}))
	.await?;

	tokio::time::sleep(CLONE_DELAY).await;
	if producer.submit(fx_raw(EventKind::Clone, CLONE_PID, 1, b"ip").as_bytes()) == Submit::Dropped {
		dropped += 1;
	}

	if dropped > 0 {
		warn!("selftest: {dropped} synthetic records dropped");
	}
	info!("selftest burst submitted");
	Ok(())
}

fn fx_raw(kind: EventKind, pid: u32, parent_pid: u32, comm: &[u8]) -> RawEvent {
	RawEvent::new(kind, ((pid as u64) << 32) | pid as u64, 0, parent_pid, command_from(comm))
}

// region:    --- Tests


// endregion: --- Tests
