use std::{
	collections::VecDeque,
	time::{Duration, Instant},
};

use crate::{
	event::{Association, CorrelatedEntry, EntryKind, SourceEvent},
	nsid::{NsId, NsidChange},
};

/// Merges process events and NSID notifications into one sequenced stream.
///
/// Join policy: a CLONE/UNSHARE/SETNS event is associated with the nearest preceding
/// unclaimed NSID assignment that arrived no more than `window` before it. Equal arrival
/// instants go to the later sequence number. An assignment is claimed at most once,
/// and a removal of the same id retracts it.
pub struct Correlator {
	window: Duration,
	next_seq: u64,
	newest: Option<Instant>,
	// Ordered by sequence number.
	pending: VecDeque<PendingNsid>,
}

#[derive(Debug, Clone, Copy)]
struct PendingNsid {
	seq: u64,
	nsid: NsId,
	arrived_at: Instant,
}

impl Correlator {
	pub fn new(window: Duration) -> Self {
		Self {
			window,
			next_seq: 1,
			newest: None,
			pending: VecDeque::new(),
		}
	}

	pub fn accept(&mut self, evt: SourceEvent) -> CorrelatedEntry {
		let seq = self.next_seq;
		self.next_seq += 1;

		let arrived_at = evt.arrived_at();
		self.newest = Some(self.newest.map_or(arrived_at, |n| n.max(arrived_at)));
		self.prune();

		let (kind, association) = match evt {
			SourceEvent::Process(a) => {
				let association = if a.value.kind.touches_namespace() {
					self.claim(a.arrived_at).map(|p| Association {
						nsid: p.nsid,
						nsid_seq: p.seq,
						pid: a.value.pid,
						delay: a.arrived_at.duration_since(p.arrived_at),
					})
				} else {
					None
				};
				(EntryKind::Process(a.value), association)
			}

			SourceEvent::Namespace(a) => {
				match (a.value.change, a.value.nsid) {
					(NsidChange::Assigned, Some(nsid)) => self.pending.push_back(PendingNsid {
						seq,
						nsid,
						arrived_at: a.arrived_at,
					}),
					(NsidChange::Removed, Some(nsid)) => self.pending.retain(|p| p.nsid != nsid),
					(_, None) => {}
				}
				(EntryKind::Namespace(a.value), None)
			}

			SourceEvent::Rejected(a) => (EntryKind::DecodeFailure(a.value), None),
		};

		CorrelatedEntry {
			seq,
			arrived_at,
			kind,
			association,
		}
	}

	/// Removes and returns the nearest assignment at or before `at`, within the window.
	fn claim(&mut self, at: Instant) -> Option<PendingNsid> {
		let idx = self
			.pending
			.iter()
			.enumerate()
			.filter(|(_, p)| p.arrived_at <= at && at.duration_since(p.arrived_at) <= self.window)
			.max_by_key(|(_, p)| (p.arrived_at, p.seq))
			.map(|(idx, _)| idx)?;

		self.pending.remove(idx)
	}

	fn prune(&mut self) {
		let Some(newest) = self.newest else {
			return;
		};
		let window = self.window;
		self.pending
			.retain(|p| newest.saturating_duration_since(p.arrived_at) <= window);
	}
}

// region:    --- Tests


// endregion: --- Tests
