use std::{
	fmt,
	time::{Duration, Instant},
};

use nsmon_common::{Event, SchemaError};

use crate::nsid::{NsId, NsidChange, NsidNotification};

/// One element of the unified stream handed to consumers.
#[derive(Debug, Clone)]
pub struct CorrelatedEntry {
	/// Starts at 1 for every run.
	pub seq: u64,
	pub arrived_at: Instant,
	pub kind: EntryKind,
	pub association: Option<Association>,
}

#[derive(Debug, Clone)]
pub enum EntryKind {
	Process(Event),
	Namespace(NsidNotification),
	DecodeFailure(SchemaError),
}

/// A namespace-touching process event joined with the NSID assignment that preceded it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Association {
	pub nsid: NsId,
	pub nsid_seq: u64,
	pub pid: u32,
	pub delay: Duration,
}

impl fmt::Display for CorrelatedEntry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "#{} ", self.seq)?;

		match &self.kind {
			EntryKind::Process(e) => write!(
				f,
				"[{}] {} (PID: {}, TID: {}, PPID: {}, UID: {}, GID: {})",
				e.kind,
				e.command_str(),
				e.pid,
				e.tid,
				e.parent_pid,
				e.uid,
				e.gid
			)?,
			EntryKind::Namespace(n) => {
				let change = match n.change {
					NsidChange::Assigned => "NSID_ASSIGNED",
					NsidChange::Removed => "NSID_REMOVED",
				};
				match n.nsid {
					Some(id) => write!(f, "[{change}] nsid {id}")?,
					None => write!(f, "[{change}] nsid unknown")?,
				}
				if let Some(id) = n.body_nsid {
					write!(f, " (NETNSA_NSID {id})")?;
				}
			}
			EntryKind::DecodeFailure(e) => write!(f, "[DECODE_FAILURE] {e}")?,
		}

		if let Some(assoc) = &self.association {
			write!(
				f,
				" <-> nsid {} (#{}, {:?} earlier)",
				assoc.nsid, assoc.nsid_seq, assoc.delay
			)?;
		}

		Ok(())
	}
}

// region:    --- Tests

#[cfg(test)]
mod tests {
	type Result<T> = core::result::Result<T, Box<dyn std::error::Error>>; // For tests.

	use super::*;

	fn fx_entry(nsid: Option<NsId>, body_nsid: Option<i32>) -> CorrelatedEntry {
		CorrelatedEntry {
			seq: 4,
			arrived_at: Instant::now(),
			kind: EntryKind::Namespace(NsidNotification {
				change: NsidChange::Assigned,
				nsid,
				body_nsid,
			}),
			association: None,
		}
	}

	#[test]
	fn namespace_entry_shows_both_ids() -> Result<()> {
		assert_eq!(fx_entry(Some(2), Some(2)).to_string(), "#4 [NSID_ASSIGNED] nsid 2 (NETNSA_NSID 2)");
		assert_eq!(fx_entry(None, Some(9)).to_string(), "#4 [NSID_ASSIGNED] nsid unknown (NETNSA_NSID 9)");
		assert_eq!(fx_entry(Some(2), None).to_string(), "#4 [NSID_ASSIGNED] nsid 2");
		Ok(())
	}

	#[test]
	fn association_is_appended() -> Result<()> {
		// -- Setup & Fixtures
		let mut entry = fx_entry(None, None);
		entry.seq = 6;
		entry.association = Some(Association {
			nsid: 3,
			nsid_seq: 5,
			pid: 100,
			delay: Duration::from_millis(2),
		});

		// -- Exec
		let line = entry.to_string();

		// -- Check
		assert!(line.starts_with("#6 [NSID_ASSIGNED] nsid unknown"));
		assert!(line.ends_with(" <-> nsid 3 (#5, 2ms earlier)"));
		Ok(())
	}
}

// endregion: --- Tests
