use core::fmt;

use zerocopy::{FromBytes, IntoBytes};
use zerocopy_derive::{FromBytes, Immutable, IntoBytes, KnownLayout};

pub const TASK_COMM_LEN: usize = 16;

/// Size in bytes of one encoded [`RawEvent`].
pub const EVENT_SIZE: usize = core::mem::size_of::<RawEvent>();

#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
	Fork = 0,
	Exec = 1,
	Exit = 2,
	Clone = 3,
	Unshare = 4,
	Setns = 5,
}

impl EventKind {
	pub const fn as_str(self) -> &'static str {
		match self {
			EventKind::Fork => "FORK",
			EventKind::Exec => "EXEC",
			EventKind::Exit => "EXIT",
			EventKind::Clone => "CLONE",
			EventKind::Unshare => "UNSHARE",
			EventKind::Setns => "SETNS",
		}
	}

	/// Kinds that create, leave or join a namespace.
	pub const fn touches_namespace(self) -> bool {
		matches!(self, EventKind::Clone | EventKind::Unshare | EventKind::Setns)
	}
}

impl TryFrom<u32> for EventKind {
	type Error = SchemaError;

	fn try_from(value: u32) -> Result<Self, Self::Error> {
		match value {
			0 => Ok(EventKind::Fork),
			1 => Ok(EventKind::Exec),
			2 => Ok(EventKind::Exit),
			3 => Ok(EventKind::Clone),
			4 => Ok(EventKind::Unshare),
			5 => Ok(EventKind::Setns),
			other => Err(SchemaError::UnknownKind(other)),
		}
	}
}

impl fmt::Display for EventKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Wire layout written by every producer into the ring buffer.
#[repr(C)]
#[derive(Clone, Copy, Debug, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct RawEvent {
	pub kind: u32,
	pub pid: u32,
	pub tid: u32,
	pub uid: u32,
	pub gid: u32,
	pub parent_pid: u32,
	pub command: [u8; TASK_COMM_LEN],
}

impl RawEvent {
	/// Builds a record from the combined helper values.
	///
	/// `pid_tgid` carries the thread-group id in the high half and the thread id in
	/// the low half. `uid_gid` carries the uid in the low half and the gid in the high half.
	#[inline(always)]
	pub const fn new(
		kind: EventKind,
		pid_tgid: u64,
		uid_gid: u64,
		parent_pid: u32,
		command: [u8; TASK_COMM_LEN],
	) -> Self {
		RawEvent {
			kind: kind as u32,
			pid: (pid_tgid >> 32) as u32,
			tid: pid_tgid as u32,
			uid: uid_gid as u32,
			gid: (uid_gid >> 32) as u32,
			parent_pid,
			command,
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchemaError {
	Length { expected: usize, actual: usize },
	UnknownKind(u32),
}

impl fmt::Display for SchemaError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			SchemaError::Length { expected, actual } => {
				write!(f, "record length mismatch (expected {expected} bytes, got {actual})")
			}
			SchemaError::UnknownKind(kind) => write!(f, "unknown event kind {kind}"),
		}
	}
}

#[cfg(feature = "user")]
impl std::error::Error for SchemaError {}

/// A validated process event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Event {
	pub kind: EventKind,
	pub pid: u32,
	pub tid: u32,
	pub uid: u32,
	pub gid: u32,
	pub parent_pid: u32,
	/// Zero from the first NUL onwards.
	pub command: [u8; TASK_COMM_LEN],
}

impl Event {
	pub fn decode(bytes: &[u8]) -> Result<Event, SchemaError> {
		let raw = RawEvent::read_from_bytes(bytes).map_err(|_| SchemaError::Length {
			expected: EVENT_SIZE,
			actual: bytes.len(),
		})?;
		let kind = EventKind::try_from(raw.kind)?;

		Ok(Event {
			kind,
			pid: raw.pid,
			tid: raw.tid,
			uid: raw.uid,
			gid: raw.gid,
			parent_pid: raw.parent_pid,
			command: truncate_at_nul(raw.command),
		})
	}

	pub fn encode(&self) -> [u8; EVENT_SIZE] {
		let raw = RawEvent {
			kind: self.kind as u32,
			pid: self.pid,
			tid: self.tid,
			uid: self.uid,
			gid: self.gid,
			parent_pid: self.parent_pid,
			command: self.command,
		};

		let mut out = [0u8; EVENT_SIZE];
		out.copy_from_slice(raw.as_bytes());
		out
	}

	/// Command bytes up to the first NUL.
	pub fn command(&self) -> &[u8] {
		let len = self.command.iter().position(|&b| b == 0).unwrap_or(TASK_COMM_LEN);
		&self.command[..len]
	}

	#[cfg(feature = "user")]
	pub fn command_str(&self) -> std::borrow::Cow<'_, str> {
		String::from_utf8_lossy(self.command())
	}
}

/// Pads a command name into the fixed-width field, truncating if needed.
pub fn command_from(name: &[u8]) -> [u8; TASK_COMM_LEN] {
	let mut command = [0u8; TASK_COMM_LEN];
	let len = name.len().min(TASK_COMM_LEN);
	command[..len].copy_from_slice(&name[..len]);
	truncate_at_nul(command)
}

fn truncate_at_nul(mut command: [u8; TASK_COMM_LEN]) -> [u8; TASK_COMM_LEN] {
	if let Some(nul) = command.iter().position(|&b| b == 0) {
		command[nul..].fill(0);
	}
	command
}

// region:    --- Tests

#[cfg(test)]
mod tests {
	type Result<T> = core::result::Result<T, Box<dyn std::error::Error>>; // For tests.

	use super::*;

	fn fx_event(kind: EventKind) -> Event {
		Event {
			kind,
			pid: 4242,
			tid: 4243,
			uid: 1000,
			gid: 100,
			parent_pid: 1,
			command: command_from(b"unshare"),
		}
	}

	#[test]
	fn raw_event_has_fixed_size() -> Result<()> {
		assert_eq!(EVENT_SIZE, 40);
		Ok(())
	}

	#[test]
	fn encode_then_decode_preserves_every_kind() -> Result<()> {
		for kind in [
			EventKind::Fork,
			EventKind::Exec,
			EventKind::Exit,
			EventKind::Clone,
			EventKind::Unshare,
			EventKind::Setns,
		] {
			let fx_evt = fx_event(kind);
			let decoded = Event::decode(&fx_evt.encode()).map_err(|e| e.to_string())?;
			assert_eq!(decoded, fx_evt);
		}
		Ok(())
	}

	#[test]
	fn id_halves_are_split() -> Result<()> {
		// -- Setup & Fixtures
		let fx_pid_tgid = (300u64 << 32) | 301;
		let fx_uid_gid = (20u64 << 32) | 10;

		// -- Exec
		let raw = RawEvent::new(EventKind::Exec, fx_pid_tgid, fx_uid_gid, 7, command_from(b"sh"));

		// -- Check
		assert_eq!(raw.pid, 300);
		assert_eq!(raw.tid, 301);
		assert_eq!(raw.uid, 10);
		assert_eq!(raw.gid, 20);
		assert_eq!(raw.parent_pid, 7);
		Ok(())
	}

	#[test]
	fn unknown_kind_is_rejected() -> Result<()> {
		for fx_kind in [6u32, 7, 0xff, u32::MAX] {
			let mut raw = RawEvent::new(EventKind::Fork, 1 << 32, 0, 0, [0u8; TASK_COMM_LEN]);
			raw.kind = fx_kind;
			let res = Event::decode(raw.as_bytes());
			assert_eq!(res, Err(SchemaError::UnknownKind(fx_kind)));
		}
		Ok(())
	}

	#[test]
	fn wrong_length_is_rejected() -> Result<()> {
		let fx_bytes = fx_event(EventKind::Fork).encode();

		let short = Event::decode(&fx_bytes[..EVENT_SIZE - 1]);
		assert_eq!(
			short,
			Err(SchemaError::Length {
				expected: EVENT_SIZE,
				actual: EVENT_SIZE - 1
			})
		);

		let mut long = [0u8; EVENT_SIZE + 8];
		long[..EVENT_SIZE].copy_from_slice(&fx_bytes);
		assert!(matches!(Event::decode(&long), Err(SchemaError::Length { .. })));
		Ok(())
	}

	#[test]
	fn command_garbage_after_nul_is_ignored() -> Result<()> {
		// -- Setup & Fixtures
		let mut fx_command = *b"ip\0garbage-bytes";
		fx_command[15] = 0xff;
		let raw = RawEvent::new(EventKind::Setns, 9 << 32 | 9, 0, 1, fx_command);

		// -- Exec
		let evt = Event::decode(raw.as_bytes()).map_err(|e| e.to_string())?;

		// -- Check
		assert_eq!(evt.command(), b"ip");
		assert!(evt.command[2..].iter().all(|&b| b == 0));
		Ok(())
	}

	#[test]
	fn full_width_command_has_no_nul() -> Result<()> {
		let evt = Event {
			command: command_from(b"a-very-long-command-name"),
			..fx_event(EventKind::Exec)
		};
		assert_eq!(evt.command(), b"a-very-long-comm");
		Ok(())
	}
}

// endregion: --- Tests
