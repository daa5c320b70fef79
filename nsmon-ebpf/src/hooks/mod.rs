mod namespace;
mod process;

pub use namespace::*;
pub use process::*;

use aya_ebpf::programs::TracePointContext;
use aya_log_ebpf::debug;
use nsmon_common::EventKind;

use crate::utils::{get_real_parent_tgid, submit_event};

/// Shared body of every hook whose tracepoint does not carry the parent pid.
fn emit_with_real_parent(ctx: &TracePointContext, kind: EventKind) -> Result<u32, u32> {
	let parent_pid = match get_real_parent_tgid() {
		Ok(tgid) => tgid,
		Err(e) => {
			debug!(ctx, "real_parent read failed for {}: {}", kind.as_str(), e);
			0
		}
	};

	submit_event(kind, parent_pid);
	Ok(0)
}
