use aya_ebpf::programs::TracePointContext;
use nsmon_common::EventKind;

use super::emit_with_real_parent;
use crate::utils::submit_event;

// sched:sched_process_fork
//   char parent_comm[16] @ 8, pid_t parent_pid @ 24, char child_comm[16] @ 28, pid_t child_pid @ 44
// Check /sys/kernel/debug/tracing/events/sched/sched_process_fork/format on the target kernel.
const FORK_PARENT_PID_OFFSET: usize = 24;

pub fn try_sched_process_fork(ctx: TracePointContext) -> Result<u32, u32> {
	let parent_pid: i32 = unsafe { ctx.read_at(FORK_PARENT_PID_OFFSET).map_err(|_| 1u32)? };

	submit_event(EventKind::Fork, parent_pid as u32);
	Ok(0)
}

pub fn try_exec(ctx: TracePointContext) -> Result<u32, u32> {
	emit_with_real_parent(&ctx, EventKind::Exec)
}

pub fn try_exit(ctx: TracePointContext) -> Result<u32, u32> {
	emit_with_real_parent(&ctx, EventKind::Exit)
}
