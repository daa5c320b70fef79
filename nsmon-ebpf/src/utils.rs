use core::ptr::addr_of;

use aya_ebpf::helpers::{
	bpf_get_current_comm, bpf_get_current_pid_tgid, bpf_get_current_uid_gid, bpf_probe_read_kernel,
	r#gen::bpf_get_current_task,
};
use nsmon_common::{EventKind, RawEvent, TASK_COMM_LEN};

use crate::{vmlinux::task_struct, DROPPED, EVT_MAP};

/// Thread-group id of the current task's real parent.
///
/// Reads the live task structure, so it can race with a concurrent reparent.
pub fn get_real_parent_tgid() -> Result<u32, i64> {
	let task = unsafe { bpf_get_current_task() } as *const task_struct;
	if task.is_null() {
		return Err(1);
	}

	let parent = unsafe { bpf_probe_read_kernel(addr_of!((*task).real_parent))? };
	if parent.is_null() {
		return Err(1);
	}

	let tgid = unsafe { bpf_probe_read_kernel(addr_of!((*parent).tgid))? };
	Ok(tgid as u32)
}

/// Builds an event for the current task and submits it. A full ring drops the event.
#[inline(always)]
pub fn submit_event(kind: EventKind, parent_pid: u32) {
	let command = bpf_get_current_comm().unwrap_or([0u8; TASK_COMM_LEN]);
	let event = RawEvent::new(
		kind,
		bpf_get_current_pid_tgid(),
		bpf_get_current_uid_gid(),
		parent_pid,
		command,
	);

	if EVT_MAP.output(&event, 0).is_err() {
		count_drop();
	}
}

#[inline(always)]
fn count_drop() {
	if let Some(counter) = DROPPED.get_ptr_mut(0) {
		unsafe { *counter += 1 };
	}
}
