#![no_std]
#![no_main]

use aya_ebpf::{
	macros::{map, tracepoint},
	maps::{PerCpuArray, RingBuf},
	programs::TracePointContext,
};
use nsmon_common::RING_BUFFER_SIZE;

mod hooks;
mod utils;
mod vmlinux;

#[map]
static EVT_MAP: RingBuf = RingBuf::with_byte_size(RING_BUFFER_SIZE, 0);

/// Events lost to a full ring buffer, per CPU.
#[map]
static DROPPED: PerCpuArray<u64> = PerCpuArray::with_max_entries(1, 0);

#[tracepoint]
pub fn trace_sched_process_fork(ctx: TracePointContext) -> u32 {
	match hooks::try_sched_process_fork(ctx) {
		Ok(ret) => ret,
		Err(ret) => ret,
	}
}

#[tracepoint]
pub fn trace_exec(ctx: TracePointContext) -> u32 {
	match hooks::try_exec(ctx) {
		Ok(ret) => ret,
		Err(ret) => ret,
	}
}

#[tracepoint]
pub fn trace_exit(ctx: TracePointContext) -> u32 {
	match hooks::try_exit(ctx) {
		Ok(ret) => ret,
		Err(ret) => ret,
	}
}

#[tracepoint]
pub fn trace_clone(ctx: TracePointContext) -> u32 {
	match hooks::try_clone(ctx) {
		Ok(ret) => ret,
		Err(ret) => ret,
	}
}

#[tracepoint]
pub fn trace_clone3(ctx: TracePointContext) -> u32 {
	match hooks::try_clone(ctx) {
		Ok(ret) => ret,
		Err(ret) => ret,
	}
}

#[tracepoint]
pub fn trace_unshare(ctx: TracePointContext) -> u32 {
	match hooks::try_unshare(ctx) {
		Ok(ret) => ret,
		Err(ret) => ret,
	}
}

#[tracepoint]
pub fn trace_setns(ctx: TracePointContext) -> u32 {
	match hooks::try_setns(ctx) {
		Ok(ret) => ret,
		Err(ret) => ret,
	}
}

#[cfg(not(test))]
#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
	loop {}
}

#[link_section = "license"]
#[no_mangle]
static LICENSE: [u8; 13] = *b"Dual MIT/GPL\0";
