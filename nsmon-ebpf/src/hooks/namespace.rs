use aya_ebpf::programs::TracePointContext;
use nsmon_common::EventKind;

use super::emit_with_real_parent;

// clone and clone3 both report as CLONE.
pub fn try_clone(ctx: TracePointContext) -> Result<u32, u32> {
	emit_with_real_parent(&ctx, EventKind::Clone)
}

pub fn try_unshare(ctx: TracePointContext) -> Result<u32, u32> {
	emit_with_real_parent(&ctx, EventKind::Unshare)
}

pub fn try_setns(ctx: TracePointContext) -> Result<u32, u32> {
	emit_with_real_parent(&ctx, EventKind::Setns)
}
