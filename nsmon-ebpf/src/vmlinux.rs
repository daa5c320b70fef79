//! `task_struct` layout, taken from the kernel BTF (`/sys/kernel/btf/vmlinux`, Linux 6.18).
//!
//! Only the fields the hooks read are named; the rest is opaque padding. Regenerate the
//! offsets (`aya-tool generate task_struct`, or `pahole task_struct`) when targeting a
//! kernel with a different layout.

#![allow(non_camel_case_types, dead_code)]

pub type pid_t = i32;

const TGID_OFFSET: usize = 1268;
const REAL_PARENT_OFFSET: usize = 1280;
const TASK_STRUCT_SIZE: usize = 3264;

#[repr(C)]
pub struct task_struct {
	_pad0: [u8; TGID_OFFSET],
	pub tgid: pid_t,
	_pad1: [u8; REAL_PARENT_OFFSET - TGID_OFFSET - 4],
	pub real_parent: *mut task_struct,
	_pad2: [u8; TASK_STRUCT_SIZE - REAL_PARENT_OFFSET - 8],
}

const _: () = assert!(core::mem::size_of::<task_struct>() == TASK_STRUCT_SIZE);
const _: () = assert!(core::mem::offset_of!(task_struct, tgid) == TGID_OFFSET);
const _: () = assert!(core::mem::offset_of!(task_struct, real_parent) == REAL_PARENT_OFFSET);
