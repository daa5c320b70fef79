#![cfg_attr(not(any(feature = "user", test)), no_std)]

mod event;

pub use event::*;

/// Size of the kernel ring buffer map, also the default for the in-process ring.
pub const RING_BUFFER_SIZE: u32 = 1 << 24;
