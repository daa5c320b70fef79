mod correlator;
mod nsid;
mod ringbuf;

pub use correlator::*;
pub use nsid::*;
pub use ringbuf::*;
