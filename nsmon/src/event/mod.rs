mod entry;
mod source;

pub use entry::*;
pub use source::*;
