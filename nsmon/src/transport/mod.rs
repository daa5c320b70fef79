mod ring;
mod source;

pub use ring::*;
pub use source::*;
