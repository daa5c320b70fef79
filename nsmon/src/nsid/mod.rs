mod message;
mod socket;

use std::future::Future;

pub use message::*;
pub use socket::*;

use crate::Result;

/// Numeric id the kernel gives a network namespace (NETNSA_NSID).
pub type NsId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NsidChange {
	Assigned,
	Removed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NsidNotification {
	pub change: NsidChange,
	/// Taken from the ancillary data of the receive call; `None` when absent.
	pub nsid: Option<NsId>,
	/// The NETNSA_NSID attribute of the message body, if any.
	pub body_nsid: Option<i32>,
}

/// Where the NSID worker gets its notifications from.
pub trait NotificationSource: Send {
	/// Resolves with the notifications of the next datagram.
	fn receive(&mut self) -> impl Future<Output = Result<NsidBatch>> + Send;
}
