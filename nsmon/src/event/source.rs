use std::time::Instant;

use derive_more::From;
use nsmon_common::{Event, SchemaError};

use crate::nsid::NsidNotification;

/// What a channel worker hands to the correlator, stamped when the channel received it.
#[derive(Debug, Clone, From)]
pub enum SourceEvent {
	#[from]
	Process(Arrived<Event>),
	#[from]
	Namespace(Arrived<NsidNotification>),
	#[from]
	Rejected(Arrived<SchemaError>),
}

#[derive(Debug, Clone, Copy)]
pub struct Arrived<T> {
	pub value: T,
	pub arrived_at: Instant,
}

impl<T> Arrived<T> {
	pub fn now(value: T) -> Self {
		Self {
			value,
			arrived_at: Instant::now(),
		}
	}

	pub fn at(value: T, arrived_at: Instant) -> Self {
		Self { value, arrived_at }
	}
}

impl SourceEvent {
	pub fn arrived_at(&self) -> Instant {
		match self {
			SourceEvent::Process(a) => a.arrived_at,
			SourceEvent::Namespace(a) => a.arrived_at,
			SourceEvent::Rejected(a) => a.arrived_at,
		}
	}
}
