//! Bounded lock-free byte ring with many producers and one consumer.
//!
//! Every record is framed by an 8-byte header holding its length and a commit bit,
//! and padded to 8 bytes. Producers reserve space with a compare-and-swap on the
//! producer position, copy the payload, then publish the header with release
//! ordering. A producer that finds no room gets [`Submit::Dropped`] and never waits.
//!
//! The consumer stops at the first reserved-but-uncommitted record, so records from
//! one producer come out in submission order and no record is ever seen half written.
//! Consumed space is zeroed before it is handed back, so a zero header always means
//! "reserved, not yet committed".

use std::sync::{
	atomic::{AtomicU64, Ordering},
	Arc,
};

use tokio::sync::Notify;

use crate::{Error, Result};

const HDR_SIZE: u64 = 8;
const COMMIT_BIT: u64 = 1 << 63;
const LEN_MASK: u64 = u32::MAX as u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submit {
	Accepted,
	Dropped,
}

struct Shared {
	data: Box<[AtomicU64]>,
	capacity: u64,
	producer_pos: AtomicU64,
	consumer_pos: AtomicU64,
	dropped: AtomicU64,
	readable: Notify,
}

impl Shared {
	fn word(&self, pos: u64) -> &AtomicU64 {
		&self.data[((pos & (self.capacity - 1)) / 8) as usize]
	}
}

/// Creates a ring of `capacity` bytes and returns its two ends.
pub fn ring_buffer(capacity: usize) -> Result<(RingProducer, RingConsumer)> {
	if capacity < 16 || !capacity.is_power_of_two() {
		return Err(Error::InvalidCapacity(capacity));
	}

	let shared = Arc::new(Shared {
		data: (0..capacity / 8).map(|_| AtomicU64::new(0)).collect(),
		capacity: capacity as u64,
		producer_pos: AtomicU64::new(0),
		consumer_pos: AtomicU64::new(0),
		dropped: AtomicU64::new(0),
		readable: Notify::new(),
	});

	Ok((
		RingProducer {
			shared: shared.clone(),
		},
		RingConsumer { shared },
	))
}

fn frame_size(len: usize) -> u64 {
	HDR_SIZE + (len as u64).div_ceil(8) * 8
}

/// `prod` may be a stale read that is already behind `cons`, so the two are never subtracted.
fn fits(prod: u64, cons: u64, total: u64, capacity: u64) -> bool {
	prod + total <= cons + capacity
}

#[derive(Clone)]
pub struct RingProducer {
	shared: Arc<Shared>,
}

impl RingProducer {
	/// Copies `record` into the ring as one unit, or drops it if there is no room.
	pub fn submit(&self, record: &[u8]) -> Submit {
		let Some(pos) = self.reserve(record.len()) else {
			self.shared.dropped.fetch_add(1, Ordering::Relaxed);
			return Submit::Dropped;
		};

		let shared = &self.shared;
		for (i, chunk) in record.chunks(8).enumerate() {
			let mut word = [0u8; 8];
			word[..chunk.len()].copy_from_slice(chunk);
			shared
				.word(pos + HDR_SIZE + i as u64 * 8)
				.store(u64::from_le_bytes(word), Ordering::Relaxed);
		}

		shared.word(pos).store(COMMIT_BIT | record.len() as u64, Ordering::Release);
		shared.readable.notify_one();

		Submit::Accepted
	}

	fn reserve(&self, len: usize) -> Option<u64> {
		if len == 0 || len as u64 > LEN_MASK {
			return None;
		}

		let shared = &self.shared;
		let total = frame_size(len);
		if total > shared.capacity {
			return None;
		}

		let mut prod = shared.producer_pos.load(Ordering::Relaxed);
		loop {
			let cons = shared.consumer_pos.load(Ordering::Acquire);
			if !fits(prod, cons, total, shared.capacity) {
				return None;
			}

			match shared
				.producer_pos
				.compare_exchange_weak(prod, prod + total, Ordering::AcqRel, Ordering::Relaxed)
			{
				Ok(_) => return Some(prod),
				Err(actual) => prod = actual,
			}
		}
	}

	pub fn dropped(&self) -> u64 {
		self.shared.dropped.load(Ordering::Relaxed)
	}
}

/// The single reading end. Not cloneable.
pub struct RingConsumer {
	shared: Arc<Shared>,
}

impl RingConsumer {
	/// Takes the next committed record, if any.
	///
	/// A header that is not a committed frame, or a frame that runs past the producer
	/// position, means producers and consumer disagree on framing. That is returned as
	/// [`Error::TransportDesync`] and the ring must not be read further.
	pub fn next(&mut self) -> Result<Option<Vec<u8>>> {
		let shared = &self.shared;
		let cons = shared.consumer_pos.load(Ordering::Relaxed);
		let prod = shared.producer_pos.load(Ordering::Acquire);
		if cons == prod {
			return Ok(None);
		}

		let header = shared.word(cons).load(Ordering::Acquire);
		if header == 0 {
			return Ok(None);
		}
		if header & COMMIT_BIT == 0 || header & !(COMMIT_BIT | LEN_MASK) != 0 {
			return Err(Error::TransportDesync {
				position: cons,
				reason: "header is not a committed frame",
			});
		}

		let len = (header & LEN_MASK) as usize;
		let total = frame_size(len);
		if len == 0 || cons + total > prod {
			return Err(Error::TransportDesync {
				position: cons,
				reason: "frame overruns the producer position",
			});
		}

		let mut record = Vec::with_capacity(len.div_ceil(8) * 8);
		let mut pos = cons + HDR_SIZE;
		while pos < cons + total {
			let word = shared.word(pos).swap(0, Ordering::Relaxed);
			record.extend_from_slice(&word.to_le_bytes());
			pos += 8;
		}
		record.truncate(len);

		shared.word(cons).store(0, Ordering::Relaxed);
		shared.consumer_pos.store(cons + total, Ordering::Release);

		Ok(Some(record))
	}

	/// Waits until a committed record is at the head of the ring.
	pub async fn readable(&self) {
		loop {
			let notified = self.shared.readable.notified();
			if self.has_committed() {
				return;
			}
			notified.await;
		}
	}

	fn has_committed(&self) -> bool {
		let shared = &self.shared;
		let cons = shared.consumer_pos.load(Ordering::Relaxed);
		cons != shared.producer_pos.load(Ordering::Acquire) && shared.word(cons).load(Ordering::Acquire) != 0
	}
}

#[cfg(test)]
impl RingProducer {
	/// Stores `value` at `pos` without framing it, the way a buggy producer would.
	pub(crate) fn overwrite_word(&self, pos: u64, value: u64) {
		self.shared.word(pos).store(value, Ordering::Release);
	}
}

// region:    --- Tests


// endregion: --- Tests
