// region:    --- Modules
mod agent;
mod cli;
mod correlator;
mod error;
mod event;
mod nsid;
mod selftest;
mod supervisor;
mod transport;
mod trx;
mod workers;
// endregion: --- Modules

use std::time::Duration;

use crate::{
	cli::args::{ChannelMode, Cli},
	correlator::Correlator,
	event::{CorrelatedEntry, SourceEvent},
	nsid::NsidSocket,
	selftest::run_selftest,
	supervisor::Supervisor,
	transport::{ring_buffer, RingProducer},
	trx::new_channel,
	workers::{CorrelatorWorker, NsidWorker, RingBufWorker},
};

pub use self::error::{Error, Result};
use agent::*;
use aya::{
	maps::{MapData, PerCpuArray, RingBuf},
	programs::TracePoint,
	Ebpf,
};
use clap::Parser;
use nsmon_common::RING_BUFFER_SIZE;
use tokio::io::unix::AsyncFd;
use tracing_subscriber::EnvFilter;
#[rustfmt::skip]
use tracing::{debug, info, warn};

/// (program, tracepoint category, tracepoint name)
const HOOKS: [(&str, &str, &str); 7] = [
	("trace_sched_process_fork", "sched", "sched_process_fork"),
	("trace_exec", "syscalls", "sys_enter_execve"),
	("trace_exit", "sched", "sched_process_exit"),
	("trace_clone", "syscalls", "sys_enter_clone"),
	("trace_clone3", "syscalls", "sys_enter_clone3"),
	("trace_unshare", "syscalls", "sys_enter_unshare"),
	("trace_setns", "syscalls", "sys_enter_setns"),
];

/// What has to stay alive until shutdown, and where drop counts are read from.
enum Session {
	Kernel {
		_ebpf: Ebpf,
		dropped: PerCpuArray<MapData, u64>,
	},
	Selftest {
		producer: RingProducer,
	},
}

#[tokio::main]
async fn main() -> Result<()> {
	let args = Cli::parse();
	tracing_subscriber::fmt()
		.with_target(false)
		.with_env_filter(EnvFilter::from_default_env())
		.init();

	let window: Duration = args.window.into();
	let poll_timeout: Duration = args.poll_timeout.into();

	let (source_tx, source_rx) = new_channel::<SourceEvent>("source");
	let (entry_tx, entry_rx) = new_channel::<CorrelatedEntry>("entries");

	let mut supervisor = Supervisor::new();

	let session = match args.channel {
		ChannelMode::Kernel => {
			bump_memlock_rlimit();

			let mut ebpf = aya::Ebpf::load(aya::include_bytes_aligned!(concat!(env!("OUT_DIR"), "/nsmon")))?;
			if let Err(e) = aya_log::EbpfLogger::init(&mut ebpf) {
				// This can happen if you remove all log statements from your eBPF program.
				warn!("failed to initialize eBPF logger: {e}");
			}

			let (ringbuf_fd, dropped) = load_hooks(&mut ebpf)?;
			let socket = NsidSocket::open()?;

			let ringbuf_worker = RingBufWorker::start(ringbuf_fd, source_tx.clone(), supervisor.token(), poll_timeout)?;
			let nsid_worker = NsidWorker::start(socket, source_tx.clone(), supervisor.token(), poll_timeout)?;
			supervisor.spawn("ringbuf", ringbuf_worker.run());
			supervisor.spawn("nsid", nsid_worker.run());

			Session::Kernel { _ebpf: ebpf, dropped }
		}

		ChannelMode::Selftest => {
			let (producer, consumer) = ring_buffer(RING_BUFFER_SIZE as usize)?;

			let ringbuf_worker = RingBufWorker::start(consumer, source_tx.clone(), supervisor.token(), poll_timeout)?;
			supervisor.spawn("ringbuf", ringbuf_worker.run());
			supervisor.spawn("selftest", run_selftest(producer.clone(), source_tx.clone()));

			Session::Selftest { producer }
		}
	};
	// Only the channel workers hold senders from here on.
	drop(source_tx);

	let correlator_worker = CorrelatorWorker::start(Correlator::new(window), source_rx, entry_tx, supervisor.token())?;
	supervisor.spawn("correlator", correlator_worker.run());
	supervisor.spawn("agent", run_agent_sink(entry_rx, supervisor.token()));

	let token = supervisor.token();
	tokio::select! {
		res = tokio::signal::ctrl_c() => {
			res?;
			info!("Ctrl-C received, shutting down");
		}

		_ = run_timer(args.time.map(Into::into)) => {
			info!("run time elapsed, shutting down");
		}

		_ = token.cancelled() => {}
	}

	let res = supervisor.shutdown().await;
	report_drops(&session);

	res
}

pub fn load_hooks(ebpf: &mut Ebpf) -> Result<(AsyncFd<RingBuf<MapData>>, PerCpuArray<MapData, u64>)> {
	for (name, category, tracepoint) in HOOKS {
		let program: &mut TracePoint = ebpf.program_mut(name).ok_or(Error::EbpfProgNotFound)?.try_into()?;
		program.load()?;
		program.attach(category, tracepoint)?;
		debug!("attached {name} to {category}:{tracepoint}");
	}

	let ring_buf = RingBuf::try_from(ebpf.take_map("EVT_MAP").ok_or(Error::EbpfMapNotFound("EVT_MAP"))?)?;
	let fd = AsyncFd::new(ring_buf)?;

	let dropped = PerCpuArray::try_from(ebpf.take_map("DROPPED").ok_or(Error::EbpfMapNotFound("DROPPED"))?)?;

	Ok((fd, dropped))
}

fn bump_memlock_rlimit() {
	// Bump the memlock rlimit. This is needed for older kernels that don't use the
	// new memcg based accounting, see https://lwn.net/Articles/837122/
	let rlim = libc::rlimit {
		rlim_cur: libc::RLIM_INFINITY,
		rlim_max: libc::RLIM_INFINITY,
	};
	let ret = unsafe { libc::setrlimit(libc::RLIMIT_MEMLOCK, &rlim) };
	if ret != 0 {
		debug!("remove limit on locked memory failed, ret is: {ret}");
	}
}

async fn run_timer(time: Option<Duration>) {
	match time {
		Some(time) => tokio::time::sleep(time).await,
		None => std::future::pending().await,
	}
}

fn report_drops(session: &Session) {
	match session {
		Session::Kernel { dropped, .. } => match dropped.get(&0, 0) {
			Ok(per_cpu) => {
				let total: u64 = per_cpu.iter().sum();
				if total > 0 {
					warn!("{total} events dropped by the kernel producers (ring full)");
				} else {
					info!("no events dropped by the kernel producers");
				}
			}
			Err(e) => warn!("failed to read the drop counter: {e}"),
		},

		Session::Selftest { producer } => {
			let total = producer.dropped();
			if total > 0 {
				warn!("{total} records dropped by the in-process ring");
			}
		}
	}
}
