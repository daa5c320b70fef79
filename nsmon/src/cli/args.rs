use clap::{Parser, ValueEnum};
use humantime::Duration;

#[derive(Parser, Debug)]
#[command(name = "nsmon", about = "Process lifecycle and network namespace monitor")]
pub struct Cli {
	#[arg(long, value_enum, default_value = "kernel")]
	pub channel: ChannelMode,

	#[arg(
		long,
		default_value = "50ms",
		help = "How far back a CLONE/UNSHARE/SETNS event looks for an NSID assignment"
	)]
	pub window: Duration,

	#[arg(long, default_value = "250ms", help = "Idle timeout of the drain loops")]
	pub poll_timeout: Duration,

	#[arg(long, help = "Time duration (e.g., 20s, 5m, 1h). Runs until Ctrl-C when omitted")]
	pub time: Option<Duration>,
}

#[derive(Copy, Clone, Debug, ValueEnum, PartialEq, Eq)]
pub enum ChannelMode {
	/// Attach the tracepoints and subscribe to NSID notifications.
	Kernel,
	/// Feed a synthetic burst through the in-process ring. Needs no privileges.
	Selftest,
}

// region:    --- Tests

#[cfg(test)]
mod tests {
	type Result<T> = core::result::Result<T, Box<dyn std::error::Error>>; // For tests.

	use super::*;

	#[test]
	fn defaults() -> Result<()> {
		let cli = Cli::try_parse_from(["nsmon"])?;

		assert_eq!(cli.channel, ChannelMode::Kernel);
		assert_eq!(*cli.window, std::time::Duration::from_millis(50));
		assert_eq!(*cli.poll_timeout, std::time::Duration::from_millis(250));
		assert!(cli.time.is_none());
		Ok(())
	}

	#[test]
	fn selftest_with_time() -> Result<()> {
		let cli = Cli::try_parse_from(["nsmon", "--channel", "selftest", "--time", "2s", "--window", "1ms"])?;

		assert_eq!(cli.channel, ChannelMode::Selftest);
		assert_eq!(cli.time.map(|t| *t), Some(std::time::Duration::from_secs(2)));
		assert_eq!(*cli.window, std::time::Duration::from_millis(1));
		Ok(())
	}
}

// endregion: --- Tests
