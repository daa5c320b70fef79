use std::{env, fs, path::PathBuf};

use aya_build::cargo_metadata;
use derive_more::{Display, From};

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Display, From)]
#[display("{self:?}")]
pub enum Error {
	#[from(String, &String, &str)]
	Custom(String),
	ExecFail,
	BuildFail,
	#[from]
	Io(std::io::Error),
}

fn main() -> Result<()> {
	// Without bpf-linker the eBPF object cannot be built. Leave an empty object so the
	// userspace side still compiles and tests; loading it fails at startup.
	if which::which("bpf-linker").is_err() {
		println!("cargo:warning=bpf-linker not found, nsmon will be built without its eBPF object");
		let out_dir = PathBuf::from(env::var("OUT_DIR").map_err(|_| Error::custom("OUT_DIR not set"))?);
		fs::write(out_dir.join("nsmon"), [])?;
		return Ok(());
	}

	let cargo_metadata::Metadata { packages, .. } = cargo_metadata::MetadataCommand::new()
		.no_deps()
		.exec()
		.map_err(|_| Error::ExecFail)?;
	let ebpf_package = packages
		.into_iter()
		.find(|cargo_metadata::Package { name, .. }| name == "nsmon-ebpf")
		.ok_or_else(|| Error::Custom("nsmon-ebpf package not found".to_string()))?;
	aya_build::build_ebpf([ebpf_package]).map_err(|_| Error::BuildFail)?;
	Ok(())
}

impl Error {
	fn custom(val: impl Into<String>) -> Self {
		Self::Custom(val.into())
	}
}
