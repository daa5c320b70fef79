use which::which;

/// Building this crate requires `bpf-linker`. Cargo does not track the linker binary,
/// so a rebuild is forced whenever it changes.
fn main() {
	if let Ok(bpf_linker) = which("bpf-linker") {
		println!("cargo:rerun-if-changed={}", bpf_linker.display());
	}
}
