use std::env;
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

/// Generated header, under `include/` unless `DLEXT_HEADER_DIR` is set.
const HEADER: &str = "dlext.h";

fn main() -> Result<(), Box<dyn Error>> {
    let crate_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR")?);

    // The DLPack structs are parsed out of dlext-tensor.
    for watched in ["cbindgen.toml", "src", "../dlext-tensor/src/ffi.rs"] {
        println!("cargo:rerun-if-changed={watched}");
    }
    println!("cargo:rerun-if-env-changed=DLEXT_HEADER_DIR");

    let include = match env::var_os("DLEXT_HEADER_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => crate_dir.join("include"),
    };
    fs::create_dir_all(&include)?;
    write_header(&crate_dir, &include.join(HEADER))
}

fn write_header(crate_dir: &Path, header: &Path) -> Result<(), Box<dyn Error>> {
    let config = cbindgen::Config::from_file(crate_dir.join("cbindgen.toml"))?;
    let bindings = cbindgen::Builder::new()
        .with_crate(crate_dir)
        .with_config(config)
        .generate()?;
    bindings.write_to_file(header);
    Ok(())
}
