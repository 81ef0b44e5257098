//! Generate UniFFI Swift bindings for ClipShelf
//!
//! Run: cargo run --bin generate-bindings -- [--project-root DIR] [--host-only]
//!
//! Outputs (relative to the project root):
//!   Sources/ClipShelfFFI/clipshelfFFI.h        C header
//!   Sources/ClipShelfFFI/module.modulemap      Clang module map
//!   Sources/ClipShelfFFI/libclipshelf.a        static lib (universal unless --host-only)
//!   Sources/ClipShelf/clipshelf.swift          Swift bindings

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

const APPLE_TARGETS: [&str; 2] = ["aarch64-apple-darwin", "x86_64-apple-darwin"];

#[derive(Parser, Debug)]
#[command(about = "Build libclipshelf and generate its Swift bindings")]
struct Args {
    /// Swift project root (defaults to the crate's parent directory)
    #[arg(long)]
    project_root: Option<PathBuf>,

    /// Only build for the host architecture instead of a universal binary
    #[arg(long)]
    host_only: bool,

    /// macOS deployment target passed to the Rust build
    #[arg(long, default_value = "15.0")]
    deployment_target: String,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let crate_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let project_root = match args.project_root {
        Some(root) => root,
        None => crate_dir
            .parent()
            .context("Crate directory has no parent")?
            .to_path_buf(),
    };
    let ffi_dest = project_root.join("Sources/ClipShelfFFI");
    let swift_dest = project_root.join("Sources/ClipShelf");
    let generated = crate_dir.join("generated");
    fs::create_dir_all(&ffi_dest)?;
    fs::create_dir_all(&swift_dest)?;

    let envs = [("MACOSX_DEPLOYMENT_TARGET", args.deployment_target.as_str())];

    println!("Building libclipshelf...");
    run_cmd("cargo", &["build", "--release", "--lib"], &crate_dir, &envs)?;

    println!("Generating Swift bindings...");
    run_cmd(
        "cargo",
        &[
            "run",
            "--bin",
            "uniffi-bindgen",
            "generate",
            "--library",
            "target/release/libclipshelf.dylib",
            "--language",
            "swift",
            "--out-dir",
            "generated",
        ],
        &crate_dir,
        &envs,
    )?;

    // Swift 6 strict concurrency rejects the generated global
    let swift = fs::read_to_string(generated.join("clipshelf.swift"))
        .context("Generated clipshelf.swift missing")?
        .replace(
            "private var initializationResult",
            "nonisolated(unsafe) private var initializationResult",
        )
        .replace("canImport(clipshelfFFI)", "canImport(ClipShelfFFI)")
        .replace("import clipshelfFFI", "import ClipShelfFFI");
    fs::write(swift_dest.join("clipshelf.swift"), swift)?;

    fs::copy(generated.join("clipshelfFFI.h"), ffi_dest.join("clipshelfFFI.h"))
        .context("Failed to copy generated header")?;
    fs::write(
        ffi_dest.join("module.modulemap"),
        "module ClipShelfFFI {\n    header \"clipshelfFFI.h\"\n    export *\n}\n",
    )?;

    let static_lib = ffi_dest.join("libclipshelf.a");
    if args.host_only {
        fs::copy(crate_dir.join("target/release/libclipshelf.a"), &static_lib)
            .context("Failed to copy static library")?;
    } else {
        println!("Building universal static library...");
        let mut slices = Vec::new();
        for target in APPLE_TARGETS {
            run_cmd("cargo", &["build", "--release", "--lib", "--target", target], &crate_dir, &envs)?;
            slices.push(format!("target/{}/release/libclipshelf.a", target));
        }
        let output = static_lib.to_string_lossy().into_owned();
        let mut lipo_args: Vec<&str> = vec!["-create"];
        lipo_args.extend(slices.iter().map(String::as_str));
        lipo_args.extend(["-output", output.as_str()]);
        run_cmd("lipo", &lipo_args, &crate_dir, &[])?;
    }

    println!("Done. Wrote:");
    for path in [
        swift_dest.join("clipshelf.swift"),
        ffi_dest.join("clipshelfFFI.h"),
        ffi_dest.join("module.modulemap"),
        static_lib,
    ] {
        println!("  - {}", path.display());
    }
    Ok(())
}

fn run_cmd(program: &str, args: &[&str], dir: &Path, envs: &[(&str, &str)]) -> Result<()> {
    let status = Command::new(program)
        .args(args)
        .current_dir(dir)
        .envs(envs.iter().copied())
        .status()
        .with_context(|| format!("Failed to run {}", program))?;
    if !status.success() {
        bail!("{} {} failed with status: {}", program, args.join(" "), status);
    }
    Ok(())
}
