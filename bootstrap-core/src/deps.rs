use anyhow::{bail, Result};
use std::{path::Path, process::Command, time::Duration};

use crate::{
    config::IndexConfig,
    process::{RunOptions, RunOutcome},
};

const UV_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

pub fn install_dependencies(
    venv_python: &Path,
    manifest: &Path,
    indexes: &IndexConfig,
) -> Result<()> {
    install_dependencies_with_exec(venv_python, manifest, indexes, &mut |cmd, opts| {
        crate::process::run(cmd, opts)
    })
}

/// Installs packages from the manifest into the venv, preferring uv (which
/// targets an arbitrary environment via `--python`) with pip as fallback.
/// Output streams live; installs can be slow.
pub fn install_dependencies_with_exec(
    venv_python: &Path,
    manifest: &Path,
    indexes: &IndexConfig,
    exec: &mut impl FnMut(&mut Command, &RunOptions) -> RunOutcome,
) -> Result<()> {
    if !manifest.exists() {
        bail!("requirements file not found: {}", manifest.display());
    }
    if !venv_python.exists() {
        bail!(
            "virtual environment interpreter not found: {}",
            venv_python.display()
        );
    }

    if uv_available(exec) {
        println!("uv detected, installing dependencies with uv...");
        let outcome = exec(
            &mut uv_install_cmd(venv_python, manifest, indexes),
            &RunOptions::streamed(),
        );
        if outcome.success() {
            println!("Dependencies installed with uv.");
            return Ok(());
        }
        eprintln!(
            "warning: uv install failed (exit {}), falling back to pip",
            outcome.code
        );
    } else {
        println!("uv not detected, installing dependencies with pip...");
    }

    let outcome = exec(
        &mut pip_install_cmd(venv_python, manifest, indexes),
        &RunOptions::streamed(),
    );
    if outcome.success() {
        println!("Dependencies installed with pip.");
        return Ok(());
    }
    bail!(
        "dependency installation failed (pip exited with {})",
        outcome.code
    );
}

fn uv_available(exec: &mut impl FnMut(&mut Command, &RunOptions) -> RunOutcome) -> bool {
    let mut cmd = Command::new("uv");
    cmd.arg("--version");
    exec(&mut cmd, &RunOptions::captured_with_timeout(UV_PROBE_TIMEOUT)).success()
}

fn uv_install_cmd(venv_python: &Path, manifest: &Path, indexes: &IndexConfig) -> Command {
    let mut cmd = Command::new("uv");
    cmd.arg("pip")
        .arg("install")
        .arg("-r")
        .arg(manifest)
        .arg("-i")
        .arg(&indexes.primary)
        .arg("--python")
        .arg(venv_python);
    cmd
}

/// pip gets the fallback index as an extra index, offered simultaneously
/// with the primary rather than tried after it.
fn pip_install_cmd(venv_python: &Path, manifest: &Path, indexes: &IndexConfig) -> Command {
    let mut cmd = Command::new(venv_python);
    cmd.arg("-m")
        .arg("pip")
        .arg("install")
        .arg("-r")
        .arg(manifest)
        .arg("-i")
        .arg(&indexes.primary);
    if !indexes.fallback.is_empty() {
        cmd.arg("--extra-index-url").arg(&indexes.fallback);
    }
    cmd
}
