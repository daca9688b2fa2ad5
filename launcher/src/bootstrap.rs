use anyhow::{anyhow, bail, Context, Result};
use std::{
    path::{Path, PathBuf},
    process::Command,
};

use bootstrap_core::{
    config::BootstrapConfig,
    console, deps,
    process::{self, RunOptions, RunOutcome, SPAWN_FAILURE_CODE},
    venv,
};

pub const MANIFEST_FILE: &str = "requirements.txt";
pub const MAIN_SCRIPT: &str = "main_refactored.py";

pub fn bootstrap(workdir: &Path, cfg: &BootstrapConfig) -> Result<i32> {
    let exe = std::env::current_exe().context("resolve current exe")?;
    let exe_dir = exe.parent().context("exe has no parent")?.to_path_buf();
    bootstrap_with_deps(
        workdir,
        &exe_dir,
        cfg,
        &mut |cmd, opts| process::run(cmd, opts),
        &mut |tool| process::run_in_new_console(&mut Command::new(tool)),
        &mut || {
            console::pause(
                "Confirm that create-venv has finished creating the environment, \
                 then press enter to continue...",
            )
        },
    )
}

/// The full launch sequence: scan for a venv, create one through the
/// creation tool if absent (with a user confirmation gate bridging its
/// fire-and-forget elevation), install dependencies, run the script.
/// Returns the script's exit code.
pub fn bootstrap_with_deps(
    workdir: &Path,
    exe_dir: &Path,
    cfg: &BootstrapConfig,
    exec: &mut impl FnMut(&mut Command, &RunOptions) -> RunOutcome,
    spawn_tool: &mut impl FnMut(&Path) -> RunOutcome,
    confirm: &mut impl FnMut(),
) -> Result<i32> {
    let venv_dir = match venv::find_existing_venv(workdir) {
        Some(dir) => dir,
        None => {
            println!("[INFO] no usable virtual environment found, running the creation tool...");
            let tool = locate_creation_tool(exe_dir, workdir);
            if !tool.exists() {
                bail!("creation tool not found at {}", tool.display());
            }

            let outcome = spawn_tool(&tool);
            if outcome.code == SPAWN_FAILURE_CODE {
                bail!("could not start {}", tool.display());
            }
            if outcome.code != 0 {
                bail!(
                    "{} exited with code {}",
                    tool.display(),
                    outcome.code
                );
            }
            println!("[INFO] creation tool finished.");

            // The tool's elevation relaunch is fire-and-forget: the child we
            // waited on may have exited while the elevated process still
            // works. The user confirms completion before we re-scan.
            confirm();

            venv::find_existing_venv(workdir).ok_or_else(|| {
                anyhow!("no virtual environment detected after running the creation tool")
            })?
        }
    };

    let venv_python = venv::venv_python(&venv_dir);

    let manifest = workdir.join(MANIFEST_FILE);
    if !manifest.exists() {
        bail!("requirements file not found: {}", manifest.display());
    }

    println!("[INFO] checking and installing dependencies...");
    if let Err(err) =
        deps::install_dependencies_with_exec(&venv_python, &manifest, &cfg.indexes, exec)
    {
        if cfg.strict_deps {
            return Err(err.context("dependency installation failed"));
        }
        eprintln!("warning: {err:#}; launching anyway");
    }

    let script = workdir.join(MAIN_SCRIPT);
    if !script.exists() {
        bail!("main script not found: {}", script.display());
    }

    println!("[INFO] dependencies ready, starting the application...");
    let mut cmd = Command::new(&venv_python);
    cmd.arg(&script).current_dir(workdir);
    let outcome = exec(&mut cmd, &RunOptions::streamed());
    if outcome.code == SPAWN_FAILURE_CODE {
        bail!("could not launch {}", venv_python.display());
    }
    Ok(outcome.code)
}

/// Checks the launcher's own directory, the working directory, then the
/// parent of the launcher's directory. Falls back to the first location so
/// a miss produces a "not found at <path>" error rather than a vague one.
pub fn locate_creation_tool(exe_dir: &Path, workdir: &Path) -> PathBuf {
    let name = format!("create-venv{}", std::env::consts::EXE_SUFFIX);
    let mut candidates = vec![exe_dir.join(&name), workdir.join(&name)];
    if let Some(parent) = exe_dir.parent() {
        candidates.push(parent.join(&name));
    }
    for candidate in &candidates {
        if candidate.exists() {
            return candidate.clone();
        }
    }
    candidates[0].clone()
}
