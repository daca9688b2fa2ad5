use anyhow::{anyhow, bail, Result};
use std::{
    path::{Path, PathBuf},
    process::Command,
};

use bootstrap_core::{
    config::BootstrapConfig,
    console, deps, locate,
    locate::Candidate,
    process::{self, RunOptions, RunOutcome, SPAWN_FAILURE_CODE},
    venv, version,
};

const PYTHON_INSTALLER_REL: &str = "install/python-3.12.8-amd64.exe";
const PYTHON_DOWNLOAD_URL: &str =
    "https://www.python.org/ftp/python/3.12.8/python-3.12.8-amd64.exe";

pub fn run(workdir: &Path, cfg: &BootstrapConfig) -> Result<()> {
    let mut exec = |cmd: &mut Command, opts: &RunOptions| process::run(cmd, opts);

    println!("Searching for Python installations...");
    let candidates = locate::discover_candidates(&mut exec);

    let selected = match select_interpreter(&candidates, &mut exec) {
        Some(selected) => selected,
        None => {
            // One retry after offering the bundled installer.
            offer_python_installer(workdir)?;
            let candidates = locate::discover_candidates(&mut exec);
            select_interpreter(&candidates, &mut exec).ok_or_else(|| {
                anyhow!(
                    "no suitable Python found (need {})",
                    version::supported_range()
                )
            })?
        }
    };

    create_and_install(workdir, cfg, &selected, &mut exec)
}

pub fn select_interpreter(
    candidates: &[Candidate],
    exec: &mut impl FnMut(&mut Command, &RunOptions) -> RunOutcome,
) -> Option<PathBuf> {
    if candidates.is_empty() {
        println!("No Python installations found.");
        return None;
    }
    println!("Found the following Python installations:");
    for candidate in candidates {
        println!("- {}", candidate.path.display());
    }
    let (candidate, version) =
        locate::select_first_supported(candidates, &mut |path| locate::probe_version(path, exec))?;
    println!(
        "Selected Python: {} (version {version})",
        candidate.path.display()
    );
    Some(candidate.path)
}

pub fn create_and_install(
    workdir: &Path,
    cfg: &BootstrapConfig,
    python: &Path,
    exec: &mut impl FnMut(&mut Command, &RunOptions) -> RunOutcome,
) -> Result<()> {
    let target = workdir.join("venv");
    println!("Creating virtual environment at {}", target.display());
    venv::ensure_environment_with_exec(python, &target, exec)?;
    println!("Virtual environment created.");
    println!(
        "Activate it with: {}",
        target.join("Scripts").join("activate").display()
    );

    let manifest = workdir.join("requirements.txt");
    if !manifest.exists() {
        println!(
            "No requirements file at {}, skipping dependency install.",
            manifest.display()
        );
        return Ok(());
    }

    println!("Installing dependencies from {}", manifest.display());
    let venv_python = venv::venv_python(&target);
    if let Err(err) =
        deps::install_dependencies_with_exec(&venv_python, &manifest, &cfg.indexes, exec)
    {
        // The launcher installs again before running the script.
        eprintln!("warning: dependency install failed: {err:#}");
    }
    Ok(())
}

fn offer_python_installer(workdir: &Path) -> Result<()> {
    println!(
        "[ERROR] no usable Python environment detected (need {}).",
        version::supported_range()
    );
    let choice = console::read_choice("Install Python 3.12.8 now? (Y/N): ");
    if choice != "y" {
        bail!("Python installation declined by user");
    }

    let installer = workdir.join(PYTHON_INSTALLER_REL);
    if installer.exists() {
        println!("Running installer: {}", installer.display());
        println!("This blocks until the installer finishes, please wait...");
        let outcome = process::run_in_new_console(&mut Command::new(&installer));
        if outcome.code == SPAWN_FAILURE_CODE {
            println!("[ERROR] could not start the installer");
        } else if outcome.code != 0 {
            println!("[ERROR] installer exited with code {}", outcome.code);
        } else {
            println!("Python installation finished.");
        }
    } else {
        println!(
            "[ERROR] no bundled installer at {}. You can download it from:",
            installer.display()
        );
        println!("{PYTHON_DOWNLOAD_URL}");
    }

    console::pause("Press enter once installation is complete to continue...");
    Ok(())
}
