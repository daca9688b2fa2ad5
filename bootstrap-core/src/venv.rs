use anyhow::{bail, Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
    process::Command,
    time::Duration,
};

use crate::process::{RunOptions, RunOutcome, SPAWN_FAILURE_CODE};

/// Conventional venv directory names, in lookup priority order.
pub const VENV_DIR_NAMES: [&str; 4] = ["venv", ".venv", "env", ".env"];

/// Delay after tearing down a stale directory, to absorb delayed handle
/// release before the path is reused.
const SETTLE_DELAY: Duration = Duration::from_secs(1);

/// The fixed nested interpreter location that defines a usable venv.
pub fn venv_python(venv_dir: &Path) -> PathBuf {
    venv_dir.join("Scripts").join("python.exe")
}

/// First conventional directory under `workdir` holding the nested
/// interpreter. A directory without the interpreter file does not count.
pub fn find_existing_venv(workdir: &Path) -> Option<PathBuf> {
    for name in VENV_DIR_NAMES {
        let dir = workdir.join(name);
        if venv_python(&dir).exists() {
            return Some(dir);
        }
    }
    None
}

pub fn ensure_environment(python: &Path, target: &Path) -> Result<()> {
    ensure_environment_with_exec(python, target, &mut |cmd, opts| {
        crate::process::run(cmd, opts)
    })
}

/// Creates a fresh virtual environment at `target`. Any existing directory
/// there is treated as stale and removed first; there is no repair mode.
/// Tries `-m venv`, then `-m virtualenv` against the same target.
pub fn ensure_environment_with_exec(
    python: &Path,
    target: &Path,
    exec: &mut impl FnMut(&mut Command, &RunOptions) -> RunOutcome,
) -> Result<()> {
    if target.exists() {
        println!("Removing stale environment at {}", target.display());
        fs::remove_dir_all(target)
            .with_context(|| format!("remove {}", target.display()))?;
        std::thread::sleep(SETTLE_DELAY);
    }

    if let Some(parent) = target.parent() {
        if !check_write_permission(parent) {
            eprintln!(
                "warning: write-permission probe failed in {}",
                parent.display()
            );
        }
    }

    println!("Creating virtual environment with venv...");
    let outcome = exec(
        &mut creation_cmd(python, "venv", target),
        &RunOptions::streamed(),
    );
    if outcome.success() {
        return Ok(());
    }
    report_creation_failure("venv", &outcome);

    println!("Falling back to virtualenv...");
    let outcome = exec(
        &mut creation_cmd(python, "virtualenv", target),
        &RunOptions::streamed(),
    );
    if outcome.success() {
        return Ok(());
    }
    report_creation_failure("virtualenv", &outcome);

    bail!(
        "failed to create virtual environment at {} (both venv and virtualenv failed)",
        target.display()
    );
}

fn creation_cmd(python: &Path, module: &str, target: &Path) -> Command {
    let mut cmd = Command::new(python);
    cmd.arg("-m").arg(module).arg(target);
    cmd
}

fn report_creation_failure(tool: &str, outcome: &RunOutcome) {
    if outcome.code == SPAWN_FAILURE_CODE {
        eprintln!("warning: could not launch the interpreter for -m {tool}");
    } else {
        eprintln!("warning: -m {tool} exited with code {}", outcome.code);
    }
}

/// Create-then-delete probe; advisory only, never blocks creation.
fn check_write_permission(dir: &Path) -> bool {
    tempfile::Builder::new()
        .prefix(".write-probe-")
        .tempfile_in(dir)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exec_ok(created: &mut Vec<(String, PathBuf)>) -> impl FnMut(&mut Command, &RunOptions) -> RunOutcome + '_ {
        move |cmd, _| {
            let args: Vec<String> = cmd
                .get_args()
                .map(|a| a.to_string_lossy().to_string())
                .collect();
            let target = PathBuf::from(&args[2]);
            fs::create_dir_all(venv_python(&target).parent().unwrap()).unwrap();
            fs::write(venv_python(&target), "stub").unwrap();
            created.push((args[1].clone(), target));
            RunOutcome {
                code: 0,
                output: String::new(),
            }
        }
    }

    #[test]
    fn venv_python_uses_fixed_relative_path() {
        let p = venv_python(Path::new("venvdir"));
        assert_eq!(p, Path::new("venvdir").join("Scripts").join("python.exe"));
    }

    #[test]
    fn find_existing_venv_requires_interpreter_file() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("venv")).unwrap();
        assert!(find_existing_venv(tmp.path()).is_none());

        fs::create_dir_all(tmp.path().join("venv").join("Scripts")).unwrap();
        fs::write(venv_python(&tmp.path().join("venv")), "stub").unwrap();
        assert_eq!(
            find_existing_venv(tmp.path()),
            Some(tmp.path().join("venv"))
        );
    }

    #[test]
    fn find_existing_venv_honors_name_priority() {
        let tmp = tempfile::tempdir().unwrap();
        for name in ["venv", ".venv"] {
            let dir = tmp.path().join(name);
            fs::create_dir_all(dir.join("Scripts")).unwrap();
            fs::write(venv_python(&dir), "stub").unwrap();
        }
        assert_eq!(
            find_existing_venv(tmp.path()),
            Some(tmp.path().join("venv"))
        );
    }

    #[test]
    fn stale_directory_is_fully_replaced() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("venv");
        fs::create_dir_all(target.join("junk")).unwrap();
        fs::write(target.join("junk").join("leftover.txt"), "old").unwrap();

        let mut created = Vec::new();
        let mut exec = exec_ok(&mut created);
        ensure_environment_with_exec(Path::new("python"), &target, &mut exec).unwrap();
        drop(exec);

        assert!(!target.join("junk").exists());
        assert!(venv_python(&target).exists());
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].0, "venv");
    }

    #[test]
    fn fallback_targets_same_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("venv");

        let mut seen: Vec<(String, PathBuf)> = Vec::new();
        let mut exec = |cmd: &mut Command, _: &RunOptions| {
            let args: Vec<String> = cmd
                .get_args()
                .map(|a| a.to_string_lossy().to_string())
                .collect();
            seen.push((args[1].clone(), PathBuf::from(&args[2])));
            let code = if args[1] == "venv" { 1 } else { 0 };
            RunOutcome {
                code,
                output: String::new(),
            }
        };

        ensure_environment_with_exec(Path::new("python"), &target, &mut exec).unwrap();
        drop(exec);

        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].0, "venv");
        assert_eq!(seen[1].0, "virtualenv");
        assert_eq!(seen[0].1, seen[1].1);
    }

    #[test]
    fn both_methods_failing_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("venv");
        let mut exec = |_: &mut Command, _: &RunOptions| RunOutcome {
            code: 1,
            output: String::new(),
        };
        let err = ensure_environment_with_exec(Path::new("python"), &target, &mut exec)
            .unwrap_err();
        assert!(err.to_string().contains("both venv and virtualenv"));
    }
}
