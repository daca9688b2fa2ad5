use semver::Version;
use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    process::Command,
    time::Duration,
};

use crate::{
    process::{RunOptions, RunOutcome},
    version,
};

const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateSource {
    PathSearch,
    KnownDir,
    Registry,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub path: PathBuf,
    pub source: CandidateSource,
}

impl Candidate {
    pub fn new(path: impl Into<PathBuf>, source: CandidateSource) -> Self {
        Self {
            path: path.into(),
            source,
        }
    }
}

/// Enumerates interpreter candidates in discovery-priority order:
/// executable search path, well-known install directories, then the
/// registry. Deduplicated, with store-alias entries demoted to the end.
pub fn discover_candidates(
    exec: &mut impl FnMut(&mut Command, &RunOptions) -> RunOutcome,
) -> Vec<Candidate> {
    let mut found = Vec::new();
    from_path_search(exec, &mut found);
    from_known_dirs(&mut found);
    from_registry(&mut found);
    let mut found = dedup_candidates(found);
    rank_candidates(&mut found);
    found
}

fn from_path_search(
    exec: &mut impl FnMut(&mut Command, &RunOptions) -> RunOutcome,
    out: &mut Vec<Candidate>,
) {
    let mut cmd = if cfg!(windows) {
        let mut c = Command::new("where");
        c.arg("python.exe");
        c
    } else {
        let mut c = Command::new("which");
        c.arg("-a").arg("python3");
        c
    };
    let outcome = exec(&mut cmd, &RunOptions::captured_with_timeout(PROBE_TIMEOUT));
    if !outcome.success() {
        return;
    }
    for line in outcome.output.lines() {
        let line = line.trim();
        if !line.is_empty() && Path::new(line).exists() {
            out.push(Candidate::new(line, CandidateSource::PathSearch));
        }
    }
}

fn from_known_dirs(out: &mut Vec<Candidate>) {
    if let Ok(local) = std::env::var("LOCALAPPDATA") {
        let local = PathBuf::from(local);
        // Store alias location; ranked to the back later.
        let alias = local
            .join("Microsoft")
            .join("WindowsApps")
            .join("python.exe");
        if alias.exists() {
            out.push(Candidate::new(alias, CandidateSource::KnownDir));
        }
        scan_python_dirs(&local.join("Programs").join("Python"), out);
    }

    for var in ["ProgramFiles", "ProgramFiles(x86)"] {
        if let Ok(base) = std::env::var(var) {
            scan_python_dirs(&PathBuf::from(base).join("Python"), out);
        }
    }
    if let Ok(drive) = std::env::var("SYSTEMDRIVE") {
        scan_python_dirs(&PathBuf::from(format!("{drive}\\")).join("Python"), out);
    }
}

/// Picks up `<base>/Python*/python.exe` installs.
fn scan_python_dirs(base: &Path, out: &mut Vec<Candidate>) {
    let Ok(entries) = std::fs::read_dir(base) else {
        return;
    };
    for entry in entries.flatten() {
        let dir = entry.path();
        if !dir.is_dir() {
            continue;
        }
        let name = entry.file_name();
        if !name.to_string_lossy().starts_with("Python") {
            continue;
        }
        let exe = dir.join("python.exe");
        if exe.exists() {
            out.push(Candidate::new(exe, CandidateSource::KnownDir));
        }
    }
}

#[cfg(windows)]
fn from_registry(out: &mut Vec<Candidate>) {
    use winreg::enums::{HKEY_CURRENT_USER, HKEY_LOCAL_MACHINE, KEY_READ};
    use winreg::RegKey;

    for hive in [HKEY_LOCAL_MACHINE, HKEY_CURRENT_USER] {
        let root = RegKey::predef(hive);
        let Ok(pycore) = root.open_subkey_with_flags(r"SOFTWARE\Python\PythonCore", KEY_READ)
        else {
            continue;
        };
        for key_name in pycore.enum_keys().flatten() {
            // Subkey names are versions like "3.12"; unparseable ones are skipped.
            if version::parse_loose(&key_name).is_none() {
                continue;
            }
            let Ok(install) = pycore.open_subkey(format!(r"{key_name}\InstallPath")) else {
                continue;
            };
            let Ok(install_path) = install.get_value::<String, _>("") else {
                continue;
            };
            let exe = PathBuf::from(install_path).join("python.exe");
            if exe.exists() {
                out.push(Candidate::new(exe, CandidateSource::Registry));
            }
        }
    }
}

#[cfg(not(windows))]
fn from_registry(_out: &mut Vec<Candidate>) {}

/// Collapses duplicates by normalized absolute path; the first occurrence's
/// position (and source tag) is kept.
pub fn dedup_candidates(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if seen.insert(normalize_path(&candidate.path)) {
            out.push(candidate);
        }
    }
    out
}

fn normalize_path(path: &Path) -> String {
    if cfg!(windows) {
        path.to_string_lossy().replace('/', "\\").to_lowercase()
    } else {
        path.to_string_lossy().into_owned()
    }
}

/// Demotes app-execution-alias entries (zero-byte WindowsApps placeholders
/// that open a store prompt instead of running Python) to the end of the
/// probe order. The sort is stable so relative order is otherwise kept.
pub fn rank_candidates(candidates: &mut [Candidate]) {
    candidates.sort_by_key(|c| is_store_alias(&c.path));
}

pub fn is_store_alias(path: &Path) -> bool {
    path.components()
        .any(|c| c.as_os_str().to_string_lossy().eq_ignore_ascii_case("WindowsApps"))
}

/// First candidate in discovery order whose reported version falls in the
/// supported range wins; this is deliberately not a best-version search.
pub fn select_first_supported(
    candidates: &[Candidate],
    probe: &mut impl FnMut(&Path) -> Option<Version>,
) -> Option<(Candidate, Version)> {
    for candidate in candidates {
        let Some(version) = probe(&candidate.path) else {
            println!(
                "skipping {} (did not report a version)",
                candidate.path.display()
            );
            continue;
        };
        if version >= version::MAX_EXCLUSIVE {
            println!(
                "[warning] Python {} at {} is >= {}, not supported",
                version,
                candidate.path.display(),
                version::MAX_EXCLUSIVE
            );
            continue;
        }
        if !version::is_supported(&version) {
            continue;
        }
        return Some((candidate.clone(), version));
    }
    None
}

/// Queries `<exe> --version` and parses the banner. A candidate that fails
/// to run, times out, or prints garbage yields `None`.
pub fn probe_version(
    exe: &Path,
    runner: &mut impl FnMut(&mut Command, &RunOptions) -> RunOutcome,
) -> Option<Version> {
    let mut cmd = Command::new(exe);
    cmd.arg("--version");
    let outcome = runner(&mut cmd, &RunOptions::captured_with_timeout(PROBE_TIMEOUT));
    if !outcome.success() {
        return None;
    }
    version::parse_banner(&outcome.output)
}
