use anyhow::{Context, Result};
use std::{
    io::{Read, Write},
    process::{Child, Command, Stdio},
    sync::{Arc, Mutex},
    thread,
    time::{Duration, Instant},
};

/// The child could not be started at all (binary missing, spawn error).
pub const SPAWN_FAILURE_CODE: i32 = -1;
/// The child outlived the configured timeout.
pub const TIMED_OUT_CODE: i32 = -2;

const CAPTURE_LIMIT: usize = 64 * 1024;
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(25);

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub capture: bool,
    pub stream: bool,
    pub timeout: Option<Duration>,
}

impl RunOptions {
    pub fn captured_with_timeout(timeout: Duration) -> Self {
        Self {
            capture: true,
            stream: false,
            timeout: Some(timeout),
        }
    }

    pub fn streamed() -> Self {
        Self {
            capture: false,
            stream: true,
            timeout: None,
        }
    }

    pub fn silent() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub code: i32,
    pub output: String,
}

impl RunOutcome {
    pub fn success(&self) -> bool {
        self.code == 0
    }

    fn spawn_failure() -> Self {
        Self {
            code: SPAWN_FAILURE_CODE,
            output: String::new(),
        }
    }
}

/// Runs a child to completion with stdout and stderr merged into one stream.
/// Never panics or errors on spawn failure; see the sentinel codes above.
pub fn run(cmd: &mut Command, opts: &RunOptions) -> RunOutcome {
    match try_run(cmd, opts) {
        Ok(outcome) => outcome,
        Err(_) => RunOutcome::spawn_failure(),
    }
}

fn try_run(cmd: &mut Command, opts: &RunOptions) -> Result<RunOutcome> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    hide_window(cmd);

    let mut child = cmd.spawn().context("spawn command")?;

    let sink = Arc::new(Mutex::new(String::new()));
    let mut drains = Vec::new();
    if let Some(stdout) = child.stdout.take() {
        drains.push(spawn_drain(stdout, Arc::clone(&sink), opts.clone()));
    }
    if let Some(stderr) = child.stderr.take() {
        drains.push(spawn_drain(stderr, Arc::clone(&sink), opts.clone()));
    }

    let code = wait_with_timeout(&mut child, opts.timeout)?;

    for drain in drains {
        let _ = drain.join();
    }

    let output = sink.lock().map(|s| s.clone()).unwrap_or_default();
    Ok(RunOutcome { code, output })
}

fn wait_with_timeout(child: &mut Child, timeout: Option<Duration>) -> Result<i32> {
    let Some(timeout) = timeout else {
        let status = child.wait().context("wait for child")?;
        return Ok(status.code().unwrap_or(1));
    };

    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait().context("poll child")? {
            return Ok(status.code().unwrap_or(1));
        }
        if Instant::now() >= deadline {
            // Best effort only; a child that ignores the kill is left to the OS.
            let _ = child.kill();
            let _ = child.wait();
            return Ok(TIMED_OUT_CODE);
        }
        thread::sleep(WAIT_POLL_INTERVAL);
    }
}

fn spawn_drain(
    mut pipe: impl Read + Send + 'static,
    sink: Arc<Mutex<String>>,
    opts: RunOptions,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut chunk = [0u8; 4096];
        loop {
            let n = match pipe.read(&mut chunk) {
                Ok(0) | Err(_) => break,
                Ok(n) => n,
            };
            let text = String::from_utf8_lossy(&chunk[..n]);
            if opts.stream {
                let mut stdout = std::io::stdout();
                let _ = stdout.write_all(text.as_bytes());
                let _ = stdout.flush();
            }
            if opts.capture {
                if let Ok(mut buf) = sink.lock() {
                    let remaining = CAPTURE_LIMIT.saturating_sub(buf.len());
                    if remaining > 0 {
                        let take = text.len().min(remaining);
                        buf.push_str(&text[..floor_char_boundary(&text, take)]);
                    }
                }
            }
        }
    })
}

fn floor_char_boundary(s: &str, mut index: usize) -> usize {
    while index < s.len() && !s.is_char_boundary(index) {
        index -= 1;
    }
    index.min(s.len())
}

/// Runs a child in its own visible console window and blocks until it exits.
/// Used for the creation tool so the user can see the elevation prompt.
pub fn run_in_new_console(cmd: &mut Command) -> RunOutcome {
    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt;
        const CREATE_NEW_CONSOLE: u32 = 0x00000010;
        cmd.creation_flags(CREATE_NEW_CONSOLE);
    }
    match cmd.status() {
        Ok(status) => RunOutcome {
            code: status.code().unwrap_or(1),
            output: String::new(),
        },
        Err(_) => RunOutcome::spawn_failure(),
    }
}

fn hide_window(cmd: &mut Command) {
    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt;
        const CREATE_NO_WINDOW: u32 = 0x08000000;
        cmd.creation_flags(CREATE_NO_WINDOW);
    }
    let _ = cmd;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_failure_yields_sentinel() {
        let mut cmd = Command::new("definitely-not-a-real-binary-xyz");
        let outcome = run(&mut cmd, &RunOptions::silent());
        assert_eq!(outcome.code, SPAWN_FAILURE_CODE);
        assert!(outcome.output.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn captures_merged_stdout_and_stderr() {
        let mut cmd = Command::new("/bin/sh");
        cmd.arg("-c").arg("echo out; echo err >&2");
        let outcome = run(
            &mut cmd,
            &RunOptions {
                capture: true,
                stream: false,
                timeout: None,
            },
        );
        assert_eq!(outcome.code, 0);
        assert!(outcome.output.contains("out"));
        assert!(outcome.output.contains("err"));
    }

    #[cfg(unix)]
    #[test]
    fn timeout_yields_sentinel() {
        let mut cmd = Command::new("/bin/sh");
        cmd.arg("-c").arg("sleep 10");
        let outcome = run(
            &mut cmd,
            &RunOptions::captured_with_timeout(Duration::from_millis(100)),
        );
        assert_eq!(outcome.code, TIMED_OUT_CODE);
    }

    #[cfg(unix)]
    #[test]
    fn nonzero_exit_is_reported() {
        let mut cmd = Command::new("/bin/sh");
        cmd.arg("-c").arg("exit 7");
        let outcome = run(&mut cmd, &RunOptions::silent());
        assert_eq!(outcome.code, 7);
    }

    #[test]
    fn floor_char_boundary_respects_utf8() {
        let s = "a\u{00e9}b";
        assert_eq!(floor_char_boundary(s, 2), 1);
        assert_eq!(floor_char_boundary(s, 10), s.len());
    }
}
