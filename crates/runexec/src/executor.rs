//! External command execution with a wall-clock timeout.
//! （以固定逾時執行外部指令並擷取文字輸出。）
//!
//! The executor wraps `std::process::Command` with an explicit argument
//! vector and working directory; nothing is ever routed through a shell.
//! Spawn failures and timeouts are folded into the [`RunResult`] so callers
//! can print them like any other process output.
//!
//! On Unix each command leads its own process group, and a timeout kills the
//! whole group so helpers started by the command (`go run` binaries, shell
//! pipelines) go down with it. Output collection after a timeout is bounded
//! by [`OUTPUT_GRACE`] in case something escaped the group and still holds a
//! pipe.

use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use thiserror::Error;

/// 逾時後等待剩餘輸出的上限。 / How long to keep reading pipes once a command timed out.
pub const OUTPUT_GRACE: Duration = Duration::from_millis(250);

/// 執行指令時可能發生的錯誤。 / Errors that may surface while executing a command.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read process output: {0}")]
    Output(std::io::Error),
    #[error("failed to poll process status: {0}")]
    Poll(std::io::Error),
    #[error("failed to terminate process: {0}")]
    Kill(std::io::Error),
}

/// 可序列化的指令設定。 / Serializable command specification.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSpec {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl RunSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            timeout_ms: None,
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn with_working_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(path.into());
        self
    }

    /// 設定逾時限制。 / Applies a timeout to the command execution.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        let millis = timeout.as_millis().clamp(1, u128::from(u64::MAX)) as u64;
        self.timeout_ms = Some(millis);
        self
    }

    /// 以空白連接的指令列（僅供顯示）。 / Space-joined command line, for display only.
    pub fn display_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// 指令執行結果。 / Result information produced by a command execution.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResult {
    /// Process exit code; `-1` for spawn failures, timeouts and signals.
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u128,
    pub timed_out: bool,
}

impl RunResult {
    /// 結束碼為 0 即成功。 / Indicates whether the command exited with code `0`.
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == 0
    }

    /// 無法啟動時的結果：代碼 -1，錯誤文字放在 stderr。 / Result recorded when the process could not run at all.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            exit_code: -1,
            stdout: String::new(),
            stderr: message.into(),
            duration_ms: 0,
            timed_out: false,
        }
    }
}

/// 依設定執行指令的主要元件。 / Executes commands according to a [`RunSpec`].
pub struct RunExecutor;

impl RunExecutor {
    /// 執行並擷取輸出；任何錯誤都轉為代碼 -1 的結果。 / Runs the command, never failing: errors become a `-1` result.
    pub fn execute(spec: &RunSpec) -> RunResult {
        match Self::try_execute(spec) {
            Ok(result) => result,
            Err(err) => {
                tracing::warn!(program = %spec.program, error = %err, "command failed to run");
                RunResult::failure(err.to_string())
            }
        }
    }

    /// 執行並回傳底層錯誤。 / Runs the command, surfacing process-level errors.
    pub fn try_execute(spec: &RunSpec) -> Result<RunResult, RunError> {
        let mut command = Command::new(&spec.program);
        command.args(&spec.args);
        command.stdin(Stdio::null());
        command.stdout(Stdio::piped());
        command.stderr(Stdio::piped());
        if let Some(dir) = &spec.working_dir {
            command.current_dir(dir);
        }
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        tracing::debug!(command = %spec.display_line(), cwd = ?spec.working_dir, "spawning");
        let start = Instant::now();
        let mut child = command.spawn().map_err(|source| RunError::Spawn {
            program: spec.program.clone(),
            source,
        })?;

        // 以執行緒讀取管線，避免輸出塞滿時卡住。 / Drain pipes on threads so a chatty child cannot block.
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let timeout = spec.timeout_ms.map(Duration::from_millis);
        let (status, timed_out) = wait_with_timeout(&mut child, start, timeout)?;

        let deadline = timed_out.then(|| Instant::now() + OUTPUT_GRACE);
        let stdout = collect_output(stdout, deadline)?;
        let mut stderr = collect_output(stderr, deadline)?;
        let exit_code = if timed_out {
            if let Some(timeout) = timeout {
                if !stderr.is_empty() && !stderr.ends_with('\n') {
                    stderr.push('\n');
                }
                stderr.push_str(&format!(
                    "Command '{}' timed out after {} seconds\n",
                    spec.display_line(),
                    timeout.as_secs_f64()
                ));
            }
            -1
        } else {
            status.unwrap_or(-1)
        };

        Ok(RunResult {
            exit_code,
            stdout,
            stderr,
            duration_ms: start.elapsed().as_millis(),
            timed_out,
        })
    }
}

fn wait_with_timeout(
    child: &mut Child,
    start: Instant,
    timeout: Option<Duration>,
) -> Result<(Option<i32>, bool), RunError> {
    let Some(timeout) = timeout else {
        let status = child.wait().map_err(RunError::Poll)?;
        return Ok((status.code(), false));
    };
    loop {
        if let Some(status) = child.try_wait().map_err(RunError::Poll)? {
            return Ok((status.code(), false));
        }
        if start.elapsed() >= timeout {
            kill_tree(child)?;
            child.wait().map_err(RunError::Poll)?;
            tracing::warn!(timeout_ms = timeout.as_millis() as u64, "process timed out and was killed");
            return Ok((None, true));
        }
        thread::sleep(Duration::from_millis(15));
    }
}

#[cfg(unix)]
fn kill_tree(child: &mut Child) -> Result<(), RunError> {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let group = Pid::from_raw(child.id() as i32);
    match killpg(group, Signal::SIGKILL) {
        Ok(()) => Ok(()),
        Err(errno) => {
            tracing::debug!(error = %errno, "killing process group failed; killing the child only");
            child.kill().map_err(RunError::Kill)
        }
    }
}

#[cfg(not(unix))]
fn kill_tree(child: &mut Child) -> Result<(), RunError> {
    child.kill().map_err(RunError::Kill)
}

/// 背景讀取中的管線。 / A pipe being drained on its own thread.
struct Capture {
    buffer: Arc<Mutex<Vec<u8>>>,
    reader: JoinHandle<std::io::Result<()>>,
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<Capture> {
    pipe.map(|mut pipe| {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&buffer);
        let reader = thread::spawn(move || {
            let mut chunk = [0u8; 8192];
            loop {
                let read = pipe.read(&mut chunk)?;
                if read == 0 {
                    return Ok(());
                }
                sink.lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .extend_from_slice(&chunk[..read]);
            }
        });
        Capture { buffer, reader }
    })
}

/// 收集輸出；有期限時不等待仍持有管線的孫程序。 / Collects a pipe; with a deadline, stops waiting for stray holders of the pipe.
fn collect_output(capture: Option<Capture>, deadline: Option<Instant>) -> Result<String, RunError> {
    let Some(Capture { buffer, reader }) = capture else {
        return Ok(String::new());
    };
    if let Some(deadline) = deadline {
        while !reader.is_finished() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
    }
    if deadline.is_none() || reader.is_finished() {
        reader
            .join()
            .map_err(|_| RunError::Output(std::io::Error::other("output reader panicked")))?
            .map_err(RunError::Output)?;
    } else {
        tracing::debug!("pipe still open after timeout; returning partial output");
    }
    let bytes = buffer.lock().unwrap_or_else(PoisonError::into_inner);
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[cfg(unix)]
    #[test]
    fn captures_stdout_and_stderr() {
        let spec = RunSpec::new("sh").with_args(["-c", "printf out; printf err >&2; exit 3"]);
        let result = RunExecutor::execute(&spec);
        assert_eq!(result.exit_code, 3);
        assert_eq!(result.stdout, "out");
        assert_eq!(result.stderr, "err");
        assert!(!result.success());
    }

    #[cfg(unix)]
    #[test]
    fn runs_in_working_directory() {
        let temp = tempdir().unwrap();
        let spec = RunSpec::new("pwd").with_working_dir(temp.path());
        let result = RunExecutor::execute(&spec);
        assert!(result.success());
        let reported = PathBuf::from(result.stdout.trim_end());
        assert_eq!(
            reported.canonicalize().unwrap(),
            temp.path().canonicalize().unwrap()
        );
    }

    #[cfg(unix)]
    #[test]
    fn timeout_kills_and_reports() {
        let spec = RunSpec::new("sh")
            .with_args(["-c", "exec sleep 5"])
            .with_timeout(Duration::from_millis(100));
        let result = RunExecutor::execute(&spec);
        assert!(result.timed_out);
        assert_eq!(result.exit_code, -1);
        assert!(result.stderr.contains("timed out"));
    }

    #[cfg(unix)]
    #[test]
    fn timeout_is_not_extended_by_child_processes() {
        let spec = RunSpec::new("sh")
            .with_args(["-c", "sleep 4; echo done"])
            .with_timeout(Duration::from_millis(200));
        let started = Instant::now();
        let result = RunExecutor::execute(&spec);
        assert!(
            started.elapsed() < Duration::from_secs(2),
            "took {:?}",
            started.elapsed()
        );
        assert!(result.timed_out);
        assert_eq!(result.exit_code, -1);
        assert!(!result.stdout.contains("done"));
    }

    #[cfg(unix)]
    #[test]
    fn output_before_timeout_is_kept() {
        let spec = RunSpec::new("sh")
            .with_args(["-c", "echo partial; sleep 4"])
            .with_timeout(Duration::from_millis(300));
        let result = RunExecutor::execute(&spec);
        assert!(result.timed_out);
        assert_eq!(result.stdout, "partial\n");
        assert!(result.stderr.contains("timed out after"));
    }

    #[test]
    fn spawn_failure_becomes_minus_one() {
        let spec = RunSpec::new("definitely-not-a-real-program-vanilla");
        let result = RunExecutor::execute(&spec);
        assert_eq!(result.exit_code, -1);
        assert!(result.stdout.is_empty());
        assert!(result.stderr.contains("failed to spawn"));
    }

    #[test]
    fn display_line_joins_arguments() {
        let spec = RunSpec::new("gcc").with_args(["main.c", "-o", "main.out"]);
        assert_eq!(spec.display_line(), "gcc main.c -o main.out");
    }
}
