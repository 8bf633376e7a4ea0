//! Child process execution.
//!
//! Every call runs on a shared multi-threaded tokio runtime but blocks the
//! calling thread until the child exits and its output is drained, or the
//! timeout fires. Do not call [`run`] from inside an async task; wrap it in
//! `spawn_blocking` instead.

use crate::config::PromptDelivery;
use crate::error::ExecError;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::OnceLock;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::time::Instant;

/// Hard cap per captured stream.
const MAX_OUTPUT_BYTES: usize = 64 * 1024 * 1024;

const PROMPT_FILE_PREFIX: &str = "levitate-llm-prompt-";

fn runtime() -> Result<&'static tokio::runtime::Runtime, ExecError> {
    static RT: OnceLock<std::io::Result<tokio::runtime::Runtime>> = OnceLock::new();
    RT.get_or_init(|| {
        tokio::runtime::Builder::new_multi_thread()
            .thread_name("levitate-llm-runner")
            .enable_time()
            .enable_io()
            .build()
    })
    .as_ref()
    .map_err(|e| ExecError::Runtime(e.to_string()))
}

/// Everything needed to launch one child, minus the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub delivery: PromptDelivery,
    /// `None` inherits the caller's working directory.
    pub cwd: Option<PathBuf>,
    pub timeout_secs: u64,
    /// Where prompt files are staged; `None` means the platform temp dir.
    pub temp_dir: Option<PathBuf>,
}

impl Invocation {
    /// Program and arguments, for diagnostics.
    pub fn display(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().cloned());
        if self.delivery == PromptDelivery::TempFileArgument {
            parts.push("<prompt>".to_owned());
        }
        parts.join(" ")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// Run `invocation`, delivering `prompt` the way it asks for.
///
/// A non-zero exit is not an error here; callers inspect `exit_code`.
pub fn run(invocation: &Invocation, prompt: &str) -> Result<ProcessOutput, ExecError> {
    let rt = runtime()?;
    match invocation.delivery {
        PromptDelivery::Stdin => rt.block_on(spawn_and_wait(
            invocation,
            &invocation.args,
            Some(prompt.as_bytes().to_vec()),
        )),
        PromptDelivery::TempFileArgument => {
            // The file is removed when `staged` drops, on every path out of this arm.
            let staged = stage_prompt_file(invocation.temp_dir.as_deref(), prompt)?;
            let content = std::fs::read_to_string(staged.path()).map_err(|source| {
                ExecError::PromptFile {
                    dir: temp_dir_or_default(invocation.temp_dir.as_deref()),
                    source,
                }
            })?;
            let mut args = invocation.args.clone();
            args.push(content);
            let result = rt.block_on(spawn_and_wait(invocation, &args, None));
            drop(staged);
            result
        }
    }
}

fn temp_dir_or_default(dir: Option<&Path>) -> PathBuf {
    dir.map(Path::to_path_buf).unwrap_or_else(std::env::temp_dir)
}

fn stage_prompt_file(dir: Option<&Path>, prompt: &str) -> Result<tempfile::NamedTempFile, ExecError> {
    use std::io::Write;

    let dir = temp_dir_or_default(dir);
    let prompt_file_err = |source| ExecError::PromptFile {
        dir: dir.clone(),
        source,
    };

    let mut file = tempfile::Builder::new()
        .prefix(PROMPT_FILE_PREFIX)
        .suffix(".txt")
        .tempfile_in(&dir)
        .map_err(prompt_file_err)?;
    file.write_all(prompt.as_bytes()).map_err(prompt_file_err)?;
    file.flush().map_err(prompt_file_err)?;
    Ok(file)
}

async fn read_limited<R: AsyncRead + Unpin>(mut reader: R, limit: usize) -> Result<Vec<u8>, ExecError> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 8192];
    loop {
        let n = reader.read(&mut chunk).await.map_err(ExecError::Output)?;
        if n == 0 {
            break;
        }
        if buf.len().saturating_add(n) > limit {
            return Err(ExecError::OutputTooLarge { limit });
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    Ok(buf)
}

async fn spawn_and_wait(
    invocation: &Invocation,
    args: &[String],
    stdin_bytes: Option<Vec<u8>>,
) -> Result<ProcessOutput, ExecError> {
    let mut cmd = tokio::process::Command::new(&invocation.program);
    cmd.args(args);
    if let Some(cwd) = &invocation.cwd {
        cmd.current_dir(cwd);
    }
    cmd.stdin(if stdin_bytes.is_some() {
        Stdio::piped()
    } else {
        Stdio::null()
    });
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    cmd.kill_on_drop(true);
    // Own process group, so a timeout also takes down anything the CLI spawned.
    #[cfg(unix)]
    cmd.process_group(0);

    tracing::debug!(
        command = %invocation.display(),
        cwd = ?invocation.cwd,
        timeout_secs = invocation.timeout_secs,
        "spawning provider subprocess"
    );

    let mut child = cmd.spawn().map_err(|source| ExecError::Spawn {
        program: invocation.program.display().to_string(),
        source,
    })?;

    // Captured now; `Child::id` is gone once the child has been reaped.
    let pgid = child.id();

    let stdout = child
        .stdout
        .take()
        .ok_or(ExecError::Pipe("stdout"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or(ExecError::Pipe("stderr"))?;
    let mut stdout_task = tokio::spawn(read_limited(stdout, MAX_OUTPUT_BYTES));
    let mut stderr_task = tokio::spawn(read_limited(stderr, MAX_OUTPUT_BYTES));

    // One deadline for the whole call: a helper the CLI left running in the
    // background can hold the output pipes open after the child exits.
    let deadline = Instant::now() + Duration::from_secs(invocation.timeout_secs);

    let stdin = child.stdin.take();
    let waited = tokio::time::timeout_at(deadline, async {
        if let (Some(mut stdin), Some(bytes)) = (stdin, stdin_bytes) {
            write_stdin(&mut stdin, &bytes).await?;
        }
        let status = child.wait().await.map_err(ExecError::Wait)?;
        let stdout = (&mut stdout_task)
            .await
            .map_err(|e| ExecError::Join(e.to_string()))??;
        let stderr = (&mut stderr_task)
            .await
            .map_err(|e| ExecError::Join(e.to_string()))??;
        Ok::<_, ExecError>((status, stdout, stderr))
    })
    .await;

    let (status, stdout, stderr) = match waited {
        Ok(Ok(done)) => done,
        Ok(Err(e)) => {
            terminate(&mut child, pgid).await;
            stdout_task.abort();
            stderr_task.abort();
            return Err(e);
        }
        Err(_) => {
            terminate(&mut child, pgid).await;
            stdout_task.abort();
            stderr_task.abort();
            tracing::debug!(
                timeout_secs = invocation.timeout_secs,
                "provider subprocess timed out"
            );
            return Err(ExecError::Timeout(invocation.timeout_secs));
        }
    };

    Ok(ProcessOutput {
        exit_code: exit_code(&status),
        stdout: String::from_utf8_lossy(&stdout).into_owned(),
        stderr: String::from_utf8_lossy(&stderr).into_owned(),
    })
}

async fn write_stdin(stdin: &mut tokio::process::ChildStdin, bytes: &[u8]) -> Result<(), ExecError> {
    // A child that exits without draining stdin closes the pipe; its exit
    // status is the interesting part, not the broken pipe.
    match stdin.write_all(bytes).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => return Ok(()),
        Err(e) => return Err(ExecError::Stdin(e)),
    }
    // Explicit close to signal EOF.
    match stdin.shutdown().await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => Ok(()),
        Err(e) => Err(ExecError::Stdin(e)),
    }
}

/// Kill the child's process group, then the child itself, and reap it.
///
/// The group is signalled even when the child has already exited, since
/// anything it left behind is still in that group.
async fn terminate(child: &mut tokio::process::Child, pgid: Option<u32>) {
    #[cfg(unix)]
    {
        if let Some(pgid) = pgid {
            // SAFETY: killpg only sends a signal; the group was created for this child.
            unsafe {
                libc::killpg(pgid as libc::pid_t, libc::SIGKILL);
            }
        }
    }
    #[cfg(not(unix))]
    let _ = pgid;
    let _ = child.kill().await;
    let _ = child.wait().await;
}

fn exit_code(status: &std::process::ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return -signal;
        }
    }
    -1
}
