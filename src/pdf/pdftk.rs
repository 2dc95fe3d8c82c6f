//! pdftk process adapter
//!
//! This module drives the pdftk command-line toolkit. Every invocation runs
//! inside a caller-supplied working directory and is bounded by a hard
//! wall-clock timeout; a child that outlives its budget is killed and reaped.

use crate::error::{Error, Result};
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

/// Time budget for document-level pdftk operations
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

const VERSION_CHECK_TIMEOUT: Duration = Duration::from_secs(10);

/// How to find and bound the pdftk executable
#[derive(Debug, Clone)]
pub struct PdftkConfig {
    /// Executable name or path (default: `pdftk`, resolved through PATH)
    pub binary: PathBuf,
    /// Wall-clock budget per invocation (default: 120s)
    pub timeout: Duration,
}

impl Default for PdftkConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("pdftk"),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// pdftk operation modes used by this crate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PdftkMode {
    /// `dump_data_fields_utf8`: flat per-field attribute records
    DumpDataFields,
    /// `generate_fdf`: bracket-nested field hierarchy
    GenerateFdf,
    /// `fill_form <fdf>`: apply field values from an FDF file
    FillForm { fdf: PathBuf },
}

impl PdftkMode {
    /// Operation keyword as pdftk spells it
    pub fn keyword(&self) -> &'static str {
        match self {
            PdftkMode::DumpDataFields => "dump_data_fields_utf8",
            PdftkMode::GenerateFdf => "generate_fdf",
            PdftkMode::FillForm { .. } => "fill_form",
        }
    }

    fn args(&self) -> Vec<OsString> {
        let mut args = vec![OsString::from(self.keyword())];
        if let PdftkMode::FillForm { fdf } = self {
            args.push(fdf.clone().into_os_string());
        }
        args
    }
}

/// Handle on the pdftk executable
#[derive(Debug, Clone)]
pub struct Pdftk {
    config: PdftkConfig,
}

impl Pdftk {
    pub fn new(config: PdftkConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PdftkConfig {
        &self.config
    }

    /// Run `pdftk <pdf> <mode...> output <output>` inside `work_dir`.
    ///
    /// Both paths should be absolute; the child's working directory is the
    /// private workspace, not the caller's.
    pub async fn run(
        &self,
        work_dir: &Path,
        pdf: &Path,
        mode: &PdftkMode,
        output: &Path,
    ) -> Result<Vec<u8>> {
        let mut args: Vec<OsString> = Vec::with_capacity(5);
        args.push(pdf.as_os_str().to_os_string());
        args.extend(mode.args());
        args.push(OsString::from("output"));
        args.push(output.as_os_str().to_os_string());

        tracing::debug!(
            mode = mode.keyword(),
            pdf = %pdf.display(),
            output = %output.display(),
            "running pdftk"
        );

        run_command(&self.config.binary, work_dir, &args, self.config.timeout).await
    }

    /// Readiness check: confirm the executable starts and report its version.
    pub async fn check_installed(&self) -> Result<String> {
        let work_dir = std::env::temp_dir();
        let stdout = run_command(
            &self.config.binary,
            &work_dir,
            &["--version"],
            VERSION_CHECK_TIMEOUT,
        )
        .await
        .map_err(|e| Error::ToolNotInstalled {
            tool: self.config.binary.display().to_string(),
            reason: e.to_string(),
        })?;

        let text = String::from_utf8_lossy(&stdout);
        Ok(text
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .unwrap_or("unknown version")
            .to_string())
    }
}

/// Run an external program in `work_dir`, returning its standard output.
///
/// Process completion and the timer race; whichever finishes first wins. On
/// unix the child leads its own process group. On timeout the whole group is
/// killed before `Error::Timeout` is returned, so a wrapper script and the
/// toolkit it started both go. Completion means stdout and stderr reached EOF
/// and the child exited: a wrapper that exits while a background process
/// still holds its output runs into the timeout. A non-zero exit becomes
/// `Error::ToolExecutionFailed` carrying the exit status and stderr.
pub async fn run_command<P, S>(
    program: P,
    work_dir: &Path,
    args: &[S],
    timeout: Duration,
) -> Result<Vec<u8>>
where
    P: AsRef<OsStr>,
    S: AsRef<OsStr>,
{
    let program = program.as_ref();
    let tool = Path::new(program)
        .file_name()
        .unwrap_or(program)
        .to_string_lossy()
        .to_string();
    let started = Instant::now();

    let mut command = Command::new(program);
    command
        .args(args)
        .current_dir(work_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    // own process group, so a timeout also reaches anything a wrapper started
    #[cfg(unix)]
    // SAFETY: setpgid is async-signal-safe and touches no parent state
    unsafe {
        command.pre_exec(|| {
            if libc::setpgid(0, 0) == 0 {
                Ok(())
            } else {
                Err(std::io::Error::last_os_error())
            }
        });
    }

    let mut child = command
        .spawn()
        .map_err(|e| Error::ToolExecutionFailed {
            tool: tool.clone(),
            reason: format!("failed to start: {}", e),
        })?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let completed = tokio::time::timeout(timeout, async {
        let (out, err, status) =
            tokio::join!(read_pipe(stdout), read_pipe(stderr), child.wait());
        Ok::<_, std::io::Error>((out?, err?, status?))
    })
    .await;

    let (stdout, stderr, status) = match completed {
        Ok(result) => result.map_err(|e| Error::ToolExecutionFailed {
            tool: tool.clone(),
            reason: e.to_string(),
        })?,
        Err(_) => {
            #[cfg(unix)]
            if let Some(pid) = child.id() {
                kill_process_group(pid);
            }
            if let Err(e) = child.kill().await {
                tracing::warn!(tool = %tool, error = %e, "failed to kill timed out process");
            }
            tracing::warn!(
                tool = %tool,
                timeout_secs = timeout.as_secs(),
                "process timed out and was killed"
            );
            return Err(Error::Timeout {
                tool,
                seconds: timeout.as_secs(),
            });
        }
    };

    tracing::debug!(
        tool = %tool,
        status = %status,
        elapsed_ms = started.elapsed().as_millis() as u64,
        stdout_bytes = stdout.len(),
        "process finished"
    );

    if !status.success() {
        let stderr = String::from_utf8_lossy(&stderr);
        return Err(Error::ToolExecutionFailed {
            tool,
            reason: format!("{}: {}", status, stderr.trim()),
        });
    }

    Ok(stdout)
}

#[cfg(unix)]
fn kill_process_group(pid: u32) {
    // SAFETY: plain syscall; a negative pid addresses the group the child leads
    let rc = unsafe { libc::kill(-(pid as libc::pid_t), libc::SIGKILL) };
    if rc != 0 {
        tracing::debug!(
            pid,
            error = %std::io::Error::last_os_error(),
            "failed to signal process group"
        );
    }
}

async fn read_pipe<R: AsyncRead + Unpin>(pipe: Option<R>) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        pipe.read_to_end(&mut buf).await?;
    }
    Ok(buf)
}
