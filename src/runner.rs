use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::fd::FromRawFd;
use std::os::unix::process::{CommandExt, ExitStatusExt};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use chrono::Local;
use serde::Serialize;
use tracing::{debug, error, warn};

/// Sentinel exit status reported when a command is killed by the timeout.
pub const TIMEOUT_EXIT: i32 = -1;
/// Sentinel exit status for launch failures and mid-run I/O breakage.
pub const FAILURE_EXIT: i32 = -2;

const CHUNK_SIZE: usize = 8192;
const POLL_INTERVAL: Duration = Duration::from_millis(25);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TerminationReason {
    /// The child exited on its own; the exit code is reported verbatim.
    Completed,
    /// The caller-supplied bound elapsed and the process group was killed.
    TimedOut,
    /// The process could not be started (missing binary, permissions, ...).
    LaunchFailed,
    /// Stream or sink I/O broke after launch.
    IoFailure,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct RunResult {
    pub exit_status: i32,
    pub reason: TerminationReason,
}

impl RunResult {
    fn completed(exit_status: i32) -> Self {
        Self {
            exit_status,
            reason: TerminationReason::Completed,
        }
    }

    fn timed_out() -> Self {
        Self {
            exit_status: TIMEOUT_EXIT,
            reason: TerminationReason::TimedOut,
        }
    }

    fn launch_failed() -> Self {
        Self {
            exit_status: FAILURE_EXIT,
            reason: TerminationReason::LaunchFailed,
        }
    }

    fn io_failure() -> Self {
        Self {
            exit_status: FAILURE_EXIT,
            reason: TerminationReason::IoFailure,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.reason == TerminationReason::Completed
    }
}

/// The dual destination for a stage's output: the report file plus the live
/// console. The file handle is held for the whole stage and closed on every
/// exit path when the sink is dropped.
pub struct ReportSink {
    file: File,
}

impl ReportSink {
    pub fn append(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self { file })
    }

    fn header(&mut self, argv: &[String]) -> io::Result<()> {
        write!(
            self.file,
            "\n\n== Command: {} ==\nStarted: {}\n",
            argv.join(" "),
            Local::now().to_rfc3339()
        )
    }

    fn chunk(&mut self, bytes: &[u8]) -> io::Result<()> {
        let mut console = io::stdout().lock();
        console.write_all(bytes)?;
        console.flush()?;
        self.file.write_all(bytes)
    }

    fn footer(&mut self, exit_status: i32) -> io::Result<()> {
        write!(
            self.file,
            "\nReturn code: {}\nFinished: {}\n",
            exit_status,
            Local::now().to_rfc3339()
        )
    }

    fn notice(&mut self, message: &str) -> io::Result<()> {
        writeln!(self.file, "\n{message}")?;
        self.file.flush()
    }
}

/// Launch `argv` with stdout and stderr merged into one stream, tee every
/// chunk to the console and to the report file, and wait for termination
/// within `timeout` (`None` means unbounded).
///
/// All failure paths fold into the returned [`RunResult`]; this never
/// propagates an error. A nonzero child exit is `Completed` with the child's
/// own code; interpreting it is the caller's business.
pub fn run(argv: &[String], report: &Path, timeout: Option<Duration>) -> RunResult {
    let mut sink = match ReportSink::append(report) {
        Ok(sink) => sink,
        Err(err) => {
            error!(report = %report.display(), "Failed to open report sink: {err}");
            return RunResult::io_failure();
        }
    };

    if argv.is_empty() {
        let _ = sink.notice("[!] ERROR launching command: empty command line");
        return RunResult::launch_failed();
    }

    if let Err(err) = sink.header(argv) {
        error!(report = %report.display(), "Failed to write report header: {err}");
        return RunResult::io_failure();
    }

    let (reader, child_out, child_err) = match merged_pipe() {
        Ok(parts) => parts,
        Err(err) => {
            let _ = sink.notice(&format!("[!] EXEC ERROR: {err}"));
            error!("Failed to create output pipe: {err}");
            return RunResult::io_failure();
        }
    };

    // The block scope drops the Command, closing the parent's copies of the
    // pipe write ends so the reader sees EOF when the child exits.
    let spawned = {
        let mut command = Command::new(&argv[0]);
        command
            .args(&argv[1..])
            .stdin(Stdio::null())
            .stdout(child_out)
            .stderr(child_err);
        unsafe {
            // New process group so a timeout can kill the tool and any
            // subprocesses it forked with one signal.
            command.pre_exec(|| match libc::setpgid(0, 0) {
                0 => Ok(()),
                _ => Err(io::Error::last_os_error()),
            });
        }
        command.spawn()
    };

    let mut child = match spawned {
        Ok(child) => child,
        Err(err) => {
            let _ = sink.notice(&format!("[!] ERROR launching command: {err}"));
            error!(program = %argv[0], "Failed to launch command: {err}");
            return RunResult::launch_failed();
        }
    };

    match stream_output(&mut child, reader, &mut sink, timeout) {
        Ok(StreamEnd::Completed(exit_status)) => {
            if let Err(err) = sink.footer(exit_status) {
                error!(report = %report.display(), "Failed to write report footer: {err}");
                return RunResult::io_failure();
            }
            debug!(exit_status, "Command completed");
            RunResult::completed(exit_status)
        }
        Ok(StreamEnd::TimedOut) => {
            let _ = sink.notice("[!] TIMEOUT - command killed by runner");
            warn!(program = %argv[0], "Command timed out and was killed");
            RunResult::timed_out()
        }
        Err(err) => {
            kill_process_group(&mut child);
            let _ = sink.notice(&format!("[!] EXEC ERROR: {err}"));
            error!(program = %argv[0], "I/O failure while streaming output: {err}");
            RunResult::io_failure()
        }
    }
}

enum StreamEnd {
    Completed(i32),
    TimedOut,
}

/// Single-threaded tee loop: non-blocking chunk reads from the merged pipe,
/// with liveness and deadline polls whenever the pipe is dry. Chunk reads,
/// not line reads, so a tool emitting a long unterminated line never stalls
/// the stream.
fn stream_output(
    child: &mut Child,
    mut reader: File,
    sink: &mut ReportSink,
    timeout: Option<Duration>,
) -> io::Result<StreamEnd> {
    let started = Instant::now();
    let mut buf = [0u8; CHUNK_SIZE];
    let mut exit_status: Option<ExitStatus> = None;

    loop {
        match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(read) => sink.chunk(&buf[..read])?,
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                if expired(started, timeout) {
                    kill_process_group(child);
                    drain(&mut reader, sink);
                    return Ok(StreamEnd::TimedOut);
                }
                if exit_status.is_none() {
                    exit_status = child.try_wait()?;
                }
                if exit_status.is_some() {
                    // Child is gone. Bytes written between the failed read
                    // and the liveness check are still in the pipe buffer,
                    // so sweep it once more. A grandchild may hold the write
                    // end open, so don't insist on EOF.
                    drain(&mut reader, sink);
                    break;
                }
                thread::sleep(POLL_INTERVAL);
            }
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => return Err(err),
        }
        if expired(started, timeout) {
            kill_process_group(child);
            drain(&mut reader, sink);
            return Ok(StreamEnd::TimedOut);
        }
    }

    loop {
        if let Some(status) = exit_status {
            return Ok(StreamEnd::Completed(exit_code(status)));
        }
        exit_status = child.try_wait()?;
        if exit_status.is_none() {
            if expired(started, timeout) {
                kill_process_group(child);
                return Ok(StreamEnd::TimedOut);
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

fn expired(started: Instant, timeout: Option<Duration>) -> bool {
    timeout.is_some_and(|limit| started.elapsed() >= limit)
}

/// Best-effort read of whatever the child wrote before it was killed, so no
/// pre-kill output is lost from the report.
fn drain(reader: &mut File, sink: &mut ReportSink) {
    let mut buf = [0u8; CHUNK_SIZE];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(read) => {
                if sink.chunk(&buf[..read]).is_err() {
                    break;
                }
            }
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(_) => break,
        }
    }
}

fn exit_code(status: ExitStatus) -> i32 {
    status
        .code()
        .or_else(|| status.signal().map(|signal| -signal))
        .unwrap_or(FAILURE_EXIT)
}

fn kill_process_group(child: &mut Child) {
    let pgid = child.id() as libc::pid_t;
    unsafe {
        libc::kill(-pgid, libc::SIGKILL);
    }
    // Reap the direct child so it does not linger as a zombie.
    let _ = child.wait();
}

/// One OS pipe whose write end is handed to the child twice (stdout and
/// stderr), so interleaving between the two streams is preserved exactly as
/// the kernel ordered it. The read end is non-blocking for the poll loop.
fn merged_pipe() -> io::Result<(File, Stdio, Stdio)> {
    let mut fds = [0 as libc::c_int; 2];
    if unsafe { libc::pipe(fds.as_mut_ptr()) } != 0 {
        return Err(io::Error::last_os_error());
    }
    let [read_fd, write_fd] = fds;

    let dup_fd = unsafe { libc::dup(write_fd) };
    if dup_fd < 0 {
        let err = io::Error::last_os_error();
        unsafe {
            libc::close(read_fd);
            libc::close(write_fd);
        }
        return Err(err);
    }

    if let Err(err) = set_nonblocking(read_fd) {
        unsafe {
            libc::close(read_fd);
            libc::close(write_fd);
            libc::close(dup_fd);
        }
        return Err(err);
    }

    let reader = unsafe { File::from_raw_fd(read_fd) };
    let child_out = unsafe { Stdio::from_raw_fd(write_fd) };
    let child_err = unsafe { Stdio::from_raw_fd(dup_fd) };
    Ok((reader, child_out, child_err))
}

fn set_nonblocking(fd: libc::c_int) -> io::Result<()> {
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
    if flags < 0 {
        return Err(io::Error::last_os_error());
    }
    if unsafe { libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) } < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}
