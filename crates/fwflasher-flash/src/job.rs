//! Flash jobs
//!
//! A [`FlashJob`] runs the external flashing tool once on its own thread.
//! The tool's stdout and stderr are connected to the write end of a single
//! pipe, so the job sees its output in exactly the order it was written.
//! Every line is appended to the job log and published as a
//! [`JobEvent::Line`]; the final verdict is published as
//! [`JobEvent::Finished`].
//!
//! Jobs cannot be cancelled. Dropping a [`JobHandle`] detaches the observer,
//! the tool keeps running to completion.

use std::ffi::OsString;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use fwflasher_core::{build_args, ChipTarget, FlashPlan, ToolCommand};

use crate::error::{Error, Result};
use crate::lines::LineSplitter;
use crate::subscribers::Subscribers;

/// Job identifier, unique within one orchestrator
pub type JobId = u64;

/// Exit code reported when the tool could not be launched at all
pub const LAUNCH_FAILURE_CODE: i32 = 1;

/// Job lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobState {
    /// Created, not started
    Idle,
    /// Tool is running
    Running,
    /// Tool exited with status 0
    Succeeded,
    /// Tool failed, was killed, or could not be launched
    Failed,
}

impl JobState {
    /// Check if the job has finished
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed)
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobState::Idle => "idle",
            JobState::Running => "running",
            JobState::Succeeded => "succeeded",
            JobState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Final verdict of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobOutcome {
    /// Job identifier
    pub id: JobId,
    /// Terminal state
    pub state: JobState,
    /// Tool exit code; `None` if the tool was killed by a signal
    pub exit_code: Option<i32>,
}

impl JobOutcome {
    /// Check if the job succeeded
    pub fn succeeded(&self) -> bool {
        self.state == JobState::Succeeded
    }
}

/// Event published by a running job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobEvent {
    /// One line of tool output
    Line(String),
    /// The job reached a terminal state; always the last event
    Finished(JobOutcome),
}

#[derive(Debug)]
struct JobRecord {
    state: JobState,
    exit_code: Option<i32>,
    log: Vec<String>,
}

struct JobShared {
    id: JobId,
    plan: FlashPlan,
    record: Mutex<JobRecord>,
    subscribers: Subscribers<JobEvent>,
}

impl JobShared {
    fn record(&self) -> MutexGuard<'_, JobRecord> {
        self.record.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push_line(&self, line: String) {
        log::trace!("[job {}] {}", self.id, line);
        self.record().log.push(line.clone());
        self.subscribers.publish(JobEvent::Line(line));
    }

    fn finish(&self, state: JobState, exit_code: Option<i32>) -> JobOutcome {
        let mut record = self.record();
        record.state = state;
        record.exit_code = exit_code;
        JobOutcome {
            id: self.id,
            state,
            exit_code,
        }
    }

    fn outcome(&self) -> JobOutcome {
        let record = self.record();
        JobOutcome {
            id: self.id,
            state: record.state,
            exit_code: record.exit_code,
        }
    }
}

/// A flash job that has not been started yet
pub struct FlashJob {
    shared: Arc<JobShared>,
    program: PathBuf,
    args: Vec<OsString>,
}

impl FlashJob {
    /// Prepare a job for a validated plan
    ///
    /// The tool's fixed leading arguments come first, followed by the
    /// generated `write_flash` invocation.
    pub fn new(
        id: JobId,
        plan: FlashPlan,
        tool: &ToolCommand,
        target: &ChipTarget,
    ) -> fwflasher_core::Result<Self> {
        let mut args: Vec<OsString> = tool.args.iter().map(OsString::from).collect();
        args.extend(build_args(&plan, target)?);

        Ok(Self {
            shared: Arc::new(JobShared {
                id,
                plan,
                record: Mutex::new(JobRecord {
                    state: JobState::Idle,
                    exit_code: None,
                    log: Vec::new(),
                }),
                subscribers: Subscribers::new(),
            }),
            program: tool.program.clone(),
            args,
        })
    }

    /// Job identifier
    pub fn id(&self) -> JobId {
        self.shared.id
    }

    /// Full command line, for display
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_os_str())
            .chain(self.args.iter().map(|a| a.as_os_str()))
            .map(|a| a.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Start the job on its own thread
    ///
    /// `on_terminal` runs on the job thread after the verdict is recorded
    /// and before [`JobEvent::Finished`] is published. If the thread cannot
    /// be spawned, `on_terminal` is dropped without being called.
    pub fn spawn<F>(self, on_terminal: F) -> Result<JobHandle>
    where
        F: FnOnce(&JobOutcome) + Send + 'static,
    {
        let shared = Arc::clone(&self.shared);
        let events = shared.subscribers.subscribe();
        let command_line = self.command_line();
        shared.record().state = JobState::Running;

        let id = shared.id;
        let thread_shared = Arc::clone(&shared);
        let FlashJob { program, args, .. } = self;

        let thread = thread::Builder::new()
            .name(format!("flash-job-{}", id))
            .spawn(move || {
                log::info!("Job {}: {}", id, command_line);
                let outcome = execute(&thread_shared, program, args);
                match outcome.exit_code {
                    Some(code) => log::info!("Job {} {} (exit code {})", id, outcome.state, code),
                    None => log::info!("Job {} {} (terminated by signal)", id, outcome.state),
                }
                on_terminal(&outcome);
                thread_shared.subscribers.publish(JobEvent::Finished(outcome));
            })
            .map_err(|source| {
                shared.finish(JobState::Failed, Some(LAUNCH_FAILURE_CODE));
                Error::Thread {
                    what: "flash job",
                    source,
                }
            })?;

        Ok(JobHandle {
            shared,
            thread: Some(thread),
            events,
        })
    }
}

fn execute(shared: &JobShared, program: PathBuf, args: Vec<OsString>) -> JobOutcome {
    match run_tool(&program, &args, |line| shared.push_line(line)) {
        Ok(status) if status.success() => shared.finish(JobState::Succeeded, status.code()),
        Ok(status) => shared.finish(JobState::Failed, status.code()),
        Err(e) => {
            log::error!("Failed to launch {}: {}", program.display(), e);
            shared.push_line(format!(
                "An error occurred while running {}: {}",
                program.display(),
                e
            ));
            shared.finish(JobState::Failed, Some(LAUNCH_FAILURE_CODE))
        }
    }
}

/// Run the tool to completion, feeding merged stdout/stderr lines to `emit`
fn run_tool(
    program: &Path,
    args: &[OsString],
    mut emit: impl FnMut(String),
) -> io::Result<ExitStatus> {
    let (mut reader, writer) = io::pipe()?;

    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(writer.try_clone()?)
        .stderr(writer);
    let mut child = cmd.spawn()?;
    // Close our copies of the write end, or the read below never sees EOF
    drop(cmd);

    let mut splitter = LineSplitter::new();
    let mut buf = [0u8; 4096];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => splitter.feed(&buf[..n], &mut emit),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                log::warn!("Reading tool output failed: {}", e);
                break;
            }
        }
    }
    splitter.finish(&mut emit);
    drop(reader);

    child.wait()
}

/// Observer of a started job
pub struct JobHandle {
    shared: Arc<JobShared>,
    thread: Option<JoinHandle<()>>,
    events: Receiver<JobEvent>,
}

impl JobHandle {
    /// Job identifier
    pub fn id(&self) -> JobId {
        self.shared.id
    }

    /// Current state
    pub fn state(&self) -> JobState {
        self.shared.record().state
    }

    /// Exit code, once terminal
    pub fn exit_code(&self) -> Option<i32> {
        self.shared.record().exit_code
    }

    /// Copy of the log so far
    pub fn log(&self) -> Vec<String> {
        self.shared.record().log.clone()
    }

    /// The plan this job is flashing
    pub fn plan(&self) -> &FlashPlan {
        &self.shared.plan
    }

    /// Events since the job was started
    ///
    /// The stream is complete: every line, then exactly one
    /// [`JobEvent::Finished`]. Stop reading after `Finished`; the channel
    /// stays open while the handle is alive.
    pub fn events(&self) -> &Receiver<JobEvent> {
        &self.events
    }

    /// Additional observer; sees only events published from now on
    pub fn subscribe(&self) -> Receiver<JobEvent> {
        self.shared.subscribers.subscribe()
    }

    /// Check if the job thread has exited
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Block until the job thread exits and return the verdict
    pub fn wait(mut self) -> JobOutcome {
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("Job {} thread panicked", self.shared.id);
                let outcome = self.shared.outcome();
                if !outcome.state.is_terminal() {
                    return self.shared.finish(JobState::Failed, None);
                }
            }
        }
        self.shared.outcome()
    }

    /// Stop observing; the job keeps running
    pub fn detach(mut self) {
        self.thread.take();
    }
}
