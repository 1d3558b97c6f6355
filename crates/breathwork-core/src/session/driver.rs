//! Async driver for a [`SessionRunner`].
//!
//! The driver owns the runner and turns its armed timer into a tokio
//! deadline. User commands arrive over a channel from [`SessionHandle`]s and
//! are applied between fires, so the runner is only ever touched from the
//! driver's task.

use tokio::sync::{mpsc, oneshot};
use tokio::time::{sleep_until, Instant};
use tracing::debug;

use super::runner::SessionRunner;
use super::state::{SessionPhase, SessionSummary};
use crate::error::SessionError;
use crate::events::SessionEvent;
use crate::routine::Routine;
use crate::timer::TimerToken;

const COMMAND_BUFFER: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    Pause,
    Resume,
    Skip,
    Exit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    Completed(SessionSummary),
    Exited,
}

struct CommandRequest {
    command: SessionCommand,
    reply: oneshot::Sender<Result<(), SessionError>>,
}

/// Cloneable remote control for a running driver.
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<CommandRequest>,
}

impl SessionHandle {
    /// Send a command and wait for the runner's verdict.
    pub async fn send(&self, command: SessionCommand) -> Result<(), SessionError> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(CommandRequest { command, reply })
            .await
            .map_err(|_| SessionError::DriverClosed)?;
        response.await.map_err(|_| SessionError::DriverClosed)?
    }

    pub async fn pause(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::Pause).await
    }

    pub async fn resume(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::Resume).await
    }

    pub async fn skip(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::Skip).await
    }

    pub async fn exit(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::Exit).await
    }
}

pub struct SessionDriver {
    runner: SessionRunner,
    commands: mpsc::Receiver<CommandRequest>,
    events: Option<mpsc::UnboundedSender<SessionEvent>>,
    /// Armed token and the instant it is due.
    deadline: Option<(TimerToken, Instant)>,
    outcome: Option<SessionOutcome>,
}

impl SessionDriver {
    pub fn new(runner: SessionRunner) -> (Self, SessionHandle) {
        let (tx, commands) = mpsc::channel(COMMAND_BUFFER);
        let driver = Self {
            runner,
            commands,
            events: None,
            deadline: None,
            outcome: None,
        };
        (driver, SessionHandle { tx })
    }

    /// Forward every event the runner produces to `events`.
    pub fn with_event_sink(mut self, events: mpsc::UnboundedSender<SessionEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Run `routine` to completion or exit.
    ///
    /// If every handle is dropped mid-session the session is exited.
    pub async fn run(mut self, routine: Routine) -> Result<SessionOutcome, SessionError> {
        let events = self.runner.start(routine)?;
        self.forward(events);
        self.sync_deadline(Instant::now());

        loop {
            if let Some(outcome) = self.outcome.take() {
                return Ok(outcome);
            }

            let due = self.deadline;
            let wake_at = due.map(|(_, at)| at).unwrap_or_else(Instant::now);
            tokio::select! {
                request = self.commands.recv() => match request {
                    Some(CommandRequest { command, reply }) => {
                        let result = self.apply(command);
                        // The caller may have stopped waiting.
                        let _ = reply.send(result);
                        self.sync_deadline(Instant::now());
                    }
                    None => {
                        debug!("All session handles dropped; exiting session");
                        self.apply_exit();
                    }
                },
                _ = sleep_until(wake_at), if due.is_some() => {
                    if let Some((token, at)) = due {
                        let events = self.runner.on_timer_fired(token);
                        self.forward(events);
                        // Next period counts from the scheduled instant, not from wake-up.
                        self.deadline = self
                            .runner
                            .armed_timer()
                            .map(|armed| (armed.token, at + armed.period));
                    }
                }
            }
        }
    }

    fn apply(&mut self, command: SessionCommand) -> Result<(), SessionError> {
        let events = match command {
            SessionCommand::Pause => self.runner.pause()?,
            SessionCommand::Resume => self.runner.resume()?,
            SessionCommand::Skip => self.runner.skip()?,
            SessionCommand::Exit => {
                self.apply_exit();
                return Ok(());
            }
        };
        self.forward(events);
        Ok(())
    }

    fn apply_exit(&mut self) {
        let events = self.runner.exit();
        self.forward(events);
        self.deadline = None;
        if self.outcome.is_none() && self.runner.phase() == SessionPhase::Idle {
            self.outcome = Some(SessionOutcome::Exited);
        }
    }

    /// Keep the current deadline for an unchanged timer, schedule a fresh one
    /// a full period from `now`, or clear it when nothing is armed.
    fn sync_deadline(&mut self, now: Instant) {
        self.deadline = match (self.runner.armed_timer(), self.deadline) {
            (None, _) => None,
            (Some(armed), Some((token, at))) if token == armed.token => Some((token, at)),
            (Some(armed), _) => Some((armed.token, now + armed.period)),
        };
    }

    fn forward(&mut self, events: Vec<SessionEvent>) {
        for event in events {
            if let SessionEvent::SessionCompleted { summary, .. } = &event {
                self.outcome = Some(SessionOutcome::Completed(summary.clone()));
            }
            if let Some(sink) = &self.events {
                // A closed sink only means nobody is listening any more.
                let _ = sink.send(event);
            }
        }
    }
}
