// ── Remote command executor ──
//
// The transport is not safe for concurrent use, so exactly one task owns
// it. Every caller (scheduler, control actions) sends a `CommandEnvelope`
// through an mpsc channel and awaits the oneshot reply; concurrent calls
// queue instead of racing. Cancellation is only observed between
// commands, so a command already on the wire always finishes or times out.
// The channel task writes the query log entry, so a call is logged even
// when its caller has gone away.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use routerscope_api::{ExecOutput, Transport};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::command::{CommandId, RemoteCommand, RetryPolicy};
use crate::error::{CollectError, ParseError, TransportFailure};
use crate::model::{CommandResult, Outcome};
use crate::store::QueryLog;

const COMMAND_CHANNEL_SIZE: usize = 64;

/// What goes into the query log for one call.
struct Verdict {
    outcome: Outcome,
    detail: Option<String>,
}

/// Answers the caller from the transport result and says how to log it.
type Responder = Box<dyn FnOnce(&CommandResult) -> Verdict + Send>;

/// A command envelope sent through the command channel.
struct CommandEnvelope {
    command: RemoteCommand,
    respond: Responder,
}

impl CommandEnvelope {
    fn complete(self, result: &CommandResult, log: &QueryLog) {
        let verdict = (self.respond)(result);
        record(log, result, verdict);
    }
}

/// Parsed output of one command, stamped with its completion time.
#[derive(Debug, Clone, PartialEq)]
pub struct Parsed<T> {
    pub value: T,
    pub timestamp: DateTime<Utc>,
}

/// Cheaply cloneable handle to the channel task.
#[derive(Clone)]
pub struct Executor {
    command_tx: mpsc::Sender<CommandEnvelope>,
    query_log: Arc<QueryLog>,
}

impl Executor {
    /// Hand `transport` (already connected) to a new channel task.
    ///
    /// The task closes the transport when `cancel` fires or every handle
    /// has been dropped.
    pub fn spawn<T: Transport>(
        transport: T,
        query_log: Arc<QueryLog>,
        cancel: CancellationToken,
    ) -> (Self, JoinHandle<()>) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);
        let handle = tokio::spawn(channel_task(
            transport,
            command_rx,
            Arc::clone(&query_log),
            cancel,
        ));
        (
            Self {
                command_tx,
                query_log,
            },
            handle,
        )
    }

    pub fn query_log(&self) -> &Arc<QueryLog> {
        &self.query_log
    }

    /// Run `command` and log the outcome. Never fails: transport problems
    /// come back inside the result.
    pub async fn execute(&self, command: &RemoteCommand) -> CommandResult {
        let answer = self
            .submit(command, |result: &CommandResult| {
                (result.clone(), plain_verdict(result))
            })
            .await;
        match answer {
            Some(result) => result,
            None => self.lost(command.id),
        }
    }

    /// Run `command` and feed its stdout to `parser`. Logs exactly one
    /// entry, whose outcome reflects the parse as well as the transport.
    pub async fn execute_parsed<T, F>(
        &self,
        command: &RemoteCommand,
        parser: F,
    ) -> Result<Parsed<T>, CollectError>
    where
        T: Send + 'static,
        F: FnOnce(&str) -> Result<T, ParseError> + Send + 'static,
    {
        let answer = self
            .submit(command, move |result: &CommandResult| interpret(result, parser))
            .await;
        match answer {
            Some(parsed) => parsed,
            None => {
                self.lost(command.id);
                Err(CollectError::Transport(TransportFailure::Stopped))
            }
        }
    }

    /// Queue `command` and wait for the answer `respond` derives from its
    /// result. `None` only if the channel task dropped the envelope
    /// without answering.
    async fn submit<R, F>(&self, command: &RemoteCommand, respond: F) -> Option<R>
    where
        R: Send + 'static,
        F: FnOnce(&CommandResult) -> (R, Verdict) + Send + 'static,
    {
        let submitted = Utc::now();
        let started = Instant::now();
        let (response_tx, response_rx) = oneshot::channel();
        let envelope = CommandEnvelope {
            command: command.clone(),
            respond: Box::new(move |result: &CommandResult| {
                let (answer, verdict) = respond(result);
                let _ = response_tx.send(answer);
                verdict
            }),
        };

        if let Err(mpsc::error::SendError(envelope)) = self.command_tx.send(envelope).await {
            let result = CommandResult::transport_failure(
                command.id,
                TransportFailure::Stopped,
                started.elapsed(),
                submitted,
            );
            envelope.complete(&result, &self.query_log);
        }
        response_rx.await.ok()
    }

    fn lost(&self, id: CommandId) -> CommandResult {
        let result =
            CommandResult::transport_failure(id, TransportFailure::Stopped, Duration::ZERO, Utc::now());
        record(&self.query_log, &result, plain_verdict(&result));
        result
    }
}

fn record(log: &QueryLog, result: &CommandResult, verdict: Verdict) {
    let duration_ms = u64::try_from(result.duration.as_millis()).unwrap_or(u64::MAX);
    log.append(
        result.command,
        result.timestamp,
        duration_ms,
        verdict.outcome,
        verdict.detail,
        result.output.len(),
    );
}

fn plain_verdict(result: &CommandResult) -> Verdict {
    let outcome = result.outcome();
    let detail = match outcome {
        Outcome::Success => None,
        Outcome::TransportError => result.transport_error.as_ref().map(ToString::to_string),
        _ => Some(failure_detail(result)),
    };
    Verdict { outcome, detail }
}

fn interpret<T, F>(result: &CommandResult, parser: F) -> (Result<Parsed<T>, CollectError>, Verdict)
where
    F: FnOnce(&str) -> Result<T, ParseError>,
{
    if let Some(ref failure) = result.transport_error {
        let verdict = Verdict {
            outcome: Outcome::TransportError,
            detail: Some(failure.to_string()),
        };
        return (Err(CollectError::Transport(failure.clone())), verdict);
    }
    if !result.success {
        let verdict = Verdict {
            outcome: Outcome::CommandFailed,
            detail: Some(failure_detail(result)),
        };
        let err = CollectError::CommandFailed {
            status: result.exit_status,
            stderr: result.stderr.trim().to_owned(),
        };
        return (Err(err), verdict);
    }

    match parser(&result.output) {
        Ok(value) => {
            let parsed = Parsed {
                value,
                timestamp: result.timestamp,
            };
            let verdict = Verdict {
                outcome: Outcome::Success,
                detail: None,
            };
            (Ok(parsed), verdict)
        }
        Err(e) => {
            warn!(command = %e.command, raw_len = e.raw_len, reason = %e.reason, "parse failed");
            let verdict = Verdict {
                outcome: Outcome::ParseError,
                detail: Some(e.reason.clone()),
            };
            (Err(CollectError::Parse(e)), verdict)
        }
    }
}

fn failure_detail(result: &CommandResult) -> String {
    let status = result
        .exit_status
        .map_or_else(|| "signal".to_owned(), |s| s.to_string());
    let stderr = result.stderr.trim();
    if stderr.is_empty() {
        format!("exit status {status}")
    } else {
        format!("exit status {status}: {stderr}")
    }
}

// ── Channel task ─────────────────────────────────────────────────────

async fn channel_task<T: Transport>(
    mut transport: T,
    mut rx: mpsc::Receiver<CommandEnvelope>,
    query_log: Arc<QueryLog>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            envelope = rx.recv() => {
                let Some(envelope) = envelope else { break };
                let result = run_command(&mut transport, &envelope.command).await;
                envelope.complete(&result, &query_log);
            }
        }
    }

    // Calls still queued never reach the wire but are answered and logged.
    rx.close();
    while let Ok(envelope) = rx.try_recv() {
        let result = CommandResult::transport_failure(
            envelope.command.id,
            TransportFailure::Stopped,
            Duration::ZERO,
            Utc::now(),
        );
        envelope.complete(&result, &query_log);
    }

    transport.close().await;
    debug!(peer = transport.peer(), "executor stopped, channel released");
}

async fn run_command<T: Transport>(transport: &mut T, command: &RemoteCommand) -> CommandResult {
    let timestamp = Utc::now();
    let started = Instant::now();

    let mut attempt = exec_with_timeout(transport, command).await;

    let retry = command.retry == RetryPolicy::ReconnectOnce
        && matches!(&attempt, Err(e) if e.is_channel_failure());
    if retry {
        debug!(command = %command.id, peer = transport.peer(), "channel failed, reconnecting once");
        attempt = match tokio::time::timeout(command.timeout, transport.reconnect()).await {
            Ok(Ok(())) => exec_with_timeout(transport, command).await,
            Ok(Err(e)) => Err(e),
            Err(_) => Err(timeout_error(command)),
        };
    }

    let duration = started.elapsed();
    match attempt {
        Ok(ExecOutput {
            status,
            stdout,
            stderr,
        }) => {
            debug!(
                command = %command.id,
                elapsed = ?duration,
                status = ?status,
                "command finished"
            );
            CommandResult {
                command: command.id,
                success: status == Some(0),
                output: stdout,
                stderr,
                exit_status: status,
                duration,
                timestamp,
                transport_error: None,
            }
        }
        Err(e) => {
            debug!(command = %command.id, error = %e, "command transport failure");
            CommandResult::transport_failure(command.id, e.into(), duration, timestamp)
        }
    }
}

async fn exec_with_timeout<T: Transport>(
    transport: &mut T,
    command: &RemoteCommand,
) -> Result<ExecOutput, routerscope_api::Error> {
    match tokio::time::timeout(command.timeout, transport.exec(&command.text)).await {
        Ok(result) => result,
        Err(_) => Err(timeout_error(command)),
    }
}

fn timeout_error(command: &RemoteCommand) -> routerscope_api::Error {
    routerscope_api::Error::Timeout {
        timeout_ms: u64::try_from(command.timeout.as_millis()).unwrap_or(u64::MAX),
    }
}
