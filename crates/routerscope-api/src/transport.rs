// Transport abstraction.
//
// The core never spawns processes itself; it drives a `Transport`. The SSH
// session is the production implementation, tests plug in scripted ones.

use std::future::Future;

use crate::error::Error;

/// Captured result of one remote command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOutput {
    /// Remote exit status (`None` if the process was killed by a signal).
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    /// A successful run with the given stdout.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            status: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

/// A stateful, *non-reentrant* channel to the remote device.
///
/// All methods take `&mut self`: the owner must serialize access. Timeouts
/// are the caller's concern; implementations should make dropped futures
/// clean up after themselves (e.g. kill the child process).
pub trait Transport: Send + 'static {
    /// Establish the channel. Idempotent when already connected.
    fn connect(&mut self) -> impl Future<Output = Result<(), Error>> + Send;

    /// Run one shell command on the device.
    fn exec(&mut self, command: &str) -> impl Future<Output = Result<ExecOutput, Error>> + Send;

    /// Tear the channel down and establish it again.
    fn reconnect(&mut self) -> impl Future<Output = Result<(), Error>> + Send;

    /// Release the channel. Must be safe to call more than once.
    fn close(&mut self) -> impl Future<Output = ()> + Send;

    /// Human-readable peer description for logs.
    fn peer(&self) -> &str;
}
