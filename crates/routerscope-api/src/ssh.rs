// ── OpenSSH session ──
//
// Wraps the system `ssh` client. `connect` starts a background master
// (`-M -N -f`) bound to a private ControlPath; every `exec` is a client
// process that multiplexes over that socket. `close` asks the master to
// exit. Nothing here ever prompts: BatchMode is always on.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::Error;
use crate::transport::{ExecOutput, Transport};

/// Exit status the `ssh` client uses for its own failures.
const SSH_CLIENT_FAILURE: i32 = 255;

/// Connection parameters for one router.
#[derive(Debug, Clone)]
pub struct SshConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub identity_file: Option<PathBuf>,
    pub connect_timeout: Duration,
    /// Directory holding the ControlMaster socket. Defaults to the system
    /// temp dir.
    pub control_dir: PathBuf,
}

impl SshConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 22,
            user: "root".into(),
            identity_file: None,
            connect_timeout: Duration::from_secs(5),
            control_dir: std::env::temp_dir(),
        }
    }

    /// `user@host` as passed to `ssh`.
    pub fn destination(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }

    fn control_path(&self) -> PathBuf {
        // %C is expanded by ssh to a hash of (local host, remote host, port, user),
        // which keeps the socket path short enough for sun_path.
        self.control_dir.join("routerscope-%C")
    }

    /// Options shared by the master and every client invocation.
    fn common_args(&self) -> Vec<String> {
        let mut args = vec![
            "-o".into(),
            "BatchMode=yes".into(),
            "-o".into(),
            format!("ConnectTimeout={}", self.connect_timeout.as_secs().max(1)),
            "-o".into(),
            format!("ControlPath={}", self.control_path().display()),
            "-p".into(),
            self.port.to_string(),
        ];
        if let Some(ref identity) = self.identity_file {
            args.push("-i".into());
            args.push(identity.display().to_string());
        }
        args
    }

    pub(crate) fn master_args(&self) -> Vec<String> {
        let mut args = vec![
            "-M".into(),
            "-N".into(),
            "-f".into(),
            "-o".into(),
            "ControlPersist=yes".into(),
            "-o".into(),
            "ServerAliveInterval=15".into(),
        ];
        args.extend(self.common_args());
        args.push(self.destination());
        args
    }

    pub(crate) fn exec_args(&self, command: &str) -> Vec<String> {
        let mut args = vec!["-o".into(), "ControlMaster=no".into()];
        args.extend(self.common_args());
        args.push(self.destination());
        args.push("--".into());
        args.push(command.to_owned());
        args
    }

    pub(crate) fn exit_args(&self) -> Vec<String> {
        let mut args = vec!["-O".into(), "exit".into()];
        args.extend(self.common_args());
        args.push(self.destination());
        args
    }
}

/// A multiplexed SSH session to one router.
///
/// Not reentrant: the executor owns it exclusively and feeds it one command
/// at a time.
#[derive(Debug)]
pub struct SshSession {
    config: SshConfig,
    peer: String,
    connected: bool,
}

impl SshSession {
    pub fn new(config: SshConfig) -> Self {
        let peer = format!("{}:{}", config.host, config.port);
        Self {
            config,
            peer,
            connected: false,
        }
    }

    pub fn config(&self) -> &SshConfig {
        &self.config
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    async fn run(args: &[String]) -> Result<std::process::Output, Error> {
        let output = Command::new("ssh")
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await?;
        Ok(output)
    }

    async fn start_master(&mut self) -> Result<(), Error> {
        ensure_dir(&self.config.control_dir)?;
        let output = Self::run(&self.config.master_args()).await?;
        if output.status.success() {
            info!(peer = %self.peer, "ssh master connection established");
            self.connected = true;
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(Error::from_client_stderr(&self.config.host, &stderr))
        }
    }

    async fn stop_master(&mut self) {
        if !self.connected {
            return;
        }
        self.connected = false;
        match Self::run(&self.config.exit_args()).await {
            Ok(out) if out.status.success() => debug!(peer = %self.peer, "ssh master closed"),
            Ok(out) => debug!(
                peer = %self.peer,
                stderr = %String::from_utf8_lossy(&out.stderr).trim(),
                "ssh master exit request rejected"
            ),
            Err(e) => warn!(peer = %self.peer, error = %e, "failed to stop ssh master"),
        }
    }
}

impl Transport for SshSession {
    async fn connect(&mut self) -> Result<(), Error> {
        if self.connected {
            return Ok(());
        }
        self.start_master().await
    }

    async fn exec(&mut self, command: &str) -> Result<ExecOutput, Error> {
        if !self.connected {
            return Err(Error::NotConnected);
        }
        let output = Self::run(&self.config.exec_args(command)).await?;
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        match output.status.code() {
            Some(SSH_CLIENT_FAILURE) => {
                self.connected = false;
                Err(Error::from_client_stderr(&self.config.host, &stderr))
            }
            status => Ok(ExecOutput {
                status,
                stdout,
                stderr,
            }),
        }
    }

    async fn reconnect(&mut self) -> Result<(), Error> {
        debug!(peer = %self.peer, "reconnecting ssh master");
        // exec may already have cleared the flag; ask the old master to exit anyway.
        self.connected = true;
        self.stop_master().await;
        self.start_master().await
    }

    async fn close(&mut self) {
        self.stop_master().await;
    }

    fn peer(&self) -> &str {
        &self.peer
    }
}

fn ensure_dir(dir: &Path) -> Result<(), Error> {
    if !dir.exists() {
        std::fs::create_dir_all(dir)?;
    }
    Ok(())
}
