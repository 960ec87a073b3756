//! Transport layer for routerscope.
//!
//! One [`SshSession`] owns a single multiplexed OpenSSH connection to the
//! router (a ControlMaster socket). Every command is executed as a short
//! `ssh` client process riding that socket, so the expensive handshake
//! happens once per session instead of once per command.
//!
//! The [`Transport`] trait is the seam `routerscope-core` programs against;
//! tests substitute scripted transports.

pub mod error;
pub mod ssh;
pub mod transport;

pub use error::Error;
pub use ssh::{SshConfig, SshSession};
pub use transport::{ExecOutput, Transport};
