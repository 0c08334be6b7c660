//! Remote command transport.
//!
//! Executes a single external command over a secure channel and exposes
//! its standard streams and exit status. The channel is an `ssh` child
//! process in batch mode; [`Connection::local`] runs the command directly
//! for same-host resources.
//!
//! Lifecycle: `open` prepares the command without starting it; stream
//! setup (`open_standard_input`, `open_standard_output`,
//! `redirect_standard_output`) happens before `connect` starts remote
//! execution; `wait_for_exit` bounds the wait for termination; `close`
//! tears everything down on every exit path, finished or not.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{GateError, Result};
use crate::profile::ResourceProfile;

const HOST_KEY: &str = "host";
const PORT_KEY: &str = "port";
const USER_KEY: &str = "user";
const IDENTITY_KEY: &str = "identity";

const DEFAULT_SSH_PORT: u16 = 22;

/// Connection settings for a remote resource, read from its profile.
#[derive(Debug, Clone)]
pub struct SessionProfile {
    pub host: String,
    pub port: u16,
    pub user: Option<String>,
    pub identity: Option<PathBuf>,
}

impl SessionProfile {
    /// Read and validate the session keys of a resource profile.
    pub fn from_profile(profile: &ResourceProfile) -> Result<Self> {
        let config = &profile.config;
        let host = config.require(HOST_KEY)?.to_string();
        if host.is_empty() {
            return Err(GateError::config(config.full_key(HOST_KEY), "empty host"));
        }
        let port: u16 = config.get_parse(PORT_KEY)?.unwrap_or(DEFAULT_SSH_PORT);
        if port == 0 {
            return Err(GateError::config(
                config.full_key(PORT_KEY),
                "must be an integer >= 1",
            ));
        }
        let user = config.get(USER_KEY).map(str::to_string);
        let identity = config.get(IDENTITY_KEY).map(PathBuf::from);
        Ok(Self {
            host,
            port,
            user,
            identity,
        })
    }

    /// The `user@host` destination for the ssh invocation.
    fn destination(&self) -> String {
        match &self.user {
            Some(user) => format!("{}@{}", user, self.host),
            None => self.host.clone(),
        }
    }
}

/// Outcome of a bounded wait for command termination.
///
/// Timeout expiry is distinct from both success and failure: on
/// `TimedOut` the command is still running and the caller decides
/// whether to keep waiting or escalate to [`Connection::close`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The command terminated with this exit status.
    Exited(i32),
    /// The timeout elapsed first; the command is still running.
    TimedOut,
}

/// A prepared, then started, remote command execution.
///
/// Owned exclusively by the call site that created it.
pub struct Connection {
    command: Command,
    connected: bool,
    stdin_requested: bool,
    stdout_requested: bool,
    redirect: Option<(Box<dyn AsyncWrite + Send + Unpin>, bool)>,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stdout: Option<ChildStdout>,
    exit_code: Option<i32>,
    forwarder: Option<JoinHandle<std::io::Result<()>>>,
}

impl Connection {
    /// Prepare (but do not start) `command_line` on the remote host.
    pub fn open(profile: &SessionProfile, command_line: &str) -> Result<Connection> {
        let mut command = Command::new("ssh");
        command.arg("-o").arg("BatchMode=yes");
        command.arg("-p").arg(profile.port.to_string());
        if let Some(identity) = &profile.identity {
            command.arg("-i").arg(identity);
        }
        command.arg(profile.destination());
        command.arg(command_line);
        debug!(
            "Prepared remote command on {}: {}",
            profile.destination(),
            command_line
        );
        Ok(Self::from_command(command))
    }

    /// Prepare (but do not start) a command on the local host, with the
    /// same lifecycle as a remote one.
    pub fn local<I, S>(program: &str, args: I) -> Connection
    where
        I: IntoIterator<Item = S>,
        S: AsRef<std::ffi::OsStr>,
    {
        let mut command = Command::new(program);
        command.args(args);
        Self::from_command(command)
    }

    fn from_command(mut command: Command) -> Connection {
        // backstop: a dropped connection must not leak the child
        command.kill_on_drop(true);
        Connection {
            command,
            connected: false,
            stdin_requested: false,
            stdout_requested: false,
            redirect: None,
            child: None,
            stdin: None,
            stdout: None,
            exit_code: None,
            forwarder: None,
        }
    }

    /// Request the command's standard input. Must precede [`connect`];
    /// the handle itself is collected with [`standard_input`] once the
    /// command has started.
    ///
    /// [`connect`]: Connection::connect
    /// [`standard_input`]: Connection::standard_input
    pub fn open_standard_input(&mut self) -> Result<()> {
        self.ensure_not_connected("open_standard_input")?;
        self.stdin_requested = true;
        Ok(())
    }

    /// Request the command's standard output. Must precede [`connect`]
    /// and excludes [`redirect_standard_output`].
    ///
    /// [`connect`]: Connection::connect
    /// [`redirect_standard_output`]: Connection::redirect_standard_output
    pub fn open_standard_output(&mut self) -> Result<()> {
        self.ensure_not_connected("open_standard_output")?;
        if self.redirect.is_some() {
            return Err(GateError::Session(
                "standard output is already redirected".into(),
            ));
        }
        self.stdout_requested = true;
        Ok(())
    }

    /// Redirect the command's standard output into `sink`, flushing
    /// after every chunk when `auto_flush`. Must precede [`connect`] and
    /// excludes [`open_standard_output`].
    ///
    /// [`connect`]: Connection::connect
    /// [`open_standard_output`]: Connection::open_standard_output
    pub fn redirect_standard_output(
        &mut self,
        sink: Box<dyn AsyncWrite + Send + Unpin>,
        auto_flush: bool,
    ) -> Result<()> {
        self.ensure_not_connected("redirect_standard_output")?;
        if self.stdout_requested {
            return Err(GateError::Session(
                "standard output is already opened for direct reading".into(),
            ));
        }
        if self.redirect.is_some() {
            return Err(GateError::Session(
                "standard output is already redirected".into(),
            ));
        }
        self.redirect = Some((sink, auto_flush));
        Ok(())
    }

    /// Start remote execution. After this the caller may write to the
    /// requested standard input and read from standard output or the
    /// registered sink.
    pub async fn connect(&mut self) -> Result<()> {
        self.ensure_not_connected("connect")?;

        self.command.stdin(if self.stdin_requested {
            Stdio::piped()
        } else {
            Stdio::null()
        });
        let wants_stdout = self.stdout_requested || self.redirect.is_some();
        self.command.stdout(if wants_stdout {
            Stdio::piped()
        } else {
            Stdio::null()
        });

        let mut child = self.command.spawn()?;

        if self.stdin_requested {
            self.stdin = child.stdin.take();
        }
        if self.stdout_requested {
            self.stdout = child.stdout.take();
        } else if let Some((sink, auto_flush)) = self.redirect.take() {
            let out = child.stdout.take().ok_or_else(|| {
                GateError::Session("spawned command has no standard output pipe".into())
            })?;
            self.forwarder = Some(tokio::spawn(forward_output(out, sink, auto_flush)));
        }

        self.child = Some(child);
        self.connected = true;
        Ok(())
    }

    /// The standard input handle requested before [`connect`]. Yields
    /// once; dropping the handle closes the command's input.
    ///
    /// [`connect`]: Connection::connect
    pub fn standard_input(&mut self) -> Result<ChildStdin> {
        if !self.connected {
            return Err(GateError::Session("not connected".into()));
        }
        self.stdin.take().ok_or_else(|| {
            GateError::Session("standard input was not opened or was already taken".into())
        })
    }

    /// The standard output handle requested before [`connect`]. Yields
    /// once.
    ///
    /// [`connect`]: Connection::connect
    pub fn standard_output(&mut self) -> Result<ChildStdout> {
        if !self.connected {
            return Err(GateError::Session("not connected".into()));
        }
        self.stdout.take().ok_or_else(|| {
            GateError::Session("standard output was not opened or was already taken".into())
        })
    }

    /// Wait until the command terminates or `timeout` elapses, whichever
    /// comes first. Once the command has exited, repeated calls return
    /// the stored status.
    pub async fn wait_for_exit(&mut self, timeout: Duration) -> Result<WaitOutcome> {
        if let Some(code) = self.exit_code {
            return Ok(WaitOutcome::Exited(code));
        }
        let child = self
            .child
            .as_mut()
            .ok_or_else(|| GateError::Session("not connected".into()))?;

        match tokio::time::timeout(timeout, child.wait()).await {
            Err(_elapsed) => Ok(WaitOutcome::TimedOut),
            Ok(status) => {
                let code = exit_code_of(status?);
                self.exit_code = Some(code);
                Ok(WaitOutcome::Exited(code))
            }
        }
    }

    /// Tear down the channel and release all associated streams, whether
    /// or not the command has finished. Idempotent.
    pub async fn close(&mut self) -> Result<()> {
        self.stdin = None;
        self.stdout = None;
        self.redirect = None;

        if let Some(mut child) = self.child.take() {
            if self.exit_code.is_none() {
                if let Err(e) = child.start_kill() {
                    // already-exited children report InvalidInput here
                    debug!("kill on close: {}", e);
                }
                match child.wait().await {
                    Ok(status) => self.exit_code = Some(exit_code_of(status)),
                    Err(e) => warn!("reaping command on close failed: {}", e),
                }
            }
        }

        if let Some(forwarder) = self.forwarder.take() {
            match forwarder.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("output forwarding ended with error: {}", e),
                Err(e) => warn!("output forwarding task failed: {}", e),
            }
        }

        Ok(())
    }

    fn ensure_not_connected(&self, operation: &str) -> Result<()> {
        if self.connected {
            return Err(GateError::Session(format!(
                "{} is only valid before connect",
                operation
            )));
        }
        Ok(())
    }

    #[cfg(test)]
    fn argv(&self) -> Vec<String> {
        let std = self.command.as_std();
        std::iter::once(std.get_program())
            .chain(std.get_args())
            .map(|s| s.to_string_lossy().into_owned())
            .collect()
    }
}

fn exit_code_of(status: std::process::ExitStatus) -> i32 {
    // signal-terminated commands carry no code; report -1
    status.code().unwrap_or(-1)
}

async fn forward_output(
    mut out: impl AsyncRead + Unpin,
    mut sink: Box<dyn AsyncWrite + Send + Unpin>,
    auto_flush: bool,
) -> std::io::Result<()> {
    let mut buf = [0u8; 8192];
    loop {
        let n = out.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        sink.write_all(&buf[..n]).await?;
        if auto_flush {
            sink.flush().await?;
        }
    }
    sink.flush().await?;
    Ok(())
}
