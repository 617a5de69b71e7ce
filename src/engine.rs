//! A perft-capable engine running as a child process.
//!
//! The engine speaks a line protocol on stdin/stdout. Stdout is pumped by a
//! reader thread into a channel so a query can wait for output while still
//! noticing when the process dies.

use std::ffi::OsStr;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info, trace, warn};

use crate::board::Position;
use crate::perft::{classify, PerftLine, PerftResult};

pub const DEFAULT_POLL: Duration = Duration::from_millis(10);
const EXIT_DRAIN: Duration = Duration::from_millis(100);

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("failed to spawn engine `{}`", .path.display())]
    SpawnFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("engine {name} terminated ({})", describe_exit(.status))]
    Terminated { name: String, status: Option<ExitStatus> },
    #[error("i/o with engine {name}")]
    Io {
        name: String,
        #[source]
        source: io::Error,
    },
}

fn describe_exit(status: &Option<ExitStatus>) -> String {
    match status {
        Some(s) => s.to_string(),
        None => "handle closed".to_string(),
    }
}

/// Forward every line of `reader` to `sink` until EOF or until `sink`
/// returns false. Bytes that are not UTF-8 are replaced, never fatal.
fn pump_lines<R: Read>(reader: R, mut sink: impl FnMut(String) -> bool) {
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        while matches!(buf.last(), Some(b'\n' | b'\r')) { buf.pop(); }
        if !sink(String::from_utf8_lossy(&buf).into_owned()) { break; }
    }
}

fn reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

/// Anything that can answer `position` + `go perft`.
pub trait PerftEngine {
    fn name(&self) -> &str;
    fn load_position(&mut self, pos: &Position) -> Result<(), EngineError>;
    fn perft(&mut self, depth: u32) -> Result<PerftResult, EngineError>;
}

#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub name: String,
    /// Log every command sent and line received at info level.
    pub verbose: bool,
    /// How long one read attempt waits before the liveness check.
    pub poll: Duration,
}

impl EngineConfig {
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Self::default() }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { name: "engine".to_string(), verbose: false, poll: DEFAULT_POLL }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineState {
    Running,
    Terminated,
}

pub struct EngineProcess {
    cfg: EngineConfig,
    child: Child,
    stdin: Option<ChildStdin>,
    lines: Receiver<String>,
    state: EngineState,
    reaped: bool,
}

impl EngineProcess {
    pub fn spawn<P: AsRef<Path>>(path: P, cfg: EngineConfig) -> Result<Self, EngineError> {
        Self::spawn_with(path, std::iter::empty::<&str>(), cfg)
    }

    pub fn spawn_with<P, I, S>(path: P, args: I, cfg: EngineConfig) -> Result<Self, EngineError>
    where
        P: AsRef<Path>,
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let path = path.as_ref();
        let spawn_err = |source| EngineError::SpawnFailed { path: path.to_path_buf(), source };
        let mut child = Command::new(path)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_err)?;

        let missing = |what: &str| io::Error::new(io::ErrorKind::BrokenPipe, format!("no {what} pipe"));
        let stdin = child.stdin.take().ok_or_else(|| missing("stdin"));
        let stdout = child.stdout.take().ok_or_else(|| missing("stdout"));
        let (stdin, stdout) = match (stdin, stdout) {
            (Ok(i), Ok(o)) => (i, o),
            (Err(e), _) | (_, Err(e)) => {
                reap(&mut child);
                return Err(spawn_err(e));
            }
        };

        let (tx, rx) = mpsc::channel();
        let pumped = thread::Builder::new()
            .name(format!("{}-stdout", cfg.name))
            .spawn(move || pump_lines(stdout, |line| tx.send(line).is_ok()));
        if let Err(e) = pumped {
            reap(&mut child);
            return Err(spawn_err(e));
        }

        if let Some(stderr) = child.stderr.take() {
            let name = cfg.name.clone();
            let drained = thread::Builder::new()
                .name(format!("{}-stderr", cfg.name))
                .spawn(move || {
                    pump_lines(stderr, |line| {
                        debug!("{name} stderr: {line}");
                        true
                    })
                });
            if let Err(e) = drained {
                reap(&mut child);
                return Err(spawn_err(e));
            }
        }

        debug!("spawned {} ({}) pid {}", cfg.name, path.display(), child.id());
        Ok(Self { cfg, child, stdin: Some(stdin), lines: rx, state: EngineState::Running, reaped: false })
    }

    pub fn state(&self) -> EngineState { self.state }

    fn terminated(&mut self) -> EngineError {
        let status = self.child.try_wait().ok().flatten();
        EngineError::Terminated { name: self.cfg.name.clone(), status }
    }

    /// Write one CRLF-terminated command and flush it.
    pub fn send(&mut self, command: &str) -> Result<(), EngineError> {
        if self.state == EngineState::Terminated { return Err(self.terminated()); }
        if self.cfg.verbose {
            info!("Sending to {}: {}", self.cfg.name, command);
        } else {
            trace!("-> {}: {}", self.cfg.name, command);
        }
        let res = match self.stdin.as_mut() {
            Some(stdin) => write!(stdin, "{command}\r\n").and_then(|_| stdin.flush()),
            None => return Err(self.terminated()),
        };
        match res {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Err(self.exited()),
            Err(source) => Err(EngineError::Io { name: self.cfg.name.clone(), source }),
        }
    }

    pub fn load_position(&mut self, pos: &Position) -> Result<(), EngineError> {
        self.send(&pos.uci_command())
    }

    pub fn perft(&mut self, depth: u32) -> Result<PerftResult, EngineError> {
        self.send(&format!("go perft {depth}"))?;
        let mut result = PerftResult::new();
        loop {
            match self.lines.recv_timeout(self.cfg.poll) {
                Ok(line) => {
                    if let Some(total) = self.absorb(&line, &mut result) {
                        result.finish(total);
                        return Ok(result);
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => return Err(self.exited()),
            }
            if self.has_exited() {
                // Lines printed right before exit may still be in flight.
                while let Ok(line) = self.lines.recv_timeout(EXIT_DRAIN) {
                    if let Some(total) = self.absorb(&line, &mut result) {
                        result.finish(total);
                        return Ok(result);
                    }
                }
                return Err(self.exited());
            }
        }
    }

    /// Feed one line into `result`; returns the total once the terminal
    /// line arrives.
    fn absorb(&self, line: &str, result: &mut PerftResult) -> Option<u64> {
        if self.cfg.verbose {
            info!("Received from {}: {}", self.cfg.name, line.trim());
        } else {
            trace!("<- {}: {}", self.cfg.name, line.trim());
        }
        match classify(line) {
            Ok(PerftLine::TerminalCount(n)) => Some(n),
            Ok(PerftLine::MoveCount(mv, n)) => {
                result.record(mv, n);
                None
            }
            Ok(PerftLine::Unrecognized) => None,
            Err(e) => {
                warn!("{}: {}", self.cfg.name, e);
                None
            }
        }
    }

    fn has_exited(&mut self) -> bool {
        !matches!(self.child.try_wait(), Ok(None))
    }

    fn exited(&mut self) -> EngineError {
        // Stdout can close a moment before the exit status is available.
        let deadline = Instant::now() + EXIT_DRAIN;
        while matches!(self.child.try_wait(), Ok(None)) && Instant::now() < deadline {
            thread::sleep(self.cfg.poll);
        }
        let err = self.terminated();
        self.state = EngineState::Terminated;
        self.stdin = None;
        err
    }

    /// Kill the process and reap it. Safe to call more than once.
    pub fn terminate(&mut self) {
        self.state = EngineState::Terminated;
        self.stdin = None;
        if self.reaped { return; }
        if let Ok(None) = self.child.try_wait() {
            if let Err(e) = self.child.kill() {
                warn!("could not kill {}: {}", self.cfg.name, e);
            }
        }
        match self.child.wait() {
            Ok(status) => debug!("{} exited: {}", self.cfg.name, status),
            Err(e) => warn!("could not reap {}: {}", self.cfg.name, e),
        }
        self.reaped = true;
    }
}

impl PerftEngine for EngineProcess {
    fn name(&self) -> &str { &self.cfg.name }

    fn load_position(&mut self, pos: &Position) -> Result<(), EngineError> {
        EngineProcess::load_position(self, pos)
    }

    fn perft(&mut self, depth: u32) -> Result<PerftResult, EngineError> {
        EngineProcess::perft(self, depth)
    }
}

impl Drop for EngineProcess {
    fn drop(&mut self) { self.terminate(); }
}
