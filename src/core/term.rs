//! Terminal I/O adapter
//!
//! Owns the raw-mode lifecycle, single-byte reads with a deadline,
//! terminal size detection and resize/termination signal capture.
//!
//! # Input sources
//!
//! The selector never reads stdin directly. It pulls bytes through the
//! [`ByteSource`] trait, which has two implementations:
//!
//! - [`TtyInput`]: poll(2) + read(2) on the real stdin
//! - [`ScriptedInput`]: an in-memory byte queue (injected key scripts, tests)

use std::collections::VecDeque;
use std::io::{self, IsTerminal};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossterm::terminal;
use thiserror::Error;
use tracing::{debug, warn};

/// Fallback size when neither the environment nor the terminal reports one
pub const DEFAULT_SIZE: (u16, u16) = (80, 24);

#[derive(Error, Debug)]
pub enum TermError {
    #[error("Failed to switch terminal mode: {0}")]
    RawMode(#[source] io::Error),

    #[error("Failed to read from terminal: {0}")]
    Read(#[source] io::Error),

    #[allow(dead_code)]
    #[error("Failed to register signal handler: {0}")]
    Signal(#[source] io::Error),
}

pub type Result<T> = std::result::Result<T, TermError>;

/// Outcome of a single byte read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadResult {
    /// A byte arrived before the deadline
    Byte(u8),
    /// Nothing arrived in time (or the wait was interrupted by a signal)
    TimedOut,
    /// The input is exhausted
    Closed,
}

/// A source of raw input bytes with an optional per-read deadline
pub trait ByteSource {
    /// Read one byte, waiting at most `timeout` (`None` waits indefinitely)
    fn read_byte(&mut self, timeout: Option<Duration>) -> Result<ReadResult>;

    /// Whether bytes come from a live terminal
    fn is_live(&self) -> bool {
        false
    }
}

/// Live stdin reader
pub struct TtyInput;

impl TtyInput {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(unix)]
impl ByteSource for TtyInput {
    fn read_byte(&mut self, timeout: Option<Duration>) -> Result<ReadResult> {
        let fd = libc::STDIN_FILENO;
        let mut pfd = libc::pollfd {
            fd,
            events: libc::POLLIN,
            revents: 0,
        };
        let wait_ms: libc::c_int = match timeout {
            Some(t) => t.as_millis().min(libc::c_int::MAX as u128) as libc::c_int,
            None => -1,
        };

        let ready = unsafe { libc::poll(&mut pfd, 1, wait_ms) };
        if ready < 0 {
            let err = io::Error::last_os_error();
            // EINTR: a signal arrived, let the caller look at its flags
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(ReadResult::TimedOut);
            }
            return Err(TermError::Read(err));
        }
        if ready == 0 {
            return Ok(ReadResult::TimedOut);
        }

        let mut byte = 0u8;
        let n = unsafe { libc::read(fd, &mut byte as *mut u8 as *mut libc::c_void, 1) };
        match n {
            1 => Ok(ReadResult::Byte(byte)),
            0 => Ok(ReadResult::Closed),
            _ => {
                let err = io::Error::last_os_error();
                match err.kind() {
                    io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock => Ok(ReadResult::TimedOut),
                    _ => Err(TermError::Read(err)),
                }
            }
        }
    }

    fn is_live(&self) -> bool {
        true
    }
}

#[cfg(not(unix))]
impl ByteSource for TtyInput {
    fn read_byte(&mut self, _timeout: Option<Duration>) -> Result<ReadResult> {
        Err(TermError::Read(io::Error::new(
            io::ErrorKind::Unsupported,
            "interactive input requires a Unix terminal",
        )))
    }

    fn is_live(&self) -> bool {
        true
    }
}

/// Pre-supplied input bytes, delivered instantly
#[derive(Debug, Default)]
pub struct ScriptedInput {
    bytes: VecDeque<u8>,
}

impl ScriptedInput {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into().into(),
        }
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl ByteSource for ScriptedInput {
    fn read_byte(&mut self, _timeout: Option<Duration>) -> Result<ReadResult> {
        Ok(match self.bytes.pop_front() {
            Some(b) => ReadResult::Byte(b),
            None => ReadResult::Closed,
        })
    }
}

/// Raw mode held for a scope; released exactly once
pub struct RawMode {
    active: bool,
}

impl RawMode {
    /// Enter raw mode. Failure is fatal for interactive use.
    pub fn acquire() -> Result<Self> {
        terminal::enable_raw_mode().map_err(TermError::RawMode)?;
        debug!("raw mode enabled");
        Ok(Self { active: true })
    }

    /// Restore the original terminal mode
    pub fn release(&mut self) -> Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        terminal::disable_raw_mode().map_err(TermError::RawMode)?;
        debug!("raw mode disabled");
        Ok(())
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            warn!("{}", e);
        }
    }
}

/// Whether both stdin and stderr (the UI stream) are terminals
pub fn is_interactive() -> bool {
    io::stdin().is_terminal() && io::stderr().is_terminal()
}

/// Cached terminal dimensions with `TRY_WIDTH`/`TRY_HEIGHT` overrides
#[derive(Debug, Default)]
pub struct TerminalSize {
    cached: Option<(u16, u16)>,
}

impl TerminalSize {
    pub fn new() -> Self {
        Self { cached: None }
    }

    /// Fixed dimensions, never re-detected
    #[allow(dead_code)]
    pub fn fixed(width: u16, height: u16) -> Self {
        Self {
            cached: Some((width, height)),
        }
    }

    pub fn width(&mut self) -> u16 {
        self.get().0
    }

    pub fn height(&mut self) -> u16 {
        self.get().1
    }

    /// Forget cached dimensions so the next query re-detects them
    pub fn refresh(&mut self) {
        self.cached = None;
    }

    fn get(&mut self) -> (u16, u16) {
        *self
            .cached
            .get_or_insert_with(|| detect_size(|name| std::env::var(name).ok(), terminal::size().ok()))
    }
}

/// Resolve dimensions from env overrides, the detected size, then the fallback
fn detect_size<F>(env: F, detected: Option<(u16, u16)>) -> (u16, u16)
where
    F: Fn(&str) -> Option<String>,
{
    let detected = detected.filter(|&(w, h)| w > 0 && h > 0);
    let width = env_dimension(&env, "TRY_WIDTH")
        .or(detected.map(|d| d.0))
        .unwrap_or(DEFAULT_SIZE.0);
    let height = env_dimension(&env, "TRY_HEIGHT")
        .or(detected.map(|d| d.1))
        .unwrap_or(DEFAULT_SIZE.1);
    (width, height)
}

fn env_dimension<F>(env: &F, name: &str) -> Option<u16>
where
    F: Fn(&str) -> Option<String>,
{
    env(name)
        .and_then(|v| v.trim().parse::<u16>().ok())
        .filter(|&v| v > 0)
}

/// Resize and termination flags set from signal handlers
pub struct SignalFlags {
    resize: Arc<AtomicBool>,
    terminate: Arc<AtomicBool>,
    #[cfg(unix)]
    ids: Vec<signal_hook::SigId>,
}

impl SignalFlags {
    /// Flags that no signal ever sets
    pub fn inert() -> Self {
        Self {
            resize: Arc::new(AtomicBool::new(false)),
            terminate: Arc::new(AtomicBool::new(false)),
            #[cfg(unix)]
            ids: Vec::new(),
        }
    }

    /// Route SIGWINCH to the resize flag and SIGINT/SIGTERM/SIGHUP to the
    /// termination flag
    #[cfg(unix)]
    pub fn register() -> Result<Self> {
        use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGTERM, SIGWINCH};

        let mut flags = Self::inert();
        let id = signal_hook::flag::register(SIGWINCH, flags.resize.clone()).map_err(TermError::Signal)?;
        flags.ids.push(id);
        for sig in [SIGINT, SIGTERM, SIGHUP] {
            let id = signal_hook::flag::register(sig, flags.terminate.clone()).map_err(TermError::Signal)?;
            flags.ids.push(id);
        }
        Ok(flags)
    }

    #[cfg(not(unix))]
    pub fn register() -> Result<Self> {
        Ok(Self::inert())
    }

    /// Consume a pending resize
    pub fn take_resize(&self) -> bool {
        self.resize.swap(false, Ordering::SeqCst)
    }

    /// Check for a pending resize without consuming it
    pub fn resize_pending(&self) -> bool {
        self.resize.load(Ordering::SeqCst)
    }

    pub fn terminated(&self) -> bool {
        self.terminate.load(Ordering::SeqCst)
    }

    /// Mark dimensions dirty (used by tests and by callers that know the size changed)
    #[allow(dead_code)]
    pub fn mark_resized(&self) {
        self.resize.store(true, Ordering::SeqCst);
    }
}

impl Drop for SignalFlags {
    fn drop(&mut self) {
        #[cfg(unix)]
        for id in self.ids.drain(..) {
            signal_hook::low_level::unregister(id);
        }
    }
}
