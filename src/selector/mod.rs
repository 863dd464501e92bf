//! Interactive workspace selector
//!
//! A single-threaded read-score-render-input loop over the candidate
//! directories. Each iteration re-ranks the cached candidates against the
//! current query, renders one frame, waits for one key and applies it.
//!
//! # States
//!
//! ```text
//! Browsing ──Ctrl-D──> Browsing (delete mode) ──Enter──> ConfirmingDelete
//!    │                                                        │
//!    └──Enter / Esc──> Done(SelectionResult) <──── "YES" ─────┘
//! ```
//!
//! The selector never touches the filesystem beyond reading the tries
//! directory. Deletion is returned as an intent for the shell script.

pub mod candidate;
pub mod state;
pub mod view;

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::core::keys::{Arrow, Decoded, KeyDecoder, KeyEvent, ESCAPE_TIMEOUT};
use crate::core::term::{self, ByteSource, RawMode, ScriptedInput, SignalFlags, TermError, TerminalSize, TtyInput};
use crate::ui::{OutputMode, Renderer, TokenMode};
use crate::workspace;

use candidate::CandidateCache;
use state::SelectorState;

/// Poll interval for live input, so signal flags are seen without a keystroke
const IDLE_TICK: Duration = Duration::from_millis(100);

/// The confirmation text that authorizes deletion
const CONFIRM_WORD: &str = "YES";

#[derive(Error, Debug)]
pub enum SelectorError {
    #[error(transparent)]
    Terminal(#[from] TermError),

    #[error("Failed to write to terminal: {0}")]
    Output(#[from] io::Error),

    #[error("Cannot resolve {}: {source}", path.display())]
    Resolve {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{} is not inside {}", path.display(), base.display())]
    OutsideBase { path: PathBuf, base: PathBuf },
}

pub type Result<T> = std::result::Result<T, SelectorError>;

/// What the user chose
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionResult {
    /// Enter an existing workspace
    Cd(PathBuf),
    /// Create a workspace and enter it
    Mkdir(PathBuf),
    /// Remove workspaces (canonical paths, all inside `base`)
    Delete { paths: Vec<PathBuf>, base: PathBuf },
    Cancelled,
}

/// Session options, mostly test-harness injection points
#[derive(Debug, Clone)]
pub struct SelectorOptions {
    pub initial_query: String,
    /// Render one frame and return `Cancelled`
    pub render_once: bool,
    /// Terminal bytes to use instead of live input
    pub key_script: Option<Vec<u8>>,
    /// Confirmation text to use instead of typed input
    pub confirm: Option<String>,
    pub escape_timeout: Duration,
    pub output: OutputMode,
    pub tokens: TokenMode,
}

impl Default for SelectorOptions {
    fn default() -> Self {
        Self {
            initial_query: String::new(),
            render_once: false,
            key_script: None,
            confirm: None,
            escape_timeout: ESCAPE_TIMEOUT,
            output: OutputMode::TTY,
            tokens: TokenMode::Expand,
        }
    }
}

/// Input phase
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Phase {
    Browsing,
    ConfirmingDelete { typed: String },
}

/// Outcome of one key
#[derive(Debug, PartialEq, Eq)]
enum Step {
    Continue,
    Done(SelectionResult),
}

pub struct Selector {
    options: SelectorOptions,
    state: SelectorState,
    phase: Phase,
    cache: CandidateCache,
    /// Display order: indices into the cached candidates
    view: Vec<usize>,
    renderer: Renderer,
    size: TerminalSize,
    decoder: KeyDecoder,
    /// Reference time for scoring and relative times
    now: SystemTime,
}

impl Selector {
    pub fn new(base: impl Into<PathBuf>, options: SelectorOptions) -> Self {
        Self {
            state: SelectorState::new(&options.initial_query),
            phase: Phase::Browsing,
            cache: CandidateCache::new(base),
            view: Vec::new(),
            renderer: Renderer::new(options.output, options.tokens),
            size: TerminalSize::new(),
            decoder: KeyDecoder::new(options.escape_timeout),
            now: SystemTime::now(),
            options,
        }
    }

    /// Use fixed dimensions instead of detecting them
    #[allow(dead_code)]
    pub fn with_size(mut self, size: TerminalSize) -> Self {
        self.size = size;
        self
    }

    /// Use a pre-scanned candidate list instead of scanning the base
    #[allow(dead_code)]
    pub fn with_candidates(mut self, entries: Vec<candidate::Candidate>) -> Self {
        self.cache = CandidateCache::with_entries(self.cache.base().to_path_buf(), entries);
        self
    }

    pub fn base(&self) -> &Path {
        self.cache.base()
    }

    /// Run a session on stderr with live or injected input.
    ///
    /// Only live sessions set up the screen (clear, hide cursor) and restore
    /// it afterwards; render-once and key scripts write frames as they are.
    pub fn run(&mut self) -> Result<SelectionResult> {
        let mut err = io::stderr();

        if self.options.render_once {
            self.refresh();
            self.render(&mut err)?;
            return Ok(SelectionResult::Cancelled);
        }

        if let Some(keys) = self.options.key_script.take() {
            let mut input = ScriptedInput::new(keys);
            return self.run_loop(&mut input, &mut err, &SignalFlags::inert());
        }

        if !term::is_interactive() {
            self.renderer.puts("Error: try requires an interactive terminal");
            self.renderer.flush(&mut err)?;
            return Ok(SelectionResult::Cancelled);
        }

        let signals = SignalFlags::register()?;
        let mut raw = RawMode::acquire()?;
        self.renderer.clear_screen(&mut err)?;
        self.renderer.hide_cursor(&mut err)?;

        let result = self.run_loop(&mut TtyInput::new(), &mut err, &signals);

        let restore = self
            .renderer
            .clear_screen(&mut err)
            .and_then(|_| self.renderer.show_cursor(&mut err));
        if let Err(e) = restore {
            warn!("Failed to restore screen: {}", e);
        }
        raw.release()?;
        result
    }

    /// The loop proper: render, read one key, apply it, until done
    pub fn run_loop<S, W>(&mut self, input: &mut S, out: &mut W, signals: &SignalFlags) -> Result<SelectionResult>
    where
        S: ByteSource + ?Sized,
        W: Write,
    {
        let wait = input.is_live().then_some(IDLE_TICK);

        loop {
            if signals.take_resize() {
                self.size.refresh();
                self.renderer.clear_screen(out)?;
                debug!("Terminal resized");
            }

            self.refresh();
            self.render(out)?;

            let key = loop {
                match self.decoder.next(input, wait)? {
                    Decoded::Key(key) => break Some(key),
                    Decoded::Unrecognized => continue,
                    Decoded::Idle => {
                        if signals.terminated() {
                            info!("Terminated by signal");
                            return Ok(SelectionResult::Cancelled);
                        }
                        if signals.resize_pending() {
                            break None;
                        }
                    }
                    Decoded::Closed => {
                        debug!("Input closed");
                        return Ok(SelectionResult::Cancelled);
                    }
                }
            };

            if let Some(key) = key {
                if let Step::Done(result) = self.handle_key(key) {
                    info!("Selection: {:?}", result);
                    return Ok(result);
                }
            }
        }
    }

    /// Re-score and re-sort against the current query
    fn refresh(&mut self) {
        self.now = SystemTime::now();
        let query = self.state.query.text();
        self.view = candidate::rank(self.cache.entries(), &query, self.now);
    }

    /// Rows in the list, including "create new" when there is a query
    fn total_items(&self) -> usize {
        self.view.len() + usize::from(!self.state.query.is_empty())
    }

    fn highlighted_path(&mut self) -> Option<PathBuf> {
        let idx = *self.view.get(self.state.cursor_pos)?;
        self.cache.entries().get(idx).map(|c| c.path.clone())
    }

    fn handle_key(&mut self, key: KeyEvent) -> Step {
        match self.phase {
            Phase::Browsing => self.handle_browse_key(key),
            Phase::ConfirmingDelete { .. } => self.handle_confirm_key(key),
        }
    }

    fn handle_browse_key(&mut self, key: KeyEvent) -> Step {
        match key {
            KeyEvent::Enter => return self.select(),
            KeyEvent::Arrow(Arrow::Up) | KeyEvent::Ctrl('p') => self.state.move_up(),
            KeyEvent::Arrow(Arrow::Down) | KeyEvent::Ctrl('n') => {
                let total = self.total_items();
                self.state.move_down(total);
            }
            KeyEvent::Arrow(Arrow::Left | Arrow::Right) => {}
            KeyEvent::Backspace | KeyEvent::Ctrl('h') => {
                self.state.query.backspace();
                self.state.cursor_pos = 0;
            }
            KeyEvent::Printable(c) => {
                if self.state.query.insert(c) {
                    self.state.cursor_pos = 0;
                }
            }
            KeyEvent::Ctrl('a') => self.state.query.home(),
            KeyEvent::Ctrl('e') => self.state.query.end(),
            KeyEvent::Ctrl('b') => self.state.query.left(),
            KeyEvent::Ctrl('f') => self.state.query.right(),
            KeyEvent::Ctrl('k') => self.state.query.kill_to_end(),
            KeyEvent::Ctrl('w') => self.state.query.delete_word(),
            KeyEvent::Ctrl('d') => {
                if let Some(path) = self.highlighted_path() {
                    self.state.toggle_mark(&path);
                    debug!("Marked for deletion: {}", self.state.marked.len());
                }
            }
            KeyEvent::Escape | KeyEvent::Ctrl('c') => {
                if !self.state.delete_mode {
                    return Step::Done(SelectionResult::Cancelled);
                }
                self.state.clear_marks();
            }
            KeyEvent::Ctrl(_) => {}
        }
        Step::Continue
    }

    fn select(&mut self) -> Step {
        if self.state.delete_mode && !self.state.marked.is_empty() {
            return self.begin_confirm();
        }

        if let Some(path) = self.highlighted_path() {
            return Step::Done(SelectionResult::Cd(path));
        }

        let query = self.state.query.text();
        if !query.is_empty() && self.state.cursor_pos == self.view.len() {
            let name = workspace::dashify(&format!("{}-{}", workspace::date_prefix(), query));
            return Step::Done(SelectionResult::Mkdir(self.base().join(name)));
        }
        Step::Continue
    }

    fn begin_confirm(&mut self) -> Step {
        match self.options.confirm.clone() {
            Some(text) => self.resolve_delete(&text),
            None => {
                self.phase = Phase::ConfirmingDelete { typed: String::new() };
                Step::Continue
            }
        }
    }

    fn handle_confirm_key(&mut self, key: KeyEvent) -> Step {
        let Phase::ConfirmingDelete { typed } = &mut self.phase else {
            return Step::Continue;
        };
        match key {
            KeyEvent::Printable(c) => typed.push(c),
            KeyEvent::Backspace | KeyEvent::Ctrl('h') => {
                typed.pop();
            }
            KeyEvent::Enter => {
                let text = std::mem::take(typed);
                return self.resolve_delete(&text);
            }
            KeyEvent::Escape | KeyEvent::Ctrl('c') => return self.resolve_delete(""),
            _ => {}
        }
        Step::Continue
    }

    /// Evaluate the confirmation text
    fn resolve_delete(&mut self, confirmation: &str) -> Step {
        self.phase = Phase::Browsing;

        if confirmation != CONFIRM_WORD {
            self.state.clear_marks();
            self.state.status = Some("Delete cancelled".to_string());
            return Step::Continue;
        }

        match self.validate_marked() {
            Ok((paths, base)) => {
                self.cache.invalidate();
                self.state.clear_marks();
                Step::Done(SelectionResult::Delete { paths, base })
            }
            Err(e) => {
                warn!("Refusing delete: {}", e);
                self.state.status = Some(format!("Error: {}", e));
                Step::Continue
            }
        }
    }

    /// Check every marked entry sits directly in the tries directory and
    /// resolves strictly inside it.
    ///
    /// The returned paths keep each entry's own name, so a marked symlink is
    /// removed as the link rather than by its target's name.
    fn validate_marked(&self) -> Result<(Vec<PathBuf>, PathBuf)> {
        let resolve = |path: &Path| {
            fs::canonicalize(path).map_err(|source| SelectorError::Resolve {
                path: path.to_path_buf(),
                source,
            })
        };

        let base = resolve(self.base())?;
        let mut paths = Vec::with_capacity(self.state.marked.len());
        for marked in &self.state.marked {
            let target = resolve(marked)?;
            if target == base || !target.starts_with(&base) {
                return Err(SelectorError::OutsideBase { path: target, base });
            }

            let parent = match marked.parent() {
                Some(p) => Some(resolve(p)?),
                None => None,
            };
            let name = match (marked.file_name(), parent) {
                (Some(name), Some(parent)) if parent == base => name,
                _ => {
                    return Err(SelectorError::OutsideBase {
                        path: marked.clone(),
                        base,
                    })
                }
            };
            paths.push(base.join(name));
        }
        Ok((paths, base))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::KeyMapper;
    use tempfile::TempDir;

    fn tries() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("2025-11-01-alpha")).unwrap();
        fs::create_dir(dir.path().join("2025-11-25-beta")).unwrap();
        dir
    }

    /// All candidates share one mtime, so an empty query lists them by name
    fn selector(base: &Path, options: SelectorOptions) -> Selector {
        let now = SystemTime::now();
        let entries = candidate::scan(base)
            .into_iter()
            .map(|mut c| {
                c.mtime = now;
                c
            })
            .collect();
        let options = SelectorOptions {
            output: OutputMode::empty(),
            ..options
        };
        Selector::new(base, options)
            .with_size(TerminalSize::fixed(80, 24))
            .with_candidates(entries)
    }

    fn drive(sel: &mut Selector, keys: &str) -> (SelectionResult, String) {
        let mut input = ScriptedInput::new(KeyMapper::parse_script(keys));
        let mut out = Vec::new();
        let result = sel.run_loop(&mut input, &mut out, &SignalFlags::inert()).unwrap();
        (result, String::from_utf8(out).unwrap())
    }

    fn run_keys(base: &Path, keys: &str) -> SelectionResult {
        drive(&mut selector(base, SelectorOptions::default()), keys).0
    }

    #[test]
    fn test_type_and_select() {
        let dir = tries();
        assert_eq!(
            run_keys(dir.path(), "beta\r"),
            SelectionResult::Cd(dir.path().join("2025-11-25-beta"))
        );
    }

    #[test]
    fn test_escape_cancels() {
        let dir = tries();
        assert_eq!(run_keys(dir.path(), "ESC"), SelectionResult::Cancelled);
    }

    #[test]
    fn test_exhausted_input_cancels() {
        let dir = tries();
        assert_eq!(run_keys(dir.path(), "beta"), SelectionResult::Cancelled);
    }

    #[test]
    fn test_navigation_clamps() {
        let dir = tries();
        let keys = "DOWN,DOWN,DOWN,DOWN,UP,UP,UP,DOWN,ENTER";
        assert_eq!(
            run_keys(dir.path(), keys),
            SelectionResult::Cd(dir.path().join("2025-11-25-beta"))
        );
    }

    #[test]
    fn test_cursor_clamped_when_list_shrinks() {
        let dir = tries();
        // Cursor on "create new", then Ctrl-W empties the query and the row goes away
        let keys = "TYPE=a,DOWN,DOWN,CTRL-W,ENTER";
        assert_eq!(
            run_keys(dir.path(), keys),
            SelectionResult::Cd(dir.path().join("2025-11-25-beta"))
        );
    }

    #[test]
    fn test_create_new_row() {
        let dir = tries();
        let result = run_keys(dir.path(), "DOWN,TYPE=new thing,DOWN,ENTER");
        let expected = dir.path().join(format!("{}-new-thing", workspace::date_prefix()));
        assert_eq!(result, SelectionResult::Mkdir(expected));
    }

    #[test]
    fn test_rejected_characters_ignored() {
        let dir = tries();
        assert_eq!(
            run_keys(dir.path(), "be/t*a\r"),
            SelectionResult::Cd(dir.path().join("2025-11-25-beta"))
        );
    }

    #[test]
    fn test_line_editing_keeps_selection() {
        let dir = tries();
        // "zzbeta" matches nothing until Ctrl-W removes the "zz" again
        let keys = "TYPE=beta,CTRL-A,TYPE=zz,CTRL-W,CTRL-E,ENTER";
        assert_eq!(
            run_keys(dir.path(), keys),
            SelectionResult::Cd(dir.path().join("2025-11-25-beta"))
        );
    }

    #[test]
    fn test_delete_confirmed() {
        let dir = tries();
        let result = run_keys(dir.path(), "TYPE=beta,CTRL-D,ENTER,TYPE=YES,ENTER");

        let base = fs::canonicalize(dir.path()).unwrap();
        assert_eq!(
            result,
            SelectionResult::Delete {
                paths: vec![base.join("2025-11-25-beta")],
                base,
            }
        );
        // Nothing is removed by the selector itself
        assert!(dir.path().join("2025-11-25-beta").exists());
    }

    #[test]
    fn test_delete_not_confirmed() {
        let dir = tries();
        let mut sel = selector(dir.path(), SelectorOptions::default());
        let (result, out) = drive(&mut sel, "CTRL-D,ENTER,TYPE=yes,ENTER");
        assert_eq!(result, SelectionResult::Cancelled);
        assert!(out.contains("Delete cancelled"));
        assert!(!sel.state.delete_mode);
        assert!(sel.state.marked.is_empty());
    }

    #[test]
    fn test_injected_confirmation() {
        let dir = tries();
        let options = SelectorOptions {
            confirm: Some("YES".to_string()),
            ..SelectorOptions::default()
        };
        let (result, _) = drive(&mut selector(dir.path(), options), "CTRL-D,DOWN,CTRL-D,ENTER");
        let SelectionResult::Delete { paths, .. } = result else {
            panic!("expected delete, got {:?}", result);
        };
        assert_eq!(paths.len(), 2);
    }

    #[test]
    fn test_escape_leaves_delete_mode() {
        let dir = tries();
        let mut sel = selector(dir.path(), SelectorOptions::default());
        let (result, out) = drive(&mut sel, "CTRL-D,ESC,ENTER");
        // Esc only cleared the marks; Enter then selects normally
        assert_eq!(result, SelectionResult::Cd(dir.path().join("2025-11-01-alpha")));
        assert!(out.contains("DELETE MODE"));
    }

    #[test]
    fn test_editing_query_keeps_marks() {
        let dir = tries();
        let options = SelectorOptions {
            confirm: Some("YES".to_string()),
            ..SelectorOptions::default()
        };
        // Mark alpha, then filter it out of view and confirm
        let (result, _) = drive(&mut selector(dir.path(), options), "CTRL-D,TYPE=beta,ENTER");
        let SelectionResult::Delete { paths, base } = result else {
            panic!("expected delete, got {:?}", result);
        };
        assert_eq!(paths, vec![base.join("2025-11-01-alpha")]);
    }

    #[test]
    fn test_unmarking_last_exits_delete_mode() {
        let dir = tries();
        let mut sel = selector(dir.path(), SelectorOptions::default());
        let (result, _) = drive(&mut sel, "CTRL-D,CTRL-D,ENTER");
        assert_eq!(result, SelectionResult::Cd(dir.path().join("2025-11-01-alpha")));
    }

    #[cfg(unix)]
    #[test]
    fn test_delete_outside_base_refused() {
        let dir = tries();
        let outside = tempfile::tempdir().unwrap();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("escape")).unwrap();

        let options = SelectorOptions {
            confirm: Some("YES".to_string()),
            ..SelectorOptions::default()
        };
        let mut sel = selector(dir.path(), options);
        let (result, out) = drive(&mut sel, "TYPE=escape,CTRL-D,ENTER");
        assert_eq!(result, SelectionResult::Cancelled);
        assert!(out.contains("Error:"));
        assert!(out.contains("is not inside"));
    }

    #[test]
    fn test_delete_symlink_uses_own_name() {
        let dir = tries();
        fs::create_dir(dir.path().join("2025-11-01-alpha/sub")).unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        std::os::unix::fs::symlink(dir.path().join("2025-11-01-alpha/sub"), dir.path().join("zlink")).unwrap();

        let options = SelectorOptions {
            confirm: Some("YES".to_string()),
            ..SelectorOptions::default()
        };
        let mut sel = selector(dir.path(), options);
        let (result, _) = drive(&mut sel, "TYPE=zlink,CTRL-D,ENTER");

        let base = fs::canonicalize(dir.path()).unwrap();
        assert_eq!(
            result,
            SelectionResult::Delete {
                paths: vec![base.join("zlink")],
                base,
            }
        );
    }

    #[test]
    fn test_frame_layout() {
        let dir = tries();
        let mut sel = selector(dir.path(), SelectorOptions::default());
        let (_, out) = drive(&mut sel, "TYPE=al");
        assert!(out.contains("📁 Try Selector"));
        assert!(out.contains("Search: al"));
        assert!(out.contains("📁 2025-11-01-alpha"));
        assert!(out.contains(&format!("📂 Create new: {}-al", workspace::date_prefix())));
        assert!(out.contains("just now"));
        assert!(out.contains("↑↓: Navigate"));
    }

    #[test]
    fn test_scroll_indicator() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..10 {
            fs::create_dir(dir.path().join(format!("proj{}", i))).unwrap();
        }
        let options = SelectorOptions {
            output: OutputMode::empty(),
            ..SelectorOptions::default()
        };
        let mut sel = Selector::new(dir.path(), options).with_size(TerminalSize::fixed(80, 10));
        let (_, out) = drive(&mut sel, "");
        assert!(out.contains("[1-3/10]"));
    }

    #[test]
    fn test_unrecognized_sequence_ignored() {
        let dir = tries();
        // ESC [ 1 ; 5 A is dropped without touching the state
        let mut sel = selector(dir.path(), SelectorOptions::default());
        let (result, _) = drive(&mut sel, "\x1b[1;5Abeta\r");
        assert_eq!(result, SelectionResult::Cd(dir.path().join("2025-11-25-beta")));
    }

    #[test]
    fn test_resize_consumed_before_render() {
        let dir = tries();
        let mut sel = selector(dir.path(), SelectorOptions::default());
        let signals = SignalFlags::inert();
        let mut out = Vec::new();
        let mut idle = IdleInput;
        signals.mark_resized();
        let result = sel.run_loop(&mut idle, &mut out, &signals).unwrap();
        assert_eq!(result, SelectionResult::Cancelled);
        assert!(!signals.resize_pending());
    }

    struct IdleInput;

    impl ByteSource for IdleInput {
        fn read_byte(&mut self, _timeout: Option<Duration>) -> term::Result<term::ReadResult> {
            Ok(term::ReadResult::Closed)
        }
    }

    /// Times out once while a resize arrives, then closes
    struct ResizeWhileIdle<'a> {
        signals: &'a SignalFlags,
        ticks: usize,
    }

    impl ByteSource for ResizeWhileIdle<'_> {
        fn read_byte(&mut self, _timeout: Option<Duration>) -> term::Result<term::ReadResult> {
            if self.ticks == 0 {
                return Ok(term::ReadResult::Closed);
            }
            self.ticks -= 1;
            self.signals.mark_resized();
            Ok(term::ReadResult::TimedOut)
        }
    }

    #[test]
    fn test_resize_while_idle_redraws() {
        let dir = tries();
        let mut sel = selector(dir.path(), SelectorOptions::default());
        let signals = SignalFlags::inert();
        let mut out = Vec::new();
        let mut input = ResizeWhileIdle {
            signals: &signals,
            ticks: 1,
        };

        let result = sel.run_loop(&mut input, &mut out, &signals).unwrap();
        assert_eq!(result, SelectionResult::Cancelled);
        assert!(!signals.resize_pending());

        let out = String::from_utf8_lossy(&out);
        let first_frame = out.find("Try Selector").unwrap();
        let cleared = out.find("\x1b[2J").unwrap();
        assert!(first_frame < cleared);
        assert!(out[cleared..].contains("Try Selector"));
    }
}
