//! Double-buffered line renderer
//!
//! Frames are built line by line with [`Renderer::print`] and
//! [`Renderer::puts`], then written with [`Renderer::flush`]. On a terminal
//! only lines that differ from the previous frame are re-emitted; unchanged
//! lines produce no output at all.
//!
//! # Output modes
//!
//! | Mode | Behaviour |
//! |------|-----------|
//! | TTY | cursor home, per-line diff, clear below a shrinking frame |
//! | non-TTY + forced colors | every line expanded and newline-terminated |
//! | non-TTY | tokens stripped, plain text |

use std::io::{self, Write};

use bitflags::bitflags;
use crossterm::{
    cursor::{Hide, MoveTo, Show},
    execute, queue,
    terminal::{Clear, ClearType},
};

use super::tokens;

const HOME: &str = "\x1b[H";
const CLEAR_BELOW: &str = "\x1b[0J";

bitflags! {
    /// Properties of the output stream
    #[derive(Clone, Copy, Debug, Default, PartialEq)]
    pub struct OutputMode: u8 {
        /// Output is a terminal (cursor addressing works)
        const TTY          = 0b0001;
        /// Emit styled output even when not a terminal
        const FORCE_COLORS = 0b0010;
    }
}

/// What happens to `{...}` tokens on output
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TokenMode {
    /// Replace with ANSI sequences
    #[default]
    Expand,
    /// Remove (colors disabled)
    Strip,
    /// Leave the markup untouched
    Literal,
}

impl TokenMode {
    /// Apply this mode to a piece of markup
    pub fn apply(self, text: &str) -> String {
        match self {
            TokenMode::Expand => tokens::expand(text),
            TokenMode::Strip => tokens::strip(text),
            TokenMode::Literal => text.to_string(),
        }
    }
}

/// Token renderer with frame diffing
#[derive(Debug, Default)]
pub struct Renderer {
    /// Lines built for the frame in progress
    buffer: Vec<String>,
    /// Lines written by the previous flush
    last_buffer: Vec<String>,
    /// Partial line not yet finalized
    current_line: String,
    mode: OutputMode,
    tokens: TokenMode,
}

impl Renderer {
    pub fn new(mode: OutputMode, tokens: TokenMode) -> Self {
        Self {
            buffer: Vec::new(),
            last_buffer: Vec::new(),
            current_line: String::new(),
            mode,
            tokens,
        }
    }

    /// Append text to the current line
    pub fn print(&mut self, text: &str) {
        self.current_line.push_str(text);
    }

    /// Append text and finalize the current line
    pub fn puts(&mut self, text: &str) {
        self.current_line.push_str(text);
        self.buffer.push(std::mem::take(&mut self.current_line));
    }

    /// Apply the token mode to one line
    pub fn render_line(&self, line: &str) -> String {
        self.tokens.apply(line)
    }

    /// Write the frame and make it the new diff baseline
    pub fn flush<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        if !self.current_line.is_empty() {
            self.buffer.push(std::mem::take(&mut self.current_line));
        }

        let is_tty = self.mode.contains(OutputMode::TTY);
        let forced = self.mode.contains(OutputMode::FORCE_COLORS);

        if is_tty {
            self.flush_diff(out)?;
        } else if forced {
            self.flush_stream(out)?;
        } else {
            self.flush_plain(out)?;
        }

        self.last_buffer = std::mem::take(&mut self.buffer);
        out.flush()
    }

    /// Terminal output: rewrite only lines that changed
    fn flush_diff<W: Write>(&self, out: &mut W) -> io::Result<()> {
        out.write_all(HOME.as_bytes())?;

        for (i, line) in self.buffer.iter().enumerate() {
            if self.last_buffer.get(i) == Some(line) {
                continue;
            }
            queue!(out, MoveTo(0, i as u16), Clear(ClearType::CurrentLine))?;
            self.write_line(out, line)?;
        }

        if self.buffer.len() < self.last_buffer.len() {
            queue!(out, MoveTo(0, self.buffer.len() as u16))?;
            out.write_all(CLEAR_BELOW.as_bytes())?;
        }
        Ok(())
    }

    /// Captured output with colors: nothing can be redrawn, so emit every line
    fn flush_stream<W: Write>(&self, out: &mut W) -> io::Result<()> {
        for line in &self.buffer {
            self.write_line(out, line)?;
            out.write_all(b"\n")?;
        }
        Ok(())
    }

    fn flush_plain<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let plain = self
            .buffer
            .iter()
            .map(|line| tokens::strip(line))
            .collect::<Vec<_>>()
            .join("\n");
        out.write_all(plain.as_bytes())?;
        if !plain.ends_with('\n') {
            out.write_all(b"\n")?;
        }
        Ok(())
    }

    fn write_line<W: Write>(&self, out: &mut W, line: &str) -> io::Result<()> {
        if line.is_empty() {
            return Ok(());
        }
        out.write_all(self.render_line(line).as_bytes())?;
        if self.tokens == TokenMode::Expand {
            out.write_all(tokens::RESET.as_bytes())?;
        }
        Ok(())
    }

    /// Clear the screen and forget both buffers so the next flush repaints
    pub fn clear_screen<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        self.current_line.clear();
        self.buffer.clear();
        self.last_buffer.clear();
        queue!(out, Clear(ClearType::All))?;
        out.write_all(HOME.as_bytes())?;
        out.flush()
    }

    pub fn hide_cursor<W: Write>(&self, out: &mut W) -> io::Result<()> {
        execute!(out, Hide)
    }

    pub fn show_cursor<W: Write>(&self, out: &mut W) -> io::Result<()> {
        execute!(out, Show)
    }
}
