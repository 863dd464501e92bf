//! Selector state
//!
//! Query editing and cursor/scroll bookkeeping. Nothing here touches the
//! terminal or the filesystem.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Editable query line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    chars: Vec<char>,
    /// Insertion point, `0..=len`
    cursor: usize,
}

impl Query {
    /// A query with the cursor at the end
    pub fn new(text: &str) -> Self {
        let chars: Vec<char> = text.chars().collect();
        let cursor = chars.len();
        Self { chars, cursor }
    }

    pub fn text(&self) -> String {
        self.chars.iter().collect()
    }

    #[allow(dead_code)]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// Split around the cursor: text before, character under, text after
    pub fn split_at_cursor(&self) -> (String, Option<char>, String) {
        let before = self.chars[..self.cursor].iter().collect();
        let at = self.chars.get(self.cursor).copied();
        let after = self
            .chars
            .get(self.cursor + 1..)
            .map(|rest| rest.iter().collect())
            .unwrap_or_default();
        (before, at, after)
    }

    /// Characters accepted into the query
    pub fn accepts(c: char) -> bool {
        c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | ' ')
    }

    /// Insert at the cursor. Returns false if the character is not accepted.
    pub fn insert(&mut self, c: char) -> bool {
        if !Self::accepts(c) {
            return false;
        }
        self.chars.insert(self.cursor, c);
        self.cursor += 1;
        true
    }

    /// Delete the character before the cursor
    pub fn backspace(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        self.chars.remove(self.cursor);
        true
    }

    pub fn home(&mut self) {
        self.cursor = 0;
    }

    pub fn end(&mut self) {
        self.cursor = self.chars.len();
    }

    pub fn left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.chars.len());
    }

    /// Ctrl-K: drop everything from the cursor on
    pub fn kill_to_end(&mut self) {
        self.chars.truncate(self.cursor);
    }

    /// Ctrl-W: delete back to the previous word boundary.
    ///
    /// Non-alphanumerics directly before the cursor go first, then the
    /// alphanumeric run before them.
    pub fn delete_word(&mut self) {
        let mut start = self.cursor;
        while start > 0 && !self.chars[start - 1].is_alphanumeric() {
            start -= 1;
        }
        while start > 0 && self.chars[start - 1].is_alphanumeric() {
            start -= 1;
        }
        self.chars.drain(start..self.cursor);
        self.cursor = start;
    }
}

/// Browsing state of one selector session
#[derive(Debug, Default)]
pub struct SelectorState {
    /// Highlighted row, `0..=total` (the extra row is "create new")
    pub cursor_pos: usize,
    /// First visible row
    pub scroll_offset: usize,
    pub query: Query,
    pub delete_mode: bool,
    /// Paths marked for deletion; survive query changes
    pub marked: BTreeSet<PathBuf>,
    /// One-shot footer message
    pub status: Option<String>,
}

impl SelectorState {
    pub fn new(initial_query: &str) -> Self {
        Self {
            query: Query::new(initial_query),
            ..Self::default()
        }
    }

    pub fn move_up(&mut self) {
        self.cursor_pos = self.cursor_pos.saturating_sub(1);
    }

    /// Move down, stopping at the last of `total` rows
    pub fn move_down(&mut self, total: usize) {
        if self.cursor_pos + 1 < total {
            self.cursor_pos += 1;
        }
    }

    /// Clamp the cursor into `0..total` and scroll it into a window of
    /// `visible` rows
    pub fn clamp(&mut self, total: usize, visible: usize) {
        self.cursor_pos = self.cursor_pos.min(total.saturating_sub(1));

        if self.cursor_pos < self.scroll_offset {
            self.scroll_offset = self.cursor_pos;
        } else if visible > 0 && self.cursor_pos >= self.scroll_offset + visible {
            self.scroll_offset = self.cursor_pos + 1 - visible;
        }
    }

    /// Toggle a deletion mark. Marking switches delete mode on; removing
    /// the last mark switches it off.
    pub fn toggle_mark(&mut self, path: &Path) {
        if !self.marked.remove(path) {
            self.marked.insert(path.to_path_buf());
            self.delete_mode = true;
        } else if self.marked.is_empty() {
            self.delete_mode = false;
        }
    }

    pub fn is_marked(&self, path: &Path) -> bool {
        self.marked.contains(path)
    }

    /// Leave delete mode and forget all marks
    pub fn clear_marks(&mut self) {
        self.marked.clear();
        self.delete_mode = false;
    }
}
