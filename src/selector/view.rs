//! Frame composition for the selector screens

use std::io::Write;
use std::time::SystemTime;

use unicode_width::UnicodeWidthStr;

use super::candidate::Candidate;
use super::{Phase, Selector};
use crate::core::fuzzy;
use crate::ui::Renderer;
use crate::workspace;

/// Columns taken by the arrow and icon before a name
const PREFIX_WIDTH: usize = 5;

const HELP_LINE: &str = "{dim}↑↓: Navigate  Enter: Select  Ctrl-D: Delete  Esc: Cancel{/fg}";

/// Rows available for the candidate list
pub fn viewport_height(term_height: u16) -> usize {
    (term_height as usize).saturating_sub(8).max(3)
}

/// `just now`, `5m ago`, `3h ago`, `2d ago`, `4w ago`
pub fn format_relative_time(time: SystemTime, now: SystemTime) -> String {
    let seconds = now.duration_since(time).map(|d| d.as_secs()).unwrap_or(0);
    let minutes = seconds / 60;
    let hours = minutes / 60;
    let days = hours / 24;

    if seconds < 60 {
        "just now".to_string()
    } else if minutes < 60 {
        format!("{}m ago", minutes)
    } else if hours < 24 {
        format!("{}h ago", hours)
    } else if days < 7 {
        format!("{}d ago", days)
    } else {
        format!("{}w ago", days / 7)
    }
}

/// Longest prefix of `text` that fits in `cols` columns
fn fit_width(text: &str, cols: usize) -> &str {
    let mut used = 0;
    for (i, c) in text.char_indices() {
        let w = unicode_width::UnicodeWidthChar::width(c).unwrap_or(0);
        if used + w > cols {
            return &text[..i];
        }
        used += w;
    }
    text
}

impl Selector {
    /// Build and flush the frame for the current phase
    pub(super) fn render<W: Write>(&mut self, out: &mut W) -> std::io::Result<()> {
        match &self.phase {
            Phase::ConfirmingDelete { typed } => {
                let typed = typed.clone();
                self.compose_confirm(&typed);
            }
            Phase::Browsing => self.compose_browse(),
        }
        self.renderer.flush(out)
    }

    fn compose_browse(&mut self) {
        let width = self.size.width() as usize;
        let height = self.size.height();
        let separator = "─".repeat(width.saturating_sub(1));
        let query = self.state.query.text();

        let r = &mut self.renderer;
        r.puts("{h1}📁 Try Selector{reset}");
        r.puts(&format!("{{dim}}{}{{/fg}}", separator));

        let (before, at, after) = self.state.query.split_at_cursor();
        r.puts(&format!(
            "{{dim}}Search:{{/fg}} {{b}}{}\x1b[7m{}\x1b[27m{}{{/b}}",
            before,
            at.unwrap_or(' '),
            after
        ));
        r.puts(&format!("{{dim}}{}{{/fg}}", separator));

        let max_visible = viewport_height(height);
        let shown = self.view.len();
        let total_items = shown + usize::from(!query.is_empty());
        self.state.clamp(total_items, max_visible);

        let scroll = self.state.scroll_offset;
        let visible_end = (scroll + max_visible).min(total_items);
        let entries = self.cache.entries();

        for idx in scroll..visible_end {
            if idx == shown && shown > 0 {
                r.puts("");
            }

            let selected = idx == self.state.cursor_pos;
            r.print(if selected { "{b}→ {/b}" } else { "  " });

            if let Some(&entry) = self.view.get(idx) {
                let candidate = &entries[entry];
                let marked = self.state.is_marked(&candidate.path);
                compose_row(r, candidate, &query, selected, marked, width, self.now);
            } else {
                if selected {
                    r.print("{section}");
                }
                let display = format!("📂 Create new: {}-{}", workspace::date_prefix(), query);
                let padding = width.saturating_sub(3 + display.width()).max(1);
                r.print(&display);
                r.print(&" ".repeat(padding));
            }
            r.puts("");
        }

        if total_items > max_visible {
            r.puts(&format!("{{dim}}{}{{/fg}}", separator));
            r.puts(&format!("{{dim}}[{}-{}/{}]{{/fg}}", scroll + 1, visible_end, total_items));
        }

        r.puts(&format!("{{dim}}{}{{/fg}}", separator));

        if let Some(status) = self.state.status.take() {
            r.puts(&format!("{{b}}{}{{/b}}", status));
        } else if self.state.delete_mode {
            r.puts(&format!(
                "{{strike}} DELETE MODE {{/strike}} {} marked  |  Ctrl-D: Toggle  Enter: Confirm  Esc: Cancel",
                self.state.marked.len()
            ));
        } else {
            r.puts(HELP_LINE);
        }
    }

    fn compose_confirm(&mut self, typed: &str) {
        let count = self.state.marked.len();
        let suffix = if count == 1 { "y" } else { "ies" };

        let r = &mut self.renderer;
        r.puts(&format!("{{h2}}Delete {} Director{}{{reset}}", count, suffix));
        r.puts("");
        for path in &self.state.marked {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            r.puts(&format!("  {{strike}}📁 {}{{/strike}}", name));
        }
        r.puts("");
        r.puts(&format!(
            "{{b}}Type {{/b}}YES{{b}} to confirm deletion: {{/b}}{}\x1b[7m \x1b[27m",
            typed
        ));
    }
}

/// One candidate row after the arrow
fn compose_row(
    r: &mut Renderer,
    candidate: &Candidate,
    query: &str,
    selected: bool,
    marked: bool,
    width: usize,
    now: SystemTime,
) {
    let meta = format!(
        "{}, {:.1}",
        format_relative_time(candidate.mtime, now),
        candidate.score
    );
    let meta_start = width.saturating_sub(meta.width() + 1);
    let max_name_for_meta = meta_start.saturating_sub(PREFIX_WIDTH + 1);
    let max_name_width = width.saturating_sub(PREFIX_WIDTH + 1);

    if marked {
        r.print("{strike}");
    }
    r.print(if marked { "🗑️  " } else { "📁 " });
    if selected {
        r.print("{section}");
    }

    let display_width = match fuzzy::split_date_prefix(&candidate.name) {
        Some((date, name)) => {
            let mut name_part = name.to_string();
            let full_width = date.width() + 1 + name.width();
            if full_width > max_name_width && max_name_width > 14 {
                let available = max_name_width - 13;
                if name.width() > available + 1 {
                    name_part = format!("{}…", fit_width(name, available));
                }
            }

            r.print(&format!("{{dim}}{}{{/fg}}", date));
            r.print(if query.contains('-') { "{b}-{/b}" } else { "{dim}-{/fg}" });
            r.print(&fuzzy::highlight_matches(&name_part, query));
            date.width() + 1 + name_part.width()
        }
        None => {
            let mut name = candidate.name.clone();
            if name.width() > max_name_width && max_name_width > 2 {
                name = format!("{}…", fit_width(&candidate.name, max_name_width - 1));
            }
            r.print(&fuzzy::highlight_matches(&name, query));
            name.width()
        }
    };

    if selected {
        r.print("{/section}");
    }

    if display_width <= max_name_for_meta {
        let padding = meta_start.saturating_sub(PREFIX_WIDTH + display_width);
        r.print(&" ".repeat(padding));
        r.print(&format!("{{dim}}{}{{/fg}}", meta));
    }

    if marked {
        r.print("{/strike}");
    }
}
