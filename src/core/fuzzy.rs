//! Fuzzy relevance scoring
//!
//! A single pure function ranks candidate names against the query. Several
//! independent heuristics are summed and scaled:
//!
//! | Heuristic | Contribution |
//! |-----------|--------------|
//! | Date prefix `YYYY-MM-DD-` | +2.0 |
//! | Matched character | +1.0 |
//! | Match at a word boundary | +1.0 |
//! | Proximity to the previous match | +2.0 / sqrt(gap + 1) |
//! | Density | × query_len / (last_match + 1) |
//! | Length penalty | × 10 / (text_len + 10) |
//! | Recency | +3.0 / sqrt(hours_since_mtime + 1) |

use std::time::SystemTime;

const DATE_BONUS: f64 = 2.0;
const MATCH_POINT: f64 = 1.0;
const BOUNDARY_BONUS: f64 = 1.0;
const PROXIMITY_WEIGHT: f64 = 2.0;
const LENGTH_BASE: f64 = 10.0;
const RECENCY_WEIGHT: f64 = 3.0;

/// Whether `text` starts with `YYYY-MM-DD-`
pub fn has_date_prefix(text: &str) -> bool {
    let b = text.as_bytes();
    b.len() >= 11
        && b[..4].iter().all(u8::is_ascii_digit)
        && b[4] == b'-'
        && b[5..7].iter().all(u8::is_ascii_digit)
        && b[7] == b'-'
        && b[8..10].iter().all(u8::is_ascii_digit)
        && b[10] == b'-'
}

/// Split `YYYY-MM-DD-rest` into (`YYYY-MM-DD`, `rest`); `rest` must be non-empty
pub fn split_date_prefix(text: &str) -> Option<(&str, &str)> {
    if has_date_prefix(text) && text.len() > 11 {
        Some((&text[..10], &text[11..]))
    } else {
        None
    }
}

/// Recency bonus for a modification time; 0 when unknown
pub fn recency(mtime: Option<SystemTime>, now: SystemTime) -> f64 {
    let Some(mtime) = mtime else {
        return 0.0;
    };
    // Timestamps in the future count as "just modified"
    let hours = now
        .duration_since(mtime)
        .map(|d| d.as_secs_f64() / 3600.0)
        .unwrap_or(0.0);
    RECENCY_WEIGHT / (hours + 1.0).sqrt()
}

/// Score `text` against `query`. Returns 0.0 when the query is not a
/// case-insensitive subsequence of the text.
pub fn score(text: &str, query: &str, mtime: Option<SystemTime>, now: SystemTime) -> f64 {
    let mut score = 0.0;

    if has_date_prefix(text) {
        score += DATE_BONUS;
    }

    if !query.is_empty() {
        let text_lower: Vec<char> = text.to_lowercase().chars().collect();
        let query_chars: Vec<char> = query.to_lowercase().chars().collect();
        let query_len = query_chars.len();

        let mut last_pos: Option<usize> = None;
        let mut query_idx = 0;

        for (i, &ch) in text_lower.iter().enumerate() {
            if query_idx >= query_len {
                break;
            }
            if ch != query_chars[query_idx] {
                continue;
            }

            score += MATCH_POINT;

            if i == 0 || !text_lower[i - 1].is_alphanumeric() {
                score += BOUNDARY_BONUS;
            }

            if let Some(last) = last_pos {
                let gap = (i - last - 1) as f64;
                score += PROXIMITY_WEIGHT / (gap + 1.0).sqrt();
            }

            last_pos = Some(i);
            query_idx += 1;
        }

        if query_idx < query_len {
            return 0.0;
        }

        if let Some(last) = last_pos {
            score *= query_len as f64 / (last + 1) as f64;
        }

        score *= LENGTH_BASE / (text.chars().count() as f64 + LENGTH_BASE);
    }

    score + recency(mtime, now)
}

/// Wrap characters of `text` that match `query` (in order, case-insensitive)
/// with `{b}`/`{/b}` tokens
pub fn highlight_matches(text: &str, query: &str) -> String {
    if query.is_empty() {
        return text.to_string();
    }

    let query_chars: Vec<char> = query.to_lowercase().chars().collect();
    let mut query_idx = 0;
    let mut result = String::with_capacity(text.len() * 2);

    for ch in text.chars() {
        let matched = query_idx < query_chars.len() && {
            let mut lower = ch.to_lowercase();
            lower.next() == Some(query_chars[query_idx]) && lower.next().is_none()
        };
        if matched {
            result.push_str("{b}");
            result.push(ch);
            result.push_str("{/b}");
            query_idx += 1;
        } else {
            result.push(ch);
        }
    }

    result
}
