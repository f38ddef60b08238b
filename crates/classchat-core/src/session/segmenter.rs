//! Time-gap session segmentation.
//!
//! Timestamps are bare `HH:MM` values, so gaps are pure clock differences. A log
//! that crosses midnight measures `23:50 -> 00:10` as 1420 minutes and splits
//! there; this is a property of the log format and is left as is.

use super::model::{LogRow, Session};
use crate::error::{ClassChatError, Result};
use chrono::{NaiveTime, Timelike};

/// Default maximum gap, in minutes, between two rows of the same session.
pub const DEFAULT_GAP_MINUTES: u32 = 30;
/// Characters of the opening message kept in [`Session::first_message`].
pub const PREVIEW_CHARS: usize = 50;
const ELLIPSIS: &str = "...";

/// Parses `HH:MM` into minutes since midnight.
pub fn parse_clock_minutes(text: &str) -> Result<u32> {
    let time = NaiveTime::parse_from_str(text.trim(), "%H:%M")
        .map_err(|err| ClassChatError::parse(format!("invalid time '{text}': {err}")))?;
    Ok(time.hour() * 60 + time.minute())
}

/// Shortens `content` to `max_chars` characters, marking the cut with `...`.
pub fn preview(content: &str, max_chars: usize) -> String {
    if content.chars().count() > max_chars {
        let mut short: String = content.chars().take(max_chars).collect();
        short.push_str(ELLIPSIS);
        short
    } else {
        content.to_string()
    }
}

/// Converts raw sheet values into log rows, dropping blank ones.
pub fn rows_from_values(values: &[Vec<String>]) -> Vec<LogRow> {
    values
        .iter()
        .enumerate()
        .map(|(index, cells)| LogRow::from_values(index + 1, cells))
        .filter(|row| !row.is_blank())
        .collect()
}

/// Groups log rows into sessions split by time gaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSegmenter {
    gap_minutes: u32,
}

impl Default for SessionSegmenter {
    fn default() -> Self {
        Self::new(DEFAULT_GAP_MINUTES)
    }
}

struct OpenSession {
    session: Session,
}

impl OpenSession {
    fn seed(row: &LogRow) -> Self {
        Self {
            session: Session {
                start_time: row.timestamp.trim().to_string(),
                end_time: row.timestamp.trim().to_string(),
                message_count: 1,
                first_message: preview(&row.content, PREVIEW_CHARS),
                row_start: row.row,
                row_end: row.row,
            },
        }
    }

    fn extend(&mut self, row: &LogRow) {
        self.session.end_time = row.timestamp.trim().to_string();
        self.session.message_count += 1;
        self.session.row_end = row.row;
    }
}

impl SessionSegmenter {
    pub fn new(gap_minutes: u32) -> Self {
        Self { gap_minutes }
    }

    pub fn gap_minutes(&self) -> u32 {
        self.gap_minutes
    }

    /// Splits `rows` into sessions.
    ///
    /// Blank rows and rows with an unparseable time are skipped: they neither
    /// extend nor close a session. The output depends only on the input.
    pub fn segment(&self, rows: &[LogRow]) -> Vec<Session> {
        let mut sessions = Vec::new();
        let mut current: Option<OpenSession> = None;
        let mut last_minutes = 0u32;

        for row in rows.iter().filter(|row| !row.is_blank()) {
            let minutes = match parse_clock_minutes(&row.timestamp) {
                Ok(minutes) => minutes,
                Err(err) => {
                    tracing::debug!(row = row.row, %err, "skipping log row");
                    continue;
                }
            };

            match current.as_mut() {
                Some(open) if minutes.abs_diff(last_minutes) <= self.gap_minutes => {
                    open.extend(row);
                }
                _ => {
                    if let Some(done) = current.take() {
                        sessions.push(done.session);
                    }
                    current = Some(OpenSession::seed(row));
                }
            }
            last_minutes = minutes;
        }

        if let Some(done) = current {
            sessions.push(done.session);
        }
        sessions
    }

    /// Segments raw `get_all_values()` output.
    pub fn segment_values(&self, values: &[Vec<String>]) -> Vec<Session> {
        self.segment(&rows_from_values(values))
    }
}
