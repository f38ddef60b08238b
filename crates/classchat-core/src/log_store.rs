//! Log store repository traits.
//!
//! The class log is a spreadsheet: one worksheet per student nickname holding
//! `[timestamp, role, content]` rows, a shared summary worksheet, and a template
//! worksheet new student sheets are copied from. These traits decouple the
//! orchestration logic from the concrete storage (remote spreadsheet, in-memory
//! workbook, JSON snapshot, ...). Row and column indices are 1-based.

use crate::conversation::MessageRole;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Name of the worksheet new student sheets are copied from.
pub const TEMPLATE_SHEET: &str = "template";
/// Name of the shared worksheet holding one row per student.
pub const SUMMARY_SHEET: &str = "summary";

/// Column holding the `HH:MM` timestamp of a log row.
pub const TIMESTAMP_COLUMN: usize = 1;
/// Column holding the `USER` / `ASSISTANT` label of a log row.
pub const ROLE_COLUMN: usize = 2;
/// Column holding the message text of a log row.
pub const CONTENT_COLUMN: usize = 3;
/// Column receiving a generated session title, on the session's first row.
pub const TITLE_COLUMN: usize = 4;

/// Offset of the class clock (Asia/Seoul, no daylight saving).
const CLASS_UTC_OFFSET_SECS: i32 = 9 * 3600;

/// A single located cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub row: usize,
    pub col: usize,
    pub value: String,
}

/// A rectangular, 1-based, inclusive cell range (`A3:C7`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRange {
    pub start_row: usize,
    pub start_col: usize,
    pub end_row: usize,
    pub end_col: usize,
}

impl CellRange {
    /// Rows `start..=end` of the three log columns.
    pub fn log_rows(start_row: usize, end_row: usize) -> Self {
        Self {
            start_row,
            start_col: TIMESTAMP_COLUMN,
            end_row,
            end_col: CONTENT_COLUMN,
        }
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}:{}{}",
            column_letters(self.start_col),
            self.start_row,
            column_letters(self.end_col),
            self.end_row
        )
    }
}

fn column_letters(mut col: usize) -> String {
    let mut letters = Vec::new();
    while col > 0 {
        let rem = (col - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        col = (col - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// An ordered, append-only table of rows (one worksheet).
#[async_trait]
pub trait LogStore: Send + Sync {
    /// Worksheet title.
    fn title(&self) -> String;

    /// Appends a row after the last non-empty row.
    async fn append_row(&self, values: Vec<String>) -> Result<()>;

    /// Every row of the sheet, in row order.
    async fn get_all_values(&self) -> Result<Vec<Vec<String>>>;

    /// The rows inside `range`, trimmed to its columns.
    async fn get(&self, range: &CellRange) -> Result<Vec<Vec<String>>>;

    /// Overwrites a single cell, growing the sheet if needed.
    async fn update_cell(&self, row: usize, col: usize, value: &str) -> Result<()>;

    /// Deletes `row`, shifting later rows up.
    async fn delete_rows(&self, row: usize) -> Result<()>;

    /// First cell whose value equals `value`, optionally restricted to one column.
    async fn find(&self, value: &str, column: Option<usize>) -> Result<Option<Cell>>;
}

/// A collection of worksheets shared by one class.
#[async_trait]
pub trait Workbook: Send + Sync {
    /// Looks up an existing worksheet by title.
    async fn worksheet(&self, name: &str) -> Result<Arc<dyn LogStore>>;

    /// Returns the student's worksheet, creating it from the template on first use.
    ///
    /// Creating a worksheet also registers the nickname in column 1 of the
    /// summary sheet so evaluations can be written next to it later.
    async fn get_or_create_worksheet(&self, nickname: &str) -> Result<Arc<dyn LogStore>>;

    /// The shared summary worksheet.
    async fn summary_sheet(&self) -> Result<Arc<dyn LogStore>> {
        self.worksheet(SUMMARY_SHEET).await
    }
}

/// Formats `now` as the `HH:MM` class-clock timestamp written into log rows.
pub fn log_timestamp(now: DateTime<Utc>) -> String {
    match FixedOffset::east_opt(CLASS_UTC_OFFSET_SECS) {
        Some(offset) => now.with_timezone(&offset).format("%H:%M").to_string(),
        None => now.format("%H:%M").to_string(),
    }
}

/// Builds a `[timestamp, ROLE, content]` log row. System entries are never logged.
pub fn log_row(role: MessageRole, content: &str, timestamp: String) -> Option<Vec<String>> {
    role.log_label()
        .map(|label| vec![timestamp, label.to_string(), content.to_string()])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_range_displays_in_a1_notation() {
        assert_eq!(CellRange::log_rows(3, 7).to_string(), "A3:C7");
        let wide = CellRange {
            start_row: 12,
            start_col: 28,
            end_row: 12,
            end_col: 703,
        };
        assert_eq!(wide.to_string(), "AB12:AAA12");
    }

    #[test]
    fn test_log_timestamp_uses_class_clock() {
        let now = Utc.with_ymd_and_hms(2024, 3, 4, 23, 5, 0).unwrap();
        assert_eq!(log_timestamp(now), "08:05");
    }

    #[test]
    fn test_log_row_labels() {
        let row = log_row(MessageRole::User, "hi", "09:00".into()).unwrap();
        assert_eq!(row, vec!["09:00", "USER", "hi"]);
        assert!(log_row(MessageRole::System, "sys", "09:00".into()).is_none());
    }
}
