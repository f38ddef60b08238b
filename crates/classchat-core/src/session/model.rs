use serde::{Deserialize, Serialize};

/// One message row of a student's log sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRow {
    /// 1-based sheet row.
    pub row: usize,
    /// Wall-clock `HH:MM`; no date component.
    pub timestamp: String,
    /// Raw role label (`USER` / `ASSISTANT`).
    pub role: String,
    pub content: String,
}

impl LogRow {
    /// Builds a row from raw cell values; missing cells read as empty.
    pub fn from_values(row: usize, values: &[String]) -> Self {
        let cell = |index: usize| values.get(index).cloned().unwrap_or_default();
        Self {
            row,
            timestamp: cell(0),
            role: cell(1),
            content: cell(2),
        }
    }

    /// Rows missing a timestamp or content never take part in segmentation.
    pub fn is_blank(&self) -> bool {
        self.timestamp.trim().is_empty() || self.content.trim().is_empty()
    }
}

/// A conversational session derived from a contiguous run of log rows.
///
/// Sessions are never stored; only a generated title is written back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub start_time: String,
    pub end_time: String,
    pub message_count: usize,
    /// Opening message, shortened for display.
    pub first_message: String,
    pub row_start: usize,
    pub row_end: usize,
}
