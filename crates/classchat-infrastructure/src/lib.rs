//! Storage adapters for ClassChat.
//!
//! Provides an in-process [`MemoryWorkbook`] implementing the core `Workbook` and
//! `LogStore` traits, optionally backed by a JSON snapshot file.

pub mod json_snapshot;
pub mod memory_workbook;

pub use json_snapshot::{WorkbookSnapshot, load_snapshot, save_snapshot};
pub use memory_workbook::{MemorySheet, MemoryWorkbook};
