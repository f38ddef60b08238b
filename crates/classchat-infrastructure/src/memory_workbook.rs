//! In-process workbook.
//!
//! Every worksheet is a grid of strings behind a `std::sync::RwLock`. No lock is
//! held across an await point.

use crate::json_snapshot::{WorkbookSnapshot, load_snapshot, save_snapshot};
use async_trait::async_trait;
use classchat_core::error::{ClassChatError, Result};
use classchat_core::log_store::{
    Cell, CellRange, LogStore, SUMMARY_SHEET, TEMPLATE_SHEET, Workbook,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

fn poisoned(what: &str) -> ClassChatError {
    ClassChatError::internal(format!("{what} lock poisoned"))
}

/// One worksheet.
#[derive(Debug)]
pub struct MemorySheet {
    title: String,
    rows: RwLock<Vec<Vec<String>>>,
}

impl MemorySheet {
    pub fn new(title: impl Into<String>) -> Self {
        Self::with_rows(title, Vec::new())
    }

    pub fn with_rows(title: impl Into<String>, rows: Vec<Vec<String>>) -> Self {
        Self {
            title: title.into(),
            rows: RwLock::new(rows),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Vec<Vec<String>>>> {
        self.rows.read().map_err(|_| poisoned(&self.title))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Vec<Vec<String>>>> {
        self.rows.write().map_err(|_| poisoned(&self.title))
    }

    /// Copy of every row.
    pub fn rows(&self) -> Result<Vec<Vec<String>>> {
        Ok(self.read()?.clone())
    }

    fn append_now(&self, values: Vec<String>) -> Result<()> {
        let mut rows = self.write()?;
        while rows
            .last()
            .is_some_and(|row| row.iter().all(|cell| cell.is_empty()))
        {
            rows.pop();
        }
        rows.push(values);
        Ok(())
    }
}

#[async_trait]
impl LogStore for MemorySheet {
    fn title(&self) -> String {
        self.title.clone()
    }

    async fn append_row(&self, values: Vec<String>) -> Result<()> {
        self.append_now(values)
    }

    async fn get_all_values(&self) -> Result<Vec<Vec<String>>> {
        self.rows()
    }

    async fn get(&self, range: &CellRange) -> Result<Vec<Vec<String>>> {
        if range.start_row == 0 || range.start_col == 0 {
            return Err(ClassChatError::parse(format!("invalid range {range}")));
        }
        let rows = self.read()?;
        Ok(rows
            .iter()
            .skip(range.start_row - 1)
            .take((range.end_row + 1).saturating_sub(range.start_row))
            .map(|row| {
                row.iter()
                    .skip(range.start_col - 1)
                    .take((range.end_col + 1).saturating_sub(range.start_col))
                    .cloned()
                    .collect()
            })
            .collect())
    }

    async fn update_cell(&self, row: usize, col: usize, value: &str) -> Result<()> {
        if row == 0 || col == 0 {
            return Err(ClassChatError::parse(format!(
                "cell ({row}, {col}) is out of range"
            )));
        }
        let mut rows = self.write()?;
        if rows.len() < row {
            rows.resize(row, Vec::new());
        }
        let cells = &mut rows[row - 1];
        if cells.len() < col {
            cells.resize(col, String::new());
        }
        cells[col - 1] = value.to_string();
        Ok(())
    }

    async fn delete_rows(&self, row: usize) -> Result<()> {
        let mut rows = self.write()?;
        if row == 0 || row > rows.len() {
            return Err(ClassChatError::not_found("row", format!("{}!{row}", self.title)));
        }
        rows.remove(row - 1);
        Ok(())
    }

    async fn find(&self, value: &str, column: Option<usize>) -> Result<Option<Cell>> {
        let rows = self.read()?;
        let found = rows.iter().enumerate().find_map(|(r, cells)| {
            cells
                .iter()
                .enumerate()
                .filter(|(c, _)| column.is_none_or(|col| col == c + 1))
                .find(|(_, cell)| cell.as_str() == value)
                .map(|(c, cell)| Cell {
                    row: r + 1,
                    col: c + 1,
                    value: cell.clone(),
                })
        });
        Ok(found)
    }
}

/// Worksheets of one class, keyed by title.
///
/// A fresh workbook holds an empty template sheet and an empty summary sheet.
/// When opened with a snapshot path, [`MemoryWorkbook::flush`] writes the current
/// contents back to that file.
#[derive(Debug)]
pub struct MemoryWorkbook {
    sheets: RwLock<BTreeMap<String, Arc<MemorySheet>>>,
    snapshot_path: Option<PathBuf>,
}

impl Default for MemoryWorkbook {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryWorkbook {
    pub fn new() -> Self {
        Self::from_sheets(BTreeMap::new())
    }

    /// A fresh workbook whose template, copied into every new student
    /// worksheet, holds `rows`.
    pub fn with_template(rows: Vec<Vec<String>>) -> Self {
        Self::from_sheets(BTreeMap::from([(TEMPLATE_SHEET.to_string(), rows)]))
    }

    fn from_sheets(rows_by_title: BTreeMap<String, Vec<Vec<String>>>) -> Self {
        let mut sheets: BTreeMap<String, Arc<MemorySheet>> = rows_by_title
            .into_iter()
            .map(|(title, rows)| {
                let sheet = Arc::new(MemorySheet::with_rows(title.clone(), rows));
                (title, sheet)
            })
            .collect();
        for required in [TEMPLATE_SHEET, SUMMARY_SHEET] {
            sheets
                .entry(required.to_string())
                .or_insert_with(|| Arc::new(MemorySheet::new(required)));
        }
        Self {
            sheets: RwLock::new(sheets),
            snapshot_path: None,
        }
    }

    /// Opens the workbook stored at `path`, or an empty one if the file is absent.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let sheets = load_snapshot(path)
            .await?
            .map(|snapshot| snapshot.sheets)
            .unwrap_or_default();
        tracing::info!(path = %path.display(), sheets = sheets.len(), "opened workbook");
        let mut workbook = Self::from_sheets(sheets);
        workbook.snapshot_path = Some(path.to_path_buf());
        Ok(workbook)
    }

    /// Titles of all worksheets, in order.
    pub fn titles(&self) -> Result<Vec<String>> {
        Ok(self
            .sheets
            .read()
            .map_err(|_| poisoned("workbook"))?
            .keys()
            .cloned()
            .collect())
    }

    /// Captures the current contents of every worksheet.
    pub fn snapshot(&self) -> Result<WorkbookSnapshot> {
        let sheets = self.sheets.read().map_err(|_| poisoned("workbook"))?;
        let mut rows_by_title = BTreeMap::new();
        for (title, sheet) in sheets.iter() {
            rows_by_title.insert(title.clone(), sheet.rows()?);
        }
        Ok(WorkbookSnapshot::new(rows_by_title))
    }

    /// Writes the workbook to its snapshot file. A no-op without one.
    pub async fn flush(&self) -> Result<()> {
        let Some(path) = self.snapshot_path.as_deref() else {
            return Ok(());
        };
        save_snapshot(path, self.snapshot()?).await
    }

    fn sheet(&self, name: &str) -> Result<Option<Arc<MemorySheet>>> {
        Ok(self
            .sheets
            .read()
            .map_err(|_| poisoned("workbook"))?
            .get(name)
            .cloned())
    }
}

#[async_trait]
impl Workbook for MemoryWorkbook {
    async fn worksheet(&self, name: &str) -> Result<Arc<dyn LogStore>> {
        self.sheet(name)?
            .map(|sheet| sheet as Arc<dyn LogStore>)
            .ok_or_else(|| ClassChatError::not_found("worksheet", name))
    }

    async fn get_or_create_worksheet(&self, nickname: &str) -> Result<Arc<dyn LogStore>> {
        let (sheet, created) = {
            let mut sheets = self.sheets.write().map_err(|_| poisoned("workbook"))?;
            match sheets.get(nickname) {
                Some(existing) => (existing.clone(), false),
                None => {
                    let template = match sheets.get(TEMPLATE_SHEET) {
                        Some(template) => template.rows()?,
                        None => Vec::new(),
                    };
                    let sheet = Arc::new(MemorySheet::with_rows(nickname, template));
                    sheets.insert(nickname.to_string(), sheet.clone());
                    (sheet, true)
                }
            }
        };

        if created {
            tracing::info!(nickname, "created worksheet from template");
            let summary = self
                .sheet(SUMMARY_SHEET)?
                .ok_or_else(|| ClassChatError::not_found("worksheet", SUMMARY_SHEET))?;
            summary.append_now(vec![nickname.to_string()])?;
        }
        Ok(sheet as Arc<dyn LogStore>)
    }
}
