#![allow(dead_code)]

use async_trait::async_trait;
use classchat_core::chat::{ChatClient, ChatRequest, ChatResponse, StreamEvent};
use classchat_core::config::SetupInfo;
use classchat_core::error::{ClassChatError, Result};
use classchat_core::log_store::{
    Cell, CellRange, LogStore, SUMMARY_SHEET, TEMPLATE_SHEET, Workbook,
};
use classchat_core::persistence::Backoff;
use futures::StreamExt;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn setup(stream: bool) -> SetupInfo {
    let values = [
        "https://sheets.example/class",
        "on",
        "anthropic",
        "sk-test",
        "claude-test",
        "512",
        "0.5",
        "",
        "You are a patient tutor.",
        "EVALUATE",
        "COMMENT",
        if stream { "true" } else { "false" },
    ];
    SetupInfo::from_values(&values).unwrap()
}

/// What the fake client answers to the next request.
pub enum Script {
    Reply(String),
    Stream(Vec<Result<StreamEvent>>),
    Fail(ClassChatError),
}

pub fn streamed(chunks: &[&str]) -> Script {
    let mut events = vec![Ok(StreamEvent::MessageStart)];
    events.extend(chunks.iter().map(|c| {
        Ok(StreamEvent::ContentBlockDelta {
            text: c.to_string(),
        })
    }));
    events.push(Ok(StreamEvent::MessageDelta));
    events.push(Ok(StreamEvent::MessageStop));
    Script::Stream(events)
}

#[derive(Default)]
pub struct FakeClient {
    scripts: Mutex<VecDeque<Script>>,
    pub requests: Mutex<Vec<ChatRequest>>,
}

impl FakeClient {
    pub fn new(scripts: Vec<Script>) -> Arc<Self> {
        Arc::new(Self {
            scripts: Mutex::new(scripts.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatClient for FakeClient {
    async fn create_message(&self, request: ChatRequest) -> Result<ChatResponse> {
        self.requests.lock().unwrap().push(request);
        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Script::Fail(ClassChatError::remote("no script left")));
        match script {
            Script::Reply(text) => Ok(ChatResponse::Message(text)),
            Script::Stream(events) => Ok(ChatResponse::Stream(futures::stream::iter(events).boxed())),
            Script::Fail(err) => Err(err),
        }
    }
}

#[derive(Default)]
pub struct FakeSheet {
    title: String,
    pub rows: Mutex<Vec<Vec<String>>>,
    /// Number of upcoming `update_cell` calls that fail.
    pub failing_updates: AtomicU32,
    pub failing_appends: AtomicBool,
    pub failing_reads: AtomicBool,
}

impl FakeSheet {
    pub fn new(title: &str) -> Arc<Self> {
        Arc::new(Self {
            title: title.to_string(),
            ..Default::default()
        })
    }

    pub fn with_rows(title: &str, rows: Vec<Vec<&str>>) -> Arc<Self> {
        let sheet = Self::new(title);
        *sheet.rows.lock().unwrap() = rows
            .into_iter()
            .map(|r| r.into_iter().map(String::from).collect())
            .collect();
        sheet
    }

    pub fn rows(&self) -> Vec<Vec<String>> {
        self.rows.lock().unwrap().clone()
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<String> {
        self.rows
            .lock()
            .unwrap()
            .get(row - 1)
            .and_then(|r| r.get(col - 1))
            .cloned()
    }
}

#[async_trait]
impl LogStore for FakeSheet {
    fn title(&self) -> String {
        self.title.clone()
    }

    async fn append_row(&self, values: Vec<String>) -> Result<()> {
        if self.failing_appends.load(Ordering::SeqCst) {
            return Err(ClassChatError::internal("append refused"));
        }
        self.rows.lock().unwrap().push(values);
        Ok(())
    }

    async fn get_all_values(&self) -> Result<Vec<Vec<String>>> {
        if self.failing_reads.load(Ordering::SeqCst) {
            return Err(ClassChatError::TransportConnection("sheet unreachable".into()));
        }
        Ok(self.rows())
    }

    async fn get(&self, range: &CellRange) -> Result<Vec<Vec<String>>> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .skip(range.start_row - 1)
            .take(range.end_row + 1 - range.start_row)
            .map(|r| {
                r.iter()
                    .skip(range.start_col - 1)
                    .take(range.end_col + 1 - range.start_col)
                    .cloned()
                    .collect()
            })
            .collect())
    }

    async fn update_cell(&self, row: usize, col: usize, value: &str) -> Result<()> {
        let remaining = self.failing_updates.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failing_updates.store(remaining - 1, Ordering::SeqCst);
            return Err(ClassChatError::internal("update refused"));
        }
        let mut rows = self.rows.lock().unwrap();
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
        let mut rows = self.rows.lock().unwrap();
        if row == 0 || row > rows.len() {
            return Err(ClassChatError::not_found("row", row.to_string()));
        }
        rows.remove(row - 1);
        Ok(())
    }

    async fn find(&self, value: &str, column: Option<usize>) -> Result<Option<Cell>> {
        let rows = self.rows.lock().unwrap();
        for (r, cells) in rows.iter().enumerate() {
            for (c, cell) in cells.iter().enumerate() {
                if cell == value && column.is_none_or(|col| col == c + 1) {
                    return Ok(Some(Cell {
                        row: r + 1,
                        col: c + 1,
                        value: cell.clone(),
                    }));
                }
            }
        }
        Ok(None)
    }
}

pub struct FakeWorkbook {
    pub sheets: Mutex<HashMap<String, Arc<FakeSheet>>>,
}

impl FakeWorkbook {
    pub fn new() -> Arc<Self> {
        let mut sheets = HashMap::new();
        sheets.insert(TEMPLATE_SHEET.to_string(), FakeSheet::new(TEMPLATE_SHEET));
        sheets.insert(SUMMARY_SHEET.to_string(), FakeSheet::new(SUMMARY_SHEET));
        Arc::new(Self {
            sheets: Mutex::new(sheets),
        })
    }

    pub fn sheet(&self, name: &str) -> Arc<FakeSheet> {
        self.sheets.lock().unwrap().get(name).cloned().unwrap()
    }

    pub fn insert(&self, sheet: Arc<FakeSheet>) {
        self.sheets.lock().unwrap().insert(sheet.title(), sheet);
    }
}

#[async_trait]
impl Workbook for FakeWorkbook {
    async fn worksheet(&self, name: &str) -> Result<Arc<dyn LogStore>> {
        self.sheets
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .map(|s| s as Arc<dyn LogStore>)
            .ok_or_else(|| ClassChatError::not_found("worksheet", name))
    }

    async fn get_or_create_worksheet(&self, nickname: &str) -> Result<Arc<dyn LogStore>> {
        if let Ok(sheet) = self.worksheet(nickname).await {
            return Ok(sheet);
        }
        let template = self.sheet(TEMPLATE_SHEET).rows();
        let sheet = FakeSheet::new(nickname);
        *sheet.rows.lock().unwrap() = template;
        self.insert(sheet.clone());
        self.sheet(SUMMARY_SHEET)
            .append_row(vec![nickname.to_string()])
            .await?;
        Ok(sheet as Arc<dyn LogStore>)
    }
}

#[derive(Default)]
pub struct RecordingBackoff {
    pub delays: Mutex<Vec<Duration>>,
}

#[async_trait]
impl Backoff for RecordingBackoff {
    async fn wait(&self, delay: Duration) {
        self.delays.lock().unwrap().push(delay);
    }
}
