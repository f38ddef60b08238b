use async_trait::async_trait;
use classchat_core::chat::{ChatClient, ChatRequest, ChatResponse};
use classchat_core::config::SetupInfo;
use classchat_core::error::Result;
use classchat_core::log_store::{SUMMARY_SHEET, TEMPLATE_SHEET, Workbook};
use classchat_core::orchestrator::ChatOrchestrator;
use classchat_core::session::SessionSegmenter;
use classchat_infrastructure::MemoryWorkbook;
use std::sync::{Arc, Mutex};

struct EchoClient {
    calls: Mutex<usize>,
}

#[async_trait]
impl ChatClient for EchoClient {
    async fn create_message(&self, request: ChatRequest) -> Result<ChatResponse> {
        let calls = {
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;
            *calls
        };
        let last = request
            .messages
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        Ok(ChatResponse::Message(format!("reply {calls}: {last}")))
    }
}

fn setup() -> SetupInfo {
    SetupInfo::from_values(&[
        "https://sheets.example/class",
        "on",
        "anthropic",
        "sk-test",
        "claude-test",
        "256",
        "0.7",
        "",
        "You are a science tutor.",
        "Evaluate the student.",
        "Comment on the session.",
        "false",
    ])
    .unwrap()
}

fn rows(sheet: &[Vec<String>]) -> Vec<Vec<&str>> {
    sheet
        .iter()
        .map(|r| r.iter().map(String::as_str).collect())
        .collect()
}

#[tokio::test]
async fn test_new_nickname_gets_template_copy_and_summary_row() {
    let workbook = Arc::new(
        MemoryWorkbook::with_template(vec![vec!["time".into(), "role".into(), "content".into()]]),
    );

    let sheet = workbook.get_or_create_worksheet("jun").await.unwrap();
    assert_eq!(sheet.title(), "jun");
    assert_eq!(
        rows(&sheet.get_all_values().await.unwrap()),
        vec![vec!["time", "role", "content"]]
    );

    workbook.get_or_create_worksheet("jun").await.unwrap();
    workbook.get_or_create_worksheet("ara").await.unwrap();
    let summary = workbook.summary_sheet().await.unwrap();
    assert_eq!(
        rows(&summary.get_all_values().await.unwrap()),
        vec![vec!["jun"], vec!["ara"]]
    );
    assert_eq!(
        workbook.titles().unwrap(),
        vec!["ara", "jun", SUMMARY_SHEET, TEMPLATE_SHEET]
    );
}

#[tokio::test]
async fn test_full_session_survives_snapshot_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("class.json");
    let client = Arc::new(EchoClient {
        calls: Mutex::new(0),
    });

    {
        let workbook = Arc::new(MemoryWorkbook::open(&path).await.unwrap());
        let mut orch = ChatOrchestrator::start(setup(), "jun", client.clone(), workbook.clone())
            .await
            .unwrap();
        orch.submit("Why is the sky blue?", |_| {}).await.unwrap();
        orch.submit("And sunsets?", |_| {}).await.unwrap();
        let summary = orch.end_session(|_| {}).await.unwrap();
        assert!(summary.evaluation.ends_with("Evaluate the student."));
        workbook.flush().await.unwrap();
    }

    let reopened = Arc::new(MemoryWorkbook::open(&path).await.unwrap());
    let log = reopened.worksheet("jun").await.unwrap();
    let values = log.get_all_values().await.unwrap();
    assert_eq!(values.len(), 4);
    assert_eq!(values[0][1], "USER");
    assert_eq!(values[1][1], "ASSISTANT");
    assert_eq!(values[3][2], "reply 2: And sunsets?");

    let summary = reopened.summary_sheet().await.unwrap();
    let summary_rows = summary.get_all_values().await.unwrap();
    let row = &summary_rows[0];
    assert_eq!(row[0], "jun");
    assert_eq!(row[1], "reply 3: Evaluate the student.");
    assert_eq!(row[2], "reply 4: Comment on the session.");

    // Rows written moments apart fall inside one session gap.
    let orch = ChatOrchestrator::start(setup(), "jun", client, reopened.clone())
        .await
        .unwrap();
    let sessions = orch.sessions(&SessionSegmenter::default()).await.unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].message_count, 4);
    assert_eq!(sessions[0].first_message, "Why is the sky blue?");
}
