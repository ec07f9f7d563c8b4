use std::fs;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Value, json};
use tempfile::TempDir;

use sentinel_config::SentinelConfig;
use sentinel_core::LocaleClock;
use sentinel_memory::{AgentAction, LogContent, LogOptions, Sentinel};
use sentinel_notify::{
    LockFile, NotificationGateway, NotifyError, NotifyOutcome, SuppressReason, Transport,
};

#[derive(Default)]
struct Outbox {
    sent: Mutex<Vec<Value>>,
}

#[async_trait]
impl Transport for Outbox {
    async fn post_json(&self, _url: &str, payload: &Value) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(payload.clone());
        Ok(())
    }
}

fn shanghai_noon() -> DateTime<Utc> {
    // 12:00 on 2026-02-26 in Asia/Shanghai.
    Utc.with_ymd_and_hms(2026, 2, 26, 4, 0, 0).unwrap()
}

fn sentinel_at(root: &TempDir, now: DateTime<Utc>, outbox: Arc<Outbox>) -> Sentinel {
    let config = SentinelConfig::with_root(root.path().to_string_lossy());
    let paths = config.paths();
    let clock = LocaleClock::fixed(now, chrono_tz::Asia::Shanghai);
    let gateway = NotificationGateway::new(
        config.notify.clone(),
        paths.secrets_file,
        LockFile::new(paths.lock_file),
        clock.clone(),
        outbox,
    );
    Sentinel::with_gateway(&config, clock, Arc::new(gateway))
}

fn write_secrets(root: &TempDir) {
    let dir = root.path().join("docs/secrets");
    fs::create_dir_all(&dir).unwrap();
    fs::write(
        dir.join("lark.env"),
        "LARK_WEBHOOK_URL=https://open.feishu.cn/open-apis/bot/v2/hook/it\n",
    )
    .unwrap();
}

#[test]
fn evidence_backed_action_lands_in_dated_raw_log() {
    let root = TempDir::new().unwrap();
    let sentinel = sentinel_at(&root, shanghai_noon(), Arc::default());

    let receipt = sentinel
        .record_action(&AgentAction {
            task: Some("scan docs".to_string()),
            citations: vec!["docs/index.md".to_string()],
            command: "ls docs".to_string(),
            success: true,
        })
        .unwrap();

    let expected = root.path().join("docs/memory/logs/raw/candy-2026-02-26.md");
    assert_eq!(receipt.path, expected);
    assert!(receipt.evidence_backed);

    let text = fs::read_to_string(expected).unwrap();
    assert!(text.contains("`docs/index.md`"));
    assert!(text.contains("✅"));
    assert!(text.contains("- **任务**: scan docs"));
}

#[test]
fn journal_and_action_log_are_separate_documents() {
    let root = TempDir::new().unwrap();
    let sentinel = sentinel_at(&root, shanghai_noon(), Arc::default());

    sentinel.record_action(&AgentAction::new("make docs")).unwrap();
    let receipt = sentinel
        .write_log(&LogContent::new("narrative"), LogOptions::default())
        .unwrap();

    assert_eq!(
        receipt.path,
        root.path().join("docs/memory/logs/2026-02-26.md")
    );
    let journal = fs::read_to_string(&receipt.path).unwrap();
    assert!(journal.contains("narrative"));
    assert!(!journal.contains("make docs"));
}

#[tokio::test]
async fn notified_log_delivers_once_then_dedups() {
    let root = TempDir::new().unwrap();
    write_secrets(&root);
    let outbox = Arc::new(Outbox::default());
    let sentinel = sentinel_at(&root, shanghai_noon(), outbox.clone());

    let content = LogContent::new("index rebuilt").title("docs");
    let first = sentinel
        .write_log(&content, LogOptions { notify: true })
        .unwrap();
    let outcome = first.notification.unwrap().await.unwrap();
    assert!(outcome.is_delivered(), "{outcome}");

    let second = sentinel
        .write_log(&content, LogOptions { notify: true })
        .unwrap();
    let outcome = second.notification.unwrap().await.unwrap();
    assert_eq!(outcome.suppress_reason(), Some(&SuppressReason::Duplicate));

    assert_eq!(outbox.sent.lock().unwrap().len(), 1);
    let journal = fs::read_to_string(&first.path).unwrap();
    assert_eq!(journal.matches("index rebuilt").count(), 2);

    let lock = sentinel.notifier().last_notification();
    assert_eq!(lock.body, "index rebuilt");
    assert_eq!(lock.timestamp, shanghai_noon().timestamp_millis());
}

#[tokio::test]
async fn log_write_succeeds_outside_the_window() {
    let root = TempDir::new().unwrap();
    write_secrets(&root);
    let outbox = Arc::new(Outbox::default());
    // 22:00 in Shanghai.
    let late = Utc.with_ymd_and_hms(2026, 2, 26, 14, 0, 0).unwrap();
    let sentinel = sentinel_at(&root, late, outbox.clone());

    let receipt = sentinel
        .write_log(&LogContent::new("late work"), LogOptions { notify: true })
        .unwrap();
    let outcome = receipt.notification.unwrap().await.unwrap();
    assert!(matches!(
        outcome,
        NotifyOutcome::Suppressed(SuppressReason::OutsideWindow { hour: 22 })
    ));
    assert!(outbox.sent.lock().unwrap().is_empty());
    assert!(fs::read_to_string(receipt.path).unwrap().contains("late work"));
}

#[test]
fn context_survives_between_independent_instances() {
    let root = TempDir::new().unwrap();
    let producer = sentinel_at(&root, shanghai_noon(), Arc::default());
    let consumer = sentinel_at(&root, shanghai_noon(), Arc::default());

    let data = |v: Value| v.as_object().cloned().unwrap();
    producer.push_semantic_context(data(json!({"focus": "sidebar"}))).unwrap();
    producer.push_semantic_context(data(json!({"focus": "router"}))).unwrap();

    let drained = consumer.consume_buffer().unwrap().unwrap();
    let focus: Vec<_> = drained.iter().map(|e| e["focus"].clone()).collect();
    assert_eq!(focus, vec![json!("sidebar"), json!("router")]);
    assert!(drained.iter().all(|e| e["timestamp"] == "2026/2/26 12:00:00"));

    assert!(!root.path().join(".context_buffer.json").exists());
    assert!(producer.consume_buffer().unwrap().is_none());
}

#[test]
fn ensure_journal_creates_once_and_never_truncates() {
    let root = TempDir::new().unwrap();
    let sentinel = sentinel_at(&root, shanghai_noon(), Arc::default());

    let path = sentinel.ensure_journal().unwrap();
    assert_eq!(path, root.path().join("docs/memory/logs/2026-02-26.md"));
    let header = fs::read_to_string(&path).unwrap();
    assert_eq!(header, "# 2026-02-26: 操作日志\n\n");

    sentinel
        .write_log(&LogContent::new("kept entry"), LogOptions::default())
        .unwrap();
    assert_eq!(sentinel.ensure_journal().unwrap(), path);
    assert_eq!(sentinel.ensure_journal().unwrap(), path);

    let text = fs::read_to_string(&path).unwrap();
    assert!(text.starts_with(&header));
    assert_eq!(text.matches("操作日志").count(), 1);
    assert!(text.contains("kept entry"));
}

#[test]
fn current_timestamp_uses_display_zone() {
    let root = TempDir::new().unwrap();
    let sentinel = sentinel_at(&root, shanghai_noon(), Arc::default());
    assert_eq!(sentinel.current_timestamp(), "2026/2/26 12:00:00");
}
