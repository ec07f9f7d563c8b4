use std::io::{self, Read};

use anyhow::{Result, bail};
use serde_json::Value;

use sentinel_config::SentinelConfig;
use sentinel_memory::{AgentAction, BufferEntry, LogContent, LogOptions, Sentinel};

pub(crate) fn run_action(
    sentinel: &Sentinel,
    command: String,
    task: Option<String>,
    citations: Vec<String>,
    success: bool,
) -> Result<()> {
    let receipt = sentinel.record_action(&AgentAction {
        task,
        citations,
        command,
        success,
    })?;
    println!("recorded: {}", receipt.path.display());
    if !receipt.evidence_backed {
        println!("⚠️  no citations: entry marked as logical inference");
    }
    Ok(())
}

pub(crate) async fn run_log(
    sentinel: &Sentinel,
    body: String,
    title: Option<String>,
    sources: Vec<String>,
    notify: bool,
) -> Result<()> {
    let body = if body == "-" {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        body
    };

    let content = LogContent {
        title,
        body,
        sources,
    };
    let receipt = sentinel.write_log(&content, LogOptions { notify })?;
    println!("logged: {}", receipt.path.display());

    // The process exits right after this, so wait for the background
    // delivery instead of letting the runtime drop it.
    if let Some(handle) = receipt.notification {
        match handle.await {
            Ok(outcome) => println!("notification: {outcome}"),
            Err(err) => eprintln!("notification task aborted: {err}"),
        }
    }
    Ok(())
}

pub(crate) async fn run_notify(sentinel: &Sentinel, body: &str, title: Option<&str>) {
    let outcome = sentinel.notifier().notify(title, body).await;
    println!("notification: {outcome}");
}

pub(crate) fn parse_object(raw: &str) -> Result<BufferEntry> {
    match serde_json::from_str::<Value>(raw)? {
        Value::Object(map) => Ok(map),
        other => bail!("context must be a JSON object, got {}", json_kind(&other)),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

pub(crate) fn run_push(sentinel: &Sentinel, raw: &str) -> Result<()> {
    let pending = sentinel.push_semantic_context(parse_object(raw)?)?;
    println!("pending: {pending}");
    Ok(())
}

pub(crate) fn run_consume(sentinel: &Sentinel) -> Result<()> {
    if let Some(entries) = sentinel.consume_buffer()? {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    }
    Ok(())
}

pub(crate) fn run_peek(sentinel: &Sentinel) -> Result<()> {
    let entries = sentinel.buffer().peek()?;
    println!("{}", serde_json::to_string_pretty(&entries)?);
    Ok(())
}

pub(crate) fn run_doctor(sentinel: &Sentinel, config: &SentinelConfig) {
    let notifier = sentinel.notifier();
    let webhook = match notifier.webhook_url() {
        Ok(Some(_)) => "configured".to_string(),
        Ok(None) => "not configured".to_string(),
        Err(err) => format!("unreadable ({err})"),
    };
    let last = notifier.last_notification();
    let pending = sentinel.buffer().peek().map(|e| e.len()).unwrap_or(0);

    println!("sentinel doctor");
    println!("- now              : {}", sentinel.current_timestamp());
    println!("- journal          : {}", sentinel.journal().today_path().display());
    println!("- action log       : {}", sentinel.action_log().today_path().display());
    println!("- context buffer   : {} ({pending} pending)", sentinel.buffer().path().display());
    println!("- secrets file     : {}", notifier.secrets_file().display());
    println!("- webhook          : {webhook}");
    println!(
        "- window           : {:02}:00 – {:02}:00",
        config.notify.window_start_hour, config.notify.window_end_hour
    );
    println!("- cooldown         : {} min", config.notify.cooldown_minutes);
    println!("- lock file        : {}", notifier.lock_file().path().display());
    if last.timestamp > 0 {
        println!("- last notified at : {} ms", last.timestamp);
        println!("- last body chars  : {}", last.body.chars().count());
    } else {
        println!("- last notified at : never");
    }
}
