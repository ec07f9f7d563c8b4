use serde_json::{Value, json};

/// Return at most the first `max_chars` characters of `text`.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Build a Lark/Feishu "post" message.
pub fn lark_post(title: &str, text: &str) -> Value {
    json!({
        "msg_type": "post",
        "content": {
            "post": {
                "zh_cn": {
                    "title": title,
                    "content": [[{ "tag": "text", "text": text }]]
                }
            }
        }
    })
}

/// Extract the text node of a payload built by [`lark_post`].
pub fn post_text(payload: &Value) -> Option<&str> {
    payload
        .pointer("/content/post/zh_cn/content/0/0/text")
        .and_then(Value::as_str)
}

pub fn post_title(payload: &Value) -> Option<&str> {
    payload
        .pointer("/content/post/zh_cn/title")
        .and_then(Value::as_str)
}
