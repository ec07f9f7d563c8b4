//! Webhook endpoint discovery.
//!
//! The endpoint lives in a dotenv-style secrets file so it never lands in
//! the tracked config.  `LARK_WEBHOOK_URL` in the process environment takes
//! precedence over the file.

use std::path::Path;

use tracing::warn;

use crate::error::NotifyError;

pub const WEBHOOK_KEY: &str = "LARK_WEBHOOK_URL";

/// Returns `Ok(None)` when nothing is configured; that is a normal state,
/// not an error.  Lines that are not `KEY=value` are skipped; only an
/// unreadable file is an error.
pub fn resolve_webhook_url(
    secrets_file: &Path,
    from_env: Option<String>,
) -> Result<Option<String>, NotifyError> {
    if let Some(url) = non_empty(from_env) {
        return Ok(Some(url));
    }

    if !secrets_file.exists() {
        return Ok(None);
    }

    let secrets_err = |source| NotifyError::Secrets {
        path: secrets_file.to_path_buf(),
        source,
    };

    let mut found = None;
    for item in dotenvy::from_path_iter(secrets_file).map_err(secrets_err)? {
        let (key, value) = match item {
            Ok(pair) => pair,
            Err(dotenvy::Error::LineParse(_, position)) => {
                // The line itself may hold a secret, so only the position is logged.
                warn!(path = %secrets_file.display(), position, "skipping unparsable secrets line");
                continue;
            }
            Err(err) => return Err(secrets_err(err)),
        };
        if key == WEBHOOK_KEY {
            found = non_empty(Some(value));
        }
    }
    Ok(found)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn missing_file_means_not_configured() {
        let dir = TempDir::new().unwrap();
        let url = resolve_webhook_url(&dir.path().join("lark.env"), None).unwrap();
        assert!(url.is_none());
    }

    #[test]
    fn reads_url_from_secrets_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("lark.env");
        fs::write(
            &path,
            "# lark bot\nOTHER=1\nLARK_WEBHOOK_URL=https://open.feishu.cn/hook/abc\n",
        )
        .unwrap();
        let url = resolve_webhook_url(&path, None).unwrap();
        assert_eq!(url.as_deref(), Some("https://open.feishu.cn/hook/abc"));
    }

    #[test]
    fn file_without_key_means_not_configured() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("lark.env");
        fs::write(&path, "OTHER=1\n").unwrap();
        assert!(resolve_webhook_url(&path, None).unwrap().is_none());
    }

    #[test]
    fn empty_value_means_not_configured() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("lark.env");
        fs::write(&path, "LARK_WEBHOOK_URL=\n").unwrap();
        assert!(resolve_webhook_url(&path, None).unwrap().is_none());
    }

    #[test]
    fn free_text_lines_do_not_hide_the_key() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("lark.env");
        fs::write(
            &path,
            "# lark\nbrain sync bot webhook\nLARK_SECRET = abc def\nLARK_WEBHOOK_URL=https://open.feishu.cn/hook/abc\n",
        )
        .unwrap();
        let url = resolve_webhook_url(&path, None).unwrap();
        assert_eq!(url.as_deref(), Some("https://open.feishu.cn/hook/abc"));
    }

    #[test]
    fn only_unparsable_lines_means_not_configured() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("lark.env");
        fs::write(&path, "!!! not a dotenv line\n").unwrap();
        assert!(resolve_webhook_url(&path, None).unwrap().is_none());
    }

    #[test]
    fn unreadable_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("lark.env");
        fs::create_dir(&path).unwrap();
        assert!(matches!(
            resolve_webhook_url(&path, None),
            Err(NotifyError::Secrets { .. })
        ));
    }

    #[test]
    fn environment_wins_over_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("lark.env");
        fs::write(&path, "LARK_WEBHOOK_URL=https://from/file\n").unwrap();
        let url = resolve_webhook_url(&path, Some("https://from/env".to_string())).unwrap();
        assert_eq!(url.as_deref(), Some("https://from/env"));
    }

    #[test]
    fn blank_environment_falls_back_to_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("lark.env");
        fs::write(&path, "LARK_WEBHOOK_URL=https://from/file\n").unwrap();
        let url = resolve_webhook_url(&path, Some("  ".to_string())).unwrap();
        assert_eq!(url.as_deref(), Some("https://from/file"));
    }
}
