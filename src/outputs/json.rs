//! JSON output for response envelopes.
//!
//! Each round overwrites one file per batch so a static dashboard can poll
//! it directly:
//!
//! ```text
//! json_output_dir/
//! ├── news.json
//! ├── social.json
//! └── all.json
//! ```

use serde::Serialize;
use std::error::Error;
use std::path::PathBuf;
use tokio::fs;
use tracing::{error, info, instrument};

/// Path of the file a batch named `name` is written to.
pub fn batch_path(json_output_dir: &str, name: &str) -> PathBuf {
    PathBuf::from(json_output_dir).join(format!("{name}.json"))
}

/// Write a response envelope to `{json_output_dir}/{name}.json`.
///
/// The file is first written next to its destination and then renamed over
/// it, so a reader never sees a half-written file.
///
/// # Arguments
///
/// * `response` - The envelope to serialize, usually a [`BatchResponse`](crate::models::BatchResponse)
/// * `json_output_dir` - Directory for JSON output (created if missing)
/// * `name` - Batch name, usually the source group
///
/// # Returns
///
/// The path written on success, or an error if directory creation or file
/// writing fails.
#[instrument(level = "info", skip_all, fields(json_output_dir = %json_output_dir, name = %name))]
pub async fn write_response<T: Serialize>(
    response: &T,
    json_output_dir: &str,
    name: &str,
) -> Result<PathBuf, Box<dyn Error>> {
    let json = serde_json::to_string_pretty(response)?;

    if let Err(e) = fs::create_dir_all(json_output_dir).await {
        error!(error = %e, "Failed to create JSON dir");
        return Err(e.into());
    }

    let path = batch_path(json_output_dir, name);
    let staging = path.with_extension("json.tmp");
    let json_len = json.len();
    fs::write(&staging, json).await?;
    fs::rename(&staging, &path).await?;
    info!(path = %path.display(), bytes = json_len, "Wrote JSON");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BatchResponse, ResolvedSource};
    use chrono::Utc;

    #[tokio::test]
    async fn test_write_response_replaces_file() {
        let dir = std::env::temp_dir().join(format!("feed_dashboard_json_{}", std::process::id()));
        let dir_str = dir.to_string_lossy().to_string();

        let batch = BatchResponse::new(vec![ResolvedSource {
            source_id: "bbc".to_string(),
            name: "BBC News".to_string(),
            color: "#BB1919".to_string(),
            icon: "📺".to_string(),
            platform: None,
            articles: vec![],
            resolved_at: Utc::now(),
        }]);

        write_response(&BatchResponse::new(vec![]), &dir_str, "news").await.unwrap();
        let path = write_response(&batch, &dir_str, "news").await.unwrap();
        assert_eq!(path, batch_path(&dir_str, "news"));

        let written: serde_json::Value =
            serde_json::from_str(&tokio::fs::read_to_string(&path).await.unwrap()).unwrap();
        assert_eq!(written["success"], true);
        assert_eq!(written["data"][0]["id"], "bbc");
        assert!(written["data"][0]["articles"].as_array().unwrap().is_empty());
        assert!(!path.with_extension("json.tmp").exists());

        let _ = tokio::fs::remove_dir_all(&dir).await;
    }
}
