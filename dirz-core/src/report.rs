//! Test-artifact summaries and the webhook request that carries them.
//!
//! Only payload construction lives here; delivering the request is the
//! caller's business.

use crate::codec;
use crate::compress::{compress_directory_with, CompressOptions};
use crate::error::{IoContext, Result};
use crate::manifest::now_iso8601;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// CI run identity, supplied by the caller rather than read from the environment.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ActionContext {
    pub repo_owner: String,
    pub repo_name: String,
    pub run_id: String,
    pub commit_sha: String,
    pub workflow_name: String,
}

impl ActionContext {
    pub fn action_url(&self) -> String {
        format!(
            "https://github.com/{}/{}/actions/runs/{}",
            self.repo_owner, self.repo_name, self.run_id
        )
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Success,
    Failed,
}

impl TestStatus {
    pub fn from_exit_code(code: i32) -> Self {
        if code == 0 {
            TestStatus::Success
        } else {
            TestStatus::Failed
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactSummary {
    pub status: TestStatus,
    pub message: String,
    pub original_size: u64,
    /// Archive file size on disk.
    pub compressed_size: u64,
    pub file_count: u64,
    pub timestamp: String,
    pub compression_ratio: String,
}

#[derive(Clone, Debug)]
pub struct ArtifactReport {
    pub archive_path: PathBuf,
    pub summary: ArtifactSummary,
}

/// `compressed / original` as a percentage with two decimals, e.g. `"12.34%"`.
pub fn format_ratio(compressed: u64, original: u64) -> String {
    if original == 0 {
        return "0.00%".to_string();
    }
    format!("{:.2}%", compressed as f64 / original as f64 * 100.0)
}

/// Compress `<working_dir>/<dir_name>` into `output_dir` if it exists.
///
/// A missing directory is not an error: it yields `Ok(None)`.
pub fn compress_if_exists(
    working_dir: &Path,
    dir_name: &str,
    output_dir: &Path,
    status: TestStatus,
    message: Option<String>,
    opts: &CompressOptions,
) -> Result<Option<ArtifactReport>> {
    let target = working_dir.join(dir_name);
    if !target.is_dir() {
        info!(dir = %target.display(), "{dir_name} directory not found, skipping compression");
        return Ok(None);
    }
    info!(dir = %target.display(), "{dir_name} directory found, compressing");

    let archive = compress_directory_with(&target, output_dir, opts)?;
    let timestamp = now_iso8601();
    let summary = ArtifactSummary {
        status,
        message: message.unwrap_or_else(|| format!("Test artifacts compressed at {timestamp}")),
        original_size: archive.metadata.total_original_size,
        compressed_size: archive.archive_size,
        file_count: archive.metadata.file_count,
        compression_ratio: format_ratio(
            archive.archive_size,
            archive.metadata.total_original_size,
        ),
        timestamp,
    };
    info!(
        archive = %archive.path.display(),
        original = summary.original_size,
        compressed = summary.compressed_size,
        ratio = %summary.compression_ratio,
        "test artifacts compressed"
    );
    Ok(Some(ArtifactReport { archive_path: archive.path, summary }))
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WebhookRequest<P> {
    pub status: TestStatus,
    pub task: String,
    pub timestamp: String,
    pub payload: P,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SimulateTestPayload {
    pub repository_name: String,
    pub repository_owner: String,
    pub action_url: String,
    pub commit_hash: String,
    pub workflow: String,
    pub message: String,
    pub tests_artifacts: TestsArtifacts,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TestsArtifacts {
    pub filename: String,
    pub content_type: String,
    /// The archive file, base64.
    pub data: String,
    pub metadata: TestsArtifactsMetadata,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TestsArtifactsMetadata {
    pub original_size: u64,
    pub compressed_size: u64,
    pub file_count: u64,
    pub timestamp: String,
}

impl WebhookRequest<SimulateTestPayload> {
    /// Build the `simulate_test` request, embedding the archive file itself.
    pub fn simulate_test(ctx: &ActionContext, report: &ArtifactReport) -> Result<Self> {
        let path = &report.archive_path;
        let bytes = std::fs::read(path).io_context(|| format!("read archive {}", path.display()))?;
        let s = &report.summary;
        Ok(WebhookRequest {
            status: s.status,
            task: "simulate_test".to_string(),
            timestamp: now_iso8601(),
            payload: SimulateTestPayload {
                repository_name: ctx.repo_name.clone(),
                repository_owner: ctx.repo_owner.clone(),
                action_url: ctx.action_url(),
                commit_hash: ctx.commit_sha.clone(),
                workflow: ctx.workflow_name.clone(),
                message: s.message.clone(),
                tests_artifacts: TestsArtifacts {
                    filename: path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default(),
                    content_type: "application/gzip".to_string(),
                    data: codec::encode_text(&bytes),
                    metadata: TestsArtifactsMetadata {
                        original_size: s.original_size,
                        compressed_size: s.compressed_size,
                        file_count: s.file_count,
                        timestamp: s.timestamp.clone(),
                    },
                },
            },
        })
    }
}
