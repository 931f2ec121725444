use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::core::segment::SegmentType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::System => "system",
        }
    }
}

/// One conversational message supplied by the agent platform.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

/// The file the agent currently has open.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileInfo {
    pub path: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub extension: Option<String>,
    #[serde(default)]
    pub line_count: Option<u32>,
    #[serde(default)]
    pub current_line: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenUsage {
    pub current: u64,
    pub limit: u64,
    pub usage_percent: f64,
}

impl Default for TokenUsage {
    fn default() -> Self {
        Self {
            current: 0,
            limit: 32_000,
            usage_percent: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskInfo {
    pub task_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// High-level information about an already-known segment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SegmentSummary {
    pub segment_id: String,
    #[serde(rename = "type")]
    pub kind: SegmentType,
    pub preview: String,
    pub tokens: u64,
    pub created_at: DateTime<Utc>,
}

/// Snapshot of the agent's context as reported by the platform.
/// Everything the context manager ingests arrives in this shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ContextDescriptors {
    #[serde(default)]
    pub recent_messages: Vec<Message>,
    #[serde(default)]
    pub current_file: Option<FileInfo>,
    #[serde(default)]
    pub token_usage: TokenUsage,
    #[serde(default)]
    pub segment_summaries: Vec<SegmentSummary>,
    #[serde(default)]
    pub task_info: Option<TaskInfo>,
}
