use crate::engine::core::descriptor::{
    ContextDescriptors, FileInfo, Message, MessageRole, SegmentSummary, TaskInfo, TokenUsage,
};
use crate::engine::core::segment::SegmentType;
use crate::shared::time;

/// Builder for platform descriptor payloads.
pub struct DescriptorFactory {
    descriptors: ContextDescriptors,
}

impl DescriptorFactory {
    pub fn new() -> Self {
        Self {
            descriptors: ContextDescriptors::default(),
        }
    }

    pub fn with_message(mut self, role: &str, content: &str) -> Self {
        let role = match role {
            "assistant" => MessageRole::Assistant,
            "system" => MessageRole::System,
            _ => MessageRole::User,
        };
        self.descriptors.recent_messages.push(Message {
            role,
            content: content.to_string(),
            timestamp: None,
        });
        self
    }

    pub fn with_token_usage(mut self, current: u64, limit: u64) -> Self {
        self.descriptors.token_usage = TokenUsage {
            current,
            limit,
            usage_percent: if limit > 0 {
                current as f64 / limit as f64 * 100.0
            } else {
                0.0
            },
        };
        self
    }

    pub fn with_current_file(mut self, path: &str, current_line: Option<u32>) -> Self {
        self.descriptors.current_file = Some(FileInfo {
            path: path.to_string(),
            name: None,
            extension: None,
            line_count: None,
            current_line,
        });
        self
    }

    pub fn with_task(mut self, task_id: &str) -> Self {
        self.descriptors.task_info = Some(TaskInfo {
            task_id: task_id.to_string(),
            name: None,
            description: None,
            created_at: None,
        });
        self
    }

    pub fn with_summary(mut self, segment_id: &str, kind: &str, preview: &str, tokens: u64) -> Self {
        let kind: SegmentType =
            serde_json::from_value(serde_json::Value::String(kind.to_string()))
                .expect("valid segment type");
        self.descriptors.segment_summaries.push(SegmentSummary {
            segment_id: segment_id.to_string(),
            kind,
            preview: preview.to_string(),
            tokens,
            created_at: time::now(),
        });
        self
    }

    pub fn create(self) -> ContextDescriptors {
        self.descriptors
    }
}
