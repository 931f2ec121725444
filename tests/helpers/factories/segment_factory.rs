use chrono::Duration;

use crate::engine::core::segment::{Generation, Segment, SegmentType, Tier};
use crate::shared::time;

/// Builder for test segments. Defaults to a young, unpinned `message`
/// segment in project `proj` touched just now.
pub struct SegmentFactory {
    segment: Segment,
}

impl SegmentFactory {
    pub fn new() -> Self {
        let now = time::now();
        Self {
            segment: Segment {
                segment_id: format!("seg-{}", rand::random::<u32>()),
                text: "example segment text".to_string(),
                kind: SegmentType::Message,
                project_id: "proj".to_string(),
                task_id: None,
                created_at: now,
                last_touched_at: now,
                pinned: false,
                generation: Generation::Young,
                gc_survival_count: 0,
                refcount: 0,
                file_path: None,
                line_range: None,
                tags: Vec::new(),
                topic_id: None,
                tokens: None,
                tokens_computed_at: None,
                text_hash: None,
                tier: Tier::Working,
            },
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.segment.segment_id = id.into();
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.segment.text = text.into();
        self
    }

    pub fn with_project(mut self, project_id: impl Into<String>) -> Self {
        self.segment.project_id = project_id.into();
        self
    }

    pub fn with_task(mut self, task_id: impl Into<String>) -> Self {
        self.segment.task_id = Some(task_id.into());
        self
    }

    pub fn with_tags(mut self, tags: Vec<&str>) -> Self {
        self.segment.tags = tags.into_iter().map(str::to_string).collect();
        self
    }

    pub fn with_topic(mut self, topic_id: impl Into<String>) -> Self {
        self.segment.topic_id = Some(topic_id.into());
        self
    }

    pub fn with_file_path(mut self, path: impl Into<String>) -> Self {
        self.segment.file_path = Some(path.into());
        self
    }

    pub fn with_line_range(mut self, start: u32, end: u32) -> Self {
        self.segment.line_range = Some((start, end));
        self
    }

    pub fn with_tokens(mut self, tokens: u64) -> Self {
        self.segment.tokens = Some(tokens);
        self
    }

    pub fn with_refcount(mut self, refcount: u32) -> Self {
        self.segment.refcount = refcount;
        self
    }

    pub fn pinned(mut self) -> Self {
        self.segment.pinned = true;
        self
    }

    pub fn log(mut self) -> Self {
        self.segment.kind = SegmentType::Log;
        self
    }

    pub fn code(mut self) -> Self {
        self.segment.kind = SegmentType::Code;
        self
    }

    pub fn note(mut self) -> Self {
        self.segment.kind = SegmentType::Note;
        self
    }

    pub fn decision(mut self) -> Self {
        self.segment.kind = SegmentType::Decision;
        self
    }

    pub fn stashed(mut self) -> Self {
        self.segment.tier = Tier::Stashed;
        self
    }

    pub fn old_generation(mut self) -> Self {
        self.segment.generation = Generation::Old;
        self
    }

    /// Push `last_touched_at` into the past.
    pub fn touched_hours_ago(mut self, hours: i64) -> Self {
        self.segment.last_touched_at = time::now() - Duration::hours(hours);
        self
    }

    /// Push both creation and touch timestamps into the past.
    pub fn created_hours_ago(mut self, hours: i64) -> Self {
        let then = time::now() - Duration::hours(hours);
        self.segment.created_at = then;
        self.segment.last_touched_at = then;
        self
    }

    pub fn create(self) -> Segment {
        self.segment
    }

    pub fn create_list(self, count: usize) -> Vec<Segment> {
        (0..count)
            .map(|i| {
                let mut segment = self.segment.clone();
                segment.segment_id = format!("{}-{i}", self.segment.segment_id);
                segment
            })
            .collect()
    }
}
