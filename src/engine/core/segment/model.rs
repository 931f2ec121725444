use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tag prefix denoting an explicit reference edge to another segment.
pub const REF_TAG_PREFIX: &str = "ref:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentType {
    Message,
    Code,
    Log,
    Note,
    Decision,
    Summary,
}

impl SegmentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SegmentType::Message => "message",
            SegmentType::Code => "code",
            SegmentType::Log => "log",
            SegmentType::Note => "note",
            SegmentType::Decision => "decision",
            SegmentType::Summary => "summary",
        }
    }
}

impl std::fmt::Display for SegmentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Generation {
    #[default]
    Young,
    Old,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    #[default]
    Working,
    Stashed,
    /// Reserved; treated as a read-only alias of `Stashed` everywhere.
    Archive,
}

impl Tier {
    pub fn is_working(&self) -> bool {
        matches!(self, Tier::Working)
    }

    pub fn is_stashed(&self) -> bool {
        matches!(self, Tier::Stashed | Tier::Archive)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Working => "working",
            Tier::Stashed => "stashed",
            Tier::Archive => "archive",
        }
    }
}

/// A unit of agent memory. The sole persisted entity: everything the
/// storage layer writes, the indexes cover, and the GC engine scores
/// is one of these.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Segment {
    pub segment_id: String,
    pub text: String,
    #[serde(rename = "type")]
    pub kind: SegmentType,

    pub project_id: String,
    #[serde(default)]
    pub task_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_touched_at: DateTime<Utc>,

    // GC metadata
    #[serde(default)]
    pub pinned: bool,
    #[serde(default)]
    pub generation: Generation,
    #[serde(default)]
    pub gc_survival_count: u32,
    #[serde(default)]
    pub refcount: u32,

    // Organization
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub line_range: Option<(u32, u32)>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub topic_id: Option<String>,

    // Token cache
    #[serde(default)]
    pub tokens: Option<u64>,
    #[serde(default)]
    pub tokens_computed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub text_hash: Option<String>,

    #[serde(default)]
    pub tier: Tier,
}

impl Segment {
    /// Segment ids this segment explicitly references via `ref:<id>` tags.
    pub fn ref_targets(&self) -> impl Iterator<Item = &str> {
        self.tags
            .iter()
            .filter_map(|tag| tag.strip_prefix(REF_TAG_PREFIX))
    }

    /// Cached token count, or zero when none has been computed yet.
    #[inline]
    pub fn tokens_or_zero(&self) -> u64 {
        self.tokens.unwrap_or(0)
    }

    /// Hours since the segment was last touched. Clock skew can make this
    /// negative; callers treat that as zero age.
    pub fn age_hours(&self, now: DateTime<Utc>) -> f64 {
        (now - self.last_touched_at).num_milliseconds() as f64 / 3_600_000.0
    }

    /// Refresh `last_touched_at`, keeping it monotone.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        if now > self.last_touched_at {
            self.last_touched_at = now;
        }
    }
}
