use crate::engine::core::segment::SegmentType;
use crate::engine::gc::PruneCandidate;

/// Builder for pruning candidates with a mid-range default score.
pub struct CandidateFactory {
    candidate: PruneCandidate,
}

impl CandidateFactory {
    pub fn new() -> Self {
        Self {
            candidate: PruneCandidate {
                segment_id: format!("cand-{}", rand::random::<u32>()),
                score: 0.5,
                tokens: 100,
                reason: "low-value type (log)".to_string(),
                segment_type: SegmentType::Log,
                age_hours: 1.0,
            },
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.candidate.segment_id = id.into();
        self
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.candidate.score = score;
        self
    }

    pub fn with_tokens(mut self, tokens: u64) -> Self {
        self.candidate.tokens = tokens;
        self
    }

    pub fn create(self) -> PruneCandidate {
        self.candidate
    }
}
