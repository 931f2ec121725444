use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::engine::core::segment::{Generation, Segment, SegmentType};
use crate::engine::gc::model::{PruneCandidate, PrunePlan};
use crate::shared::time;

/// Mark-and-sweep pruning analysis. The engine is pure over the supplied
/// root set: it builds the reference graph, marks reachable segments,
/// scores the rest, and synthesizes stash/delete plans.
pub struct GcEngine {
    recent_messages_count: usize,
    recent_decision_hours: i64,
}

impl GcEngine {
    pub fn new(recent_messages_count: usize, recent_decision_hours: i64) -> Self {
        Self {
            recent_messages_count,
            recent_decision_hours,
        }
    }

    /// How many trailing message segments callers should seed the root
    /// set with.
    pub fn recent_messages_count(&self) -> usize {
        self.recent_messages_count
    }

    /// Decisions younger than this window are treated as roots.
    pub fn recent_decision_hours(&self) -> i64 {
        self.recent_decision_hours
    }

    /// Score every segment that is not a root, not reachable from the
    /// roots, and not pinned. Returns candidates sorted by descending
    /// score.
    pub fn analyze_candidates(&self, segments: &[Segment], roots: &HashSet<String>) -> Vec<PruneCandidate> {
        if segments.is_empty() {
            return Vec::new();
        }

        let references = build_reference_graph(segments);
        let reachable = self.reachable(roots, &references);

        let now = time::now();
        let mut candidates: Vec<PruneCandidate> = Vec::new();

        for segment in segments {
            if roots.contains(&segment.segment_id) || reachable.contains(&segment.segment_id) {
                continue;
            }
            // Pinned segments are never candidates.
            if segment.pinned {
                continue;
            }

            let score = self.score(segment, now);
            let age_hours = segment.age_hours(now);
            let reason = candidate_reason(segment, score, age_hours);

            candidates.push(PruneCandidate {
                segment_id: segment.segment_id.clone(),
                score,
                tokens: segment.tokens_or_zero(),
                reason,
                segment_type: segment.kind,
                age_hours,
            });
        }

        candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
        debug!(
            target: "ctxstash::gc",
            total = segments.len(),
            reachable = reachable.len(),
            candidates = candidates.len(),
            "analyzed pruning candidates"
        );
        candidates
    }

    /// Mark phase: every id reachable from the roots over the reference
    /// graph. The visited set terminates cycles.
    pub fn reachable(
        &self,
        roots: &HashSet<String>,
        references: &HashMap<String, HashSet<String>>,
    ) -> HashSet<String> {
        if roots.is_empty() {
            return HashSet::new();
        }

        let mut reachable: HashSet<String> = HashSet::new();
        let mut to_visit: Vec<String> = roots.iter().cloned().collect();

        while let Some(segment_id) = to_visit.pop() {
            if !reachable.insert(segment_id.clone()) {
                continue;
            }
            if let Some(refs) = references.get(&segment_id) {
                for ref_id in refs {
                    if !reachable.contains(ref_id) {
                        to_visit.push(ref_id.clone());
                    }
                }
            }
        }

        reachable
    }

    /// Prune score; higher means more prune-worthy.
    ///
    /// score = 0.4·recency + 0.3·type + 0.2·refcount + 0.1·generation
    pub fn score(&self, segment: &Segment, now: DateTime<Utc>) -> f64 {
        let recency_score = segment.age_hours(now) / 24.0;

        let type_score = match segment.kind {
            SegmentType::Log => 1.0,
            SegmentType::Note => 0.8,
            SegmentType::Code => 0.5,
            SegmentType::Message => 0.3,
            SegmentType::Summary => 0.2,
            SegmentType::Decision => 0.1,
        };

        let refcount_score = 1.0 / (segment.refcount as f64 + 1.0);

        let generation_score = match segment.generation {
            Generation::Old => 1.0,
            Generation::Young => 0.3,
        };

        0.4 * recency_score + 0.3 * type_score + 0.2 * refcount_score + 0.1 * generation_score
    }

    /// Partition candidates by score and greedily pick until the token
    /// target is met: scores above 0.7 are deleted, above 0.4 stashed,
    /// the rest skipped. Deletes are taken before stashes.
    pub fn plan(&self, candidates: &[PruneCandidate], target_tokens: u64) -> PrunePlan {
        if candidates.is_empty() {
            return PrunePlan {
                candidates: Vec::new(),
                total_tokens_freed: 0,
                stash_segments: Vec::new(),
                delete_segments: Vec::new(),
                reason: "no candidates available".to_string(),
            };
        }

        let mut delete_bucket: Vec<&PruneCandidate> = Vec::new();
        let mut stash_bucket: Vec<&PruneCandidate> = Vec::new();
        let mut skip_bucket: Vec<&PruneCandidate> = Vec::new();

        for candidate in candidates {
            if candidate.score > 0.7 {
                delete_bucket.push(candidate);
            } else if candidate.score > 0.4 {
                stash_bucket.push(candidate);
            } else {
                skip_bucket.push(candidate);
            }
        }

        delete_bucket.sort_by(|a, b| b.score.total_cmp(&a.score));
        stash_bucket.sort_by(|a, b| b.score.total_cmp(&a.score));

        let mut delete_segments: Vec<String> = Vec::new();
        let mut stash_segments: Vec<String> = Vec::new();
        let mut total_tokens_freed: u64 = 0;

        for candidate in &delete_bucket {
            if total_tokens_freed >= target_tokens {
                break;
            }
            delete_segments.push(candidate.segment_id.clone());
            total_tokens_freed += candidate.tokens;
        }

        for candidate in &stash_bucket {
            if total_tokens_freed >= target_tokens {
                break;
            }
            stash_segments.push(candidate.segment_id.clone());
            total_tokens_freed += candidate.tokens;
        }

        let mut all_candidates: Vec<PruneCandidate> = delete_bucket
            .into_iter()
            .chain(stash_bucket)
            .chain(skip_bucket)
            .cloned()
            .collect();
        all_candidates.sort_by(|a, b| b.score.total_cmp(&a.score));

        let reason = plan_reason(
            stash_segments.len(),
            delete_segments.len(),
            total_tokens_freed,
            target_tokens,
        );

        PrunePlan {
            candidates: all_candidates,
            total_tokens_freed,
            stash_segments,
            delete_segments,
            reason,
        }
    }
}

/// Edges are `ref:<id>` tags pointing at known ids, plus symmetric edges
/// among segments sharing a `topic_id`.
fn build_reference_graph(segments: &[Segment]) -> HashMap<String, HashSet<String>> {
    let known_ids: HashSet<&str> = segments.iter().map(|s| s.segment_id.as_str()).collect();

    let mut topic_members: HashMap<&str, Vec<&str>> = HashMap::new();
    for segment in segments {
        if let Some(topic_id) = &segment.topic_id {
            topic_members
                .entry(topic_id.as_str())
                .or_default()
                .push(segment.segment_id.as_str());
        }
    }

    let mut references: HashMap<String, HashSet<String>> = HashMap::new();
    for segment in segments {
        let mut refs: HashSet<String> = segment
            .ref_targets()
            .filter(|id| known_ids.contains(id))
            .map(str::to_string)
            .collect();

        if let Some(topic_id) = &segment.topic_id {
            if let Some(members) = topic_members.get(topic_id.as_str()) {
                refs.extend(
                    members
                        .iter()
                        .filter(|id| **id != segment.segment_id)
                        .map(|id| id.to_string()),
                );
            }
        }

        if !refs.is_empty() {
            references.insert(segment.segment_id.clone(), refs);
        }
    }

    references
}

fn candidate_reason(segment: &Segment, score: f64, age_hours: f64) -> String {
    let mut reasons: Vec<String> = Vec::new();

    if age_hours > 24.0 {
        reasons.push(format!("old ({age_hours:.1}h)"));
    } else if age_hours > 1.0 {
        reasons.push(format!("recent ({age_hours:.1}h)"));
    }

    if matches!(segment.kind, SegmentType::Log | SegmentType::Note) {
        reasons.push(format!("low-value type ({})", segment.kind));
    }

    if segment.refcount == 0 {
        reasons.push("no references".to_string());
    } else if segment.refcount < 3 {
        reasons.push(format!("low refcount ({})", segment.refcount));
    }

    if segment.generation == Generation::Old {
        reasons.push("old generation".to_string());
    }

    if reasons.is_empty() {
        reasons.push(format!("score {score:.2}"));
    }

    reasons.join(", ")
}

fn plan_reason(stash_count: usize, delete_count: usize, tokens_freed: u64, target_tokens: u64) -> String {
    let mut actions: Vec<String> = Vec::new();
    if stash_count > 0 {
        actions.push(format!("stash {stash_count} segment(s)"));
    }
    if delete_count > 0 {
        actions.push(format!("delete {delete_count} segment(s)"));
    }
    let action_str = if actions.is_empty() {
        "no action".to_string()
    } else {
        actions.join(" and ")
    };

    let status = if tokens_freed >= target_tokens {
        "target met".to_string()
    } else if tokens_freed > 0 {
        format!("partial ({tokens_freed}/{target_tokens} tokens)")
    } else {
        "no candidates".to_string()
    };

    format!("{action_str} to {status}")
}
