use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::engine::analysis::model::{
    HealthFactors, HealthScore, Priority, Recommendation, RecommendedAction, UsageMetrics,
};
use crate::engine::core::segment::{Segment, SegmentType};
use crate::engine::core::tokenizer::Tokenizer;
use crate::shared::time;

/// Computes usage metrics, the health score, and threshold-driven
/// recommendations over a working set.
pub struct AnalysisEngine {
    tokenizer: Arc<Tokenizer>,
}

impl AnalysisEngine {
    pub fn new(tokenizer: Arc<Tokenizer>) -> Self {
        Self { tokenizer }
    }

    /// Aggregate metrics for the given working-tier segments. Token
    /// counts are served from the per-segment cache where valid, so the
    /// slice is mutable.
    pub fn usage_metrics(&self, segments: &mut [Segment], token_limit: u64) -> UsageMetrics {
        if segments.is_empty() {
            return UsageMetrics {
                estimated_remaining_tokens: token_limit,
                ..UsageMetrics::default()
            };
        }

        let now = time::now();
        let mut total_tokens: u64 = 0;
        let mut tokens_by_type: HashMap<SegmentType, u64> = HashMap::new();
        let mut segments_by_type: HashMap<SegmentType, usize> = HashMap::new();
        let mut tokens_by_task: HashMap<String, u64> = HashMap::new();
        let mut pinned_segments_count = 0;
        let mut pinned_tokens: u64 = 0;
        let mut ages_hours: Vec<f64> = Vec::with_capacity(segments.len());

        for segment in segments.iter_mut() {
            let tokens = self.tokenizer.count_segment(segment, false);
            total_tokens += tokens;

            *tokens_by_type.entry(segment.kind).or_default() += tokens;
            *segments_by_type.entry(segment.kind).or_default() += 1;

            if let Some(task_id) = &segment.task_id {
                *tokens_by_task.entry(task_id.clone()).or_default() += tokens;
            }

            if segment.pinned {
                pinned_segments_count += 1;
                pinned_tokens += tokens;
            }

            ages_hours.push(segment.age_hours(now).max(0.0));
        }

        let usage_percent = if token_limit > 0 {
            total_tokens as f64 / token_limit as f64 * 100.0
        } else {
            0.0
        };

        UsageMetrics {
            total_tokens,
            total_segments: segments.len(),
            tokens_by_type,
            segments_by_type,
            tokens_by_task,
            oldest_segment_age_hours: ages_hours.iter().cloned().fold(0.0, f64::max),
            newest_segment_age_hours: ages_hours.iter().cloned().fold(f64::INFINITY, f64::min),
            pinned_segments_count,
            pinned_tokens,
            usage_percent,
            estimated_remaining_tokens: token_limit.saturating_sub(total_tokens),
        }
    }

    /// Health score in [0, 100]: usage headroom, minus an age penalty,
    /// plus a type-diversity bonus.
    pub fn health_score(&self, segments: &mut [Segment], token_limit: u64) -> HealthScore {
        if segments.is_empty() {
            return HealthScore {
                score: 100.0,
                usage_percent: 0.0,
                factors: HealthFactors {
                    usage: 100.0,
                    age_penalty: 0.0,
                    distribution: 0.0,
                },
            };
        }

        let metrics = self.usage_metrics(segments, token_limit);
        let usage_score = (100.0 - metrics.usage_percent).max(0.0);

        let oldest_age_days = metrics.oldest_segment_age_hours / 24.0;
        let age_penalty = (oldest_age_days * 2.0).min(20.0);

        let distribution = distribution_bonus(segments);

        let score = (usage_score - age_penalty + distribution).clamp(0.0, 100.0);
        debug!(
            target: "ctxstash::analysis",
            score,
            usage = usage_score,
            age_penalty,
            distribution,
            "computed health score"
        );

        HealthScore {
            score,
            usage_percent: metrics.usage_percent,
            factors: HealthFactors {
                usage: usage_score,
                age_penalty: -age_penalty,
                distribution,
            },
        }
    }

    /// Ordered recommendations derived from usage thresholds.
    pub fn recommendations(&self, metrics: &UsageMetrics) -> Vec<Recommendation> {
        let mut recommendations = Vec::new();

        if metrics.usage_percent >= 90.0 {
            recommendations.push(Recommendation {
                priority: Priority::Urgent,
                message: "Urgent: Prune context immediately".to_string(),
                action: Some(RecommendedAction::Prune),
            });
        } else if metrics.usage_percent >= 80.0 {
            recommendations.push(Recommendation {
                priority: Priority::High,
                message: "Consider pruning old segments to free space".to_string(),
                action: Some(RecommendedAction::Prune),
            });
        } else if metrics.usage_percent >= 60.0 {
            recommendations.push(Recommendation {
                priority: Priority::Medium,
                message: "Context usage at 60%+ - monitor closely and consider stashing old segments"
                    .to_string(),
                action: Some(RecommendedAction::Stash),
            });
        } else if metrics.usage_percent < 50.0 {
            recommendations.push(Recommendation {
                priority: Priority::Low,
                message: "Context usage is healthy, no action needed".to_string(),
                action: None,
            });
        }

        if metrics.oldest_segment_age_hours > 24.0 {
            recommendations.push(Recommendation {
                priority: Priority::Medium,
                message: "Stash segments older than 24 hours".to_string(),
                action: Some(RecommendedAction::Stash),
            });
        }

        if metrics.total_segments > 0 {
            if let Some((&dominant, &count)) = metrics
                .segments_by_type
                .iter()
                .max_by_key(|(_, count)| **count)
            {
                if count as f64 / metrics.total_segments as f64 > 0.6 {
                    let message = if dominant == SegmentType::Log {
                        "Too many log segments, consider stashing".to_string()
                    } else {
                        format!("Segment type '{dominant}' dominates the context, consider stashing")
                    };
                    recommendations.push(Recommendation {
                        priority: Priority::Medium,
                        message,
                        action: Some(RecommendedAction::Stash),
                    });
                }
            }
        }

        if metrics.pinned_segments_count > 0
            && metrics.pinned_segments_count == metrics.total_segments
        {
            recommendations.push(Recommendation {
                priority: Priority::Low,
                message: "All segments are pinned, consider unpinning some".to_string(),
                action: Some(RecommendedAction::Unpin),
            });
        }

        recommendations
    }
}

/// Normalized Shannon entropy over segment types, scaled to [0, 10].
/// Populations of zero or one segment get the neutral 5.0; two or more
/// segments of a single type score 0.
fn distribution_bonus(segments: &[Segment]) -> f64 {
    if segments.len() <= 1 {
        return 5.0;
    }

    let mut type_counts: HashMap<SegmentType, usize> = HashMap::new();
    for segment in segments {
        *type_counts.entry(segment.kind).or_default() += 1;
    }

    let num_types = type_counts.len();
    if num_types <= 1 {
        return 0.0;
    }

    let total = segments.len() as f64;
    let entropy: f64 = type_counts
        .values()
        .map(|&count| {
            let p = count as f64 / total;
            -p * p.log2()
        })
        .sum();

    let max_entropy = (num_types as f64).log2();
    ((entropy / max_entropy) * 10.0).clamp(0.0, 10.0)
}
