pub mod engine;
pub mod model;

pub use engine::AnalysisEngine;
pub use model::{
    AnalysisResult, HealthFactors, HealthScore, Priority, Recommendation, RecommendedAction,
    UsageMetrics,
};
