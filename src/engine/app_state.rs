use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::engine::analysis::AnalysisEngine;
use crate::engine::context::ContextManager;
use crate::engine::core::tokenizer::Tokenizer;
use crate::engine::errors::StorageError;
use crate::engine::gc::GcEngine;
use crate::engine::storage::StorageLayer;
use crate::shared::config::Settings;

/// Owns one instance of every component and wires their dependencies.
/// All state is instance-scoped: independent `AppState` values never
/// share anything, which is what makes parallel tests safe.
pub struct AppState {
    pub settings: Settings,
    pub context: ContextManager,
}

impl AppState {
    pub fn new(settings: Settings) -> Result<Self, StorageError> {
        if !settings.storage.shard_per_project {
            warn!(
                target: "ctxstash::app",
                "shard_per_project=false is not supported; using the sharded layout"
            );
        }

        let storage = StorageLayer::open(
            Path::new(&settings.storage.data_dir),
            settings.storage.max_active_segments,
            settings.storage.enable_indexing,
        )?;

        let tokenizer = Arc::new(Tokenizer::new(&settings.tokenizer.model));
        let analysis = AnalysisEngine::new(Arc::clone(&tokenizer));
        let gc = GcEngine::new(
            settings.gc.recent_messages_count,
            settings.gc.recent_decision_hours,
        );

        let context = ContextManager::new(storage, gc, analysis, tokenizer);

        info!(
            target: "ctxstash::app",
            data_dir = %settings.storage.data_dir,
            model = %settings.tokenizer.model,
            "application state initialized"
        );

        Ok(Self { settings, context })
    }
}
