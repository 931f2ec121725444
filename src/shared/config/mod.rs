pub mod model;

pub use model::{
    GcConfig, LoggingConfig, Settings, StorageConfig, TokenizerConfig, load_settings,
};
