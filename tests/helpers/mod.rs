pub mod factories;

use std::path::Path;

use crate::shared::config::Settings;

/// Settings pointing at a temp directory, sized for unit tests.
pub fn test_settings(dir: &Path) -> Settings {
    let mut settings = Settings::default();
    settings.storage.data_dir = dir.to_string_lossy().into_owned();
    settings.storage.max_active_segments = 100;
    settings.logging.log_dir = dir.join("logs").to_string_lossy().into_owned();
    settings
}
