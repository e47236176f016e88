pub mod config;
pub mod excel;
pub mod export;
pub mod history;
pub mod pdf;
pub mod repository;

use std::sync::Arc;

use config::Config;
use repository::ExtractionRepository;

mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

/// Package version, with the short git hash when the build provides one.
pub fn get_service_version() -> String {
    match option_env!("SPEC_ASSISTANT_GIT_HASH") {
        Some(hash) => {
            let short: String = hash.chars().take(8).collect();
            format!("{}+{}", built_info::PKG_VERSION, short)
        }
        None => built_info::PKG_VERSION.to_string(),
    }
}

pub struct AppState {
    pub config: Config,
    pub repository: Arc<dyn ExtractionRepository>,
}

impl AppState {
    pub fn new(config: Config, repository: Arc<dyn ExtractionRepository>) -> Self {
        Self { config, repository }
    }
}
