pub mod config;
pub mod context;
pub mod moment;
pub mod patterns;
pub mod recommend;
pub mod track;

use std::sync::Arc;

use laterly_core::{BehaviorLog, Config, Database, LearningStore, SuggestionCoordinator};

/// Everything a command needs from the user's data directory.
pub struct Workspace {
    pub config: Config,
    pub db: Arc<Database>,
    pub coordinator: SuggestionCoordinator,
}

impl Workspace {
    pub fn open() -> Result<Self, Box<dyn std::error::Error>> {
        let config = Config::load()?;
        let db = Arc::new(Database::open()?);
        let store: Arc<dyn LearningStore> = db.clone();
        let coordinator = SuggestionCoordinator::with_settings(store, config.coordinator_settings());
        tracing::debug!(
            log_capacity = config.recommendations.log_capacity,
            "workspace opened"
        );
        Ok(Self {
            config,
            db,
            coordinator,
        })
    }

    pub fn log(&self) -> Result<BehaviorLog, Box<dyn std::error::Error>> {
        Ok(self.db.load_log(self.config.recommendations.log_capacity)?)
    }
}

pub fn print_json<T: serde::Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
