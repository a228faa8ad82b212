pub mod config;
pub mod duration;
pub mod name;

pub use config::{
    ConfigError, CorsConfig, DaemonConfig, PollConfig, PollSettings, ServerConfig, StorageConfig,
    SweepConfig, TriggerConfig,
};
pub use name::{NameError, ProjectName};
