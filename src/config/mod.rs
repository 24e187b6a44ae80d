// Configuration management module
// Handles the TOML settings file and interactive editing

pub mod interactive;
pub mod settings;


pub use interactive::{run_interactive_config, show_config};
pub use settings::{Config, ConfigError, EmbeddingBackend, EmbeddingConfig, MatchingConfig};
