//! Configuration file parsing for tvbridge
//!
//! Supports:
//! - `./tvbridge.toml` - Per-directory settings
//! - `<config dir>/tvbridge/config.toml` - User settings

pub mod settings;
pub mod types;

pub use settings::{
    default_config_paths, load_settings, load_settings_from, LOCAL_CONFIG_FILENAME,
};
pub use types::*;
