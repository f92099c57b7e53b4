//! User configuration stored in `~/.cadstream/config.ini`.
//!
//! ```ini
//! [streaming]
//! detailed_budget = 30
//! update_interval_ms = 250
//! camera_rest_ms = 250
//!
//! [decode]
//! workers = 0
//! geometry_cache_mb = 256
//!
//! [fetch]
//! max_attempts = 3
//! retry_delay_ms = 100
//! max_concurrent = 50
//!
//! [logging]
//! level = info
//! file_name = cadstream.log
//! ```
//!
//! Missing keys take their defaults. [`ConfigKey`] addresses single
//! settings for the CLI's `config get|set|list` commands.

mod file;
mod keys;

pub use file::{
    config_dir, config_file_path, ConfigError, ConfigFile, DecodeSettings, FetchSettings, StreamingSettings,
    CONFIG_DIR_NAME, CONFIG_FILE_NAME,
};
pub use keys::ConfigKey;
