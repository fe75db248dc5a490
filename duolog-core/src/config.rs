use std::sync::LazyLock;

use derive_from_env::FromEnv;

use crate::level::Level;

/// Process-wide defaults, read once from `DUOLOG_*` environment variables.
#[derive(FromEnv)]
#[from_env(prefix = "DUOLOG")]
#[allow(non_snake_case)]
pub struct DuologConfig {
    /// Capacity of the buffer in front of file writers.
    #[from_env(default = "8192")]
    pub BUFFER_CAPACITY: usize,
    /// Minimum level of sinks built without an explicit level.
    #[from_env(default = "DEBUG")]
    pub LEVEL: Level,
}

pub static DUOLOG_CONFIG: LazyLock<DuologConfig> = LazyLock::new(|| {
    DuologConfig::from_env().expect("invalid DUOLOG_* environment configuration")
});
