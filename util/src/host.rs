//! Host platform utility functions

use std::path::PathBuf;

/// Environment variable which points at the root of the software tree. The `params` and
/// `sessions` directories are resolved relative to it.
pub const SW_ROOT_ENV_VAR: &str = "EXO_SW_ROOT";

/// Get the software root directory from the `EXO_SW_ROOT` environment variable.
pub fn get_exo_sw_root() -> Result<PathBuf, std::env::VarError> {
    std::env::var(SW_ROOT_ENV_VAR).map(PathBuf::from)
}
