//! Host platform utility functions

use std::env;
use std::path::PathBuf;

/// Environment variable pointing at the root of the software tree.
pub const SW_ROOT_ENV_VAR: &str = "SSL_CTRL_SW_ROOT";

/// Get the root directory of the software.
///
/// This is the value of the `SSL_CTRL_SW_ROOT` environment variable, or the
/// current working directory if the variable is not set.
pub fn get_sw_root() -> std::io::Result<PathBuf> {
    match env::var_os(SW_ROOT_ENV_VAR) {
        Some(root) => Ok(PathBuf::from(root)),
        None => env::current_dir(),
    }
}
