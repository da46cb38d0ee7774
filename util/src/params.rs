//! Generic parameters functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::de::DeserializeOwned;
use std::fs::read_to_string;
use std::path::Path;
use thiserror::Error;
use toml;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// An error that occurs during loading of a parameter file.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Cannot find the software root directory: {0}")]
    SwRootNotFound(std::io::Error),

    #[error("Cannot load the parmeter file: {0}")]
    FileLoadError(std::io::Error),

    #[error("Cannot read the parameter file: {0}")]
    DeserialiseError(toml::de::Error)
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Load a parameter file
///
/// The file path is relative to the "params" directory of the software root
/// (see [`crate::host::get_sw_root`]).
pub fn load<P>(param_file_path: &str) -> Result<P, LoadError> 
where
    P: DeserializeOwned
{
    // Get the params dir
    let mut path = crate::host::get_sw_root()
        .map_err(LoadError::SwRootNotFound)?;
    path.push("params");
    path.push(param_file_path);

    load_from_path(path)
}

/// Load a parameter file from an explicit path.
pub fn load_from_path<P, F>(path: F) -> Result<P, LoadError>
where
    P: DeserializeOwned,
    F: AsRef<Path>
{
    // Load the file into a string
    let params_str = read_to_string(path)
        .map_err(LoadError::FileLoadError)?;

    from_toml_str(&params_str)
}

/// Parse parameters from a TOML string.
pub fn from_toml_str<P>(params_str: &str) -> Result<P, LoadError>
where
    P: DeserializeOwned
{
    toml::from_str(params_str).map_err(LoadError::DeserialiseError)
}

#[cfg(test)]
mod test {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize, Debug)]
    struct TestParams {
        k_p: f64,
        limits: [f64; 2],
    }

    #[test]
    fn test_from_toml_str() {
        let p: TestParams = from_toml_str("k_p = 0.5\nlimits = [1.0, 2.0]\n").unwrap();
        assert_eq!(p.k_p, 0.5);
        assert_eq!(p.limits, [1.0, 2.0]);

        let e = from_toml_str::<TestParams>("k_p = \"fast\"\n");
        assert!(matches!(e, Err(LoadError::DeserialiseError(_))));
    }

    #[test]
    fn test_missing_file() {
        let e = load_from_path::<TestParams, _>("/this/file/does/not/exist.toml");
        assert!(matches!(e, Err(LoadError::FileLoadError(_))));
    }
}
