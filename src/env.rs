/// Environment variable management for launched tools.
use std::collections::BTreeMap;
use std::process::Command;

/// Errors from environment updates.
#[derive(Debug)]
pub enum EnvError {
    /// Key is empty or contains `=` or NUL.
    InvalidKey(String),
    /// Value contains NUL.
    InvalidValue { key: String },
    /// `setx` could not be run.
    Persist {
        key: String,
        source: std::io::Error,
    },
    /// `setx` ran but reported failure.
    PersistStatus { key: String, code: Option<i32> },
}

impl std::fmt::Display for EnvError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EnvError::InvalidKey(key) => write!(f, "invalid environment variable name: {key:?}"),
            EnvError::InvalidValue { key } => {
                write!(f, "invalid value for environment variable {key}")
            }
            EnvError::Persist { key, source } => {
                write!(f, "failed to persist environment variable {key}: {source}")
            }
            EnvError::PersistStatus { key, code } => {
                write!(f, "setx failed for {key} (exit code {code:?})")
            }
        }
    }
}

impl std::error::Error for EnvError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EnvError::Persist { source, .. } => Some(source),
            _ => None,
        }
    }
}

fn validate(key: &str, value: &str) -> Result<(), EnvError> {
    if key.is_empty() || key.contains('=') || key.contains('\0') {
        return Err(EnvError::InvalidKey(key.to_string()));
    }
    if value.contains('\0') {
        return Err(EnvError::InvalidValue {
            key: key.to_string(),
        });
    }
    Ok(())
}

/// Set `key` for this process and everything it launches afterwards.
///
/// With `persist` on Windows the value is also stored for future sessions
/// via `setx`. Elsewhere `persist` is ignored.
pub fn set_environment_variable(key: &str, value: &str, persist: bool) -> Result<(), EnvError> {
    validate(key, value)?;
    std::env::set_var(key, value);
    tracing::debug!(key, "environment variable set");

    if persist && crate::platform::is_windows() {
        let status = Command::new("setx")
            .arg(key)
            .arg(value)
            .status()
            .map_err(|e| EnvError::Persist {
                key: key.to_string(),
                source: e,
            })?;
        if !status.success() {
            return Err(EnvError::PersistStatus {
                key: key.to_string(),
                code: status.code(),
            });
        }
    }
    Ok(())
}

pub fn get(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Current environment with `overrides` applied on top. Variables that
/// aren't valid UTF-8 are left out.
pub fn merged_environment(overrides: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    let mut env: BTreeMap<String, String> = std::env::vars_os()
        .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
        .collect();
    for (key, value) in overrides {
        env.insert(key.clone(), value.clone());
    }
    env
}
