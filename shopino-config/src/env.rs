// Environment variable loading

use crate::{ConfigError, Result};
use std::collections::HashMap;
use std::env;
use std::str::FromStr;

/// Where variables are read from.
#[derive(Debug, Clone)]
enum VarSource {
    Process,
    Fixed(HashMap<String, String>),
}

/// Environment variable loader
///
/// Keys are upper-cased and, when a prefix is set, joined to it with `_`:
/// `load_var("webhook_secret")` with prefix `SHOPINO` reads
/// `SHOPINO_WEBHOOK_SECRET`.
#[derive(Debug, Clone)]
pub struct EnvLoader {
    prefix: Option<String>,
    source: VarSource,
}

impl EnvLoader {
    /// Create a loader over the process environment
    pub fn new(prefix: Option<String>) -> Self {
        Self {
            prefix,
            source: VarSource::Process,
        }
    }

    /// Create a loader over a fixed set of variables instead of the process
    /// environment.
    pub fn from_vars<I, K, V>(prefix: Option<String>, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            prefix,
            source: VarSource::Fixed(
                vars.into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }

    /// Full variable name for a key
    pub fn full_key(&self, key: &str) -> String {
        match self.prefix {
            Some(ref prefix) => format!("{}_{}", prefix, key.to_uppercase()),
            None => key.to_uppercase(),
        }
    }

    /// Load a specific variable
    pub fn load_var(&self, key: &str) -> Result<String> {
        let full_key = self.full_key(key);
        self.raw(&full_key)
            .ok_or(ConfigError::KeyNotFound(full_key))
    }

    /// Load a variable, treating unset and empty the same way
    pub fn load_opt(&self, key: &str) -> Option<String> {
        self.raw(&self.full_key(key)).filter(|v| !v.is_empty())
    }

    /// Load with default value
    pub fn load_var_or(&self, key: &str, default: &str) -> String {
        self.load_opt(key).unwrap_or_else(|| default.to_string())
    }

    /// Load and parse a variable. Unset or empty yields `Ok(None)`.
    pub fn load_parsed<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.load_opt(key) {
            None => Ok(None),
            Some(raw) => raw
                .trim()
                .parse::<T>()
                .map(Some)
                .map_err(|e| ConfigError::ParseError {
                    key: self.full_key(key),
                    message: e.to_string(),
                }),
        }
    }

    /// Load a boolean flag (`1`, `true`, `yes`, `on` are truthy)
    pub fn load_bool(&self, key: &str) -> Option<bool> {
        self.load_opt(key).map(|v| {
            matches!(
                v.trim().to_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            )
        })
    }

    /// Read an exact, unprefixed variable name
    pub fn raw(&self, name: &str) -> Option<String> {
        match &self.source {
            VarSource::Process => env::var(name).ok(),
            VarSource::Fixed(map) => map.get(name).cloned(),
        }
    }
}

impl Default for EnvLoader {
    fn default() -> Self {
        Self::new(None)
    }
}

/// Load a `.env` file into the process environment.
///
/// With no path, a missing `.env` in the working directory is ignored.
pub fn load_dotenv(path: Option<&str>) -> Result<()> {
    match path {
        Some(path) => {
            dotenvy::from_path(path).map_err(|e| ConfigError::LoadError(e.to_string()))?;
        }
        None => {
            dotenvy::dotenv().ok();
        }
    }
    Ok(())
}
