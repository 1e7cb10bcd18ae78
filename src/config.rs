// Copyright 2024 FastLabs Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::ErrorKind;
use crate::LogTypeDescriptor;
use crate::descriptor::DEFAULT_EXTENSION;
use crate::descriptor::DEFAULT_ROOT;
use crate::exception::DEFAULT_MAX_DEPTH;

/// Configuration of a [`Dispatcher`](crate::Dispatcher).
///
/// Every field has a default, so a configuration file only names what it changes:
///
/// ```json
/// {
///     "root": "/var/log/orders",
///     "buffered_lines_limit": 4096,
///     "log_types": [
///         { "name": "Audit", "folder": "security/audit", "severity": "Warning", "rotation": "daily" }
///     ]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// The directory every log type without its own root writes under.
    pub root: PathBuf,
    /// The file extension of the built-in log types.
    pub extension: String,
    /// Bound on each sink's queue. Unbounded when unset.
    pub buffered_lines_limit: Option<usize>,
    /// How long dropping a sink waits for its queue to drain, in milliseconds.
    pub shutdown_timeout_ms: Option<u64>,
    /// Bound on the number of records in a serialized cause chain.
    pub max_exception_depth: usize,
    /// Custom log types, registered after the built-in ones, in order.
    pub log_types: Vec<LogTypeDescriptor>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            root: PathBuf::from(DEFAULT_ROOT),
            extension: DEFAULT_EXTENSION.to_string(),
            buffered_lines_limit: None,
            shutdown_timeout_ms: None,
            max_exception_depth: DEFAULT_MAX_DEPTH,
            log_types: vec![],
        }
    }
}

impl Config {
    /// Parse a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Config, Error> {
        let config: Config = serde_json::from_str(json).map_err(|err| {
            Error::new(ErrorKind::ConfigInvalid, "failed to parse configuration").with_source(err)
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Build a configuration from the default overridden by environment variables.
    ///
    /// | Variable                        | Field                   |
    /// |---------------------------------|-------------------------|
    /// | `LOGROUTE_ROOT`                 | `root`                  |
    /// | `LOGROUTE_EXTENSION`            | `extension`             |
    /// | `LOGROUTE_BUFFERED_LINES`       | `buffered_lines_limit`  |
    /// | `LOGROUTE_SHUTDOWN_TIMEOUT_MS`  | `shutdown_timeout_ms`   |
    /// | `LOGROUTE_MAX_EXCEPTION_DEPTH`  | `max_exception_depth`   |
    pub fn from_env() -> Result<Config, Error> {
        Config::from_vars(|key| std::env::var(key).ok())
    }

    /// Like [`Config::from_env`], reading variables through `lookup`.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Config, Error> {
        let mut config = Config::default();
        if let Some(root) = lookup("LOGROUTE_ROOT") {
            config.root = PathBuf::from(root);
        }
        if let Some(extension) = lookup("LOGROUTE_EXTENSION") {
            config.extension = extension;
        }
        if let Some(limit) = lookup("LOGROUTE_BUFFERED_LINES") {
            config.buffered_lines_limit = Some(parse_var("LOGROUTE_BUFFERED_LINES", &limit)?);
        }
        if let Some(timeout) = lookup("LOGROUTE_SHUTDOWN_TIMEOUT_MS") {
            config.shutdown_timeout_ms = Some(parse_var("LOGROUTE_SHUTDOWN_TIMEOUT_MS", &timeout)?);
        }
        if let Some(depth) = lookup("LOGROUTE_MAX_EXCEPTION_DEPTH") {
            config.max_exception_depth = parse_var("LOGROUTE_MAX_EXCEPTION_DEPTH", &depth)?;
        }
        config.validate()?;
        Ok(config)
    }

    /// The shutdown timeout as a [`Duration`].
    pub fn shutdown_timeout(&self) -> Option<Duration> {
        self.shutdown_timeout_ms.map(Duration::from_millis)
    }

    fn validate(&self) -> Result<(), Error> {
        if self.max_exception_depth == 0 {
            return Err(Error::new(
                ErrorKind::ConfigInvalid,
                "max_exception_depth must be at least 1",
            ));
        }
        if self.buffered_lines_limit == Some(0) {
            return Err(Error::new(
                ErrorKind::ConfigInvalid,
                "buffered_lines_limit must be at least 1",
            ));
        }
        Ok(())
    }
}

fn parse_var<T>(key: &'static str, value: &str) -> Result<T, Error>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value.trim().parse().map_err(|err| {
        Error::new(ErrorKind::ConfigInvalid, "failed to parse environment variable")
            .with_context("key", key)
            .with_context("value", value)
            .with_source(err)
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::LogType;
    use crate::Rotation;
    use crate::Severity;

    #[test]
    fn test_from_json_with_defaults() {
        let config = Config::from_json(
            r#"{
                "root": "/var/log/orders",
                "log_types": [
                    {"name": "Audit", "folder": "security/audit", "severity": "warning", "rotation": "daily"}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(config.root, PathBuf::from("/var/log/orders"));
        assert_eq!(config.extension, "md");
        assert_eq!(config.max_exception_depth, DEFAULT_MAX_DEPTH);
        assert_eq!(config.shutdown_timeout(), None);

        let audit = &config.log_types[0];
        assert_eq!(audit.name(), "Audit");
        assert_eq!(audit.severity(), Severity::Warning);
        assert_eq!(audit.rotation(), Rotation::Daily);
    }

    #[test]
    fn test_from_json_rejects_invalid() {
        for json in [
            r#"{"unknown": 1}"#,
            r#"{"max_exception_depth": 0}"#,
            r#"{"buffered_lines_limit": 0}"#,
            r#"{"log_types": [{"name": "A", "severity": "loud"}]}"#,
            "not json",
        ] {
            let err = Config::from_json(json).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::ConfigInvalid, "{json}");
        }
    }

    #[test]
    fn test_from_vars() {
        let vars = HashMap::from([
            ("LOGROUTE_ROOT", "/tmp/logs"),
            ("LOGROUTE_EXTENSION", "log"),
            ("LOGROUTE_BUFFERED_LINES", "128"),
            ("LOGROUTE_SHUTDOWN_TIMEOUT_MS", " 250 "),
            ("LOGROUTE_MAX_EXCEPTION_DEPTH", "8"),
        ]);
        let config = Config::from_vars(|key| vars.get(key).map(|v| v.to_string())).unwrap();
        assert_eq!(config.root, PathBuf::from("/tmp/logs"));
        assert_eq!(config.extension, "log");
        assert_eq!(config.buffered_lines_limit, Some(128));
        assert_eq!(config.shutdown_timeout(), Some(Duration::from_millis(250)));
        assert_eq!(config.max_exception_depth, 8);
    }

    #[test]
    fn test_from_vars_rejects_garbage() {
        let err = Config::from_vars(|key| {
            (key == "LOGROUTE_BUFFERED_LINES").then(|| "lots".to_string())
        })
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
        assert!(err.to_string().contains("LOGROUTE_BUFFERED_LINES"));
    }
}
