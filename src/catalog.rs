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

//! Built-in log types.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use crate::Error;
use crate::ErrorKind;
use crate::LogType;
use crate::LogTypeDescriptor;
use crate::Rotation;
use crate::Severity;
use crate::descriptor::DEFAULT_EXTENSION;
use crate::descriptor::DEFAULT_ROOT;

/// Well-known log categories, each bound to a built-in log type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogCategory {
    /// Default general-purpose log type.
    Default,
    /// Application startup events.
    Startup,
    /// Exceptions raised during startup.
    StartupException,
    /// Tracing of business or infrastructure events.
    TraceLog,
    /// Exceptions captured during trace operations.
    TraceLogException,
    /// Critical failures encountered during tracing.
    TraceLogFailure,
    /// General exceptions.
    Exception,
    /// Database exceptions.
    ExceptionDatabase,
    /// Data tampering or integrity violations.
    ExceptionDataTamper,
    /// Failures while handling an exception or recovering from it.
    ExceptionFailure,
    /// Failures that are not exceptions, such as a failed command or workflow.
    Failure,
}

impl LogCategory {
    /// Every category.
    pub const ALL: [LogCategory; 11] = [
        LogCategory::Default,
        LogCategory::Startup,
        LogCategory::StartupException,
        LogCategory::TraceLog,
        LogCategory::TraceLogException,
        LogCategory::TraceLogFailure,
        LogCategory::Exception,
        LogCategory::ExceptionDatabase,
        LogCategory::ExceptionDataTamper,
        LogCategory::ExceptionFailure,
        LogCategory::Failure,
    ];

    /// The name of the category, which is also the name of its log type.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogCategory::Default => "Default",
            LogCategory::Startup => "Startup",
            LogCategory::StartupException => "StartupException",
            LogCategory::TraceLog => "TraceLog",
            LogCategory::TraceLogException => "TraceLogException",
            LogCategory::TraceLogFailure => "TraceLogFailure",
            LogCategory::Exception => "Exception",
            LogCategory::ExceptionDatabase => "ExceptionDatabase",
            LogCategory::ExceptionDataTamper => "ExceptionDataTamper",
            LogCategory::ExceptionFailure => "ExceptionFailure",
            LogCategory::Failure => "Failure",
        }
    }

    // (folder, severity, rotation)
    fn policy(&self) -> (&'static str, Severity, Rotation) {
        match self {
            LogCategory::Default => ("default", Severity::Verbose, Rotation::Hourly),
            LogCategory::Startup => ("startup", Severity::Information, Rotation::Hourly),
            LogCategory::StartupException => {
                ("startup/exceptions", Severity::Fatal, Rotation::Minutely)
            }
            LogCategory::TraceLog => ("tracelogs", Severity::Information, Rotation::Hourly),
            LogCategory::TraceLogException => {
                ("tracelogs/exceptions", Severity::Error, Rotation::Minutely)
            }
            LogCategory::TraceLogFailure => {
                ("tracelogs/failures", Severity::Fatal, Rotation::Minutely)
            }
            LogCategory::Exception => ("exceptions", Severity::Error, Rotation::Minutely),
            LogCategory::ExceptionDatabase => {
                ("exceptions/database", Severity::Fatal, Rotation::Minutely)
            }
            LogCategory::ExceptionDataTamper => {
                ("exceptions/datatamper", Severity::Fatal, Rotation::Minutely)
            }
            LogCategory::ExceptionFailure => {
                ("exceptions/failure", Severity::Fatal, Rotation::Minutely)
            }
            LogCategory::Failure => ("failures", Severity::Fatal, Rotation::Minutely),
        }
    }
}

impl fmt::Display for LogCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogCategory {
    type Err = Error;

    fn from_str(s: &str) -> Result<LogCategory, Self::Err> {
        LogCategory::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                Error::new(ErrorKind::ConfigInvalid, "unknown log category").with_context("input", s)
            })
    }
}

/// The fixed table of built-in log types, one per [`LogCategory`].
///
/// Entries are built once and never change.
///
/// # Examples
///
/// ```
/// use logroute::LogCategory;
/// use logroute::PredefinedCatalog;
/// use logroute::Rotation;
/// use logroute::Severity;
///
/// let catalog = PredefinedCatalog::default();
/// let startup_exception = catalog.get(LogCategory::StartupException);
/// assert_eq!(startup_exception.severity(), Severity::Fatal);
/// assert_eq!(startup_exception.rotation(), Rotation::Minutely);
/// ```
#[derive(Debug, Clone)]
pub struct PredefinedCatalog {
    entries: HashMap<LogCategory, Arc<dyn LogType>>,
    default: Arc<dyn LogType>,
}

impl Default for PredefinedCatalog {
    fn default() -> Self {
        PredefinedCatalog::new(DEFAULT_ROOT, DEFAULT_EXTENSION)
    }
}

impl PredefinedCatalog {
    /// Build the catalog with every log type stored under `root`, using file extension
    /// `extension`.
    pub fn new(root: impl AsRef<Path>, extension: &str) -> PredefinedCatalog {
        let root = root.as_ref();
        let build = |category: LogCategory| -> Arc<dyn LogType> {
            let (folder, severity, rotation) = category.policy();
            Arc::new(
                LogTypeDescriptor::builder(category.as_str())
                    .root(root)
                    .folder(folder)
                    .extension(extension)
                    .severity(severity)
                    .rotation(rotation)
                    .build(),
            )
        };

        let entries = LogCategory::ALL
            .into_iter()
            .map(|category| (category, build(category)))
            .collect::<HashMap<_, _>>();
        let default = build(LogCategory::Default);
        PredefinedCatalog { entries, default }
    }

    /// Return the log type of `category`, falling back to the `Default` log type.
    pub fn get(&self, category: LogCategory) -> Arc<dyn LogType> {
        self.entries
            .get(&category)
            .unwrap_or(&self.default)
            .clone()
    }

    /// Return every built-in log type with its category name.
    pub fn get_all(&self) -> impl Iterator<Item = (&'static str, Arc<dyn LogType>)> + '_ {
        self.entries
            .iter()
            .map(|(category, log_type)| (category.as_str(), log_type.clone()))
    }
}
