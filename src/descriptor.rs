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

//! Log type descriptors: the routing policy of one log type.

use std::fmt;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

use crate::Rotation;
use crate::Severity;
use crate::layout::DEFAULT_OUTPUT_TEMPLATE;

/// The directory all log types are stored under unless configured otherwise.
pub const DEFAULT_ROOT: &str = "app-logs";

/// The file extension of log files unless configured otherwise.
pub const DEFAULT_EXTENSION: &str = "md";

/// Normalize a log type name for lookups. Names are case-insensitive.
pub fn normalize(name: &str) -> String {
    name.to_lowercase()
}

/// The routing policy of one log type: where its entries go, at which severity, how the files
/// rotate and how each entry is rendered.
///
/// Implementations must be immutable: every method returns the same value for the lifetime of
/// the instance, and [`LogType::log_path`] is a pure function of its argument.
pub trait LogType: fmt::Debug + Send + Sync + 'static {
    /// The name identifying this log type. Lookups compare names case-insensitively.
    fn name(&self) -> &str;

    /// The path template of the log file, optionally scoped by an instance identifier.
    fn log_path(&self, instance_id: Option<&str>) -> PathBuf;

    /// The severity every entry of this type is written at, which is also its floor.
    fn severity(&self) -> Severity;

    /// How often the log file rolls over.
    fn rotation(&self) -> Rotation;

    /// The output template used to render each entry.
    fn output_template(&self) -> &str;
}

/// The default [`LogType`] implementation.
///
/// The path of a descriptor named `Name` with folder `folder` is
/// `root/folder/log_name_.ext`, or `root/folder/log_name_{instance}_.ext` when an instance
/// identifier is given. Without a folder, the normalized name is used as the folder.
///
/// # Examples
///
/// ```
/// use std::path::PathBuf;
///
/// use logroute::LogType;
/// use logroute::LogTypeDescriptor;
/// use logroute::Rotation;
/// use logroute::Severity;
///
/// let audit = LogTypeDescriptor::builder("Audit")
///     .folder("security/audit")
///     .severity(Severity::Warning)
///     .rotation(Rotation::Daily)
///     .build();
///
/// assert_eq!(
///     audit.log_path(None),
///     PathBuf::from("app-logs/security/audit/log_audit_.md")
/// );
/// assert_eq!(
///     audit.log_path(Some("42")),
///     PathBuf::from("app-logs/security/audit/log_audit_42_.md")
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogTypeDescriptor {
    name: String,
    #[serde(default)]
    folder: Option<String>,
    #[serde(default)]
    root: Option<PathBuf>,
    #[serde(default = "default_extension")]
    extension: String,
    #[serde(default = "default_severity")]
    severity: Severity,
    #[serde(default = "default_rotation")]
    rotation: Rotation,
    #[serde(default = "default_output_template")]
    output_template: String,
}

fn default_extension() -> String {
    DEFAULT_EXTENSION.to_string()
}

fn default_severity() -> Severity {
    Severity::Verbose
}

fn default_rotation() -> Rotation {
    Rotation::Hourly
}

fn default_output_template() -> String {
    DEFAULT_OUTPUT_TEMPLATE.to_string()
}

impl LogTypeDescriptor {
    /// Create a [`LogTypeDescriptorBuilder`] for a log type called `name`.
    pub fn builder(name: impl Into<String>) -> LogTypeDescriptorBuilder {
        LogTypeDescriptorBuilder {
            descriptor: LogTypeDescriptor {
                name: name.into(),
                folder: None,
                root: None,
                extension: default_extension(),
                severity: default_severity(),
                rotation: default_rotation(),
                output_template: default_output_template(),
            },
        }
    }

    /// The folder under the root, if one was configured.
    pub fn folder(&self) -> Option<&str> {
        self.folder.as_deref()
    }

    /// The root directory this descriptor writes under.
    pub fn root(&self) -> &Path {
        self.root
            .as_deref()
            .unwrap_or_else(|| Path::new(DEFAULT_ROOT))
    }

    /// The log file extension, without the dot.
    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub(crate) fn with_root_if_unset(mut self, root: &Path) -> LogTypeDescriptor {
        if self.root.is_none() {
            self.root = Some(root.to_path_buf());
        }
        self
    }
}

impl LogType for LogTypeDescriptor {
    fn name(&self) -> &str {
        &self.name
    }

    fn log_path(&self, instance_id: Option<&str>) -> PathBuf {
        let name = normalize(&self.name);
        let folder = match self.folder.as_deref() {
            Some(folder) if !folder.is_empty() => folder.to_string(),
            _ => name.clone(),
        };
        let filename = match instance_id {
            None => format!("log_{name}_.{}", self.extension),
            Some(id) => format!("log_{name}_{id}_.{}", self.extension),
        };
        self.root().join(folder).join(filename)
    }

    fn severity(&self) -> Severity {
        self.severity
    }

    fn rotation(&self) -> Rotation {
        self.rotation
    }

    fn output_template(&self) -> &str {
        &self.output_template
    }
}

/// A builder for [`LogTypeDescriptor`].
#[must_use = "call `build` to construct the descriptor"]
#[derive(Debug, Clone)]
pub struct LogTypeDescriptorBuilder {
    descriptor: LogTypeDescriptor,
}

impl LogTypeDescriptorBuilder {
    /// Set the folder under the root. Default to the normalized name.
    #[must_use]
    pub fn folder(mut self, folder: impl Into<String>) -> Self {
        self.descriptor.folder = Some(folder.into());
        self
    }

    /// Set the root directory. Default to [`DEFAULT_ROOT`].
    #[must_use]
    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.descriptor.root = Some(root.into());
        self
    }

    /// Set the file extension, without the dot. Default to [`DEFAULT_EXTENSION`].
    #[must_use]
    pub fn extension(mut self, extension: impl Into<String>) -> Self {
        self.descriptor.extension = extension.into();
        self
    }

    /// Set the severity. Default to [`Severity::Verbose`].
    #[must_use]
    pub fn severity(mut self, severity: Severity) -> Self {
        self.descriptor.severity = severity;
        self
    }

    /// Set the rotation. Default to [`Rotation::Hourly`].
    #[must_use]
    pub fn rotation(mut self, rotation: Rotation) -> Self {
        self.descriptor.rotation = rotation;
        self
    }

    /// Set the output template. Default to [`DEFAULT_OUTPUT_TEMPLATE`].
    #[must_use]
    pub fn output_template(mut self, template: impl Into<String>) -> Self {
        self.descriptor.output_template = template.into();
        self
    }

    /// Build the descriptor.
    pub fn build(self) -> LogTypeDescriptor {
        self.descriptor
    }
}
