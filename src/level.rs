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

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;

use crate::Error;
use crate::ErrorKind;

/// Severity of a log entry, ordered from the most verbose to the most severe.
///
/// # Examples
///
/// ```
/// use logroute::Severity;
///
/// assert!(Severity::Verbose < Severity::Fatal);
/// assert_eq!(Severity::Information.abbreviation(), "INF");
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Severity {
    /// Anything and everything you might want to know about a running block of code.
    Verbose,
    /// Internal system events that aren't necessarily observable from the outside.
    Debug,
    /// The lifeblood of operational intelligence - things happen.
    Information,
    /// Service is degraded or endangered.
    Warning,
    /// Functionality is unavailable, invariants are broken or data is lost.
    Error,
    /// If you have a pager, it goes off when one of these occurs.
    Fatal,
}

impl Severity {
    /// All severities in ascending order.
    pub const ALL: [Severity; 6] = [
        Severity::Verbose,
        Severity::Debug,
        Severity::Information,
        Severity::Warning,
        Severity::Error,
        Severity::Fatal,
    ];

    /// Return the string representation of the `Severity`.
    ///
    /// This returns the same string as the `fmt::Display` implementation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Verbose => "Verbose",
            Severity::Debug => "Debug",
            Severity::Information => "Information",
            Severity::Warning => "Warning",
            Severity::Error => "Error",
            Severity::Fatal => "Fatal",
        }
    }

    /// Return the three-letter upper-case form, as rendered by `{Level:u3}`.
    pub fn abbreviation(&self) -> &'static str {
        match self {
            Severity::Verbose => "VRB",
            Severity::Debug => "DBG",
            Severity::Information => "INF",
            Severity::Warning => "WRN",
            Severity::Error => "ERR",
            Severity::Fatal => "FTL",
        }
    }

    /// Map a `log` crate level onto a severity.
    pub fn from_log_level(level: log::Level) -> Severity {
        match level {
            log::Level::Error => Severity::Error,
            log::Level::Warn => Severity::Warning,
            log::Level::Info => Severity::Information,
            log::Level::Debug => Severity::Debug,
            log::Level::Trace => Severity::Verbose,
        }
    }
}

impl fmt::Debug for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Severity, Self::Err> {
        for level in Severity::ALL {
            if s.eq_ignore_ascii_case(level.as_str()) || s.eq_ignore_ascii_case(level.abbreviation())
            {
                return Ok(level);
            }
        }
        Err(Error::new(ErrorKind::ConfigInvalid, "malformed severity").with_context("input", s))
    }
}

impl Serialize for Severity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Severity::from_str(&s).map_err(serde::de::Error::custom)
    }
}
