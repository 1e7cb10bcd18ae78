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

use jiff::RoundMode;
use jiff::Span;
use jiff::Unit;
use jiff::Zoned;
use jiff::ZonedRound;
use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;

use crate::Error;
use crate::ErrorKind;

/// Defines a fixed period for rolling of a log file.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub enum Rotation {
    /// Minutely Rotation
    Minutely,
    /// Hourly Rotation
    Hourly,
    /// Daily Rotation
    Daily,
    /// No Time Rotation
    Never,
}

impl Rotation {
    /// Return the next rollover boundary after `current_date`, in milliseconds since the epoch.
    pub fn next_date_timestamp(&self, current_date: &Zoned) -> Option<usize> {
        let (span, unit) = match *self {
            Rotation::Minutely => (Span::new().minutes(1), Unit::Minute),
            Rotation::Hourly => (Span::new().hours(1), Unit::Hour),
            Rotation::Daily => (Span::new().days(1), Unit::Day),
            Rotation::Never => return None,
        };

        let next_date = current_date.checked_add(span).ok()?;
        let rounding = ZonedRound::new().smallest(unit).mode(RoundMode::Trunc);
        let next_date = next_date.round(rounding).ok()?;
        Some(next_date.timestamp().as_millisecond() as usize)
    }

    /// Return the strftime pattern that stamps a file of this rotation.
    pub fn date_format(&self) -> &'static str {
        match *self {
            Rotation::Minutely => "%Y%m%d%H%M",
            Rotation::Hourly => "%Y%m%d%H",
            Rotation::Daily => "%Y%m%d",
            Rotation::Never => "",
        }
    }

    /// Return the lower-case name of this rotation.
    pub fn as_str(&self) -> &'static str {
        match *self {
            Rotation::Minutely => "minutely",
            Rotation::Hourly => "hourly",
            Rotation::Daily => "daily",
            Rotation::Never => "never",
        }
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Rotation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Rotation, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "minute" | "minutely" => Ok(Rotation::Minutely),
            "hour" | "hourly" => Ok(Rotation::Hourly),
            "day" | "daily" => Ok(Rotation::Daily),
            "never" | "infinite" => Ok(Rotation::Never),
            _ => Err(Error::new(ErrorKind::ConfigInvalid, "malformed rotation").with_context("input", s)),
        }
    }
}

impl Serialize for Rotation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Rotation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Rotation::from_str(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use jiff::Zoned;

    use super::Rotation;

    fn millis(s: &str) -> usize {
        Zoned::from_str(s).unwrap().timestamp().as_millisecond() as usize
    }

    #[test]
    fn test_next_date_timestamp() {
        let current_date = Zoned::from_str("2024-08-10T17:12:52[UTC]").unwrap();

        assert_eq!(
            Rotation::Minutely.next_date_timestamp(&current_date),
            Some(millis("2024-08-10T17:13:00[UTC]"))
        );
        assert_eq!(
            Rotation::Hourly.next_date_timestamp(&current_date),
            Some(millis("2024-08-10T18:00:00[UTC]"))
        );
        assert_eq!(
            Rotation::Daily.next_date_timestamp(&current_date),
            Some(millis("2024-08-11T00:00:00[UTC]"))
        );
        assert_eq!(Rotation::Never.next_date_timestamp(&current_date), None);
    }

    #[test]
    fn test_from_str() {
        assert_eq!(Rotation::from_str("Minute").unwrap(), Rotation::Minutely);
        assert_eq!(Rotation::from_str("hourly").unwrap(), Rotation::Hourly);
        assert_eq!(Rotation::from_str("DAY").unwrap(), Rotation::Daily);
        assert!(Rotation::from_str("weekly").is_err());
    }
}
