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

use jiff::Timestamp;
use jiff::tz::TimeZone;

const ENVELOPE_TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M:%S %:z";

/// Wraps a payload in the delimited header/footer block written for every entry.
///
/// Output format:
///
/// ```text
///
/// -----
/// ----------
/// ---------------
/// Start of Startup Log at utc: 2024/08/10 09:12:52 +00:00, local: 2024/08/10 17:12:52 +08:00
/// -----
/// service starting
/// -----
/// End of Startup Log at utc: 2024/08/10 09:12:52 +00:00, local: 2024/08/10 17:12:52 +08:00
/// ---------------
/// ----------
/// -----
/// ```
///
/// The local timestamp uses the system time zone unless [`Envelope::timezone`] overrides it.
#[derive(Debug, Clone)]
pub struct Envelope {
    timezone: TimeZone,
}

impl Default for Envelope {
    fn default() -> Self {
        Self {
            timezone: TimeZone::system(),
        }
    }
}

impl Envelope {
    /// Set the time zone of the local timestamp.
    ///
    /// # Examples
    ///
    /// ```
    /// use jiff::tz::TimeZone;
    /// use logroute::layout::Envelope;
    ///
    /// let envelope = Envelope::default().timezone(TimeZone::UTC);
    /// ```
    #[must_use]
    pub fn timezone(mut self, tz: TimeZone) -> Self {
        self.timezone = tz;
        self
    }

    /// Wrap `content` for the log type called `name`, stamped at `now`.
    pub fn wrap(&self, name: &str, now: Timestamp, content: &str) -> String {
        let utc = now
            .to_zoned(TimeZone::UTC)
            .strftime(ENVELOPE_TIMESTAMP_FORMAT)
            .to_string();
        let local = now
            .to_zoned(self.timezone.clone())
            .strftime(ENVELOPE_TIMESTAMP_FORMAT)
            .to_string();

        let stamp = format!("utc: {utc}, local: {local}");
        let mut text = String::with_capacity(content.len() + 4 * stamp.len());
        text.push_str("\n-----\n----------\n---------------\n");
        text.push_str(&format!("Start of {name} Log at {stamp}\n"));
        text.push_str("-----\n");
        text.push_str(content);
        text.push_str("\n-----\n");
        text.push_str(&format!("End of {name} Log at {stamp}\n"));
        text.push_str("---------------\n----------\n-----");
        text
    }
}
