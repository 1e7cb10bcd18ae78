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

use serde::Serialize;

/// The text written in place of a missing or blank payload.
pub const EMPTY_PAYLOAD_PLACEHOLDER: &str = "No log data provided.";

/// The content of one log entry.
///
/// A payload never fails to render: missing and blank payloads render as
/// [`EMPTY_PAYLOAD_PLACEHOLDER`], and structured values that cannot be serialized render as a
/// description of the failure.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Payload {
    /// Plain text.
    Text(String),
    /// A value already serialized to indented JSON.
    Structured(String),
    /// No payload.
    #[default]
    Empty,
}

impl Payload {
    /// An empty payload.
    pub fn empty() -> Payload {
        Payload::Empty
    }

    /// Serialize `value` to indented JSON.
    ///
    /// # Examples
    ///
    /// ```
    /// use logroute::Payload;
    ///
    /// #[derive(serde::Serialize)]
    /// struct Order {
    ///     id: u64,
    /// }
    ///
    /// let payload = Payload::structured(&Order { id: 7 });
    /// assert_eq!(payload.render(), "{\n  \"id\": 7\n}");
    /// ```
    pub fn structured<T: Serialize + ?Sized>(value: &T) -> Payload {
        match serde_json::to_string_pretty(value) {
            Ok(json) => Payload::Structured(json),
            Err(err) => Payload::Text(format!("<unserializable payload: {err}>")),
        }
    }

    /// Return `true` if this payload renders as the placeholder.
    pub fn is_blank(&self) -> bool {
        match self {
            Payload::Text(text) | Payload::Structured(text) => text.trim().is_empty(),
            Payload::Empty => true,
        }
    }

    /// Render the payload as the text that goes between the entry's header and footer.
    pub fn render(&self) -> String {
        match self {
            Payload::Text(text) | Payload::Structured(text) if !text.trim().is_empty() => {
                text.clone()
            }
            _ => EMPTY_PAYLOAD_PLACEHOLDER.to_string(),
        }
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload::Text(text.to_string())
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::Text(text)
    }
}

impl From<&String> for Payload {
    fn from(text: &String) -> Self {
        Payload::Text(text.clone())
    }
}

impl From<serde_json::Value> for Payload {
    fn from(value: serde_json::Value) -> Self {
        Payload::structured(&value)
    }
}

impl<T: Into<Payload>> From<Option<T>> for Payload {
    fn from(payload: Option<T>) -> Self {
        payload.map(Into::into).unwrap_or_default()
    }
}
