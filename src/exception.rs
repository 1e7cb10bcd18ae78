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

//! Exception records and their serialization.
//!
//! An [`ExceptionRecord`] is a typed snapshot of an error and its cause chain: a flat map of
//! named string fields per link plus the link's cause. Records are built from any
//! [`std::error::Error`] by walking [`source`](std::error::Error::source), or by hand for
//! errors that carry more structure than `Display` and `Debug` expose.
//!
//! [`ExceptionSerializer`] renders a record as indented JSON. Each field becomes a string member;
//! the cause becomes a nested object under `InnerException`, or `""` when there is none.

use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::io;

use serde_json::Map;
use serde_json::Value;

/// The member that holds a record's cause.
pub const INNER_EXCEPTION_FIELD: &str = "InnerException";

/// The default bound on the number of records in a serialized cause chain.
pub const DEFAULT_MAX_DEPTH: usize = 32;

const CYCLIC_MARKER: &str = "<cyclic cause chain>";

fn truncated_marker(depth: usize) -> String {
    format!("<cause chain truncated at depth {depth}>")
}

/// A snapshot of one error and, recursively, its cause.
///
/// # Examples
///
/// ```
/// use logroute::ExceptionRecord;
///
/// let record = ExceptionRecord::new("DatabaseError")
///     .field("Message", "connection reset")
///     .field("Table", "orders")
///     .cause(ExceptionRecord::new("IoError").field("Message", "broken pipe"));
///
/// assert_eq!(record.get("Table"), Some("orders"));
/// assert_eq!(record.inner().unwrap().get("Message"), Some("broken pipe"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExceptionRecord {
    fields: BTreeMap<String, String>,
    inner: Inner,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
enum Inner {
    #[default]
    None,
    Record(Box<ExceptionRecord>),
    Elided(String),
}

impl ExceptionRecord {
    /// Create a record whose `Type` field is `kind`.
    pub fn new(kind: impl Into<String>) -> ExceptionRecord {
        ExceptionRecord::default().field("Type", kind.into())
    }

    /// Set the field `name` to `value`.
    ///
    /// The name `InnerException` is reserved for the cause and is ignored here.
    pub fn field(mut self, name: impl Into<String>, value: impl ToString) -> ExceptionRecord {
        let name = name.into();
        if name != INNER_EXCEPTION_FIELD {
            self.fields.insert(name, value.to_string());
        }
        self
    }

    /// Set the cause of this record.
    pub fn cause(mut self, cause: ExceptionRecord) -> ExceptionRecord {
        self.inner = Inner::Record(Box::new(cause));
        self
    }

    /// Return the value of the field `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Return every field of this record, excluding the cause.
    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    /// Return the cause of this record.
    pub fn inner(&self) -> Option<&ExceptionRecord> {
        match &self.inner {
            Inner::Record(record) => Some(record),
            _ => None,
        }
    }

    /// Snapshot `err` and its source chain, keeping at most `max_depth` links.
    ///
    /// Every link gets a `Message` field with its `Display` output and a `Debug` field with its
    /// `Debug` output. Links of a few well-known types also carry `Type` and `Kind`.
    ///
    /// A source that is an error already visited in the chain ends the chain with a
    /// `<cyclic cause chain>` marker; a chain longer than `max_depth` ends with a
    /// `<cause chain truncated at depth N>` marker.
    pub fn from_error(err: &(dyn StdError + 'static), max_depth: usize) -> ExceptionRecord {
        let max_depth = max_depth.max(1);
        let mut links = vec![];
        let mut seen: Vec<*const ()> = vec![];
        let mut tail = Inner::None;

        let mut next = Some(err);
        while let Some(err) = next {
            let addr = err as *const dyn StdError as *const ();
            if seen.contains(&addr) {
                tail = Inner::Elided(CYCLIC_MARKER.to_string());
                break;
            }
            if links.len() == max_depth {
                tail = Inner::Elided(truncated_marker(max_depth));
                break;
            }
            seen.push(addr);
            links.push(snapshot(err));
            next = err.source();
        }

        let mut inner = tail;
        for mut link in links.into_iter().rev() {
            link.inner = inner;
            inner = Inner::Record(Box::new(link));
        }
        match inner {
            Inner::Record(record) => *record,
            _ => ExceptionRecord::default(),
        }
    }
}

fn snapshot(err: &(dyn StdError + 'static)) -> ExceptionRecord {
    let record = if let Some(e) = err.downcast_ref::<io::Error>() {
        ExceptionRecord::new("std::io::Error").field("Kind", e.kind())
    } else if let Some(e) = err.downcast_ref::<crate::Error>() {
        ExceptionRecord::new("logroute::Error").field("Kind", e.kind())
    } else if err.is::<serde_json::Error>() {
        ExceptionRecord::new("serde_json::Error")
    } else {
        ExceptionRecord::default()
    };
    record
        .field("Message", err)
        .field("Debug", format!("{err:?}"))
}

/// Renders exceptions as indented JSON payloads.
///
/// # Examples
///
/// ```
/// use logroute::ExceptionRecord;
/// use logroute::ExceptionSerializer;
///
/// let record = ExceptionRecord::new("Timeout").field("Message", "took too long");
/// let json = ExceptionSerializer::default().serialize_record(&record);
/// assert_eq!(
///     json,
///     "{\n  \"InnerException\": \"\",\n  \"Message\": \"took too long\",\n  \"Type\": \"Timeout\"\n}"
/// );
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExceptionSerializer {
    max_depth: usize,
}

impl Default for ExceptionSerializer {
    fn default() -> Self {
        ExceptionSerializer::new(DEFAULT_MAX_DEPTH)
    }
}

impl ExceptionSerializer {
    /// Create a serializer keeping at most `max_depth` records of a cause chain. A depth of zero
    /// is treated as one.
    pub fn new(max_depth: usize) -> ExceptionSerializer {
        ExceptionSerializer {
            max_depth: max_depth.max(1),
        }
    }

    /// The bound on the number of records in a serialized cause chain.
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Serialize `err` and its source chain.
    pub fn serialize(&self, err: &(dyn StdError + 'static)) -> String {
        self.serialize_record(&ExceptionRecord::from_error(err, self.max_depth))
    }

    /// Serialize a record and its cause chain.
    pub fn serialize_record(&self, record: &ExceptionRecord) -> String {
        let value = self.to_value(record, 1);
        serde_json::to_string_pretty(&value).unwrap_or_else(|err| {
            format!("<unserializable exception: {err}>")
        })
    }

    fn to_value(&self, record: &ExceptionRecord, depth: usize) -> Value {
        let mut object = record
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect::<Map<_, _>>();

        let inner = match &record.inner {
            Inner::None => Value::String(String::new()),
            Inner::Elided(marker) => Value::String(marker.clone()),
            Inner::Record(_) if depth >= self.max_depth => {
                Value::String(truncated_marker(self.max_depth))
            }
            Inner::Record(cause) => self.to_value(cause, depth + 1),
        };
        object.insert(INNER_EXCEPTION_FIELD.to_string(), inner);
        Value::Object(object)
    }
}
