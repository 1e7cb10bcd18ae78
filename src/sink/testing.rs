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

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use crate::Severity;
use crate::sink::Handoff;
use crate::sink::Sink;

/// One entry captured by a [`Testing`] sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedEntry {
    /// The severity the entry was written at.
    pub severity: Severity,
    /// The text handed to the sink.
    pub text: String,
}

/// A sink that keeps entries in memory so that tests can inspect them.
///
/// Clones share the same buffer.
///
/// # Examples
///
/// ```
/// use logroute::Severity;
/// use logroute::sink::Sink;
/// use logroute::sink::Testing;
///
/// let sink = Testing::default();
/// sink.write(Severity::Information, "hello".to_string()).wait().unwrap();
/// assert_eq!(sink.texts(), vec!["hello".to_string()]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Testing {
    entries: Arc<Mutex<Vec<CapturedEntry>>>,
}

impl Testing {
    fn lock(&self) -> MutexGuard<'_, Vec<CapturedEntry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Return a snapshot of every captured entry, in write order.
    pub fn entries(&self) -> Vec<CapturedEntry> {
        self.lock().clone()
    }

    /// Return the captured texts, in write order.
    pub fn texts(&self) -> Vec<String> {
        self.lock().iter().map(|e| e.text.clone()).collect()
    }

    /// Return the number of captured entries.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Return true if nothing has been captured.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl Sink for Testing {
    fn write(&self, severity: Severity, text: String) -> Handoff {
        self.lock().push(CapturedEntry { severity, text });
        Handoff::done()
    }
}
