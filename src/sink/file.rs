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
use std::sync::Arc;
use std::time::Duration;

use jiff::Zoned;

use crate::DefaultTrap;
use crate::Error;
use crate::Rotation;
use crate::Severity;
use crate::Trap;
use crate::layout::OutputTemplate;
use crate::sink::Handoff;
use crate::sink::NonBlocking;
use crate::sink::NonBlockingBuilder;
use crate::sink::RollingFileWriterBuilder;
use crate::sink::Sink;
use crate::sink::WorkerGuard;

/// A builder to configure and create a [`RollingFile`] sink.
#[derive(Debug)]
pub struct RollingFileBuilder {
    writer: RollingFileWriterBuilder,
    non_blocking: NonBlockingBuilder,
    template: OutputTemplate,
    min_severity: Severity,
    trap: Arc<dyn Trap>,
}

impl RollingFileBuilder {
    /// Create a new rolling file sink builder for the given path template.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            writer: RollingFileWriterBuilder::new(path),
            non_blocking: NonBlockingBuilder::default(),
            template: OutputTemplate::default(),
            min_severity: Severity::Verbose,
            trap: Arc::new(DefaultTrap::default()),
        }
    }

    /// Set the rotation policy. Default to [`Rotation::Never`].
    #[must_use]
    pub fn rotation(mut self, rotation: Rotation) -> Self {
        self.writer = self.writer.rotation(rotation);
        self
    }

    /// Set the output template used to render each entry.
    #[must_use]
    pub fn template(mut self, template: OutputTemplate) -> Self {
        self.template = template;
        self
    }

    /// Set the lowest severity this sink writes. Default to [`Severity::Verbose`].
    #[must_use]
    pub fn min_severity(mut self, severity: Severity) -> Self {
        self.min_severity = severity;
        self
    }

    /// Set the name of the background worker thread.
    #[must_use]
    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.non_blocking = self.non_blocking.thread_name(name);
        self
    }

    /// Bound the number of queued entries; senders block once it is reached.
    #[must_use]
    pub fn buffered_lines_limit(mut self, limit: Option<usize>) -> Self {
        self.non_blocking = self.non_blocking.buffered_lines_limit(limit);
        self
    }

    /// Set how long dropping the sink waits for queued entries to drain.
    #[must_use]
    pub fn shutdown_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.non_blocking = self.non_blocking.shutdown_timeout(timeout);
        self
    }

    /// Set the trap receiving background errors nobody observed.
    #[must_use]
    pub fn trap(mut self, trap: Arc<dyn Trap>) -> Self {
        self.trap = trap;
        self
    }

    /// Build the [`RollingFile`] sink, opening the current file and spawning its worker.
    pub fn build(self) -> Result<RollingFile, Error> {
        let RollingFileBuilder {
            writer,
            non_blocking,
            template,
            min_severity,
            trap,
        } = self;

        let writer = writer.trap(trap.clone()).build()?;
        let (writer, guard) = non_blocking.finish(writer, trap)?;
        Ok(RollingFile {
            template,
            min_severity,
            writer,
            _guard: guard,
        })
    }
}

/// A sink that renders entries with an [`OutputTemplate`] and writes them to rolling files from a
/// background thread.
#[derive(Debug)]
pub struct RollingFile {
    template: OutputTemplate,
    min_severity: Severity,
    writer: NonBlocking,
    _guard: WorkerGuard,
}

impl RollingFile {
    /// Create a [`RollingFileBuilder`].
    pub fn builder(path: impl Into<PathBuf>) -> RollingFileBuilder {
        RollingFileBuilder::new(path)
    }
}

impl Sink for RollingFile {
    fn write(&self, severity: Severity, text: String) -> Handoff {
        if severity < self.min_severity {
            return Handoff::done();
        }
        let entry = self.template.render(&Zoned::now(), severity, &text, None);
        self.writer.send(entry.into_bytes())
    }

    fn flush(&self) -> Handoff {
        self.writer.flush()
    }
}
