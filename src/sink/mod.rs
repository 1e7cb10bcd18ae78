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

//! Sinks: the durable write targets that log types are routed to.
//!
//! A [`Sink`] receives fully formatted text and a severity. The [`SinkCache`](crate::SinkCache)
//! builds at most one sink per log type name through a [`SinkFactory`]; the default factory,
//! [`RollingFileFactory`], builds a [`RollingFile`] sink from the log type's path template,
//! rotation and output template.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::DefaultTrap;
use crate::Error;
use crate::LogType;
use crate::Severity;
use crate::Trap;
use crate::descriptor::normalize;
use crate::layout::OutputTemplate;

mod file;
mod handoff;
mod non_blocking;
mod rolling;
mod testing;
mod worker;

pub use self::file::RollingFile;
pub use self::file::RollingFileBuilder;
pub use self::handoff::Handoff;
pub use self::non_blocking::NonBlocking;
pub use self::non_blocking::NonBlockingBuilder;
pub use self::non_blocking::WorkerGuard;
pub use self::rolling::RollingFileWriter;
pub use self::rolling::RollingFileWriterBuilder;
pub use self::testing::CapturedEntry;
pub use self::testing::Testing;

/// A write target for formatted log entries.
pub trait Sink: fmt::Debug + Send + Sync + 'static {
    /// Hand `text` off to the sink at `severity`.
    ///
    /// This must not block on I/O. The returned [`Handoff`] resolves once the write happened.
    fn write(&self, severity: Severity, text: String) -> Handoff;

    /// Flush any buffered entries.
    ///
    /// Default to a no-op.
    fn flush(&self) -> Handoff {
        Handoff::done()
    }
}

/// Builds the sink for a log type the first time the type is dispatched to.
///
/// Closures of the shape `Fn(&dyn LogType) -> Result<Arc<dyn Sink>, Error>` are factories.
pub trait SinkFactory: Send + Sync + 'static {
    /// Build a sink bound to `log_type`'s path, rotation and output template.
    fn create(&self, log_type: &dyn LogType) -> Result<Arc<dyn Sink>, Error>;
}

impl<F> SinkFactory for F
where
    F: Fn(&dyn LogType) -> Result<Arc<dyn Sink>, Error> + Send + Sync + 'static,
{
    fn create(&self, log_type: &dyn LogType) -> Result<Arc<dyn Sink>, Error> {
        self(log_type)
    }
}

/// The default [`SinkFactory`]: one [`RollingFile`] per log type.
///
/// The sink's own severity gate is always [`Severity::Verbose`]; filtering by a log type's
/// severity floor is the dispatcher's job.
#[derive(Debug, Clone)]
pub struct RollingFileFactory {
    buffered_lines_limit: Option<usize>,
    shutdown_timeout: Option<Duration>,
    trap: Arc<dyn Trap>,
}

impl Default for RollingFileFactory {
    fn default() -> Self {
        Self {
            buffered_lines_limit: None,
            shutdown_timeout: None,
            trap: Arc::new(DefaultTrap::default()),
        }
    }
}

impl RollingFileFactory {
    /// Bound every sink's queue; senders block once it is reached.
    #[must_use]
    pub fn buffered_lines_limit(mut self, limit: Option<usize>) -> Self {
        self.buffered_lines_limit = limit;
        self
    }

    /// Set how long dropping a sink waits for its queue to drain.
    #[must_use]
    pub fn shutdown_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Set the trap receiving background errors nobody observed.
    #[must_use]
    pub fn trap(mut self, trap: Arc<dyn Trap>) -> Self {
        self.trap = trap;
        self
    }
}

impl SinkFactory for RollingFileFactory {
    fn create(&self, log_type: &dyn LogType) -> Result<Arc<dyn Sink>, Error> {
        let sink = RollingFile::builder(log_type.log_path(None))
            .rotation(log_type.rotation())
            .template(OutputTemplate::parse(log_type.output_template()))
            .min_severity(Severity::Verbose)
            .thread_name(format!("logroute-{}", normalize(log_type.name())))
            .buffered_lines_limit(self.buffered_lines_limit)
            .shutdown_timeout(self.shutdown_timeout)
            .trap(self.trap.clone())
            .build()?;
        Ok(Arc::new(sink))
    }
}

enum Message {
    Record {
        record: Vec<u8>,
        ack: oneshot::Sender<Result<(), Error>>,
    },
    Flush {
        ack: oneshot::Sender<Result<(), Error>>,
    },
    Shutdown,
}
