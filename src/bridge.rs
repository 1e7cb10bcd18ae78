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

//! Bridge from the [`log`] crate to a [`Dispatcher`].

use std::sync::Arc;

use log::LevelFilter;

use crate::DefaultTrap;
use crate::Dispatcher;
use crate::Error;
use crate::ErrorKind;
use crate::LogCategory;
use crate::LogType;
use crate::Severity;
use crate::Trap;

/// Routes `log` records to a [`Dispatcher`], treating each record's target as a log type name.
///
/// Targets that name no registered log type go to the `Default` log type. A record below the
/// severity floor of its log type is dropped. Records whose target starts with `logroute` are
/// the dispatcher's own diagnostics and are always dropped, so a sink can never log into
/// itself.
#[derive(Debug)]
pub struct LogBridge {
    dispatcher: Arc<Dispatcher>,
    max_level: LevelFilter,
    trap: Box<dyn Trap>,
}

impl LogBridge {
    /// Create a bridge forwarding every level to `dispatcher`.
    pub fn new(dispatcher: Arc<Dispatcher>) -> LogBridge {
        LogBridge {
            dispatcher,
            max_level: LevelFilter::Trace,
            trap: Box::new(DefaultTrap::default()),
        }
    }

    /// Drop records more verbose than `level`.
    #[must_use]
    pub fn max_level(mut self, level: LevelFilter) -> Self {
        self.max_level = level;
        self
    }

    /// Set the trap receiving failures to build a sink. Default to [`DefaultTrap`].
    #[must_use]
    pub fn trap(mut self, trap: impl Into<Box<dyn Trap>>) -> Self {
        self.trap = trap.into();
        self
    }

    fn log_type(&self, target: &str) -> Arc<dyn LogType> {
        self.dispatcher
            .log_type(target)
            .unwrap_or_else(|_| self.dispatcher.catalog().get(LogCategory::Default))
    }
}

impl log::Log for LogBridge {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= self.max_level && !metadata.target().starts_with("logroute")
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let log_type = self.log_type(record.target());
        if Severity::from_log_level(record.level()) < log_type.severity() {
            return;
        }

        // fire-and-forget; write failures reach the sink's trap
        match self.dispatcher.log(log_type, record.args().to_string()) {
            Ok(handoff) => drop(handoff),
            Err(err) => self.trap.trap(
                &Error::new(ErrorKind::Unexpected, "failed to bridge log record")
                    .with_context("target", record.target())
                    .with_source(err),
            ),
        }
    }

    fn flush(&self) {
        if let Err(err) = self.dispatcher.flush() {
            self.trap.trap(&err);
        }
    }
}

/// Set up the log crate global logger to forward to `dispatcher`.
///
/// This function calls [`log::set_boxed_logger`] with a [`LogBridge`] and sets the global maximum
/// log level to `Trace`. To override this, call [`log::set_max_level`] after this function.
///
/// # Errors
///
/// Return an error if the log crate global logger has already been set.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use logroute::Dispatcher;
///
/// let dispatcher = Arc::new(Dispatcher::builder().build());
/// logroute::bridge::try_setup_log_crate(dispatcher).unwrap();
/// ```
pub fn try_setup_log_crate(dispatcher: Arc<Dispatcher>) -> Result<(), log::SetLoggerError> {
    log::set_boxed_logger(Box::new(LogBridge::new(dispatcher)))?;
    log::set_max_level(LevelFilter::Trace);
    Ok(())
}
