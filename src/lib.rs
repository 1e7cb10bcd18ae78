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

//! Logroute routes log entries to per-type rolling files.
//!
//! # Overview
//!
//! Every entry is tagged with a *log type*: a name bound to a folder, a severity, a rotation and
//! an output template. The [`Dispatcher`] resolves the log type, wraps the payload in a header and
//! footer stamped with UTC and local time, and hands it to the log type's sink. Sinks are built
//! on first use, exactly once per log type name, and write on a background thread.
//!
//! Eleven log types are built in, one per [`LogCategory`]. Custom ones are registered at runtime
//! or declared in a [`Config`].
//!
//! # Examples
//!
//! ```
//! use logroute::Config;
//! use logroute::Dispatcher;
//! use logroute::LogCategory;
//! use logroute::LogTypeDescriptor;
//! use logroute::Rotation;
//! use logroute::Severity;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let dispatcher = Dispatcher::new(Config {
//!     root: dir.path().to_path_buf(),
//!     ..Config::default()
//! });
//!
//! dispatcher
//!     .log(LogCategory::Startup, "service starting")
//!     .unwrap()
//!     .wait()
//!     .unwrap();
//!
//! dispatcher.register(
//!     LogTypeDescriptor::builder("Audit")
//!         .severity(Severity::Warning)
//!         .rotation(Rotation::Daily)
//!         .build(),
//! );
//! let handoff = dispatcher.log("audit", "password changed").unwrap();
//! drop(handoff); // fire-and-forget
//!
//! let err = std::io::Error::other("disk full");
//! let _ = dispatcher.log_exception(LogCategory::Failure, &err).unwrap();
//! dispatcher.flush().unwrap();
//! ```

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod bridge;
pub mod layout;
pub mod sink;

mod cache;
mod catalog;
mod clock;
mod config;
mod descriptor;
mod dispatcher;
mod error;
mod exception;
mod level;
mod payload;
mod registry;
mod rotation;
mod trap;

pub use self::cache::SinkCache;
pub use self::catalog::LogCategory;
pub use self::catalog::PredefinedCatalog;
pub use self::config::Config;
pub use self::descriptor::DEFAULT_EXTENSION;
pub use self::descriptor::DEFAULT_ROOT;
pub use self::descriptor::LogType;
pub use self::descriptor::LogTypeDescriptor;
pub use self::descriptor::LogTypeDescriptorBuilder;
pub use self::descriptor::normalize;
pub use self::dispatcher::Dispatcher;
pub use self::dispatcher::DispatcherBuilder;
pub use self::dispatcher::Target;
pub use self::error::Error;
pub use self::error::ErrorKind;
pub use self::exception::DEFAULT_MAX_DEPTH;
pub use self::exception::ExceptionRecord;
pub use self::exception::ExceptionSerializer;
pub use self::exception::INNER_EXCEPTION_FIELD;
pub use self::level::Severity;
pub use self::payload::EMPTY_PAYLOAD_PLACEHOLDER;
pub use self::payload::Payload;
pub use self::registry::TypeRegistry;
pub use self::rotation::Rotation;
pub use self::trap::DefaultTrap;
pub use self::trap::Trap;
