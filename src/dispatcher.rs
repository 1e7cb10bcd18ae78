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

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use jiff::Timestamp;
use jiff::tz::TimeZone;

use crate::Config;
use crate::DefaultTrap;
use crate::Error;
use crate::ExceptionRecord;
use crate::ExceptionSerializer;
use crate::LogCategory;
use crate::LogType;
use crate::LogTypeDescriptor;
use crate::Payload;
use crate::PredefinedCatalog;
use crate::SinkCache;
use crate::Trap;
use crate::TypeRegistry;
use crate::descriptor::normalize;
use crate::layout::Envelope;
use crate::sink::Handoff;
use crate::sink::RollingFileFactory;
use crate::sink::Sink;
use crate::sink::SinkFactory;

/// Selects the log type an entry is routed to.
#[derive(Debug, Clone)]
pub enum Target {
    /// A built-in category, resolved through the [`PredefinedCatalog`].
    Category(LogCategory),
    /// A name, resolved through the [`TypeRegistry`].
    Name(String),
    /// A log type used as is, registered or not.
    LogType(Arc<dyn LogType>),
}

impl From<LogCategory> for Target {
    fn from(category: LogCategory) -> Self {
        Target::Category(category)
    }
}

impl From<&str> for Target {
    fn from(name: &str) -> Self {
        Target::Name(name.to_string())
    }
}

impl From<String> for Target {
    fn from(name: String) -> Self {
        Target::Name(name)
    }
}

impl From<LogTypeDescriptor> for Target {
    fn from(descriptor: LogTypeDescriptor) -> Self {
        Target::LogType(Arc::new(descriptor))
    }
}

impl From<Arc<dyn LogType>> for Target {
    fn from(log_type: Arc<dyn LogType>) -> Self {
        Target::LogType(log_type)
    }
}

impl From<&Arc<dyn LogType>> for Target {
    fn from(log_type: &Arc<dyn LogType>) -> Self {
        Target::LogType(log_type.clone())
    }
}

/// The entry point: resolves a [`Target`] to a log type, renders the entry and hands it to the
/// log type's sink.
///
/// A dispatcher owns its registry and sink cache; share it with [`Arc`] and every clone routes
/// to the same sinks. All methods take `&self` and may be called from any number of threads.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use logroute::Dispatcher;
/// use logroute::LogCategory;
/// use logroute::LogType;
/// use logroute::sink::Sink;
/// use logroute::sink::Testing;
///
/// let captured = Testing::default();
/// let dispatcher = Dispatcher::builder()
///     .sink_factory({
///         let captured = captured.clone();
///         move |_: &dyn LogType| -> Result<Arc<dyn Sink>, logroute::Error> {
///             Ok(Arc::new(captured.clone()))
///         }
///     })
///     .build();
///
/// dispatcher
///     .log(LogCategory::Startup, "service starting")
///     .unwrap()
///     .wait()
///     .unwrap();
///
/// let text = &captured.texts()[0];
/// assert!(text.contains("Start of Startup Log at utc: "));
/// assert!(text.contains("service starting"));
/// ```
pub struct Dispatcher {
    catalog: PredefinedCatalog,
    registry: TypeRegistry,
    cache: SinkCache,
    envelope: Envelope,
    serializer: ExceptionSerializer,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("registry", &self.registry)
            .field("cache", &self.cache)
            .field("serializer", &self.serializer)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Create a [`DispatcherBuilder`] with the default configuration.
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::default()
    }

    /// Create a dispatcher writing rolling files as `config` describes.
    pub fn new(config: Config) -> Dispatcher {
        Dispatcher::builder().config(config).build()
    }

    /// The built-in log types.
    pub fn catalog(&self) -> &PredefinedCatalog {
        &self.catalog
    }

    /// The sinks built so far.
    pub fn sink_cache(&self) -> &SinkCache {
        &self.cache
    }

    /// Register `log_type` under its own name, returning the log type it replaced.
    ///
    /// A sink already built for the name is evicted so the next entry uses the new path,
    /// rotation and template. Entries already handed to the old sink are still written.
    pub fn register(&self, log_type: impl LogType) -> Option<Arc<dyn LogType>> {
        let log_type: Arc<dyn LogType> = Arc::new(log_type);
        let name = log_type.name().to_string();
        self.register_as(&name, log_type)
    }

    /// Register `log_type` under `name`, returning the log type it replaced.
    ///
    /// See [`Dispatcher::register`] for how cached sinks are treated.
    pub fn register_as(
        &self,
        name: &str,
        log_type: Arc<dyn LogType>,
    ) -> Option<Arc<dyn LogType>> {
        let replaced = self.registry.register_as(name, log_type.clone());
        if let Some(previous) = &replaced {
            self.cache.evict(previous.name());
        }
        self.cache.evict(log_type.name());
        replaced
    }

    /// Look up the log type registered under `name`, case-insensitively.
    pub fn log_type(&self, name: &str) -> Result<Arc<dyn LogType>, Error> {
        self.registry.get(name)
    }

    /// Every registered log type, in no particular order.
    pub fn log_types(&self) -> Vec<Arc<dyn LogType>> {
        self.registry.get_all()
    }

    /// Resolve `target` to a log type.
    ///
    /// Categories always resolve to their built-in log type; names fail with
    /// [`ConfigurationNotFound`](crate::ErrorKind::ConfigurationNotFound) when unregistered.
    pub fn resolve(&self, target: impl Into<Target>) -> Result<Arc<dyn LogType>, Error> {
        match target.into() {
            Target::Category(category) => Ok(self.catalog.get(category)),
            Target::Name(name) => self.registry.get(&name),
            Target::LogType(log_type) => Ok(log_type),
        }
    }

    /// Route `payload` to `target`.
    ///
    /// The entry is rendered and handed to the sink before this returns; the returned
    /// [`Handoff`] resolves once the sink performed the write. Resolution failures and failures
    /// to build the sink are returned here, before anything is written.
    pub fn log(
        &self,
        target: impl Into<Target>,
        payload: impl Into<Payload>,
    ) -> Result<Handoff, Error> {
        let log_type = self.resolve(target)?;
        self.dispatch(&log_type, &payload.into().render())
    }

    /// Route `err` and its cause chain, serialized to JSON, to `target`.
    pub fn log_exception(
        &self,
        target: impl Into<Target>,
        err: &(dyn StdError + 'static),
    ) -> Result<Handoff, Error> {
        let log_type = self.resolve(target)?;
        self.dispatch(&log_type, &self.serializer.serialize(err))
    }

    /// Route an exception record, serialized to JSON, to `target`.
    pub fn log_record(
        &self,
        target: impl Into<Target>,
        record: &ExceptionRecord,
    ) -> Result<Handoff, Error> {
        let log_type = self.resolve(target)?;
        self.dispatch(&log_type, &self.serializer.serialize_record(record))
    }

    /// Flush every sink built so far and wait for the flushes to complete.
    ///
    /// Every sink is flushed even if some fail; the first failure is returned.
    pub fn flush(&self) -> Result<(), Error> {
        let handoffs = self
            .cache
            .sinks()
            .iter()
            .map(|sink| sink.flush())
            .collect::<Vec<_>>();

        let mut first_err = None;
        for handoff in handoffs {
            if let Err(err) = handoff.wait() {
                first_err.get_or_insert(err);
            }
        }
        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn dispatch(&self, log_type: &Arc<dyn LogType>, content: &str) -> Result<Handoff, Error> {
        let sink = self.sink_for(log_type)?;
        let text = self.envelope.wrap(log_type.name(), Timestamp::now(), content);
        // every entry of a log type is written at the type's own severity
        Ok(sink.write(log_type.severity(), text))
    }

    // The sink of a registered name always follows the registry's current mapping, so a sink
    // built from a log type that was replaced meanwhile is rebuilt on the next dispatch.
    fn sink_for(&self, log_type: &Arc<dyn LogType>) -> Result<Arc<dyn Sink>, Error> {
        let key = normalize(log_type.name());
        match self.registry.find(&key) {
            Some(registered) if normalize(registered.name()) == key => {
                self.cache.get_or_replace(&registered)
            }
            _ => self.cache.get_or_create(log_type),
        }
    }
}

/// A builder for [`Dispatcher`].
#[must_use = "call `build` to construct the dispatcher"]
pub struct DispatcherBuilder {
    config: Config,
    factory: Option<Arc<dyn SinkFactory>>,
    trap: Arc<dyn Trap>,
    timezone: Option<TimeZone>,
}

impl fmt::Debug for DispatcherBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatcherBuilder")
            .field("config", &self.config)
            .field("trap", &self.trap)
            .field("timezone", &self.timezone)
            .finish_non_exhaustive()
    }
}

impl Default for DispatcherBuilder {
    fn default() -> Self {
        DispatcherBuilder {
            config: Config::default(),
            factory: None,
            trap: Arc::new(DefaultTrap::default()),
            timezone: None,
        }
    }
}

impl DispatcherBuilder {
    /// Set the configuration.
    #[must_use]
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Build sinks with `factory` instead of writing rolling files.
    #[must_use]
    pub fn sink_factory(mut self, factory: impl SinkFactory) -> Self {
        self.factory = Some(Arc::new(factory));
        self
    }

    /// Set the trap receiving write failures that nobody observed.
    ///
    /// Default to [`DefaultTrap`]. Only used by the default sink factory.
    #[must_use]
    pub fn trap(mut self, trap: impl Trap) -> Self {
        self.trap = Arc::new(trap);
        self
    }

    /// Set the time zone of the local timestamp in each entry's header and footer.
    ///
    /// Default to the system time zone.
    #[must_use]
    pub fn timezone(mut self, tz: TimeZone) -> Self {
        self.timezone = Some(tz);
        self
    }

    /// Build the dispatcher.
    ///
    /// The registry is seeded with every built-in log type, then with the configured ones in
    /// order, before the dispatcher exists.
    pub fn build(self) -> Dispatcher {
        let DispatcherBuilder {
            config,
            factory,
            trap,
            timezone,
        } = self;

        let catalog = PredefinedCatalog::new(&config.root, &config.extension);
        let registry = TypeRegistry::new(&catalog);
        for descriptor in config.log_types.iter().cloned() {
            registry.register(descriptor.with_root_if_unset(&config.root));
        }

        let factory = factory.unwrap_or_else(|| {
            Arc::new(
                RollingFileFactory::default()
                    .buffered_lines_limit(config.buffered_lines_limit)
                    .shutdown_timeout(config.shutdown_timeout())
                    .trap(trap),
            )
        });

        let envelope = match timezone {
            Some(tz) => Envelope::default().timezone(tz),
            None => Envelope::default(),
        };

        Dispatcher {
            catalog,
            registry,
            cache: SinkCache::with_factory(factory),
            envelope,
            serializer: ExceptionSerializer::new(config.max_exception_depth),
        }
    }
}
