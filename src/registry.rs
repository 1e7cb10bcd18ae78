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
use std::sync::Arc;

use dashmap::DashMap;

use crate::Error;
use crate::LogType;
use crate::PredefinedCatalog;
use crate::descriptor::normalize;

/// A concurrent map of log type names to log types.
///
/// Names are compared case-insensitively. The registry is seeded with every built-in log type
/// when it is constructed, so no registration can race the seed. Registering a name that already
/// exists replaces the previous log type; the last registration wins.
pub struct TypeRegistry {
    entries: DashMap<String, Arc<dyn LogType>>,
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("len", &self.entries.len())
            .finish()
    }
}

impl TypeRegistry {
    /// Create a registry seeded with every entry of `catalog`.
    pub fn new(catalog: &PredefinedCatalog) -> TypeRegistry {
        let entries = DashMap::new();
        for (name, log_type) in catalog.get_all() {
            entries.insert(normalize(name), log_type);
        }
        TypeRegistry { entries }
    }

    /// Register `log_type` under its own name, returning the log type it replaced.
    pub fn register(&self, log_type: impl LogType) -> Option<Arc<dyn LogType>> {
        self.register_shared(Arc::new(log_type))
    }

    /// Register a shared log type under its own name, returning the log type it replaced.
    pub fn register_shared(&self, log_type: Arc<dyn LogType>) -> Option<Arc<dyn LogType>> {
        let name = log_type.name().to_string();
        self.register_as(&name, log_type)
    }

    /// Register `log_type` under `name`, which may differ from the log type's own name.
    pub fn register_as(
        &self,
        name: &str,
        log_type: Arc<dyn LogType>,
    ) -> Option<Arc<dyn LogType>> {
        let replaced = self.entries.insert(normalize(name), log_type);
        if replaced.is_some() {
            log::debug!(target: "logroute::registry", "replaced log type {name}");
        }
        replaced
    }

    /// Look up the log type registered under `name`.
    ///
    /// Return an error of kind [`ConfigurationNotFound`](crate::ErrorKind::ConfigurationNotFound)
    /// if nothing is registered under that name.
    pub fn get(&self, name: &str) -> Result<Arc<dyn LogType>, Error> {
        self.find(name).ok_or_else(|| Error::not_found(name))
    }

    /// Look up the log type registered under `name`, if any.
    pub fn find(&self, name: &str) -> Option<Arc<dyn LogType>> {
        self.entries
            .get(&normalize(name))
            .map(|entry| entry.value().clone())
    }

    /// Return every registered log type, in no particular order.
    pub fn get_all(&self) -> Vec<Arc<dyn LogType>> {
        self.entries
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Return the number of registered log types.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Return `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
