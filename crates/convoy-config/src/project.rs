//! The assembled configuration snapshot.

use std::collections::HashMap;

use thiserror::Error;

use crate::group::Group;
use crate::service::Service;

/// Errors raised while assembling a configuration snapshot.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A service with the same name was already registered.
    #[error("service '{name}' is declared more than once")]
    DuplicateService {
        /// The conflicting service name.
        name: String,
    },

    /// A group with the same name was already registered.
    #[error("group '{name}' is declared more than once")]
    DuplicateGroup {
        /// The conflicting group name.
        name: String,
    },

    /// A group shares its name with a service, making tokens ambiguous.
    #[error("group '{name}' collides with a service of the same name")]
    AmbiguousName {
        /// The colliding name.
        name: String,
    },

    /// A log marker pattern failed to compile.
    #[error("invalid marker pattern '{pattern}'")]
    InvalidMarker {
        /// The offending pattern text.
        pattern: String,
        /// Underlying regex compilation error.
        #[source]
        source: regex::Error,
    },
}

/// Stable identifier for a service within one project.
///
/// Ids are declaration indices, so ordering `ServiceId`s orders services
/// by declaration order. Ids from one project must not be used with
/// another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ServiceId(usize);

impl ServiceId {
    /// Declaration index of the service within its project.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// An immutable project snapshot: services, groups, and network naming.
///
/// Services are stored in declaration order; [`ServiceId`] is the
/// declaration index, which the scheduler uses as the deterministic
/// tie-break between unordered services.
#[derive(Debug, Clone, Default)]
pub struct Project {
    name: String,
    services: Vec<Service>,
    service_index: HashMap<String, ServiceId>,
    groups: HashMap<String, Group>,
}

impl Project {
    /// Creates an empty project with the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Project name, used to derive engine resource names.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the default network all services join.
    #[must_use]
    pub fn default_network(&self) -> String {
        format!("{}_default", self.name)
    }

    /// Registers a service, assigning it the next declaration index.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DuplicateService`] if the name is taken.
    pub fn add_service(&mut self, service: Service) -> Result<ServiceId, ConfigError> {
        let name = service.name().to_owned();
        if self.service_index.contains_key(&name) {
            return Err(ConfigError::DuplicateService { name });
        }
        let id = ServiceId(self.services.len());
        self.services.push(service);
        self.service_index.insert(name, id);
        Ok(id)
    }

    /// Registers a group.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DuplicateGroup`] if the group name is taken,
    /// or [`ConfigError::AmbiguousName`] if it collides with a service.
    pub fn add_group(&mut self, group: Group) -> Result<(), ConfigError> {
        let name = group.name().to_owned();
        if self.service_index.contains_key(&name) {
            return Err(ConfigError::AmbiguousName { name });
        }
        if self.groups.contains_key(&name) {
            return Err(ConfigError::DuplicateGroup { name });
        }
        self.groups.insert(name, group);
        Ok(())
    }

    /// Returns the service with the given id, if the id belongs to this
    /// project.
    #[must_use]
    pub fn service(&self, id: ServiceId) -> Option<&Service> {
        self.services.get(id.0)
    }

    /// Looks up a service id by name.
    #[must_use]
    pub fn service_named(&self, name: &str) -> Option<ServiceId> {
        self.service_index.get(name).copied()
    }

    /// Looks up a group by name.
    #[must_use]
    pub fn group(&self, name: &str) -> Option<&Group> {
        self.groups.get(name)
    }

    /// Iterates services in declaration order with their ids.
    pub fn services(&self) -> impl Iterator<Item = (ServiceId, &Service)> {
        self.services
            .iter()
            .enumerate()
            .map(|(index, service)| (ServiceId(index), service))
    }

    /// Number of registered services.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.services.len()
    }

    /// Returns `true` when no services are registered.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}
