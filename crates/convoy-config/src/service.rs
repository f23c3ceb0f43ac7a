//! Service definitions and opaque container parameters.

use crate::binding::{Binding, CommandBindings, Operation};
use crate::condition::{Condition, DependencyEdge};
use crate::marker::LogMarker;

/// Image and run parameters owned by the configuration loader.
///
/// The orchestration core treats these values opaquely and passes them
/// through to the engine binding untouched.
#[derive(Debug, Clone, Default)]
pub struct ContainerSpec {
    image: String,
    command: Vec<String>,
}

impl ContainerSpec {
    /// Creates a spec for the given image reference.
    #[must_use]
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            command: Vec::new(),
        }
    }

    /// Replaces the container command.
    #[must_use]
    pub fn with_command(mut self, command: impl IntoIterator<Item = String>) -> Self {
        self.command = command.into_iter().collect();
        self
    }

    /// Image reference to create the container from.
    #[must_use]
    pub fn image(&self) -> &str {
        &self.image
    }

    /// Command override, empty when the image default applies.
    #[must_use]
    pub fn command(&self) -> &[String] {
        &self.command
    }
}

/// A named unit of deployment.
///
/// Services are constructed once per configuration load and are immutable
/// thereafter; the orchestration core only reads them.
#[derive(Debug, Clone)]
pub struct Service {
    name: String,
    depends_on: Vec<DependencyEdge>,
    bindings: CommandBindings,
    markers: Vec<LogMarker>,
    spec: ContainerSpec,
}

impl Service {
    /// Creates a service with no dependencies and all-`Auto` bindings.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            depends_on: Vec::new(),
            bindings: CommandBindings::new(),
            markers: Vec::new(),
            spec: ContainerSpec::default(),
        }
    }

    /// Adds a dependency edge to the named service.
    #[must_use]
    pub fn with_dependency(mut self, service: impl Into<String>, condition: Condition) -> Self {
        self.depends_on.push(DependencyEdge::new(service, condition));
        self
    }

    /// Sets the binding for one operation.
    #[must_use]
    pub fn with_binding(mut self, operation: Operation, binding: Binding) -> Self {
        self.bindings = self.bindings.with(operation, binding);
        self
    }

    /// Appends a log marker to the service's readiness monitor list.
    #[must_use]
    pub fn with_marker(mut self, marker: LogMarker) -> Self {
        self.markers.push(marker);
        self
    }

    /// Replaces the opaque container parameters.
    #[must_use]
    pub fn with_spec(mut self, spec: ContainerSpec) -> Self {
        self.spec = spec;
        self
    }

    /// Service name, unique within a project.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared dependency edges, in declaration order.
    #[must_use]
    pub fn depends_on(&self) -> &[DependencyEdge] {
        &self.depends_on
    }

    /// Returns this service's binding for the given operation.
    #[must_use]
    pub fn binding_for(&self, operation: Operation) -> Binding {
        self.bindings.binding_for(operation)
    }

    /// Configured log markers, in declaration order.
    #[must_use]
    pub fn markers(&self) -> &[LogMarker] {
        &self.markers
    }

    /// Opaque image and run parameters.
    #[must_use]
    pub const fn spec(&self) -> &ContainerSpec {
        &self.spec
    }
}
