//! The container engine boundary.
//!
//! [`ContainerEngine`] is the seam between the orchestration core and the
//! concrete engine binding (the HTTP client lives outside this
//! workspace). Each method is one logical operation; all may fail with an
//! [`EngineError`] that the executor wraps and propagates, classified,
//! through the action harness. Test code implements the trait with
//! scripted fakes.

use std::sync::Arc;

use thiserror::Error;

use convoy_config::ContainerSpec;

/// A container's combined stdout/stderr stream as a line sequence.
pub type LogStream = Box<dyn Iterator<Item = Result<String, EngineError>> + Send>;

/// Kind of engine resource named in an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum ResourceKind {
    /// A container image.
    Image,
    /// A container.
    Container,
    /// A network.
    Network,
}

/// Native healthcheck state reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    /// The container has no native healthcheck configured.
    Unsupported,
    /// The healthcheck has not yet produced a verdict.
    Starting,
    /// The healthcheck reports healthy.
    Healthy,
    /// The healthcheck reports unhealthy.
    Unhealthy,
}

/// Errors surfaced by the engine binding.
///
/// The `is_known` subtypes are expected operational failures rendered as
/// a concise known-cause message rather than a raw error dump.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// The engine endpoint could not be reached.
    #[error("container engine is unreachable: {message}")]
    Unreachable {
        /// Description of the connectivity failure.
        message: String,
    },

    /// A named resource does not exist on the engine.
    #[error("{kind} '{name}' not found")]
    NotFound {
        /// Kind of the missing resource.
        kind: ResourceKind,
        /// Name of the missing resource.
        name: String,
    },

    /// A host port required by a container is already bound.
    #[error("port {port} is already in use")]
    PortInUse {
        /// The contested host port.
        port: u16,
    },

    /// A network cannot be removed while containers are attached.
    #[error("network '{network}' has active endpoints")]
    ActiveEndpoints {
        /// The network that still has endpoints.
        network: String,
    },

    /// An I/O error occurred while talking to the engine.
    #[error("I/O error talking to the engine: {source}")]
    Io {
        /// Underlying error wrapped in Arc for Clone support.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// Any other engine-reported failure.
    #[error("engine operation failed: {message}")]
    Failure {
        /// The engine's failure description.
        message: String,
    },
}

impl EngineError {
    /// Creates an `Io` error from a raw I/O error.
    #[must_use]
    pub fn io(source: std::io::Error) -> Self {
        Self::Io {
            source: Arc::new(source),
        }
    }

    /// Creates a `NotFound` error.
    #[must_use]
    pub fn not_found(kind: ResourceKind, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }

    /// Whether this is an expected, known-cause failure.
    ///
    /// Known failures classify as [`KnownException`] in the action
    /// harness and are rendered concisely rather than as a raw dump.
    ///
    /// [`KnownException`]: crate::harness::EndingCondition::KnownException
    #[must_use]
    pub const fn is_known(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. } | Self::PortInUse { .. } | Self::ActiveEndpoints { .. }
        )
    }
}

/// One logical engine operation per method.
///
/// Implementations must be safe for concurrent use: the executor shares
/// one engine reference across the worker threads of a ready set.
pub trait ContainerEngine: Send + Sync {
    /// Connects to the engine if not already connected; idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Unreachable`] when the endpoint cannot be
    /// reached.
    fn ensure_connected(&self) -> Result<(), EngineError>;

    /// Creates a network, succeeding if it already exists.
    ///
    /// # Errors
    ///
    /// Returns an [`EngineError`] describing the engine-side failure.
    fn create_network(&self, name: &str) -> Result<(), EngineError>;

    /// Removes a network.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ActiveEndpoints`] while containers remain
    /// attached, or another [`EngineError`] for engine-side failures.
    fn remove_network(&self, name: &str) -> Result<(), EngineError>;

    /// Creates the container for a service from its opaque parameters.
    ///
    /// # Errors
    ///
    /// Returns an [`EngineError`] describing the engine-side failure.
    fn create_container(&self, service: &str, spec: &ContainerSpec) -> Result<(), EngineError>;

    /// Starts a service's container.
    ///
    /// # Errors
    ///
    /// Returns an [`EngineError`] describing the engine-side failure,
    /// [`EngineError::PortInUse`] being the classic known cause.
    fn start_container(&self, service: &str) -> Result<(), EngineError>;

    /// Stops a service's container.
    ///
    /// # Errors
    ///
    /// Returns an [`EngineError`] describing the engine-side failure.
    fn stop_container(&self, service: &str) -> Result<(), EngineError>;

    /// Removes a service's container.
    ///
    /// # Errors
    ///
    /// Returns an [`EngineError`] describing the engine-side failure.
    fn remove_container(&self, service: &str) -> Result<(), EngineError>;

    /// Attaches to a container's combined stdout/stderr as lines.
    ///
    /// Returned streams must not block indefinitely on a live container:
    /// implementations bound how long one `next` call may block (short
    /// poll timeouts, or ending the stream when the container stops), so
    /// that a reader stopping between lines releases the attachment
    /// promptly when it drops the stream.
    ///
    /// # Errors
    ///
    /// Returns an [`EngineError`] when the stream cannot be attached.
    fn attach_logs(&self, service: &str) -> Result<LogStream, EngineError>;

    /// Queries a container's exit code, `None` while still running.
    ///
    /// # Errors
    ///
    /// Returns an [`EngineError`] describing the engine-side failure.
    fn exit_status(&self, service: &str) -> Result<Option<i64>, EngineError>;

    /// Queries a container's native healthcheck state.
    ///
    /// # Errors
    ///
    /// Returns an [`EngineError`] describing the engine-side failure.
    fn health_status(&self, service: &str) -> Result<HealthStatus, EngineError>;
}
