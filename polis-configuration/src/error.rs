use polis::PatternError;
use polis_core::PolicyError;
use thiserror::Error;

/// Errors raised while loading or compiling a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The document is not valid YAML or does not match the schema.
    #[error("failed to parse configuration")]
    Yaml(#[from] serde_saphyr::Error),

    /// An ignore-domain pattern is malformed.
    #[error(transparent)]
    Pattern(#[from] PatternError),

    /// A policy definition could not be built.
    #[error("invalid policy `{name}`")]
    InvalidPolicy {
        /// Name of the policy definition.
        name: String,
        /// Underlying cause.
        #[source]
        source: PolicyError,
    },

    /// A controller refers to a policy that is not defined.
    #[error("controller `{controller}` refers to unknown policy `{policy}`")]
    UnknownPolicy {
        /// Referring controller.
        controller: String,
        /// Missing policy.
        policy: String,
    },

    /// A controller extends a controller that is not defined.
    #[error("controller `{controller}` extends unknown controller `{parent}`")]
    UnknownController {
        /// Referring controller.
        controller: String,
        /// Missing parent.
        parent: String,
    },

    /// A controller overrides a policy none of its ancestors declares.
    #[error("controller `{controller}` overrides `{policy}`, which no ancestor declares")]
    UnknownOverride {
        /// Referring controller.
        controller: String,
        /// Policy name that is not inherited.
        policy: String,
    },

    /// Controllers extend each other in a loop.
    #[error("controller inheritance cycle: {}", .0.join(" -> "))]
    InheritanceCycle(Vec<String>),
}
