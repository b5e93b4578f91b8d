use std::sync::Arc;

use polis::{DomainFilter, PatternError};
use polis_core::Environment;
use tower::Layer;

use crate::service::PolicyService;

/// Tower layer running the policy stage.
///
/// Place it outermost, around everything that registers policies, so that
/// it runs after the handler produced its response.
#[derive(Debug, Clone, Default)]
pub struct PolicyLayer {
    filter: Arc<DomainFilter>,
    environment: Environment,
}

impl PolicyLayer {
    /// A layer in a live environment ignoring no domain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a builder.
    pub fn builder() -> PolicyLayerBuilder {
        PolicyLayerBuilder::default()
    }

    /// The host filter handed to every request's dispatcher.
    pub fn domain_filter(&self) -> &DomainFilter {
        &self.filter
    }

    /// The deployment mode policies see.
    pub fn environment(&self) -> Environment {
        self.environment
    }
}

impl<S> Layer<S> for PolicyLayer {
    type Service = PolicyService<S>;

    fn layer(&self, upstream: S) -> Self::Service {
        PolicyService::new(upstream, Arc::clone(&self.filter), self.environment)
    }
}

/// Builder for [`PolicyLayer`].
#[derive(Debug, Default)]
pub struct PolicyLayerBuilder {
    filter: DomainFilter,
    environment: Environment,
}

impl PolicyLayerBuilder {
    /// Compiles ignore-domain patterns and adds them to the filter.
    pub fn ignore_domains<I, P>(mut self, patterns: I) -> Result<Self, PatternError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<str>,
    {
        for pattern in DomainFilter::new(patterns)?.patterns() {
            self.filter.push(pattern.clone());
        }
        Ok(self)
    }

    /// Replaces the host filter.
    pub fn domain_filter(self, filter: DomainFilter) -> Self {
        PolicyLayerBuilder { filter, ..self }
    }

    /// Sets the deployment mode.
    pub fn environment(self, environment: Environment) -> Self {
        PolicyLayerBuilder {
            environment,
            ..self
        }
    }

    /// Finishes the layer.
    pub fn build(self) -> PolicyLayer {
        PolicyLayer {
            filter: Arc::new(self.filter),
            environment: self.environment,
        }
    }
}
