use std::sync::Arc;

use indexmap::IndexMap;
use polis::{DomainFilter, PolicyApplicator, PolicySet};
use polis_core::{Environment, PolicyEntry};
use tracing::debug;

use crate::controller::{ConfiguredController, ControllerDefinition};
use crate::error::ConfigError;
use crate::Config;

/// A validated, ready-to-use configuration.
#[derive(Debug, Clone)]
pub struct Catalog {
    environment: Environment,
    domain_filter: Arc<DomainFilter>,
    policies: IndexMap<String, PolicyEntry>,
    controllers: IndexMap<String, Vec<PolicyApplicator>>,
}

impl Catalog {
    /// Deployment mode.
    pub fn environment(&self) -> Environment {
        self.environment
    }

    /// Compiled ignore-domain patterns.
    pub fn domain_filter(&self) -> &DomainFilter {
        &self.domain_filter
    }

    /// Compiled ignore-domain patterns, shareable with dispatchers.
    pub fn shared_domain_filter(&self) -> Arc<DomainFilter> {
        Arc::clone(&self.domain_filter)
    }

    /// A named policy.
    pub fn policy(&self, name: &str) -> Option<&PolicyEntry> {
        self.policies.get(name)
    }

    /// The applicators of a controller, base-most first.
    pub fn applicators(&self, controller: &str) -> Option<&[PolicyApplicator]> {
        self.controllers.get(controller).map(Vec::as_slice)
    }

    /// A controller that registers its declared policies.
    pub fn controller(&self, name: &str) -> Option<ConfiguredController> {
        self.controllers
            .get(name)
            .map(|applicators| ConfiguredController::new(name.to_owned(), applicators.clone()))
    }

    /// Names of the declared controllers.
    pub fn controllers(&self) -> impl Iterator<Item = &str> {
        self.controllers.keys().map(String::as_str)
    }
}

impl TryFrom<Config> for Catalog {
    type Error = ConfigError;

    fn try_from(config: Config) -> Result<Self, Self::Error> {
        let domain_filter = DomainFilter::new(&config.ignore_domains)?;

        let policies = config
            .policies
            .into_iter()
            .map(|(name, definition)| {
                let entry = definition.into_entry(&name, config.disable_cache_age_in_dev)?;
                Ok((name, entry))
            })
            .collect::<Result<IndexMap<_, _>, ConfigError>>()?;

        let mut resolver = Resolver {
            definitions: &config.controllers,
            policies: &policies,
            resolved: IndexMap::new(),
            stack: Vec::new(),
        };
        for name in config.controllers.keys() {
            resolver.resolve(name)?;
        }
        let mut resolved = resolver.resolved;
        let controllers = config
            .controllers
            .keys()
            .filter_map(|name| resolved.swap_remove_entry(name))
            .collect::<IndexMap<_, _>>();

        debug!(
            environment = ?config.environment,
            ignore_domains = domain_filter.patterns().len(),
            policies = policies.len(),
            controllers = controllers.len(),
            "policy configuration compiled"
        );

        Ok(Catalog {
            environment: config.environment,
            domain_filter: Arc::new(domain_filter),
            policies,
            controllers,
        })
    }
}

struct Resolver<'a> {
    definitions: &'a IndexMap<String, ControllerDefinition>,
    policies: &'a IndexMap<String, PolicyEntry>,
    resolved: IndexMap<String, Vec<PolicyApplicator>>,
    stack: Vec<String>,
}

impl Resolver<'_> {
    fn policy(&self, controller: &str, name: &str) -> Result<PolicyEntry, ConfigError> {
        self.policies
            .get(name)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownPolicy {
                controller: controller.to_owned(),
                policy: name.to_owned(),
            })
    }

    fn resolve(&mut self, name: &str) -> Result<Vec<PolicyApplicator>, ConfigError> {
        if let Some(applicators) = self.resolved.get(name) {
            return Ok(applicators.clone());
        }
        if let Some(start) = self.stack.iter().position(|seen| seen == name) {
            let mut cycle = self.stack[start..].to_vec();
            cycle.push(name.to_owned());
            return Err(ConfigError::InheritanceCycle(cycle));
        }
        let definitions = self.definitions;
        let Some(definition) = definitions.get(name) else {
            return Err(ConfigError::UnknownController {
                controller: self.stack.last().cloned().unwrap_or_default(),
                parent: name.to_owned(),
            });
        };

        self.stack.push(name.to_owned());
        let mut applicators = match &definition.extends {
            Some(parent) => self.resolve(parent)?,
            None => Vec::new(),
        };
        self.stack.pop();

        for (target, replacement) in &definition.overrides {
            let entry = self.policy(name, replacement)?;
            let mut found = false;
            for applicator in &mut applicators {
                if applicator.policies().get(target).is_some() {
                    let mut policies = applicator.policies().clone();
                    policies.insert(target.clone(), entry.clone());
                    applicator.set_policies(policies);
                    found = true;
                }
            }
            if !found {
                return Err(ConfigError::UnknownOverride {
                    controller: name.to_owned(),
                    policy: target.clone(),
                });
            }
        }

        let mut own = PolicySet::new();
        for policy in &definition.policies {
            own.insert(policy.clone(), self.policy(name, policy)?);
        }
        if !own.is_empty() {
            applicators.push(PolicyApplicator::with_policies(own));
        }

        self.resolved.insert(name.to_owned(), applicators.clone());
        Ok(applicators)
    }
}
