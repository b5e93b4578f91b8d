//! YAML configuration for Polis.
//!
//! A configuration document declares the deployment environment, ignored
//! domains, named policies and the controllers using them:
//!
//! ```
//! use polis_configuration::Config;
//!
//! let catalog = Config::from_yaml(r#"
//! environment: Live
//! ignore_domains:
//!   - "*.staging.example.com"
//! policies:
//!   general:
//!     type: Caching
//!     cache_age: 15m
//!   headers:
//!     type: CustomHeader
//!     headers:
//!       X-Frame-Options: DENY
//!   off:
//!     type: Noop
//! controllers:
//!   Page:
//!     policies: [general, headers]
//!   HomePage:
//!     extends: Page
//!     overrides: { headers: off }
//! "#)?
//! .into_catalog()?;
//!
//! assert!(catalog.domain_filter().is_ignored("cms.staging.example.com"));
//! assert_eq!(catalog.applicators("HomePage").map(<[_]>::len), Some(1));
//! # Ok::<(), polis_configuration::ConfigError>(())
//! ```

#![warn(missing_docs)]

mod catalog;
pub mod controller;
mod error;
pub mod policy;

use indexmap::IndexMap;
use polis_core::Environment;
use serde::{Deserialize, Serialize};

pub use catalog::Catalog;
pub use controller::{ConfiguredController, ControllerDefinition};
pub use error::ConfigError;
pub use policy::{CacheAge, CachingDefinition, CustomHeaderDefinition, PolicyDefinition};

fn default_true() -> bool {
    true
}

/// Root of a configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Deployment mode, `Live` by default.
    #[serde(default)]
    pub environment: Environment,
    /// Default for every caching policy: force max-age to zero in `Dev`.
    #[serde(default = "default_true")]
    pub disable_cache_age_in_dev: bool,
    /// Ignore-domain patterns.
    #[serde(default)]
    pub ignore_domains: Vec<String>,
    /// Named policy definitions.
    #[serde(default)]
    pub policies: IndexMap<String, PolicyDefinition>,
    /// Controller declarations.
    #[serde(default)]
    pub controllers: IndexMap<String, ControllerDefinition>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            disable_cache_age_in_dev: true,
            ignore_domains: Vec::new(),
            policies: IndexMap::new(),
            controllers: IndexMap::new(),
        }
    }
}

impl Config {
    /// Parses a YAML document.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_saphyr::from_str(yaml)?)
    }

    /// Validates the configuration and builds every policy and controller.
    pub fn into_catalog(self) -> Result<Catalog, ConfigError> {
        Catalog::try_from(self)
    }
}
