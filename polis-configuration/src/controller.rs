//! Controller declarations.
//!
//! ```yaml
//! Page:
//!   policies: [general, headers]
//! HomePage:
//!   extends: Page
//!   overrides: { headers: off }
//!   policies: [general]
//! ```
//!
//! A controller inherits the declarations of the controller it extends.
//! `overrides` swaps an inherited policy for another definition, typically a
//! `Noop` one to cancel it, without changing its position.

use indexmap::IndexMap;
use polis::{Controller, Originator, PolicyApplicator};
use serde::{Deserialize, Serialize};

/// Declaration of one controller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerDefinition {
    /// Controller whose declarations are inherited.
    #[serde(default)]
    pub extends: Option<String>,
    /// Policy names in declared order; the first one wins on overlapping
    /// headers.
    #[serde(default)]
    pub policies: Vec<String>,
    /// Inherited policy name mapped to the name of its replacement.
    #[serde(default)]
    pub overrides: IndexMap<String, String>,
}

/// A controller built from configuration.
///
/// Has no override capabilities; controllers that need them implement
/// [`Controller`] themselves and reuse
/// [`Catalog::applicators`](crate::Catalog::applicators).
#[derive(Debug, Clone)]
pub struct ConfiguredController {
    name: String,
    applicators: Vec<PolicyApplicator>,
}

impl ConfiguredController {
    pub(crate) fn new(name: String, applicators: Vec<PolicyApplicator>) -> Self {
        Self { name, applicators }
    }

    /// Name of the declaration.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Originator for ConfiguredController {
    fn label(&self) -> &str {
        &self.name
    }
}

impl Controller for ConfiguredController {
    fn applicators(&self) -> &[PolicyApplicator] {
        &self.applicators
    }
}
