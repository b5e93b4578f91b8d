//! Attaching declared policies to controllers.
//!
//! A controller declares its policies through one or more
//! [`PolicyApplicator`]s. When the controller is initialized for a request,
//! [`init_controller`] registers those policies with the request's
//! [`Dispatcher`], tagging each one with the controller as originator.
//!
//! Within a single applicator the declared list is registered in **reverse**
//! order. Since the dispatcher applies registrations in order and later
//! writes overwrite earlier ones, the first declared policy is applied last
//! and wins on overlapping headers.
//!
//! Applicators of a controller hierarchy are listed base-most first, so
//! policies declared on a derived controller are applied after (and override)
//! those of its base.

use std::sync::Arc;

use polis_core::{Originator, PolicyEntry, PolicyError, PolicySet};

use crate::dispatcher::Dispatcher;

/// Declares the policies of one controller (or one level of a controller
/// hierarchy).
#[derive(Debug, Clone, Default)]
pub struct PolicyApplicator {
    policies: PolicySet,
}

impl PolicyApplicator {
    /// Creates an applicator without policies.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an applicator declaring `policies`.
    pub fn with_policies(policies: PolicySet) -> Self {
        Self { policies }
    }

    /// Replaces the declared policies.
    pub fn set_policies(&mut self, policies: PolicySet) {
        self.policies = policies;
    }

    /// Declared policies, in declared order.
    pub fn policies(&self) -> &PolicySet {
        &self.policies
    }

    /// Registers the declared policies with `dispatcher` on behalf of `owner`,
    /// in reverse declared order.
    ///
    /// Does nothing when no policy is declared.
    pub fn on_after_init(
        &self,
        owner: Arc<dyn Originator>,
        dispatcher: &Dispatcher,
    ) -> Result<(), PolicyError> {
        for (_, entry) in self.policies.iter().rev() {
            dispatcher.register(owner.clone(), entry.clone())?;
        }
        Ok(())
    }
}

impl From<PolicySet> for PolicyApplicator {
    fn from(policies: PolicySet) -> Self {
        Self::with_policies(policies)
    }
}

impl FromIterator<(&'static str, PolicyEntry)> for PolicyApplicator {
    fn from_iter<I: IntoIterator<Item = (&'static str, PolicyEntry)>>(iter: I) -> Self {
        Self::with_policies(iter.into_iter().collect())
    }
}

/// A request handler that declares policies.
pub trait Controller: Originator {
    /// Policy declarations, base-most first.
    fn applicators(&self) -> &[PolicyApplicator];
}

/// Runs every applicator of `controller` against `dispatcher`.
///
/// Stops at the first rejected registration.
pub fn init_controller<C>(controller: &Arc<C>, dispatcher: &Dispatcher) -> Result<(), PolicyError>
where
    C: Controller + 'static,
{
    let owner: Arc<dyn Originator> = controller.clone();
    for applicator in controller.applicators() {
        applicator.on_after_init(owner.clone(), dispatcher)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use polis_core::{Policy, PolicyRequest, PolicyResponse};
    use pretty_assertions::assert_eq;

    #[derive(Debug)]
    struct Named(&'static str);

    impl Policy for Named {
        fn apply_to_response(
            &self,
            _originator: &dyn Originator,
            _request: &PolicyRequest,
            _response: &mut dyn PolicyResponse,
        ) -> Result<(), PolicyError> {
            Ok(())
        }

        fn name(&self) -> &str {
            self.0
        }
    }

    struct Layered {
        applicators: Vec<PolicyApplicator>,
    }

    impl Originator for Layered {
        fn label(&self) -> &str {
            "Layered"
        }
    }

    impl Controller for Layered {
        fn applicators(&self) -> &[PolicyApplicator] {
            &self.applicators
        }
    }

    fn registered_names(dispatcher: &Dispatcher) -> Vec<String> {
        dispatcher
            .registrations()
            .iter()
            .map(|registration| registration.entry.name().to_owned())
            .collect()
    }

    #[test]
    fn registers_in_reverse_declared_order() {
        let applicator: PolicyApplicator = [
            ("a", PolicyEntry::new(Named("A"))),
            ("b", PolicyEntry::new(Named("B"))),
            ("c", PolicyEntry::new(Named("C"))),
        ]
        .into_iter()
        .collect();
        let dispatcher = Dispatcher::new();

        applicator.on_after_init(Arc::new(()), &dispatcher).unwrap();

        assert_eq!(registered_names(&dispatcher), ["C", "B", "A"]);
    }

    #[test]
    fn empty_applicator_registers_nothing() {
        let dispatcher = Dispatcher::new();
        PolicyApplicator::new()
            .on_after_init(Arc::new(()), &dispatcher)
            .unwrap();
        assert!(dispatcher.is_empty());
    }

    #[test]
    fn set_policies_replaces_declarations() {
        let mut applicator: PolicyApplicator =
            [("a", PolicyEntry::new(Named("A")))].into_iter().collect();
        applicator.set_policies(PolicySet::new().with("b", PolicyEntry::new(Named("B"))));
        assert_eq!(applicator.policies().names().collect::<Vec<_>>(), ["b"]);
    }

    #[test]
    fn base_applicators_register_first() {
        let controller = Arc::new(Layered {
            applicators: vec![
                [("base", PolicyEntry::new(Named("Base")))].into_iter().collect(),
                [
                    ("first", PolicyEntry::new(Named("First"))),
                    ("second", PolicyEntry::new(Named("Second"))),
                ]
                .into_iter()
                .collect(),
            ],
        });
        let dispatcher = Dispatcher::new();

        init_controller(&controller, &dispatcher).unwrap();

        assert_eq!(registered_names(&dispatcher), ["Base", "Second", "First"]);
        assert!(
            dispatcher
                .registrations()
                .iter()
                .all(|registration| registration.originator.label() == "Layered")
        );
    }
}
