//! Skip policies.
//!
//! Policies are evaluated in order before a task body runs; the first one
//! that asks to skip wins and the task returns SKIPPED without side effects.

use crate::BuildParameters;
use confmig_core::{Environment, Result, TaskName};
use std::rc::Rc;
use tracing::debug;

/// Guard deciding whether a task should be skipped.
pub trait SkipPolicy<S> {
    /// Whether to skip the named task.
    fn should_skip(&self, name: &TaskName, params: &BuildParameters<S>, environment: &Environment) -> Result<bool>;
}

/// Skips when the boolean property `<task name>.skip` is true.
///
/// A missing property means run; a value other than `true`/`false` is an
/// environment error.
#[derive(Debug, Clone, Copy, Default)]
pub struct SkipIfPropertyTrue;

impl SkipIfPropertyTrue {
    /// The property consulted for a task.
    pub fn property_key(name: &TaskName) -> String {
        format!("{}.skip", name.name())
    }
}

impl<S> SkipPolicy<S> for SkipIfPropertyTrue {
    fn should_skip(&self, name: &TaskName, _params: &BuildParameters<S>, environment: &Environment) -> Result<bool> {
        Ok(environment
            .get_property_as_bool(&Self::property_key(name))?
            .unwrap_or(false))
    }
}

/// Skips when a closure says so.
pub struct SkipIf<F>(pub F);

impl<S, F> SkipPolicy<S> for SkipIf<F>
where
    F: Fn(&TaskName, &BuildParameters<S>, &Environment) -> Result<bool>,
{
    fn should_skip(&self, name: &TaskName, params: &BuildParameters<S>, environment: &Environment) -> Result<bool> {
        (self.0)(name, params, environment)
    }
}

/// Skips unless the confirmation capability agrees to run the task.
///
/// Without a confirmation capability the run is non-interactive and the
/// task is treated as confirmed.
#[derive(Debug, Clone)]
pub struct SkipUnlessConfirmed {
    question: String,
}

impl SkipUnlessConfirmed {
    /// Create a policy asking `question`.
    pub fn new(question: impl Into<String>) -> Self {
        Self { question: question.into() }
    }
}

impl<S> SkipPolicy<S> for SkipUnlessConfirmed {
    fn should_skip(&self, _name: &TaskName, params: &BuildParameters<S>, _environment: &Environment) -> Result<bool> {
        Ok(params
            .confirm()
            .map(|confirm| !confirm.confirm(&self.question))
            .unwrap_or(false))
    }
}

/// Ordered list of skip policies combined with OR.
pub struct SkipPolicies<S> {
    policies: Vec<Rc<dyn SkipPolicy<S>>>,
}

impl<S: 'static> SkipPolicies<S> {
    /// No policies.
    pub fn new() -> Self {
        Self { policies: Vec::new() }
    }

    /// Only [`SkipIfPropertyTrue`].
    pub fn with_default() -> Self {
        let mut policies = Self::new();
        policies.push(SkipIfPropertyTrue);
        policies
    }

    /// Append a policy.
    pub fn push(&mut self, policy: impl SkipPolicy<S> + 'static) {
        self.policies.push(Rc::new(policy));
    }
}

impl<S> SkipPolicies<S> {
    /// Number of policies.
    pub fn len(&self) -> usize {
        self.policies.len()
    }

    /// Whether there are no policies.
    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    /// Evaluate the policies in order, stopping at the first that skips.
    pub fn should_skip(&self, name: &TaskName, params: &BuildParameters<S>, environment: &Environment) -> Result<bool> {
        for (index, policy) in self.policies.iter().enumerate() {
            if policy.should_skip(name, params, environment)? {
                debug!(task = %name, policy = index, "skip policy matched");
                return Ok(true);
            }
        }
        Ok(false)
    }
}

impl<S: 'static> Default for SkipPolicies<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Clone for SkipPolicies<S> {
    fn clone(&self) -> Self {
        Self {
            policies: self.policies.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{params, Source};
    use crate::Confirm;
    use confmig_core::{EnvironmentError, MigrationError};
    use std::cell::Cell;

    struct Answer(bool);

    impl Confirm for Answer {
        fn confirm(&self, _question: &str) -> bool {
            self.0
        }
    }

    #[test]
    fn test_skip_property_uses_base_name() {
        let params = params();
        let name = TaskName::new("remove-jacorb").with_attribute("profile", "full");
        let mut environment = Environment::new();
        assert!(!SkipIfPropertyTrue.should_skip(&name, &params, &environment).unwrap());

        environment.set_property("remove-jacorb.skip", Some("TRUE".into()));
        assert!(SkipIfPropertyTrue.should_skip(&name, &params, &environment).unwrap());

        environment.set_property("remove-jacorb.skip", Some("sometimes".into()));
        assert!(matches!(
            SkipIfPropertyTrue.should_skip(&name, &params, &environment),
            Err(MigrationError::Environment(EnvironmentError::Malformed { .. }))
        ));
    }

    #[test]
    fn test_first_matching_policy_wins() {
        let evaluated = Rc::new(Cell::new(0));
        let mut policies = SkipPolicies::<Source>::new();
        for answer in [false, true, false] {
            let evaluated = Rc::clone(&evaluated);
            policies.push(SkipIf(move |_: &TaskName, _: &BuildParameters<Source>, _: &Environment| {
                evaluated.set(evaluated.get() + 1);
                Ok(answer)
            }));
        }
        let skipped = policies
            .should_skip(&TaskName::new("t"), &params(), &Environment::new())
            .unwrap();
        assert!(skipped);
        assert_eq!(evaluated.get(), 2);
    }

    #[test]
    fn test_confirmation() {
        let name = TaskName::new("t");
        let environment = Environment::new();
        let policy = SkipUnlessConfirmed::new("Remove the legacy subsystems?");

        assert!(!policy.should_skip(&name, &params(), &environment).unwrap());
        let declined = params().with_confirm(Rc::new(Answer(false)));
        assert!(policy.should_skip(&name, &declined, &environment).unwrap());
        let accepted = params().with_confirm(Rc::new(Answer(true)));
        assert!(!policy.should_skip(&name, &accepted, &environment).unwrap());
    }
}
