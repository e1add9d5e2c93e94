//! Parts shared by composite and leaf plans.

use crate::{BuildParameters, SkipPolicies, TaskContext};
use confmig_core::{Environment, Result, TaskName, TaskResult};
use std::rc::Rc;
use tracing::debug;

pub(crate) type NameFn<S> = dyn Fn(&BuildParameters<S>) -> TaskName;
pub(crate) type BeforeHook<S> = dyn Fn(&TaskName, &BuildParameters<S>);
pub(crate) type AfterHook<S> = dyn Fn(&TaskName, &BuildParameters<S>, &TaskResult);

pub(crate) enum NameSource<S> {
    Fixed(TaskName),
    Built(Rc<NameFn<S>>),
}

impl<S> Clone for NameSource<S> {
    fn clone(&self) -> Self {
        match self {
            Self::Fixed(name) => Self::Fixed(name.clone()),
            Self::Built(f) => Self::Built(Rc::clone(f)),
        }
    }
}

/// Name, skip policies and hooks of a plan.
pub(crate) struct TaskPlan<S> {
    pub(crate) name: NameSource<S>,
    pub(crate) skip_policies: SkipPolicies<S>,
    pub(crate) before: Option<Rc<BeforeHook<S>>>,
    pub(crate) after: Option<Rc<AfterHook<S>>>,
}

impl<S: 'static> TaskPlan<S> {
    pub(crate) fn new(name: TaskName) -> Self {
        Self {
            name: NameSource::Fixed(name),
            skip_policies: SkipPolicies::with_default(),
            before: None,
            after: None,
        }
    }
}

impl<S> TaskPlan<S> {
    pub(crate) fn name_for(&self, params: &BuildParameters<S>) -> TaskName {
        match &self.name {
            NameSource::Fixed(name) => name.clone(),
            NameSource::Built(f) => f(params),
        }
    }

    pub(crate) fn would_skip(&self, params: &BuildParameters<S>, environment: &Environment) -> Result<bool> {
        let name = self.name_for(params);
        self.skip_policies.should_skip(&name, params, environment)
    }

    /// Run `body` unless a skip policy matches, with the hooks around it.
    pub(crate) fn run<F>(
        &self,
        name: &TaskName,
        params: &BuildParameters<S>,
        context: &mut TaskContext<'_>,
        body: F,
    ) -> Result<TaskResult>
    where
        F: FnOnce(&mut TaskContext<'_>) -> Result<TaskResult>,
    {
        if self.skip_policies.should_skip(name, params, context.environment())? {
            debug!(task = %name, "skipped by policy");
            return Ok(TaskResult::skipped());
        }
        if let Some(before) = &self.before {
            before(name, params);
        }
        let result = body(context)?;
        if let Some(after) = &self.after {
            after(name, params, &result);
        }
        Ok(result)
    }
}

impl<S> Clone for TaskPlan<S> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            skip_policies: self.skip_policies.clone(),
            before: self.before.clone(),
            after: self.after.clone(),
        }
    }
}
