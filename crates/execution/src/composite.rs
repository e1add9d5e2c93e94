//! Composite tasks - fan-out over selected resources.

use crate::plan::{NameSource, TaskPlan};
use crate::{BuildParameters, SkipPolicies, SkipPolicy, Task, TaskBuilder, TaskContext};
use confmig_core::{Environment, Result, TaskName, TaskResult};
use confmig_management::ManageableResourceSelector;
use std::rc::Rc;
use tracing::debug;

enum Subtask<S> {
    /// Built against the composite's own parameters.
    Unkeyed(Rc<dyn TaskBuilder<S>>),
    /// Built once per resource the selector yields.
    Keyed {
        selector: ManageableResourceSelector,
        builder: Rc<dyn TaskBuilder<S>>,
    },
}

impl<S> Clone for Subtask<S> {
    fn clone(&self) -> Self {
        match self {
            Self::Unkeyed(builder) => Self::Unkeyed(Rc::clone(builder)),
            Self::Keyed { selector, builder } => Self::Keyed {
                selector: selector.clone(),
                builder: Rc::clone(builder),
            },
        }
    }
}

/// Plan of a composite task.
///
/// Subtask mappings run in registration order. Selectors are evaluated when
/// the composite runs, from its resolved resource, so a mapping sees every
/// change made by the mappings before it. The composite succeeds if any
/// direct subtask succeeded and is skipped otherwise; it never fails on its
/// own and subtask errors pass through untouched.
pub struct CompositeTaskBuilder<S> {
    plan: TaskPlan<S>,
    subtasks: Vec<Subtask<S>>,
}

impl<S: 'static> CompositeTaskBuilder<S> {
    /// Create an empty plan.
    pub fn new(name: impl Into<TaskName>) -> Self {
        Self {
            plan: TaskPlan::new(name.into()),
            subtasks: Vec::new(),
        }
    }

    /// Derive the name from the parameters.
    pub fn name_builder<F>(mut self, name: F) -> Self
    where
        F: Fn(&BuildParameters<S>) -> TaskName + 'static,
    {
        self.plan.name = NameSource::Built(Rc::new(name));
        self
    }

    /// Add a skip policy after the ones already registered.
    pub fn skip_policy(mut self, policy: impl SkipPolicy<S> + 'static) -> Self {
        self.plan.skip_policies.push(policy);
        self
    }

    /// Replace the skip policies, the default property policy included.
    pub fn skip_policies(mut self, policies: SkipPolicies<S>) -> Self {
        self.plan.skip_policies = policies;
        self
    }

    /// Hook called before the subtasks run.
    pub fn before<F>(mut self, hook: F) -> Self
    where
        F: Fn(&TaskName, &BuildParameters<S>) + 'static,
    {
        self.plan.before = Some(Rc::new(hook));
        self
    }

    /// Hook called with the aggregate result.
    pub fn after<F>(mut self, hook: F) -> Self
    where
        F: Fn(&TaskName, &BuildParameters<S>, &TaskResult) + 'static,
    {
        self.plan.after = Some(Rc::new(hook));
        self
    }

    /// Add a subtask run against the composite's own resource.
    pub fn subtask(mut self, builder: impl TaskBuilder<S> + 'static) -> Self {
        self.subtasks.push(Subtask::Unkeyed(Rc::new(builder)));
        self
    }

    /// Add a subtask run once per resource `selector` yields.
    pub fn subtasks(mut self, selector: ManageableResourceSelector, builder: impl TaskBuilder<S> + 'static) -> Self {
        self.subtasks.push(Subtask::Keyed {
            selector,
            builder: Rc::new(builder),
        });
        self
    }

    /// Whether the task built from `params` would be skipped by policy.
    pub fn would_skip(&self, params: &BuildParameters<S>, environment: &Environment) -> Result<bool> {
        self.plan.would_skip(params, environment)
    }
}

impl<S: 'static> TaskBuilder<S> for CompositeTaskBuilder<S> {
    fn build(&self, params: &BuildParameters<S>) -> Box<dyn Task> {
        Box::new(CompositeTask {
            name: self.plan.name_for(params),
            params: params.clone(),
            plan: self.plan.clone(),
            subtasks: self.subtasks.clone(),
        })
    }
}

impl<S> Clone for CompositeTaskBuilder<S> {
    fn clone(&self) -> Self {
        Self {
            plan: self.plan.clone(),
            subtasks: self.subtasks.clone(),
        }
    }
}

/// A built composite task.
pub struct CompositeTask<S> {
    name: TaskName,
    params: BuildParameters<S>,
    plan: TaskPlan<S>,
    subtasks: Vec<Subtask<S>>,
}

impl<S> Task for CompositeTask<S> {
    fn name(&self) -> &TaskName {
        &self.name
    }

    fn run(&self, context: &mut TaskContext<'_>) -> Result<TaskResult> {
        self.plan.run(&self.name, &self.params, context, |context| {
            for subtask in &self.subtasks {
                match subtask {
                    Subtask::Unkeyed(builder) => {
                        context.execute(builder.build(&self.params).as_ref())?;
                    }
                    Subtask::Keyed { selector, builder } => {
                        let resources = selector.select(self.params.resource())?;
                        debug!(
                            task = %self.name,
                            selector = selector.description(),
                            selected = resources.len(),
                            "fanning out"
                        );
                        for resource in resources {
                            let params = self.params.with_resource(resource);
                            context.execute(builder.build(&params).as_ref())?;
                        }
                    }
                }
            }
            Ok(context.result())
        })
    }
}
