//! Leaf tasks - one resource, one runnable.

use crate::plan::TaskPlan;
use crate::{BuildParameters, SkipPolicies, SkipPolicy, Task, TaskBuilder, TaskContext};
use confmig_core::{Environment, MigrationError, Result, TaskName, TaskResult};
use confmig_management::ManageableResourceSelector;
use std::rc::Rc;
use tracing::debug;

/// The body of a leaf task, built once its resource is resolved.
pub type Runnable = Box<dyn FnOnce(&mut TaskContext<'_>) -> Result<TaskResult>>;

type RunnableFactory<S> = dyn Fn(&BuildParameters<S>, &TaskName) -> Runnable;

/// Plan of a leaf task.
///
/// The leaf works on the resource of its parameters, or on the single
/// resource an optional selector picks from it. The runnable is built from
/// the resolved parameters and the task name, so it can label its work
/// without resolving anything again.
pub struct LeafTaskBuilder<S> {
    plan: TaskPlan<S>,
    selector: Option<ManageableResourceSelector>,
    runnable: Rc<RunnableFactory<S>>,
}

impl<S: 'static> LeafTaskBuilder<S> {
    /// Create a plan from a runnable factory.
    pub fn new<F>(name: impl Into<TaskName>, runnable: F) -> Self
    where
        F: Fn(&BuildParameters<S>, &TaskName) -> Runnable + 'static,
    {
        Self {
            plan: TaskPlan::new(name.into()),
            selector: None,
            runnable: Rc::new(runnable),
        }
    }

    /// Create a plan whose body is a plain function of the resolved
    /// parameters.
    pub fn run_fn<F>(name: impl Into<TaskName>, body: F) -> Self
    where
        F: Fn(&BuildParameters<S>, &mut TaskContext<'_>) -> Result<TaskResult> + 'static,
    {
        let body = Rc::new(body);
        Self::new(name, move |params: &BuildParameters<S>, _name: &TaskName| -> Runnable {
            let body = Rc::clone(&body);
            let params = params.clone();
            Box::new(move |context: &mut TaskContext<'_>| body(&params, context))
        })
    }

    /// Resolve the task's resource with a selector.
    ///
    /// No match skips the task; more than one match is an error.
    pub fn resource(mut self, selector: ManageableResourceSelector) -> Self {
        self.selector = Some(selector);
        self
    }

    /// Derive the name from the parameters.
    pub fn name_builder<F>(mut self, name: F) -> Self
    where
        F: Fn(&BuildParameters<S>) -> TaskName + 'static,
    {
        self.plan.name = crate::plan::NameSource::Built(Rc::new(name));
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

    /// Hook called before the body runs.
    pub fn before<F>(mut self, hook: F) -> Self
    where
        F: Fn(&TaskName, &BuildParameters<S>) + 'static,
    {
        self.plan.before = Some(Rc::new(hook));
        self
    }

    /// Hook called with the result after the body returns.
    pub fn after<F>(mut self, hook: F) -> Self
    where
        F: Fn(&TaskName, &BuildParameters<S>, &TaskResult) + 'static,
    {
        self.plan.after = Some(Rc::new(hook));
        self
    }

    /// Whether the task built from `params` would be skipped by policy.
    pub fn would_skip(&self, params: &BuildParameters<S>, environment: &Environment) -> Result<bool> {
        self.plan.would_skip(params, environment)
    }
}

impl<S: 'static> TaskBuilder<S> for LeafTaskBuilder<S> {
    fn build(&self, params: &BuildParameters<S>) -> Box<dyn Task> {
        Box::new(LeafTask {
            name: self.plan.name_for(params),
            params: params.clone(),
            plan: self.plan.clone(),
            selector: self.selector.clone(),
            runnable: Rc::clone(&self.runnable),
        })
    }
}

impl<S> Clone for LeafTaskBuilder<S> {
    fn clone(&self) -> Self {
        Self {
            plan: self.plan.clone(),
            selector: self.selector.clone(),
            runnable: Rc::clone(&self.runnable),
        }
    }
}

/// A built leaf task.
pub struct LeafTask<S> {
    name: TaskName,
    params: BuildParameters<S>,
    plan: TaskPlan<S>,
    selector: Option<ManageableResourceSelector>,
    runnable: Rc<RunnableFactory<S>>,
}

impl<S> LeafTask<S> {
    fn resolve(&self) -> Result<Option<BuildParameters<S>>> {
        let Some(selector) = &self.selector else {
            return Ok(Some(self.params.clone()));
        };
        let selected = selector.select(self.params.resource())?;
        match selected.as_slice() {
            [] => Ok(None),
            [resource] => Ok(Some(self.params.with_resource(Rc::clone(resource)))),
            _ => Err(MigrationError::Invariant(format!(
                "task {} expects one resource for {} under {}, found {}",
                self.name,
                selector.description(),
                self.params.resource().address(),
                selected.len()
            ))),
        }
    }
}

impl<S> Task for LeafTask<S> {
    fn name(&self) -> &TaskName {
        &self.name
    }

    fn run(&self, context: &mut TaskContext<'_>) -> Result<TaskResult> {
        self.plan.run(&self.name, &self.params, context, |context| {
            let Some(params) = self.resolve()? else {
                debug!(task = %self.name, "no resource to work on");
                return Ok(TaskResult::skipped_because("no matching resource"));
            };
            let runnable = (self.runnable)(&params, &self.name);
            runnable(context)
        })
    }
}
