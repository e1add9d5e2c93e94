//! The built-in migration pipeline and the registry it is published in.

use confmig_core::{Result, TaskName, TaskResult, TaskStatus};
use confmig_execution::{
    BuildParameters, CompositeTaskBuilder, ConfigurationUnit, LeafTaskBuilder, ProviderRegistry, Runnable, SourceDescriptor,
    Task, TaskBuilder, TaskContext,
};
use confmig_management::{ManageableResourceSelector, ManageableServer, ResourceType};
use confmig_xml::{TransactionsObjectStoreMigration, XmlFilter, XmlFilterTask};
use std::path::PathBuf;
use std::rc::Rc;
use tracing::info;

/// Unit rewriting the configuration document.
pub const XML_UNIT: &str = "xml-configuration";
/// Unit migrating the management model.
pub const MANAGEMENT_UNIT: &str = "management-resources";
/// Comma separated subsystem names to remove from the model.
pub const REMOVED_SUBSYSTEMS_PROPERTY: &str = "subsystems.remove";

/// What a migration works on.
#[derive(Debug, Clone)]
pub struct MigrationInput {
    /// Configuration document, rewritten in place
    pub config: PathBuf,
    /// Product and version the configuration comes from
    pub source: SourceDescriptor,
}

/// Builds the units of a run; `with_model` is set when a management model
/// was loaded.
pub type Provider = fn(&BuildParameters<MigrationInput>, bool) -> Vec<ConfigurationUnit>;

/// Registry of the pipelines shipped with the binary.
pub fn providers() -> ProviderRegistry<Provider> {
    let mut registry: ProviderRegistry<Provider> = ProviderRegistry::new();
    registry.register(SourceDescriptor::any_version("wildfly"), standard_pipeline);
    registry.register(SourceDescriptor::any_version("eap"), standard_pipeline);
    registry
}

/// The document rewrite, then the management model when there is one.
pub fn standard_pipeline(params: &BuildParameters<MigrationInput>, with_model: bool) -> Vec<ConfigurationUnit> {
    let mut units = vec![ConfigurationUnit::new(XML_UNIT, xml_configuration().build(params))];
    if with_model {
        let server: &Rc<ManageableServer> = params.server();
        units.push(
            ConfigurationUnit::new(MANAGEMENT_UNIT, management_resources(server).build(params)).with_server(Rc::clone(server)),
        );
    }
    units
}

/// Rewrites of the configuration document.
pub fn xml_configuration() -> CompositeTaskBuilder<MigrationInput> {
    CompositeTaskBuilder::new(XML_UNIT).subtask(LeafTaskBuilder::new(
        "subsystem.transactions.migrate-object-store",
        |params: &BuildParameters<MigrationInput>, name: &TaskName| -> Runnable {
            let task = XmlFilterTask::new(
                name.clone(),
                params.source().config.clone(),
                XmlFilter::new().with_component(TransactionsObjectStoreMigration::new()),
            );
            Box::new(move |context: &mut TaskContext<'_>| task.run(context))
        },
    ))
}

/// Removal of the listed subsystems from every resource holding subsystems.
pub fn management_resources(server: &ManageableServer) -> CompositeTaskBuilder<MigrationInput> {
    let subsystems = ManageableResourceSelector::children(ResourceType::SUBSYSTEM).under(server.subsystem_holders());
    CompositeTaskBuilder::new(MANAGEMENT_UNIT).subtasks(
        subsystems,
        LeafTaskBuilder::run_fn("remove-subsystem", remove_listed_subsystem).name_builder(|params| {
            TaskName::new("remove-subsystem").with_attribute("resource", params.resource().address().to_string())
        }),
    )
}

fn remove_listed_subsystem(params: &BuildParameters<MigrationInput>, context: &mut TaskContext<'_>) -> Result<TaskResult> {
    let subsystem = params.resource();
    let listed = context
        .environment()
        .get_property_as_list(REMOVED_SUBSYSTEMS_PROPERTY)
        .unwrap_or_default();
    if !listed.iter().any(|name| name == subsystem.name()) {
        return Ok(TaskResult::skipped_because("not listed for removal"));
    }
    subsystem.remove()?;
    info!(resource = %subsystem.address(), "subsystem removed");
    Ok(TaskResult::builder(TaskStatus::Success)
        .attribute("removed", subsystem.address().to_string())
        .build())
}
