//! confmig CLI

mod pipeline;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use confmig_core::Environment;
use confmig_execution::{BuildParameters, MigrationRunner, RunnerConfig, SourceDescriptor, UnitOutcome};
use confmig_management::{InMemoryConnection, ManageableServer, ServerMode};
use pipeline::{MigrationInput, MANAGEMENT_UNIT};
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "confmig")]
#[command(about = "Migrates server configurations to the current schema", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Migrate a configuration document, and optionally its management model
    Migrate {
        /// Configuration document, rewritten in place
        #[arg(long)]
        config: PathBuf,

        /// Management model (JSON), saved back after the run
        #[arg(long)]
        model: Option<PathBuf>,

        /// How the model is rooted
        #[arg(long, value_enum, default_value_t = Mode::Standalone)]
        mode: Mode,

        /// Host name, for host mode
        #[arg(long, default_value = "primary")]
        host: String,

        /// Environment property
        #[arg(short = 'D', value_name = "KEY=VALUE")]
        define: Vec<String>,

        /// Write the run report as JSON
        #[arg(long)]
        report: Option<PathBuf>,

        /// Product the configuration comes from
        #[arg(long, default_value = "wildfly")]
        product: String,

        /// Version of that product
        #[arg(long)]
        version: Option<String>,

        /// Stop at the first aborted unit
        #[arg(long)]
        stop_on_failure: bool,
    },

    /// List the sources a migration is registered for
    Sources,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    Standalone,
    Domain,
    Host,
}

impl Mode {
    fn server_mode(self, host: String) -> ServerMode {
        match self {
            Mode::Standalone => ServerMode::Standalone,
            Mode::Domain => ServerMode::Domain,
            Mode::Host => ServerMode::Host { name: host },
        }
    }
}

struct MigrateOptions {
    config: PathBuf,
    model: Option<PathBuf>,
    mode: ServerMode,
    define: Vec<String>,
    report: Option<PathBuf>,
    source: SourceDescriptor,
    stop_on_failure: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Migrate {
            config,
            model,
            mode,
            host,
            define,
            report,
            product,
            version,
            stop_on_failure,
        } => migrate(MigrateOptions {
            config,
            model,
            mode: mode.server_mode(host),
            define,
            report,
            source: SourceDescriptor { product, version },
            stop_on_failure,
        })?,

        Commands::Sources => {
            println!("Registered sources:");
            for source in pipeline::providers().sources() {
                println!("  {}", source);
            }
        }
    }

    Ok(())
}

fn environment_from(assignments: &[String]) -> Result<Environment> {
    let mut environment = Environment::new();
    for assignment in assignments {
        let (key, value) = Environment::parse_assignment(assignment)?;
        environment.set_property(key, Some(value));
    }
    Ok(environment)
}

fn load_model(path: Option<&PathBuf>) -> Result<Rc<InMemoryConnection>> {
    let Some(path) = path else {
        return Ok(Rc::new(InMemoryConnection::default()));
    };
    let json = fs::read_to_string(path).with_context(|| format!("reading model {}", path.display()))?;
    let connection = InMemoryConnection::from_json(&json).with_context(|| format!("parsing model {}", path.display()))?;
    Ok(Rc::new(connection))
}

fn migrate(options: MigrateOptions) -> Result<()> {
    let mut environment = environment_from(&options.define)?;
    let registry = pipeline::providers();
    let provider = registry
        .lookup(&options.source)
        .ok_or_else(|| anyhow!("no migration registered for {}", options.source))?;

    let connection = load_model(options.model.as_ref())?;
    let server = Rc::new(ManageableServer::new(options.mode, connection.clone()));
    let input = MigrationInput {
        config: options.config,
        source: options.source,
    };
    let params = BuildParameters::new(Rc::new(input), server);
    let units = provider(&params, options.model.is_some());

    let mut runner = MigrationRunner::new().with_config(RunnerConfig {
        stop_on_failure: options.stop_on_failure,
    });
    let report = runner.run(&units, &mut environment);

    for (key, value) in environment.property_reads() {
        debug!(%key, %value, "property read");
    }

    let model_migrated = report
        .units
        .iter()
        .any(|u| u.unit() == MANAGEMENT_UNIT && !u.is_aborted());
    if let (Some(path), true) = (&options.model, model_migrated) {
        fs::write(path, connection.to_json_pretty()?).with_context(|| format!("saving model {}", path.display()))?;
        info!(path = %path.display(), "model saved");
    }

    if let Some(path) = &options.report {
        fs::write(path, serde_json::to_string_pretty(&report)?)
            .with_context(|| format!("writing report {}", path.display()))?;
        info!(path = %path.display(), "report written");
    }

    println!("Run {}", report.run_id);
    for outcome in &report.units {
        match outcome {
            UnitOutcome::Completed { unit, execution } => {
                println!("  {}: {}", unit, execution.result.status());
                execution.walk(&mut |depth, record| {
                    if depth > 0 {
                        println!("  {}{} {}", "  ".repeat(depth), record.result.status(), record.name);
                    }
                });
            }
            UnitOutcome::Aborted { unit, error } => println!("  {}: ABORTED ({})", unit, error),
        }
    }

    let aborted = report.aborted();
    if aborted > 0 {
        bail!("{} configuration unit(s) aborted", aborted);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_migrate() {
        let cli = Cli::try_parse_from([
            "confmig",
            "migrate",
            "--config",
            "standalone.xml",
            "-D",
            "subsystems.remove=cmp,threads",
            "-D",
            "remove-subsystem.skip=false",
            "--mode",
            "domain",
            "--version",
            "8.2",
        ])
        .unwrap();
        let Commands::Migrate { config, define, mode, version, stop_on_failure, .. } = cli.command else {
            panic!("expected migrate");
        };
        assert_eq!(config, PathBuf::from("standalone.xml"));
        assert_eq!(define.len(), 2);
        assert_eq!(mode, Mode::Domain);
        assert_eq!(version.as_deref(), Some("8.2"));
        assert!(!stop_on_failure);
    }

    #[test]
    fn test_defines_become_properties() {
        let environment = environment_from(&["a=1".to_string(), "b.list=x,y".to_string()]).unwrap();
        assert_eq!(environment.get_property_as_int("a").unwrap(), Some(1));
        assert_eq!(environment.get_property_as_list("b.list"), Some(vec!["x".to_string(), "y".to_string()]));
        assert!(environment_from(&["no-equals".to_string()]).is_err());
    }

    #[test]
    fn test_migrate_saves_model_and_report() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("standalone.xml");
        let model = dir.path().join("model.json");
        let report = dir.path().join("report.json");
        fs::write(&config, "<server/>").unwrap();
        fs::write(&model, r#"{"children": {"subsystem": {"cmp": {}, "jmx": {}}}}"#).unwrap();

        migrate(MigrateOptions {
            config,
            model: Some(model.clone()),
            mode: ServerMode::Standalone,
            define: vec!["subsystems.remove=cmp".to_string()],
            report: Some(report.clone()),
            source: SourceDescriptor::any_version("wildfly"),
            stop_on_failure: false,
        })
        .unwrap();

        let saved = InMemoryConnection::from_json(&fs::read_to_string(&model).unwrap()).unwrap();
        assert!(saved.snapshot().child("subsystem", "cmp").is_none());
        assert!(saved.snapshot().child("subsystem", "jmx").is_some());
        let written: serde_json::Value = serde_json::from_str(&fs::read_to_string(&report).unwrap()).unwrap();
        assert_eq!(written["units"].as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn test_unknown_product_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let result = migrate(MigrateOptions {
            config: dir.path().join("standalone.xml"),
            model: None,
            mode: ServerMode::Standalone,
            define: Vec::new(),
            report: None,
            source: SourceDescriptor::any_version("tomcat"),
            stop_on_failure: false,
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_document_aborts_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let result = migrate(MigrateOptions {
            config: dir.path().join("missing.xml"),
            model: None,
            mode: ServerMode::Standalone,
            define: Vec::new(),
            report: None,
            source: SourceDescriptor::any_version("eap"),
            stop_on_failure: false,
        });
        assert!(result.is_err());
    }
}
