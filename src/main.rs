//! multihost CLI — inspect a multihost configuration and plan test runs.
//!
//! Subcommands:
//! - `topology` — print the topology detected from the configuration
//! - `known`    — list the built-in topologies
//! - `plan`     — select tests from a manifest and show what each binds
//! - `run`      — set up, bind, and tear down every kept invocation

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use multihost_core::{shellexpand, MultihostConfig};
use multihost_plugin::{
    bind, ArtifactsPolicy, FuncArgs, KnownTopology, MultihostSession, Outcome, SessionOptions,
    TestManifest,
};
use multihost_roles::RoleRegistry;
use std::collections::BTreeMap;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(
    name = "multihost",
    version,
    about = "Topology-aware selection and host binding for multihost tests"
)]
struct Cli {
    /// Multihost configuration file (TOML, or JSON with a .json extension).
    #[arg(long, global = true, env = "MULTIHOST_CONFIG")]
    multihost_config: Option<String>,
    /// Run only tests whose topology equals the detected one.
    #[arg(long, global = true)]
    exact_topology: bool,
    /// Also write the log to this file.
    #[arg(long, global = true)]
    multihost_log_path: Option<String>,
    /// When to collect artifacts: never, on-failure, or always.
    #[arg(long, global = true, default_value = "on-failure")]
    collect_artifacts: ArtifactsPolicy,
    /// Where collected artifacts are stored.
    #[arg(long, global = true, default_value = "./artifacts")]
    artifacts_dir: String,
    /// Debug logging.
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the topology detected from the configuration.
    Topology,
    /// List the built-in topologies as JSON.
    Known,
    /// Select tests and show the arguments each invocation receives.
    Plan {
        /// Test manifest (TOML).
        #[arg(long)]
        tests: String,
    },
    /// Run every kept invocation with a no-op body.
    Run {
        /// Test manifest (TOML).
        #[arg(long)]
        tests: String,
    },
}

fn init_logging(verbose: bool, log_path: Option<&str>) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));
    let stderr = fmt::layer().with_writer(std::io::stderr);

    let (file, guard) = match log_path {
        Some(path) => {
            let expanded = shellexpand(path);
            let path = std::path::Path::new(&expanded);
            let Some(name) = path.file_name() else {
                bail!("invalid log path: {expanded}");
            };
            let dir = match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent,
                _ => std::path::Path::new("."),
            };
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr)
        .with(file)
        .init();
    Ok(guard)
}

fn load_config(path: Option<&str>) -> anyhow::Result<Option<MultihostConfig>> {
    path.map(|p| MultihostConfig::load(p).with_context(|| format!("loading multihost config {p}")))
        .transpose()
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = init_logging(cli.verbose, cli.multihost_log_path.as_deref())?;

    let options = SessionOptions {
        exact_topology: cli.exact_topology,
        multihost_log_path: cli.multihost_log_path.clone(),
        collect_artifacts: cli.collect_artifacts,
        artifacts_dir: cli.artifacts_dir.clone(),
    };
    tracing::debug!("cli: {options:?}");
    let registry = RoleRegistry::builtin();
    let config = load_config(cli.multihost_config.as_deref())?;

    match cli.command {
        Commands::Topology => {
            let Some(config) = config else {
                bail!("no multihost configuration provided, use --multihost-config");
            };
            let session = MultihostSession::new(options, Some(config), &registry)?;
            let Some(inventory) = session.inventory() else {
                bail!("inventory was not built");
            };
            let result = serde_json::json!({
                "topology": inventory.topology().export(),
                "paths": inventory.topology().paths(),
                "hosts": inventory.len(),
            });
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::Known => {
            let marks = KnownTopology::ALL
                .iter()
                .map(|known| known.mark().map(|mark| mark.export()))
                .collect::<Result<Vec<_>, _>>()?;
            println!("{}", serde_json::to_string_pretty(&marks)?);
        }
        Commands::Plan { tests } => {
            let manifest = TestManifest::load(&tests)?;
            let session = MultihostSession::new(options, config, &registry)?;
            session.start();

            let collected = session.collect(&manifest.tests)?;
            let report = session.select(&collected);

            for invocation in &report.kept {
                let mut bound: BTreeMap<String, Vec<&str>> = BTreeMap::new();
                if let (Some(mark), Some(inventory)) = (&invocation.mark, session.inventory()) {
                    let mut args = FuncArgs::new(&invocation.args, Some(inventory));
                    bind(mark, inventory, &mut args)
                        .with_context(|| format!("binding {}", invocation.name))?;
                    bound.extend(args.iter().map(|(name, value)| (name.to_string(), value.hostnames())));
                }
                let line = serde_json::json!({
                    "invocation": invocation.name,
                    "args": bound,
                });
                println!("{}", serde_json::to_string(&line)?);
            }
            let line = serde_json::json!({ "deselected": report.deselected });
            println!("{}", serde_json::to_string(&line)?);
        }
        Commands::Run { tests } => {
            let manifest = TestManifest::load(&tests)?;
            let mut session = MultihostSession::new(options, config, &registry)?;
            session.start();

            let collected = session.collect(&manifest.tests)?;
            let report = session.select(&collected);

            for invocation in &report.kept {
                let record = session
                    .run(invocation, |_| Outcome::Passed)
                    .with_context(|| format!("running {}", invocation.name))?;
                println!("{}", serde_json::to_string(&record)?);
            }
            session.finish()?;
        }
    }

    Ok(())
}
