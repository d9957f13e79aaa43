//! websetup - Main entry point
//!
//! Command line front end for the setup wizard: checks requirements, drives
//! the wizard from an answers file and prints the compiled installation plan.

use anyhow::{bail, Context};
use std::fs;
use std::path::Path;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use websetup::cli::{Cli, Commands};
use websetup::config::CONFIG_DIR_ENV;
use websetup::engine::plan::{self, InstallationPlan};
use websetup::logic::hooks::{PageContext, StaticPage};
use websetup::types::{EmptyData, ModulesData};
use websetup::{
    AnswerSet, Environment, ExtensionRegistry, PageId, PageRecord, PageView, SetupConfig,
    SubmitOutcome, TcpDbTool, Wizard,
};

/// Initialize tracing; RUST_LOG overrides the default level
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Settings file, then environment, then command line
fn load_config(cli: &Cli) -> anyhow::Result<SetupConfig> {
    let mut config = match &cli.config {
        Some(path) => SetupConfig::load_from_file(path)?,
        None => SetupConfig::default(),
    };

    let from_env = std::env::var(CONFIG_DIR_ENV).ok().filter(|v| !v.is_empty());
    if cli.config_dir.is_some() || from_env.is_some() || cli.config.is_none() {
        config.config_dir = SetupConfig::resolve_config_dir(cli.config_dir.clone(), from_env);
    }

    config.validate()?;
    debug!("Using configuration directory {}", config.config_dir.display());
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse_args();
    init_tracing(cli.verbose);
    info!("websetup starting up");

    let config = load_config(&cli)?;

    match cli.command {
        Commands::Requirements => run_requirements(&config),
        Commands::Validate { answers } => run_validate(&config, &answers),
        Commands::Walk {
            answers,
            ignore_requirements,
            output,
        } => run_walk(config, &answers, ignore_requirements, output.as_deref()),
        Commands::Plan { answers, summary } => run_plan(&config, &answers, summary),
    }
}

fn run_requirements(config: &SetupConfig) -> anyhow::Result<()> {
    let report = Environment::detect(&config.config_dir).requirements();
    print!("{}", report);

    if report.fulfilled() {
        println!("✓ All mandatory requirements are met");
        Ok(())
    } else {
        error!("Mandatory requirements are not met");
        eprintln!("✗ Mandatory requirements are not met");
        std::process::exit(1);
    }
}

fn run_validate(config: &SetupConfig, path: &Path) -> anyhow::Result<()> {
    info!("Validating answers file: {:?}", path);
    let answers = AnswerSet::load_from_file(path)?;

    match plan::compile(&answers, config, &ExtensionRegistry::new()) {
        Ok(plan) => {
            println!("✓ Answers are complete ({} installation steps)", plan.len());
            Ok(())
        }
        Err(e) => {
            error!("Answers validation failed: {}", e);
            eprintln!("✗ Answers validation failed: {}", e);
            std::process::exit(1);
        }
    }
}

fn run_plan(config: &SetupConfig, path: &Path, summary: bool) -> anyhow::Result<()> {
    let answers = AnswerSet::load_from_file(path)?;
    let plan = plan::compile(&answers, config, &ExtensionRegistry::new())?;
    if summary {
        print!("{}", plan);
    } else {
        println!("{}", plan_json(&plan)?);
    }
    Ok(())
}

fn run_walk(
    config: SetupConfig,
    path: &Path,
    ignore_requirements: bool,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let provided = AnswerSet::load_from_file(path)?;
    let environment = Environment::detect(&config.config_dir);
    let tool = TcpDbTool::new(config.probe_timeout());

    let mut wizard = Wizard::new(config, environment, Box::new(tool));
    if ignore_requirements {
        info!("Ignoring failed requirements");
        wizard = wizard.with_hook(PageId::Requirements, Box::new(StaticPage));
    }

    let mut view = wizard.show()?;
    for _ in 0..PageId::ALL.len() {
        print_view(&view);
        if view.page == PageId::Summary {
            break;
        }
        match wizard.submit(record_for(view.page, &provided)?)? {
            SubmitOutcome::Advanced(next) => view = next,
            SubmitOutcome::Rejected { page, errors } => {
                for message in &errors {
                    eprintln!("✗ {}: {}", page, message);
                }
                bail!("Page {} rejected the given answers", page);
            }
        }
    }

    let plan = wizard.finish()?;
    if let Some(output) = output {
        fs::write(output, plan_json(&plan)?)
            .with_context(|| format!("Failed to write plan to {:?}", output))?;
        println!("✓ Installation plan written to {}", output.display());
    }
    Ok(())
}

/// Recorded answer for the page, or the empty record of a page without input
fn record_for(page: PageId, provided: &AnswerSet) -> anyhow::Result<PageRecord> {
    if let Some(record) = provided.get(page) {
        return Ok(record.clone());
    }
    match page {
        PageId::Welcome => Ok(PageRecord::Welcome(EmptyData {})),
        PageId::Requirements => Ok(PageRecord::Requirements(EmptyData {})),
        PageId::Modules => Ok(PageRecord::Modules(ModulesData::default())),
        _ => bail!("The answers file has no entry for page {}", page),
    }
}

fn print_view(view: &PageView) {
    println!("== {} ({}) {}", view.title, view.page, view.buttons);
    match &view.context {
        PageContext::Requirements { report } => print!("{}", report),
        PageContext::Summary { subject, summary } => {
            println!("{} will be installed as follows:", subject);
            for line in summary {
                println!("  - {}", line);
            }
        }
        PageContext::None => {}
        other => match serde_json::to_string(other) {
            Ok(json) => debug!("Page context: {}", json),
            Err(e) => debug!("Page context not serializable: {}", e),
        },
    }
}

fn plan_json(plan: &InstallationPlan) -> anyhow::Result<String> {
    serde_json::to_string_pretty(plan).context("Failed to serialize installation plan")
}
