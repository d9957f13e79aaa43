use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// websetup - Guided setup for Icinga Web 2
#[derive(Parser, Debug)]
#[command(name = "websetup")]
#[command(about = "Walk the Icinga Web 2 setup wizard and compile its installation plan")]
#[command(version)]
pub struct Cli {
    /// Wizard settings file (JSON). Defaults are used when omitted.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Configuration directory of the web frontend.
    ///
    /// Overrides the settings file and the ICINGAWEB_CONFIGDIR environment
    /// variable.
    #[arg(long, global = true)]
    pub config_dir: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check the platform requirements
    Requirements,
    /// Check that an answers file is complete enough to compile a plan
    Validate {
        /// Answers file (JSON object keyed by page identifier)
        answers: PathBuf,
    },
    /// Drive the wizard page by page with the given answers
    Walk {
        /// Answers file (JSON object keyed by page identifier)
        answers: PathBuf,

        /// Continue even if mandatory requirements fail
        #[arg(long)]
        ignore_requirements: bool,

        /// Write the compiled plan to this file (JSON)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Compile the installation plan from an answers file
    Plan {
        /// Answers file (JSON object keyed by page identifier)
        answers: PathBuf,

        /// Print the human-readable summary instead of JSON
        #[arg(long)]
        summary: bool,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        <Self as clap::Parser>::parse()
    }
}
