//! Icinga Web 2 Setup Wizard Library
//!
//! This library provides the navigation core of the web setup wizard: the
//! answer store, per-page hooks, skip-aware navigation, the connectivity
//! probe and the compiler turning answers into an installation plan.

pub mod answers;
pub mod cli;
pub mod config;
pub mod dbtool;
pub mod engine;
pub mod error;
pub mod extension;
pub mod logic;
pub mod pages;
pub mod requirements;
pub mod types;
pub mod wizard;

// Re-export main types for convenience
pub use answers::{AnswerSet, PageRecord};
pub use config::SetupConfig;
pub use dbtool::TcpDbTool;
pub use error::{Result, SetupError};
pub use extension::{ExtensionRegistry, SetupExtension};
pub use pages::{ButtonLabels, Direction, PageId};
pub use requirements::{Environment, RequirementReport};
pub use wizard::{PageView, SubmitOutcome, Wizard};

// Plan compiler
pub use engine::plan::{compile, InstallationPlan, Step};

// Page hooks and navigation
pub use logic::hooks::{PageContext, PageHook, PageRegistry};
pub use logic::navigation::{resolve, Resolution};
pub use logic::probe::{probe, probe_connection, Connection, DbTool, ProbeError, ProbeVerdict};
