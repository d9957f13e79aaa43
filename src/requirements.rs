//! Requirement report for the target platform
//!
//! The report is rebuilt on every request from an explicit [`Environment`]
//! snapshot. Mandatory items gate the requirements page, optional items are
//! advisory only.
//!
//! # Checks
//!
//! | Requirement               | Kind      |
//! |---------------------------|-----------|
//! | PHP version >= 5.3.2      | mandatory |
//! | Default timezone          | mandatory |
//! | Linux platform            | optional  |
//! | PHP modules (json, ...)   | optional  |
//! | Writable config directory | mandatory |

use nix::unistd::{access, AccessFlags};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;
use strum::Display;

/// Minimum runtime version able to serve the web frontend
pub const MINIMUM_RUNTIME_VERSION: &str = "5.3.2";

/// Optional runtime modules: (module name, display name, purpose)
const OPTIONAL_MODULES: &[(&str, &str, &str)] = &[
    (
        "json",
        "JSON",
        "The JSON module for PHP is required for various export functionalities as well as APIs.",
    ),
    (
        "ldap",
        "LDAP",
        "If you'd like to authenticate users using LDAP the corresponding PHP module is required.",
    ),
    (
        "intl",
        "INTL",
        "If you want your users to benefit from language, timezone and date/time format \
         negotiation, the INTL module for PHP is required.",
    ),
    (
        "dom",
        "DOM",
        "To be able to export views and reports to PDF, the DOM module for PHP is required.",
    ),
    (
        "gd",
        "GD",
        "In case you want icons and graphs being exported to PDF as well, you'll need the GD \
         extension for PHP.",
    ),
    (
        "pdo_mysql",
        "PDO-MySQL",
        "Is Icinga Web 2 supposed to access a MySQL database the PDO-MySQL module for PHP is \
         required.",
    ),
    (
        "pdo_pgsql",
        "PDO-PostgreSQL",
        "Is Icinga Web 2 supposed to access a PostgreSQL database the PDO-PostgreSQL module for \
         PHP is required.",
    ),
];

/// Whether a failing requirement blocks the wizard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "lowercase")]
pub enum RequirementKind {
    #[strum(serialize = "mandatory")]
    Mandatory,
    #[strum(serialize = "optional")]
    Optional,
}

/// One resolved requirement check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Requirement {
    pub title: String,
    pub description: String,
    pub kind: RequirementKind,
    pub fulfilled: bool,
    /// Detail about the observed state
    pub message: String,
}

impl Requirement {
    /// Returns true if this item blocks the wizard
    pub fn is_blocking(&self) -> bool {
        self.kind == RequirementKind::Mandatory && !self.fulfilled
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mark = if self.fulfilled { "✓" } else { "✗" };
        write!(f, "{} {} ({}): {}", mark, self.title, self.kind, self.message)
    }
}

/// Ordered list of requirement checks
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RequirementReport {
    items: Vec<Requirement>,
}

impl RequirementReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a requirement that must be met to continue
    pub fn add_mandatory(
        &mut self,
        title: impl Into<String>,
        description: impl Into<String>,
        fulfilled: bool,
        message: impl Into<String>,
    ) {
        self.push(RequirementKind::Mandatory, title, description, fulfilled, message);
    }

    /// Append an advisory requirement
    pub fn add_optional(
        &mut self,
        title: impl Into<String>,
        description: impl Into<String>,
        fulfilled: bool,
        message: impl Into<String>,
    ) {
        self.push(RequirementKind::Optional, title, description, fulfilled, message);
    }

    fn push(
        &mut self,
        kind: RequirementKind,
        title: impl Into<String>,
        description: impl Into<String>,
        fulfilled: bool,
        message: impl Into<String>,
    ) {
        self.items.push(Requirement {
            title: title.into(),
            description: description.into(),
            kind,
            fulfilled,
            message: message.into(),
        });
    }

    /// Append every item of another report, keeping its order
    pub fn merge(&mut self, other: RequirementReport) {
        self.items.extend(other.items);
    }

    /// Downgrade every item to optional
    pub fn all_optional(mut self) -> Self {
        for item in &mut self.items {
            item.kind = RequirementKind::Optional;
        }
        self
    }

    /// Returns true if every mandatory requirement is met
    pub fn fulfilled(&self) -> bool {
        !self.items.iter().any(Requirement::is_blocking)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Requirement> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl fmt::Display for RequirementReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for item in &self.items {
            writeln!(f, "{}", item)?;
        }
        Ok(())
    }
}

// ============================================================================
// Environment Snapshot
// ============================================================================

/// Platform facts the requirement report is built from.
///
/// Passed explicitly into the wizard; nothing in the library reads process
/// globals on its own.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    /// Version of the PHP runtime, empty if none was found
    pub runtime_version: String,
    /// `date.timezone` of the runtime, if configured
    pub default_timezone: Option<String>,
    /// Operating system name (e.g. "linux")
    pub os_name: String,
    /// Lowercase names of the loaded runtime modules
    pub modules: BTreeSet<String>,
    /// Configuration directory the installer will write to
    pub config_dir: PathBuf,
    /// Whether `config_dir` is writable by this process
    pub config_dir_writable: bool,
}

impl Environment {
    /// Detect the environment of the running host.
    ///
    /// Never fails: a missing `php` binary yields an empty version and no
    /// modules, which the report then flags.
    pub fn detect(config_dir: &Path) -> Self {
        let runtime_version = php_eval("echo PHP_VERSION;").unwrap_or_default();
        let default_timezone =
            php_eval("echo ini_get('date.timezone');").filter(|tz| !tz.is_empty());
        let modules = php_modules();
        let config_dir_writable = is_writable(config_dir);

        tracing::info!(
            runtime = %runtime_version,
            modules = modules.len(),
            writable = config_dir_writable,
            "Environment detected"
        );

        Self {
            runtime_version,
            default_timezone,
            os_name: std::env::consts::OS.to_string(),
            modules,
            config_dir: config_dir.to_path_buf(),
            config_dir_writable,
        }
    }

    /// Returns true if the given runtime module is loaded
    pub fn has_module(&self, name: &str) -> bool {
        self.modules.contains(&name.to_lowercase())
    }

    /// Returns true when running on Linux
    pub fn is_linux(&self) -> bool {
        self.os_name.eq_ignore_ascii_case("linux")
    }

    /// Build the requirement report for this snapshot
    pub fn requirements(&self) -> RequirementReport {
        let mut report = RequirementReport::new();

        let version_ok = !self.runtime_version.is_empty()
            && version_at_least(&self.runtime_version, MINIMUM_RUNTIME_VERSION);
        report.add_mandatory(
            "PHP Version",
            format!(
                "Running Icinga Web 2 requires PHP version {}. Advanced features like the \
                 built-in web server require PHP version 5.4.",
                MINIMUM_RUNTIME_VERSION
            ),
            version_ok,
            if self.runtime_version.is_empty() {
                "No PHP installation was found.".to_string()
            } else {
                format!("You are running PHP version {}.", self.runtime_version)
            },
        );

        report.add_mandatory(
            "Default Timezone",
            "It is required that a default timezone has been set using date.timezone in php.ini.",
            self.default_timezone.is_some(),
            match &self.default_timezone {
                Some(tz) => format!("Your default timezone is: {}", tz),
                None => "You did not define a default timezone.".to_string(),
            },
        );

        report.add_optional(
            "Linux Platform",
            "Icinga Web 2 is developed for and tested on Linux. While we cannot guarantee they \
             will, other platforms may also perform as well.",
            self.is_linux(),
            format!("You are running PHP on a {} system.", self.os_name),
        );

        for (module, display, purpose) in OPTIONAL_MODULES {
            let loaded = self.has_module(module);
            report.add_optional(
                format!("PHP Module: {}", display),
                *purpose,
                loaded,
                if loaded {
                    format!("The PHP module {} is available.", display)
                } else {
                    format!("The PHP module {} is missing.", display)
                },
            );
        }

        report.add_mandatory(
            "Writable Config Directory",
            "The Icinga Web 2 configuration directory defaults to \"/etc/icingaweb\", if not \
             explicitly set in the environment variable \"ICINGAWEB_CONFIGDIR\".",
            self.config_dir_writable,
            if self.config_dir_writable {
                format!(
                    "The current configuration directory is writable: {}",
                    self.config_dir.display()
                )
            } else {
                format!(
                    "The current configuration directory is not writable: {}",
                    self.config_dir.display()
                )
            },
        );

        report
    }
}

/// Compare dotted numeric versions; non-numeric suffixes (e.g. "-1ubuntu") are ignored.
pub fn version_at_least(actual: &str, minimum: &str) -> bool {
    fn parts(v: &str) -> Vec<u64> {
        v.split('.')
            .map(|p| {
                p.chars()
                    .take_while(char::is_ascii_digit)
                    .collect::<String>()
                    .parse()
                    .unwrap_or(0)
            })
            .collect()
    }

    let (mut a, mut b) = (parts(actual), parts(minimum));
    let len = a.len().max(b.len());
    a.resize(len, 0);
    b.resize(len, 0);
    a >= b
}

/// Check write access the way the kernel will judge it for this process
fn is_writable(path: &Path) -> bool {
    access(path, AccessFlags::W_OK).is_ok()
}

/// Evaluate a PHP snippet, None if php is missing or fails
fn php_eval(code: &str) -> Option<String> {
    let output = Command::new("php").args(["-r", code]).output().ok()?;
    if !output.status.success() {
        tracing::debug!("php -r exited with {}", output.status);
        return None;
    }
    Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Loaded PHP modules as reported by `php -m`
fn php_modules() -> BTreeSet<String> {
    match Command::new("php").arg("-m").output() {
        Ok(output) if output.status.success() => parse_module_list(
            &String::from_utf8_lossy(&output.stdout),
        ),
        Ok(output) => {
            tracing::debug!("php -m exited with {}", output.status);
            BTreeSet::new()
        }
        Err(e) => {
            tracing::debug!("php binary not available: {}", e);
            BTreeSet::new()
        }
    }
}

/// Parse `php -m` output, skipping the `[PHP Modules]` style section headers
fn parse_module_list(output: &str) -> BTreeSet<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('['))
        .map(str::to_lowercase)
        .collect()
}
