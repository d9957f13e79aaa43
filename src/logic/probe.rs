//! Database connectivity and privilege probe
//!
//! Decides whether the `setup_database_creation` page is redundant because the
//! credentials entered for the storage resource already hold every privilege
//! the installer needs.
//!
//! # Tiers
//!
//! 1. Connect to the configured database. If that works, look for the first
//!    known table: present means the schema exists and only the *usage*
//!    privileges are checked, absent means the *setup* privileges are checked.
//! 2. Otherwise connect to the server without selecting a database. Schema
//!    existence cannot be determined without full access, so the *setup*
//!    privileges are checked.
//! 3. Otherwise nothing is known and the page must be shown.
//!
//! Connection failures are values here, never errors of the wizard.

use crate::types::DbResourceConfig;
use serde::Serialize;
use std::fmt;
use strum::Display;
use thiserror::Error;

/// Tables operated by the web frontend. The first one marks an existing schema.
pub const DATABASE_TABLES: &[&str] = &[
    "icingaweb_group",
    "icingaweb_group_membership",
    "icingaweb_user",
    "icingaweb_user_preference",
];

/// Privileges required to create and set up the database
pub const SETUP_PRIVILEGES: &[&str] = &[
    "CREATE",
    "ALTER",
    "REFERENCES",
    "CREATE USER", // MySQL
    "CREATEROLE",  // PostgreSQL
];

/// Privileges required to operate an existing database
pub const USAGE_PRIVILEGES: &[&str] = &[
    "SELECT",
    "INSERT",
    "UPDATE",
    "DELETE",
    "EXECUTE",
    "TEMPORARY",               // PostgreSQL
    "CREATE TEMPORARY TABLES", // MySQL
];

/// Failures reported by a database client
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    /// Could not establish a session
    #[error("connection failed: {0}")]
    Connection(String),

    /// Session exists but a query failed
    #[error("query failed: {0}")]
    Query(String),

    /// The client cannot perform this operation at all
    #[error("unsupported by this client: {0}")]
    Unsupported(String),
}

/// Database client consumed by the probe.
///
/// Implementations own their connection state; each method may block on the
/// network. Callers wanting a latency bound impose it in the transport and
/// report a timeout as a `ProbeError`.
pub trait DbTool {
    /// Log in to the configured database itself
    fn connect_to_db(&mut self, config: &DbResourceConfig) -> Result<(), ProbeError>;

    /// Log in to the server without selecting a database
    fn connect_to_host(&mut self, config: &DbResourceConfig) -> Result<(), ProbeError>;

    /// Tables of the connected database
    fn list_tables(&mut self) -> Result<Vec<String>, ProbeError>;

    /// Whether the connected account holds all `privileges` on `tables`
    fn check_privileges(&mut self, privileges: &[&str], tables: &[&str]) -> bool;
}

/// How far the probe got
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Connection {
    /// Logged in to the database; carries its table list
    Database { tables: Vec<String> },
    /// Only the server accepted the credentials
    HostOnly,
    /// Neither tier succeeded
    Unreachable,
}

impl Connection {
    /// Returns true if the schema's marker table was listed
    pub fn schema_exists(&self) -> bool {
        match self {
            Self::Database { tables } => tables.iter().any(|t| t == DATABASE_TABLES[0]),
            Self::HostOnly | Self::Unreachable => false,
        }
    }
}

/// Privilege set a verdict was checked against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "lowercase")]
pub enum PrivilegeSet {
    #[strum(serialize = "setup")]
    Setup,
    #[strum(serialize = "usage")]
    Usage,
}

impl PrivilegeSet {
    pub const fn privileges(self) -> &'static [&'static str] {
        match self {
            Self::Setup => SETUP_PRIVILEGES,
            Self::Usage => USAGE_PRIVILEGES,
        }
    }
}

/// Outcome of one probe run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeVerdict {
    pub connection: Connection,
    /// Set that was checked, None when unreachable
    pub checked: Option<PrivilegeSet>,
    /// Whether the checked set is already held
    pub satisfied: bool,
}

impl ProbeVerdict {
    /// Returns true if asking for privileged credentials would be redundant
    pub fn should_skip(&self) -> bool {
        self.checked.is_some() && self.satisfied
    }
}

impl fmt::Display for ProbeVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tier = match &self.connection {
            Connection::Database { .. } => "database",
            Connection::HostOnly => "host",
            Connection::Unreachable => "unreachable",
        };
        match self.checked {
            Some(set) => write!(f, "tier={}, {} privileges held={}", tier, set, self.satisfied),
            None => write!(f, "tier={}", tier),
        }
    }
}

/// Run the two connection tiers and report how far they got.
pub fn probe_connection(tool: &mut dyn DbTool, config: &DbResourceConfig) -> Connection {
    match tool.connect_to_db(config).and_then(|()| tool.list_tables()) {
        Ok(tables) => return Connection::Database { tables },
        Err(e) => tracing::warn!("Database login for resource '{}' failed: {}", config.name, e),
    }

    match tool.connect_to_host(config) {
        Ok(()) => Connection::HostOnly,
        Err(e) => {
            tracing::warn!("Server login for resource '{}' failed: {}", config.name, e);
            Connection::Unreachable
        }
    }
}

/// Probe the resource and check the privilege set its state calls for.
pub fn probe(tool: &mut dyn DbTool, config: &DbResourceConfig) -> ProbeVerdict {
    let connection = probe_connection(tool, config);
    let checked = match &connection {
        Connection::Database { .. } if connection.schema_exists() => Some(PrivilegeSet::Usage),
        Connection::Database { .. } | Connection::HostOnly => Some(PrivilegeSet::Setup),
        Connection::Unreachable => None,
    };
    let satisfied = checked
        .map(|set| tool.check_privileges(set.privileges(), DATABASE_TABLES))
        .unwrap_or(false);

    let verdict = ProbeVerdict {
        connection,
        checked,
        satisfied,
    };
    tracing::debug!("Probe verdict for '{}': {}", config.name, verdict);
    verdict
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Scripted client recording which privilege sets were asked for
    #[derive(Debug, Default)]
    pub(crate) struct ScriptedTool {
        pub db_ok: bool,
        pub host_ok: bool,
        pub list_ok: bool,
        pub tables: Vec<String>,
        pub granted: Vec<&'static str>,
        pub checked: Vec<Vec<String>>,
    }

    impl DbTool for ScriptedTool {
        fn connect_to_db(&mut self, _config: &DbResourceConfig) -> Result<(), ProbeError> {
            if self.db_ok {
                Ok(())
            } else {
                Err(ProbeError::Connection("access denied".into()))
            }
        }

        fn connect_to_host(&mut self, _config: &DbResourceConfig) -> Result<(), ProbeError> {
            if self.host_ok {
                Ok(())
            } else {
                Err(ProbeError::Connection("no route to host".into()))
            }
        }

        fn list_tables(&mut self) -> Result<Vec<String>, ProbeError> {
            if self.list_ok {
                Ok(self.tables.clone())
            } else {
                Err(ProbeError::Query("permission denied".into()))
            }
        }

        fn check_privileges(&mut self, privileges: &[&str], _tables: &[&str]) -> bool {
            self.checked
                .push(privileges.iter().map(|p| p.to_string()).collect());
            privileges
                .iter()
                .all(|p| self.granted.iter().any(|g| g == p))
        }
    }

    fn resource() -> DbResourceConfig {
        DbResourceConfig {
            name: "icingaweb_db".into(),
            host: "localhost".into(),
            dbname: "icingaweb".into(),
            username: "icingaweb".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_existing_schema_checks_usage_privileges() {
        let mut tool = ScriptedTool {
            db_ok: true,
            list_ok: true,
            tables: vec!["icingaweb_group".into(), "icingaweb_user".into()],
            granted: USAGE_PRIVILEGES.to_vec(),
            ..Default::default()
        };
        let verdict = probe(&mut tool, &resource());
        assert_eq!(verdict.checked, Some(PrivilegeSet::Usage));
        assert!(verdict.should_skip());
        assert_eq!(tool.checked.len(), 1);
        assert!(tool.checked[0].contains(&"SELECT".to_string()));
    }

    #[test]
    fn test_missing_schema_checks_setup_privileges() {
        let mut tool = ScriptedTool {
            db_ok: true,
            list_ok: true,
            tables: vec![],
            granted: USAGE_PRIVILEGES.to_vec(),
            ..Default::default()
        };
        let verdict = probe(&mut tool, &resource());
        assert_eq!(verdict.checked, Some(PrivilegeSet::Setup));
        assert!(!verdict.should_skip());
    }

    #[test]
    fn test_host_only_checks_setup_privileges() {
        let mut tool = ScriptedTool {
            host_ok: true,
            granted: SETUP_PRIVILEGES.to_vec(),
            ..Default::default()
        };
        let verdict = probe(&mut tool, &resource());
        assert_eq!(verdict.connection, Connection::HostOnly);
        assert_eq!(verdict.checked, Some(PrivilegeSet::Setup));
        assert!(verdict.should_skip());
    }

    #[test]
    fn test_failed_listing_falls_back_to_host() {
        let mut tool = ScriptedTool {
            db_ok: true,
            list_ok: false,
            host_ok: true,
            ..Default::default()
        };
        let verdict = probe(&mut tool, &resource());
        assert_eq!(verdict.connection, Connection::HostOnly);
    }

    #[test]
    fn test_unreachable_never_skips() {
        let mut tool = ScriptedTool {
            granted: SETUP_PRIVILEGES.to_vec(),
            ..Default::default()
        };
        let verdict = probe(&mut tool, &resource());
        assert_eq!(verdict.connection, Connection::Unreachable);
        assert_eq!(verdict.checked, None);
        assert!(!verdict.should_skip());
        assert!(tool.checked.is_empty());
    }
}
