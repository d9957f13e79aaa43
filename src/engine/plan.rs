//! Installation Plan Compiler
//!
//! Translates the accumulated wizard answers into an ordered sequence of
//! `Step`s that an external installer runner executes.
//!
//! # Step Order
//!
//! | # | Step              | Included when |
//! |---|-------------------|---------------|
//! | 1 | Database          | db resource configured and validation not skipped |
//! | 2 | GeneralConfig     | always |
//! | 3 | Authentication    | always |
//! | 4 | Resource          | a db or ldap resource is configured |
//! | 5 | MakeDir           | always |
//! | 6 | Module steps      | selected extensions that are finished, in registration order |
//!
//! Provisioning storage comes before anything configured on top of it.
//! The order is the compilation order; nothing sorts the plan afterwards.
//!
//! # Design
//!
//! - **Pure logic**: No I/O. Steps copy their parameters out of the answers,
//!   so later answer changes never reach an already compiled plan.
//! - **Deterministic**: identical answers give an identical plan.
//! - **Fail loudly**: a missing mandatory answer is a driver bug and returns
//!   `SetupError::MissingAnswer` instead of an incomplete plan.

use crate::answers::AnswerSet;
use crate::config::SetupConfig;
use crate::error::{Result, SetupError};
use crate::extension::ExtensionRegistry;
use crate::logic::probe::{DATABASE_TABLES, USAGE_PRIVILEGES};
use crate::pages::PageId;
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

// ============================================================================
// Step Types
// ============================================================================

/// Provision the storage backend: schema, tables and an operating login
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseStep {
    pub tables: Vec<String>,
    /// Privileges granted to the operating login
    pub privileges: Vec<String>,
    pub resource: DbResourceConfig,
    /// Privileged login used only while provisioning
    pub admin_name: Option<String>,
    pub admin_password: Option<String>,
}

/// Write the general configuration file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneralConfigStep {
    pub general_config: GeneralConfigData,
    pub preferences_type: PreferencesType,
    pub preferences_resource: Option<String>,
    pub file_mode: FileMode,
}

/// Initial administrator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminAccount {
    pub username: String,
    /// Only for a new account whose database was validated
    pub password: Option<String>,
    pub resource: Option<DbResourceConfig>,
}

/// Write the authentication backend and grant the administrator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticationStep {
    pub backend: AuthBackendConfig,
    /// Resource owning the user accounts
    pub resource_name: Option<String>,
    pub admin_account: AdminAccount,
    pub file_mode: FileMode,
}

/// Database resource as persisted: without wizard-only fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbResourceEntry {
    pub name: String,
    pub db: DbType,
    pub host: String,
    pub port: Option<u16>,
    pub dbname: String,
    pub username: String,
    pub password: String,
}

impl From<&DbResourceConfig> for DbResourceEntry {
    fn from(config: &DbResourceConfig) -> Self {
        Self {
            name: config.name.clone(),
            db: config.db,
            host: config.host.clone(),
            port: config.port,
            dbname: config.dbname.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
        }
    }
}

/// LDAP resource as persisted: without wizard-only fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LdapResourceEntry {
    pub name: String,
    pub hostname: String,
    pub port: Option<u16>,
    pub root_dn: String,
    pub bind_dn: Option<String>,
    pub bind_pw: Option<String>,
}

impl From<&LdapResourceConfig> for LdapResourceEntry {
    fn from(config: &LdapResourceConfig) -> Self {
        Self {
            name: config.name.clone(),
            hostname: config.hostname.clone(),
            port: config.port,
            root_dn: config.root_dn.clone(),
            bind_dn: config.bind_dn.clone(),
            bind_pw: config.bind_pw.clone(),
        }
    }
}

/// Write the resource configuration file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceStep {
    pub db_resource: Option<DbResourceEntry>,
    pub ldap_resource: Option<LdapResourceEntry>,
    pub file_mode: FileMode,
}

/// Create the configuration subdirectories
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MakeDirStep {
    pub paths: Vec<PathBuf>,
    pub file_mode: FileMode,
}

/// Step contributed by an extension; the core treats it as opaque
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleStep {
    pub module: String,
    pub action: String,
    pub params: serde_json::Value,
}

/// A single unit of deferred installation work
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "params", rename_all = "snake_case")]
pub enum Step {
    Database(DatabaseStep),
    GeneralConfig(GeneralConfigStep),
    Authentication(AuthenticationStep),
    Resource(ResourceStep),
    MakeDir(MakeDirStep),
    Module(ModuleStep),
}

impl Step {
    /// Short tag of the step kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Database(_) => "database",
            Self::GeneralConfig(_) => "general_config",
            Self::Authentication(_) => "authentication",
            Self::Resource(_) => "resource",
            Self::MakeDir(_) => "make_dir",
            Self::Module(_) => "module",
        }
    }

    /// Human-readable description for the summary page
    pub fn summary(&self) -> String {
        match self {
            Self::Database(step) => {
                let login = step.admin_name.as_deref().unwrap_or(&step.resource.username);
                format!(
                    "Database: create or update schema '{}' on {}:{} ({}) as '{}', granting {} \
                     to '{}'",
                    step.resource.dbname,
                    step.resource.host,
                    step.resource.effective_port(),
                    step.resource.db,
                    login,
                    step.privileges.join(", "),
                    step.resource.username
                )
            }
            Self::GeneralConfig(step) => {
                let prefs = match &step.preferences_resource {
                    Some(resource) => format!("{} (resource '{}')", step.preferences_type, resource),
                    None => step.preferences_type.to_string(),
                };
                format!(
                    "General configuration: preferences stored as {}, logging via {} at level \
                     {}",
                    prefs, step.general_config.logging.log_type, step.general_config.logging.level
                )
            }
            Self::Authentication(step) => {
                let resource = step
                    .resource_name
                    .as_ref()
                    .map(|r| format!(" on resource '{}'", r))
                    .unwrap_or_default();
                let account = if step.admin_account.password.is_some() {
                    "new account"
                } else {
                    "account"
                };
                format!(
                    "Authentication: backend '{}' ({}){}, administrator {} '{}'",
                    step.backend.name, step.backend.backend, resource, account,
                    step.admin_account.username
                )
            }
            Self::Resource(step) => {
                let names: Vec<&str> = step
                    .db_resource
                    .iter()
                    .map(|r| r.name.as_str())
                    .chain(step.ldap_resource.iter().map(|r| r.name.as_str()))
                    .collect();
                format!("Resources: {}", names.join(", "))
            }
            Self::MakeDir(step) => {
                let paths: Vec<String> = step.paths.iter().map(|p| p.display().to_string()).collect();
                format!("Directories: {} (mode {})", paths.join(", "), step.file_mode)
            }
            Self::Module(step) => format!("Module {}: {}", step.module, step.action),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.summary())
    }
}

/// A complete installation plan: an ordered list of steps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallationPlan {
    pub steps: Vec<Step>,
}

impl InstallationPlan {
    /// Position of the first step of the given kind
    pub fn position(&self, kind: &str) -> Option<usize> {
        self.steps.iter().position(|s| s.kind() == kind)
    }

    /// Kinds of all steps in order
    pub fn kinds(&self) -> Vec<&'static str> {
        self.steps.iter().map(Step::kind).collect()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// One line per step, for the summary page
    pub fn summary(&self) -> Vec<String> {
        self.steps.iter().map(Step::summary).collect()
    }
}

impl fmt::Display for InstallationPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Installation Plan ({} steps):", self.steps.len())?;
        for (i, step) in self.steps.iter().enumerate() {
            writeln!(f, "  {}. {}", i + 1, step)?;
        }
        Ok(())
    }
}

// ============================================================================
// Plan Compilation
// ============================================================================

/// Compile the installation plan from the wizard answers.
///
/// # Errors
///
/// `SetupError::MissingAnswer` if a mandatory page was never answered:
/// authentication type, preferences type, authentication backend, admin
/// account (with a name), general configuration, and the resource the
/// authentication type depends on.
pub fn compile(
    answers: &AnswerSet,
    config: &SetupConfig,
    extensions: &ExtensionRegistry,
) -> Result<InstallationPlan> {
    let auth_type = answers
        .auth_type()
        .ok_or_else(|| missing(PageId::AuthenticationType))?;
    let preferences_type = answers
        .preferences_kind()
        .ok_or_else(|| missing(PageId::PreferencesType))?;
    let general = answers
        .general_config()
        .ok_or_else(|| missing(PageId::GeneralConfig))?;
    let backend = answers
        .auth_backend()
        .ok_or_else(|| missing(PageId::AuthBackend))?;
    let admin = answers
        .admin_account()
        .ok_or_else(|| missing(PageId::AdminAccount))?;
    let admin_name = admin.username().ok_or_else(|| {
        SetupError::missing_answer(
            PageId::AdminAccount,
            format!("no account name given for user type {}", admin.user_type),
        )
    })?;

    let db_resource = answers.db_resource();
    let ldap_resource = answers.ldap_resource();
    let resource_name = match auth_type {
        AuthType::Db => Some(
            db_resource
                .ok_or_else(|| required_by(PageId::DbResource, auth_type))?
                .name
                .clone(),
        ),
        AuthType::Ldap => Some(
            ldap_resource
                .ok_or_else(|| required_by(PageId::LdapResource, auth_type))?
                .name
                .clone(),
        ),
        AuthType::External => None,
    };

    let file_mode = general.global_filemode;
    let validated_db = db_resource.filter(|_| !database_validation_skipped(answers));
    let mut steps = Vec::new();

    // 1. Storage provisioning
    if let Some(resource) = validated_db {
        let creation = answers.database_creation();
        steps.push(Step::Database(DatabaseStep {
            tables: DATABASE_TABLES.iter().map(|t| t.to_string()).collect(),
            privileges: USAGE_PRIVILEGES.iter().map(|p| p.to_string()).collect(),
            resource: resource.clone(),
            admin_name: creation.map(|c| c.username.clone()),
            admin_password: creation.map(|c| c.password.clone()),
        }));
    }

    // 2. General configuration
    steps.push(Step::GeneralConfig(GeneralConfigStep {
        general_config: general.clone(),
        preferences_type,
        preferences_resource: db_resource
            .filter(|_| preferences_type == PreferencesType::Db)
            .map(|r| r.name.clone()),
        file_mode,
    }));

    // 3. Authentication
    let new_account_resource = validated_db.filter(|_| admin.user_type == AdminUserType::NewUser);
    steps.push(Step::Authentication(AuthenticationStep {
        backend: backend.clone(),
        resource_name,
        admin_account: AdminAccount {
            username: admin_name.to_string(),
            password: new_account_resource.and(admin.new_user_password.clone()),
            resource: new_account_resource.cloned(),
        },
        file_mode,
    }));

    // 4. Resource persistence
    if db_resource.is_some() || ldap_resource.is_some() {
        steps.push(Step::Resource(ResourceStep {
            db_resource: db_resource.map(DbResourceEntry::from),
            ldap_resource: ldap_resource.map(LdapResourceEntry::from),
            file_mode,
        }));
    }

    // 5. Directories
    steps.push(Step::MakeDir(MakeDirStep {
        paths: config.required_directories(),
        file_mode,
    }));

    // 6. Extensions
    steps.extend(extensions.finished_steps(answers));

    let plan = InstallationPlan { steps };
    tracing::info!("Compiled installation plan: {}", plan.kinds().join(" → "));
    Ok(plan)
}

/// Returns true if the user skipped validating the storage resource, either on
/// the resource page or on the database creation page.
pub fn database_validation_skipped(answers: &AnswerSet) -> bool {
    answers.db_resource().is_some_and(|r| r.skip_validation)
        || answers.database_creation().is_some_and(|c| c.skip_validation)
}

fn missing(page: PageId) -> SetupError {
    SetupError::missing_answer(page, "page was never answered")
}

fn required_by(page: PageId, auth_type: AuthType) -> SetupError {
    SetupError::missing_answer(page, format!("required by authentication type {}", auth_type))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::answers::PageRecord;

    fn db_answers() -> AnswerSet {
        let mut answers = AnswerSet::new();
        answers.insert(PageRecord::AuthenticationType(AuthenticationTypeData {
            auth_type: AuthType::Db,
        }));
        answers.insert(PageRecord::PreferencesType(PreferencesTypeData {
            preferences_type: PreferencesType::Db,
        }));
        answers.insert(PageRecord::DbResource(DbResourceConfig {
            name: "icingaweb_db".into(),
            host: "localhost".into(),
            dbname: "icingaweb".into(),
            username: "icingaweb".into(),
            password: "secret".into(),
            ..Default::default()
        }));
        answers.insert(PageRecord::AuthBackend(AuthBackendConfig {
            name: "icingaweb2".into(),
            backend: AuthType::Db,
            ..Default::default()
        }));
        answers.insert(PageRecord::AdminAccount(AdminAccountData {
            user_type: AdminUserType::NewUser,
            new_user: Some("icingaadmin".into()),
            new_user_password: Some("hunter2".into()),
            ..Default::default()
        }));
        answers.insert(PageRecord::GeneralConfig(GeneralConfigData::default()));
        answers
    }

    fn compile_default(answers: &AnswerSet) -> Result<InstallationPlan> {
        compile(answers, &SetupConfig::default(), &ExtensionRegistry::new())
    }

    #[test]
    fn test_full_db_plan_order() {
        let plan = compile_default(&db_answers()).unwrap();
        assert_eq!(
            plan.kinds(),
            vec!["database", "general_config", "authentication", "resource", "make_dir"]
        );
    }

    #[test]
    fn test_new_admin_gets_password_when_validated() {
        let plan = compile_default(&db_answers()).unwrap();
        let Step::Authentication(auth) = &plan.steps[2] else {
            panic!("expected authentication step");
        };
        assert_eq!(auth.resource_name.as_deref(), Some("icingaweb_db"));
        assert_eq!(auth.admin_account.password.as_deref(), Some("hunter2"));
        assert!(auth.admin_account.resource.is_some());
    }

    #[test]
    fn test_skipped_validation_drops_provisioning_and_password() {
        let mut answers = db_answers();
        answers.insert(PageRecord::DatabaseCreation(DatabaseCreationData {
            username: "root".into(),
            password: "toor".into(),
            skip_validation: true,
        }));
        let plan = compile_default(&answers).unwrap();
        assert_eq!(plan.position("database"), None);
        let Step::Authentication(auth) = &plan.steps[1] else {
            panic!("expected authentication step");
        };
        assert_eq!(auth.admin_account.username, "icingaadmin");
        assert!(auth.admin_account.password.is_none());
        assert!(auth.admin_account.resource.is_none());
    }

    #[test]
    fn test_provisioning_uses_creation_credentials() {
        let mut answers = db_answers();
        answers.insert(PageRecord::DatabaseCreation(DatabaseCreationData {
            username: "root".into(),
            password: "toor".into(),
            skip_validation: false,
        }));
        let plan = compile_default(&answers).unwrap();
        let Step::Database(db) = &plan.steps[0] else {
            panic!("expected database step");
        };
        assert_eq!(db.admin_name.as_deref(), Some("root"));
        assert_eq!(db.admin_password.as_deref(), Some("toor"));
        assert_eq!(db.tables.len(), 4);
        assert!(db.privileges.contains(&"SELECT".to_string()));
    }

    #[test]
    fn test_resource_step_strips_skip_validation() {
        let mut answers = db_answers();
        if let Some(PageRecord::DbResource(mut resource)) = answers.remove(PageId::DbResource) {
            resource.skip_validation = true;
            answers.insert(PageRecord::DbResource(resource));
        }
        let plan = compile_default(&answers).unwrap();
        let index = plan.position("resource").unwrap();
        let json = serde_json::to_value(&plan.steps[index]).unwrap();
        assert_eq!(json["kind"], "resource");
        assert!(json["params"]["db_resource"].get("skip_validation").is_none());
        assert_eq!(json["params"]["db_resource"]["name"], "icingaweb_db");
    }

    #[test]
    fn test_external_auth_without_resources() {
        let mut answers = db_answers();
        answers.remove(PageId::DbResource);
        answers.insert(PageRecord::AuthenticationType(AuthenticationTypeData {
            auth_type: AuthType::External,
        }));
        answers.insert(PageRecord::PreferencesType(PreferencesTypeData {
            preferences_type: PreferencesType::Ini,
        }));
        let plan = compile_default(&answers).unwrap();
        assert_eq!(plan.kinds(), vec!["general_config", "authentication", "make_dir"]);
        let Step::Authentication(auth) = &plan.steps[1] else {
            panic!("expected authentication step");
        };
        assert_eq!(auth.resource_name, None);
        assert!(auth.admin_account.password.is_none());
    }

    #[test]
    fn test_missing_mandatory_answer_is_an_error() {
        let mut answers = db_answers();
        answers.remove(PageId::GeneralConfig);
        let err = compile_default(&answers).unwrap_err();
        assert!(matches!(
            err,
            SetupError::MissingAnswer { page: PageId::GeneralConfig, .. }
        ));
    }

    #[test]
    fn test_db_auth_requires_db_resource() {
        let mut answers = db_answers();
        answers.remove(PageId::DbResource);
        let err = compile_default(&answers).unwrap_err();
        assert!(matches!(
            err,
            SetupError::MissingAnswer { page: PageId::DbResource, .. }
        ));
    }

    #[test]
    fn test_make_dir_uses_config_dir() {
        let config = SetupConfig::new("/srv/icingaweb");
        let plan = compile(&db_answers(), &config, &ExtensionRegistry::new()).unwrap();
        let Some(Step::MakeDir(step)) = plan.steps.last() else {
            panic!("expected make_dir step last");
        };
        assert_eq!(step.paths[0], PathBuf::from("/srv/icingaweb/modules"));
        assert_eq!(step.file_mode.to_string(), "2770");
    }

    #[test]
    fn test_summary_has_one_line_per_step() {
        let plan = compile_default(&db_answers()).unwrap();
        let summary = plan.summary();
        assert_eq!(summary.len(), plan.len());
        assert!(summary[2].contains("new account 'icingaadmin'"));
    }
}
