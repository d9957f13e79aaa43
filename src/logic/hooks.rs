//! Per-page hooks of the setup wizard.
//!
//! Every page may contribute up to four decisions, dispatched through a table
//! keyed by [`PageId`]:
//!
//! | Hook             | Called                               | May write answers |
//! |------------------|--------------------------------------|-------------------|
//! | `configure`      | once, for the page about to be shown | no                |
//! | `skip`           | for every page visited while resolving | no (the resolver prunes) |
//! | `validate`       | on submission, before storing        | no                |
//! | `invalidated_by` | on forward submission, before storing | no (the wizard prunes) |
//!
//! Pages without special behavior fall back to [`StaticPage`].

use crate::answers::{AnswerSet, PageRecord};
use crate::config::SetupConfig;
use crate::engine::plan;
use crate::error::Result;
use crate::extension::ExtensionRegistry;
use crate::logic::probe::{self, DbTool, SETUP_PRIVILEGES, USAGE_PRIVILEGES};
use crate::pages::PageId;
use crate::requirements::{Environment, RequirementReport};
use crate::types::*;
use serde::Serialize;
use std::collections::BTreeMap;

/// Product name shown on the summary page
pub const SUBJECT_TITLE: &str = "Icinga Web 2";

// ============================================================================
// Hook Inputs and Outputs
// ============================================================================

/// Read-only view handed to `configure` and `validate`
#[derive(Debug, Clone, Copy)]
pub struct HookContext<'a> {
    pub answers: &'a AnswerSet,
    pub config: &'a SetupConfig,
    pub environment: &'a Environment,
    pub extensions: &'a ExtensionRegistry,
}

/// Input of a skip decision; the probe client is only used by the database
/// creation page.
pub struct SkipContext<'a> {
    pub answers: &'a AnswerSet,
    pub db_tool: &'a mut dyn DbTool,
}

/// A resource record owning the user accounts of the chosen backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ResourceRef {
    Db(DbResourceConfig),
    Ldap(LdapResourceConfig),
}

impl ResourceRef {
    pub fn name(&self) -> &str {
        match self {
            Self::Db(resource) => &resource.name,
            Self::Ldap(resource) => &resource.name,
        }
    }
}

/// Cross-page data injected into a page before it is displayed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "page_context", rename_all = "snake_case")]
pub enum PageContext {
    None,
    Requirements {
        report: RequirementReport,
    },
    PreferencesType {
        show_database_note: bool,
    },
    DbResource {
        /// Name already claimed by the LDAP resource
        reserved_name: Option<String>,
    },
    LdapDiscoveryConfirm {
        discovery: Option<LdapDiscoveryData>,
    },
    LdapResource {
        /// Name already claimed by the database resource
        reserved_name: Option<String>,
        suggestion: Option<LdapResourceConfig>,
    },
    AuthBackend {
        auth_type: Option<AuthType>,
        resource: Option<ResourceRef>,
        suggestion: Option<AuthBackendConfig>,
    },
    AdminAccount {
        backend: Option<AuthBackendConfig>,
        resource: Option<ResourceRef>,
    },
    DatabaseCreation {
        setup_privileges: Vec<String>,
        usage_privileges: Vec<String>,
        resource: Option<DbResourceConfig>,
    },
    Modules {
        available: Vec<String>,
        selected: Vec<String>,
    },
    Summary {
        subject: String,
        summary: Vec<String>,
    },
}

// ============================================================================
// Hook Trait
// ============================================================================

/// Behavior attached to one page. Every method has a neutral default.
pub trait PageHook {
    /// Data the page needs from earlier answers
    fn configure(&self, _ctx: &HookContext<'_>) -> Result<PageContext> {
        Ok(PageContext::None)
    }

    /// Returns true if the page must not be shown
    fn skip(&self, _ctx: &mut SkipContext<'_>) -> bool {
        false
    }

    /// User-facing error messages for a submitted record; empty means valid
    fn validate(&self, _ctx: &HookContext<'_>, _record: &PageRecord) -> Vec<String> {
        Vec::new()
    }

    /// Pages whose answers a forward submission of `record` makes stale
    fn invalidated_by(&self, _answers: &AnswerSet, _record: &PageRecord) -> Vec<PageId> {
        Vec::new()
    }
}

/// Page without cross-page behavior
#[derive(Debug, Default)]
pub struct StaticPage;

impl PageHook for StaticPage {}

// ============================================================================
// Shared Helpers
// ============================================================================

/// Requirements of the platform plus those of the selected extensions
pub fn collect_requirements(ctx: &HookContext<'_>) -> RequirementReport {
    let mut report = ctx.environment.requirements();
    report.merge(ctx.extensions.requirements(ctx.answers));
    report
}

/// The resource the chosen authentication type stores its users in
pub fn owning_resource(answers: &AnswerSet) -> Option<ResourceRef> {
    match answers.auth_type()? {
        AuthType::Db => answers.db_resource().cloned().map(ResourceRef::Db),
        AuthType::Ldap => answers.ldap_resource().cloned().map(ResourceRef::Ldap),
        AuthType::External => None,
    }
}

fn duplicate_name_error(owner: &str) -> String {
    format!(
        "The given resource name must be unique and is already in use by the {} resource",
        owner
    )
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

// ============================================================================
// Page Hooks
// ============================================================================

/// `setup_requirements`: blocks while a mandatory requirement fails
#[derive(Debug, Default)]
pub struct RequirementsPage;

impl PageHook for RequirementsPage {
    fn configure(&self, ctx: &HookContext<'_>) -> Result<PageContext> {
        Ok(PageContext::Requirements {
            report: collect_requirements(ctx),
        })
    }

    fn validate(&self, ctx: &HookContext<'_>, _record: &PageRecord) -> Vec<String> {
        collect_requirements(ctx)
            .iter()
            .filter(|r| r.is_blocking())
            .map(|r| format!("{}: {}", r.title, r.message))
            .collect()
    }
}

/// `setup_authentication_type`: a changed type invalidates the backend and
/// the administrator account
#[derive(Debug, Default)]
pub struct AuthenticationTypePage;

impl PageHook for AuthenticationTypePage {
    fn invalidated_by(&self, answers: &AnswerSet, record: &PageRecord) -> Vec<PageId> {
        let PageRecord::AuthenticationType(submitted) = record else {
            return Vec::new();
        };
        match answers.auth_type() {
            Some(previous) if previous != submitted.auth_type => {
                vec![PageId::AdminAccount, PageId::AuthBackend]
            }
            _ => Vec::new(),
        }
    }
}

/// `setup_preferences_type`
#[derive(Debug, Default)]
pub struct PreferencesTypePage;

impl PageHook for PreferencesTypePage {
    fn configure(&self, ctx: &HookContext<'_>) -> Result<PageContext> {
        Ok(PageContext::PreferencesType {
            show_database_note: ctx.answers.auth_type() == Some(AuthType::Db),
        })
    }
}

/// `setup_db_resource`
#[derive(Debug, Default)]
pub struct DbResourcePage;

impl PageHook for DbResourcePage {
    fn configure(&self, ctx: &HookContext<'_>) -> Result<PageContext> {
        Ok(PageContext::DbResource {
            reserved_name: ctx.answers.ldap_resource().map(|r| r.name.clone()),
        })
    }

    fn skip(&self, ctx: &mut SkipContext<'_>) -> bool {
        ctx.answers.preferences_kind() != Some(PreferencesType::Db)
            && ctx.answers.auth_type() != Some(AuthType::Db)
    }

    fn validate(&self, ctx: &HookContext<'_>, record: &PageRecord) -> Vec<String> {
        match (record, ctx.answers.ldap_resource()) {
            (PageRecord::DbResource(db), Some(ldap)) if db.name == ldap.name => {
                vec![duplicate_name_error("LDAP")]
            }
            _ => Vec::new(),
        }
    }
}

/// `setup_ldap_discovery`
#[derive(Debug, Default)]
pub struct LdapDiscoveryPage;

impl PageHook for LdapDiscoveryPage {
    fn skip(&self, ctx: &mut SkipContext<'_>) -> bool {
        ctx.answers.auth_type() != Some(AuthType::Ldap)
    }
}

/// `setup_ldap_discovery_confirm`: only after a discovery was made
#[derive(Debug, Default)]
pub struct LdapDiscoveryConfirmPage;

impl PageHook for LdapDiscoveryConfirmPage {
    fn configure(&self, ctx: &HookContext<'_>) -> Result<PageContext> {
        Ok(PageContext::LdapDiscoveryConfirm {
            discovery: ctx.answers.ldap_discovery().cloned(),
        })
    }

    fn skip(&self, ctx: &mut SkipContext<'_>) -> bool {
        !ctx.answers.has(PageId::LdapDiscovery)
    }
}

/// `setup_ldap_resource`: shown under the same condition as the discovery
#[derive(Debug, Default)]
pub struct LdapResourcePage;

impl PageHook for LdapResourcePage {
    fn configure(&self, ctx: &HookContext<'_>) -> Result<PageContext> {
        Ok(PageContext::LdapResource {
            reserved_name: ctx.answers.db_resource().map(|r| r.name.clone()),
            suggestion: ctx
                .answers
                .ldap_discovery_confirm()
                .and_then(|c| c.resource.clone()),
        })
    }

    fn skip(&self, ctx: &mut SkipContext<'_>) -> bool {
        LdapDiscoveryPage.skip(ctx)
    }

    fn validate(&self, ctx: &HookContext<'_>, record: &PageRecord) -> Vec<String> {
        match (record, ctx.answers.db_resource()) {
            (PageRecord::LdapResource(ldap), Some(db)) if ldap.name == db.name => {
                vec![duplicate_name_error("database")]
            }
            _ => Vec::new(),
        }
    }
}

/// `setup_authentication_backend`
#[derive(Debug, Default)]
pub struct AuthBackendPage;

impl PageHook for AuthBackendPage {
    fn configure(&self, ctx: &HookContext<'_>) -> Result<PageContext> {
        let auth_type = ctx.answers.auth_type();
        let suggestion = ctx
            .answers
            .ldap_discovery_confirm()
            .filter(|_| auth_type == Some(AuthType::Ldap))
            .and_then(|c| c.backend.clone());
        Ok(PageContext::AuthBackend {
            auth_type,
            resource: owning_resource(ctx.answers),
            suggestion,
        })
    }
}

/// `setup_admin_account`
#[derive(Debug, Default)]
pub struct AdminAccountPage;

impl PageHook for AdminAccountPage {
    fn configure(&self, ctx: &HookContext<'_>) -> Result<PageContext> {
        Ok(PageContext::AdminAccount {
            backend: ctx.answers.auth_backend().cloned(),
            resource: owning_resource(ctx.answers),
        })
    }

    fn validate(&self, _ctx: &HookContext<'_>, record: &PageRecord) -> Vec<String> {
        match record {
            PageRecord::AdminAccount(account) if account.username().is_none() => {
                vec![format!("An account name is required for user type {}", account.user_type)]
            }
            _ => Vec::new(),
        }
    }
}

/// `setup_general_config`
#[derive(Debug, Default)]
pub struct GeneralConfigPage;

impl PageHook for GeneralConfigPage {
    fn validate(&self, _ctx: &HookContext<'_>, record: &PageRecord) -> Vec<String> {
        let PageRecord::GeneralConfig(general) = record else {
            return Vec::new();
        };
        let logging = &general.logging;
        let has_file = logging.file.as_deref().is_some_and(|f| !f.as_os_str().is_empty());
        if logging.log_type == LogType::File && !has_file {
            vec!["A log file path is required when logging to a file".to_string()]
        } else {
            Vec::new()
        }
    }
}

/// `setup_database_creation`: asks for privileged credentials unless the
/// probe shows the resource credentials suffice
#[derive(Debug, Default)]
pub struct DatabaseCreationPage;

impl PageHook for DatabaseCreationPage {
    fn configure(&self, ctx: &HookContext<'_>) -> Result<PageContext> {
        Ok(PageContext::DatabaseCreation {
            setup_privileges: owned(SETUP_PRIVILEGES),
            usage_privileges: owned(USAGE_PRIVILEGES),
            resource: ctx.answers.db_resource().cloned(),
        })
    }

    fn skip(&self, ctx: &mut SkipContext<'_>) -> bool {
        let Some(resource) = ctx.answers.db_resource() else {
            return true;
        };
        if resource.skip_validation {
            return true;
        }
        let verdict = probe::probe(ctx.db_tool, resource);
        tracing::info!("Database creation page probe: {}", verdict);
        verdict.should_skip()
    }
}

/// `setup_modules`
#[derive(Debug, Default)]
pub struct ModulesPage;

impl PageHook for ModulesPage {
    fn configure(&self, ctx: &HookContext<'_>) -> Result<PageContext> {
        Ok(PageContext::Modules {
            available: ctx.extensions.names().into_iter().map(String::from).collect(),
            selected: ctx
                .answers
                .modules()
                .map(|m| m.selected.clone())
                .unwrap_or_default(),
        })
    }

    fn validate(&self, ctx: &HookContext<'_>, record: &PageRecord) -> Vec<String> {
        let PageRecord::Modules(modules) = record else {
            return Vec::new();
        };
        let available = ctx.extensions.names();
        modules
            .selected
            .iter()
            .filter(|name| !available.contains(&name.as_str()))
            .map(|name| format!("Unknown module: {}", name))
            .collect()
    }
}

/// `setup_summary`: shows what the installer will do
#[derive(Debug, Default)]
pub struct SummaryPage;

impl PageHook for SummaryPage {
    fn configure(&self, ctx: &HookContext<'_>) -> Result<PageContext> {
        let plan = plan::compile(ctx.answers, ctx.config, ctx.extensions)?;
        Ok(PageContext::Summary {
            subject: SUBJECT_TITLE.to_string(),
            summary: plan.summary(),
        })
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Dispatch table from page to hook
pub struct PageRegistry {
    hooks: BTreeMap<PageId, Box<dyn PageHook>>,
    fallback: StaticPage,
}

impl std::fmt::Debug for PageRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.hooks.keys()).finish()
    }
}

impl Default for PageRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl PageRegistry {
    /// Registry without any hooks; every page behaves like a static page
    pub fn empty() -> Self {
        Self {
            hooks: BTreeMap::new(),
            fallback: StaticPage,
        }
    }

    /// Registry with the hooks of every built-in page
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry.replace(PageId::Requirements, Box::new(RequirementsPage));
        registry.replace(PageId::AuthenticationType, Box::new(AuthenticationTypePage));
        registry.replace(PageId::PreferencesType, Box::new(PreferencesTypePage));
        registry.replace(PageId::DbResource, Box::new(DbResourcePage));
        registry.replace(PageId::LdapDiscovery, Box::new(LdapDiscoveryPage));
        registry.replace(PageId::LdapDiscoveryConfirm, Box::new(LdapDiscoveryConfirmPage));
        registry.replace(PageId::LdapResource, Box::new(LdapResourcePage));
        registry.replace(PageId::AuthBackend, Box::new(AuthBackendPage));
        registry.replace(PageId::AdminAccount, Box::new(AdminAccountPage));
        registry.replace(PageId::GeneralConfig, Box::new(GeneralConfigPage));
        registry.replace(PageId::DatabaseCreation, Box::new(DatabaseCreationPage));
        registry.replace(PageId::Modules, Box::new(ModulesPage));
        registry.replace(PageId::Summary, Box::new(SummaryPage));
        registry
    }

    /// Install `hook` for `page`, returning the one it replaces
    pub fn replace(&mut self, page: PageId, hook: Box<dyn PageHook>) -> Option<Box<dyn PageHook>> {
        self.hooks.insert(page, hook)
    }

    /// Hook of the given page
    pub fn hook(&self, page: PageId) -> &dyn PageHook {
        match self.hooks.get(&page) {
            Some(hook) => hook.as_ref(),
            None => &self.fallback,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
