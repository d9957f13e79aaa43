//! Type-safe answer records for the wizard pages
//!
//! Every page submits one record. Choice fields use proper Rust enums instead
//! of strings so that a typo in an answers file fails at parse time instead of
//! silently changing which pages are shown.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use strum::{Display, EnumIter, EnumString};

/// Authentication type chosen on `setup_authentication_type`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[serde(rename_all = "lowercase")]
pub enum AuthType {
    #[default]
    #[strum(serialize = "db")]
    Db,
    #[strum(serialize = "ldap")]
    Ldap,
    #[strum(serialize = "external")]
    External,
}

/// Preferences store chosen on `setup_preferences_type`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[serde(rename_all = "lowercase")]
pub enum PreferencesType {
    #[default]
    #[strum(serialize = "ini")]
    Ini,
    #[strum(serialize = "db")]
    Db,
    #[strum(serialize = "none")]
    None,
}

/// Database flavour of the storage resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[serde(rename_all = "lowercase")]
pub enum DbType {
    #[default]
    #[strum(serialize = "mysql")]
    Mysql,
    #[strum(serialize = "pgsql")]
    Pgsql,
}

impl DbType {
    /// Default server port for this database flavour
    pub const fn default_port(self) -> u16 {
        match self {
            Self::Mysql => 3306,
            Self::Pgsql => 5432,
        }
    }
}

/// Which kind of administrative account the user picked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[serde(rename_all = "snake_case")]
pub enum AdminUserType {
    #[default]
    #[strum(serialize = "by_name")]
    ByName,
    #[strum(serialize = "existing_user")]
    ExistingUser,
    #[strum(serialize = "new_user")]
    NewUser,
}

/// Application log target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[serde(rename_all = "lowercase")]
pub enum LogType {
    #[default]
    #[strum(serialize = "syslog")]
    Syslog,
    #[strum(serialize = "file")]
    File,
    #[strum(serialize = "none")]
    None,
}

/// Unix permission bits applied to every path the installer creates.
///
/// Serialized as the octal string users type into the form (e.g. `"2770"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FileMode(u32);

impl FileMode {
    /// Highest value accepted (setuid/setgid/sticky plus rwx for all)
    const MAX: u32 = 0o7777;

    /// Create a mode from raw permission bits.
    pub fn new(bits: u32) -> Option<Self> {
        (bits <= Self::MAX).then_some(Self(bits))
    }

    /// Raw permission bits
    #[inline]
    pub const fn bits(self) -> u32 {
        self.0
    }
}

impl Default for FileMode {
    fn default() -> Self {
        Self(0o2770)
    }
}

impl fmt::Display for FileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04o}", self.0)
    }
}

impl FromStr for FileMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bits = u32::from_str_radix(s.trim(), 8)
            .map_err(|e| format!("invalid octal file mode '{}': {}", s, e))?;
        Self::new(bits).ok_or_else(|| format!("file mode '{}' is out of range", s))
    }
}

impl TryFrom<String> for FileMode {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FileMode> for String {
    fn from(mode: FileMode) -> Self {
        mode.to_string()
    }
}

// ============================================================================
// Page Records
// ============================================================================

/// `setup_authentication_type`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AuthenticationTypeData {
    #[serde(rename = "type")]
    pub auth_type: AuthType,
}

/// `setup_preferences_type`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PreferencesTypeData {
    #[serde(rename = "type")]
    pub preferences_type: PreferencesType,
}

/// `setup_db_resource`: connection parameters of the storage resource
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DbResourceConfig {
    pub name: String,
    pub db: DbType,
    pub host: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    pub dbname: String,
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Wizard-only flag, never persisted with the resource
    #[serde(default)]
    pub skip_validation: bool,
}

impl DbResourceConfig {
    /// Configured port or the flavour's default
    pub fn effective_port(&self) -> u16 {
        self.port.unwrap_or_else(|| self.db.default_port())
    }
}

/// `setup_ldap_discovery`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LdapDiscoveryData {
    pub domain: String,
}

/// `setup_ldap_resource`: connection parameters of the directory service
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LdapResourceConfig {
    pub name: String,
    pub hostname: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    pub root_dn: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind_dn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind_pw: Option<String>,
    /// Wizard-only flag, never persisted with the resource
    #[serde(default)]
    pub skip_validation: bool,
}

/// `setup_ldap_discovery_confirm`: the discovery suggestions the user accepted
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LdapDiscoveryConfirmData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<LdapResourceConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<AuthBackendConfig>,
}

/// `setup_authentication_backend`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AuthBackendConfig {
    pub name: String,
    pub backend: AuthType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name_attribute: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_dn: Option<String>,
}

/// `setup_admin_account`
///
/// The account name lives in the field named after `user_type`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AdminAccountData {
    pub user_type: AdminUserType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub by_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub existing_user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_user_password: Option<String>,
}

impl AdminAccountData {
    /// Account name selected by `user_type`
    pub fn username(&self) -> Option<&str> {
        let name = match self.user_type {
            AdminUserType::ByName => &self.by_name,
            AdminUserType::ExistingUser => &self.existing_user,
            AdminUserType::NewUser => &self.new_user,
        };
        name.as_deref().filter(|n| !n.trim().is_empty())
    }
}

/// Logging section of `setup_general_config`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(rename = "type")]
    pub log_type: LogType,
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

fn default_log_level() -> String {
    "ERROR".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_type: LogType::Syslog,
            level: default_log_level(),
            application: Some("icingaweb2".to_string()),
            file: None,
        }
    }
}

/// `setup_general_config`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GeneralConfigData {
    pub global_filemode: FileMode,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// `setup_database_creation`: privileged credentials used only for provisioning
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DatabaseCreationData {
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub skip_validation: bool,
}

/// `setup_modules`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ModulesData {
    #[serde(default)]
    pub selected: Vec<String>,
}

/// Pages without form fields submit an empty record.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EmptyData {}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_auth_type_serialization() {
        assert_eq!(AuthType::Db.to_string(), "db");
        assert_eq!(AuthType::from_str("ldap").unwrap(), AuthType::Ldap);
        assert_eq!(serde_json::to_string(&AuthType::External).unwrap(), "\"external\"");
    }

    #[test]
    fn test_admin_user_type_serde_matches_strum() {
        for user_type in AdminUserType::iter() {
            let json = serde_json::to_string(&user_type).unwrap();
            assert_eq!(json, format!("\"{}\"", user_type));
        }
    }

    #[test]
    fn test_file_mode_parsing() {
        let mode: FileMode = "2770".parse().unwrap();
        assert_eq!(mode.bits(), 0o2770);
        assert_eq!(mode.to_string(), "2770");
        assert_eq!("0755".parse::<FileMode>().unwrap().to_string(), "0755");
        assert!("9999".parse::<FileMode>().is_err());
        assert!("17777".parse::<FileMode>().is_err());
    }

    #[test]
    fn test_file_mode_json() {
        let data: GeneralConfigData =
            serde_json::from_str(r#"{"global_filemode": "2770"}"#).unwrap();
        assert_eq!(data.global_filemode, FileMode::default());
        assert_eq!(data.logging.level, "ERROR");
        assert!(serde_json::from_str::<GeneralConfigData>(r#"{"global_filemode": "abc"}"#).is_err());
    }

    #[test]
    fn test_admin_username_follows_user_type() {
        let data = AdminAccountData {
            user_type: AdminUserType::NewUser,
            by_name: Some("icingaadmin".into()),
            new_user: Some("root".into()),
            ..Default::default()
        };
        assert_eq!(data.username(), Some("root"));

        let blank = AdminAccountData {
            user_type: AdminUserType::ExistingUser,
            existing_user: Some("  ".into()),
            ..Default::default()
        };
        assert_eq!(blank.username(), None);
    }

    #[test]
    fn test_db_resource_default_port() {
        let config = DbResourceConfig {
            db: DbType::Pgsql,
            ..Default::default()
        };
        assert_eq!(config.effective_port(), 5432);
    }
}
