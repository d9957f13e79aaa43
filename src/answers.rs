//! Page data store
//!
//! `AnswerSet` holds the record each page submitted, keyed by `PageId`.
//! A missing record is a normal state, not an error: it means the page was
//! never shown, was skipped, or was invalidated by an upstream change.
//!
//! The JSON form is an object keyed by page identifier:
//!
//! ```json
//! {
//!   "setup_authentication_type": { "type": "db" },
//!   "setup_db_resource": { "name": "icingaweb_db", "db": "mysql", ... }
//! }
//! ```

use crate::error::{Result, SetupError};
use crate::pages::PageId;
use crate::types::*;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// One page's submitted record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageRecord {
    Welcome(EmptyData),
    Requirements(EmptyData),
    AuthenticationType(AuthenticationTypeData),
    PreferencesType(PreferencesTypeData),
    DbResource(DbResourceConfig),
    LdapDiscovery(LdapDiscoveryData),
    LdapDiscoveryConfirm(LdapDiscoveryConfirmData),
    LdapResource(LdapResourceConfig),
    AuthBackend(AuthBackendConfig),
    AdminAccount(AdminAccountData),
    GeneralConfig(GeneralConfigData),
    DatabaseCreation(DatabaseCreationData),
    Modules(ModulesData),
    Summary(EmptyData),
}

impl PageRecord {
    /// Page this record belongs to
    pub fn page(&self) -> PageId {
        match self {
            Self::Welcome(_) => PageId::Welcome,
            Self::Requirements(_) => PageId::Requirements,
            Self::AuthenticationType(_) => PageId::AuthenticationType,
            Self::PreferencesType(_) => PageId::PreferencesType,
            Self::DbResource(_) => PageId::DbResource,
            Self::LdapDiscovery(_) => PageId::LdapDiscovery,
            Self::LdapDiscoveryConfirm(_) => PageId::LdapDiscoveryConfirm,
            Self::LdapResource(_) => PageId::LdapResource,
            Self::AuthBackend(_) => PageId::AuthBackend,
            Self::AdminAccount(_) => PageId::AdminAccount,
            Self::GeneralConfig(_) => PageId::GeneralConfig,
            Self::DatabaseCreation(_) => PageId::DatabaseCreation,
            Self::Modules(_) => PageId::Modules,
            Self::Summary(_) => PageId::Summary,
        }
    }

    /// Parse the JSON form of a record for the given page.
    pub fn from_json(page: PageId, value: Value) -> Result<Self> {
        Ok(match page {
            PageId::Welcome => Self::Welcome(serde_json::from_value(value)?),
            PageId::Requirements => Self::Requirements(serde_json::from_value(value)?),
            PageId::AuthenticationType => Self::AuthenticationType(serde_json::from_value(value)?),
            PageId::PreferencesType => Self::PreferencesType(serde_json::from_value(value)?),
            PageId::DbResource => Self::DbResource(serde_json::from_value(value)?),
            PageId::LdapDiscovery => Self::LdapDiscovery(serde_json::from_value(value)?),
            PageId::LdapDiscoveryConfirm => {
                Self::LdapDiscoveryConfirm(serde_json::from_value(value)?)
            }
            PageId::LdapResource => Self::LdapResource(serde_json::from_value(value)?),
            PageId::AuthBackend => Self::AuthBackend(serde_json::from_value(value)?),
            PageId::AdminAccount => Self::AdminAccount(serde_json::from_value(value)?),
            PageId::GeneralConfig => Self::GeneralConfig(serde_json::from_value(value)?),
            PageId::DatabaseCreation => Self::DatabaseCreation(serde_json::from_value(value)?),
            PageId::Modules => Self::Modules(serde_json::from_value(value)?),
            PageId::Summary => Self::Summary(serde_json::from_value(value)?),
        })
    }

    /// JSON form of the record, without the page key.
    pub fn to_json(&self) -> Result<Value> {
        let value = match self {
            Self::Welcome(data) | Self::Requirements(data) | Self::Summary(data) => {
                serde_json::to_value(data)?
            }
            Self::AuthenticationType(data) => serde_json::to_value(data)?,
            Self::PreferencesType(data) => serde_json::to_value(data)?,
            Self::DbResource(data) => serde_json::to_value(data)?,
            Self::LdapDiscovery(data) => serde_json::to_value(data)?,
            Self::LdapDiscoveryConfirm(data) => serde_json::to_value(data)?,
            Self::LdapResource(data) => serde_json::to_value(data)?,
            Self::AuthBackend(data) => serde_json::to_value(data)?,
            Self::AdminAccount(data) => serde_json::to_value(data)?,
            Self::GeneralConfig(data) => serde_json::to_value(data)?,
            Self::DatabaseCreation(data) => serde_json::to_value(data)?,
            Self::Modules(data) => serde_json::to_value(data)?,
        };
        Ok(value)
    }
}

/// Generates a typed getter returning the record of one page.
macro_rules! record_getter {
    ($(#[$doc:meta])* $name:ident, $variant:ident, $ty:ty) => {
        $(#[$doc])*
        pub fn $name(&self) -> Option<&$ty> {
            match self.records.get(&PageId::$variant) {
                Some(PageRecord::$variant(data)) => Some(data),
                _ => None,
            }
        }
    };
}

/// Accumulated answers of one wizard session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerSet {
    records: BTreeMap<PageId, PageRecord>,
}

impl AnswerSet {
    /// Create an empty answer set
    pub fn new() -> Self {
        Self::default()
    }

    /// Record of the given page, if any
    pub fn get(&self, page: PageId) -> Option<&PageRecord> {
        self.records.get(&page)
    }

    /// Store a page's record, replacing any previous one (no merge).
    ///
    /// # Errors
    ///
    /// `SetupError::State` if the record belongs to a different page.
    pub fn set(&mut self, page: PageId, record: PageRecord) -> Result<()> {
        if record.page() != page {
            return Err(SetupError::state(format!(
                "record for {} cannot be stored under {}",
                record.page(),
                page
            )));
        }
        self.records.insert(page, record);
        Ok(())
    }

    /// Store a record under its own page.
    pub fn insert(&mut self, record: PageRecord) {
        self.records.insert(record.page(), record);
    }

    /// Returns true if the page has a record
    #[inline]
    pub fn has(&self, page: PageId) -> bool {
        self.records.contains_key(&page)
    }

    /// Drop a page's record. Other pages are untouched.
    pub fn remove(&mut self, page: PageId) -> Option<PageRecord> {
        self.records.remove(&page)
    }

    /// Drop several records as one mutation.
    ///
    /// Returns the pages that actually had a record.
    pub fn remove_keys(&mut self, pages: &[PageId]) -> Vec<PageId> {
        pages
            .iter()
            .filter(|page| self.records.remove(*page).is_some())
            .copied()
            .collect()
    }

    /// Drop every record
    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Pages that currently hold a record, in page order
    pub fn pages(&self) -> impl Iterator<Item = PageId> + '_ {
        self.records.keys().copied()
    }

    /// Number of recorded pages
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if nothing was recorded yet
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    record_getter!(
        /// Chosen authentication type record
        authentication_type, AuthenticationType, AuthenticationTypeData
    );
    record_getter!(
        /// Chosen preferences store record
        preferences_type, PreferencesType, PreferencesTypeData
    );
    record_getter!(db_resource, DbResource, DbResourceConfig);
    record_getter!(ldap_discovery, LdapDiscovery, LdapDiscoveryData);
    record_getter!(ldap_discovery_confirm, LdapDiscoveryConfirm, LdapDiscoveryConfirmData);
    record_getter!(ldap_resource, LdapResource, LdapResourceConfig);
    record_getter!(auth_backend, AuthBackend, AuthBackendConfig);
    record_getter!(admin_account, AdminAccount, AdminAccountData);
    record_getter!(general_config, GeneralConfig, GeneralConfigData);
    record_getter!(database_creation, DatabaseCreation, DatabaseCreationData);
    record_getter!(modules, Modules, ModulesData);

    /// Authentication type, if the page was answered
    pub fn auth_type(&self) -> Option<AuthType> {
        self.authentication_type().map(|data| data.auth_type)
    }

    /// Preferences store type, if the page was answered
    pub fn preferences_kind(&self) -> Option<PreferencesType> {
        self.preferences_type().map(|data| data.preferences_type)
    }

    /// Load an answer set from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        use anyhow::Context;

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read answers from {:?}", path.as_ref()))?;
        let answers: Self =
            serde_json::from_str(&content).context("Failed to parse answers JSON")?;
        Ok(answers)
    }
}

impl Serialize for AnswerSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.records.len()))?;
        for (page, record) in &self.records {
            let value = record.to_json().map_err(serde::ser::Error::custom)?;
            map.serialize_entry(page, &value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for AnswerSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = BTreeMap::<PageId, Value>::deserialize(deserializer)?;
        let mut answers = AnswerSet::new();
        for (page, value) in raw {
            let record = PageRecord::from_json(page, value)
                .map_err(|e| serde::de::Error::custom(format!("{}: {}", page, e)))?;
            answers.insert(record);
        }
        Ok(answers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth(auth_type: AuthType) -> PageRecord {
        PageRecord::AuthenticationType(AuthenticationTypeData { auth_type })
    }

    #[test]
    fn test_absent_is_not_an_error() {
        let answers = AnswerSet::new();
        assert!(answers.get(PageId::DbResource).is_none());
        assert!(!answers.has(PageId::DbResource));
        assert!(answers.db_resource().is_none());
        assert!(answers.auth_type().is_none());
    }

    #[test]
    fn test_set_overwrites() {
        let mut answers = AnswerSet::new();
        answers.set(PageId::AuthenticationType, auth(AuthType::Db)).unwrap();
        answers.set(PageId::AuthenticationType, auth(AuthType::Ldap)).unwrap();
        assert_eq!(answers.auth_type(), Some(AuthType::Ldap));
        assert_eq!(answers.len(), 1);
    }

    #[test]
    fn test_set_rejects_foreign_record() {
        let mut answers = AnswerSet::new();
        let err = answers.set(PageId::DbResource, auth(AuthType::Db)).unwrap_err();
        assert!(matches!(err, SetupError::State(_)));
        assert!(answers.is_empty());
    }

    #[test]
    fn test_remove_leaves_other_pages() {
        let mut answers = AnswerSet::new();
        answers.insert(auth(AuthType::Db));
        answers.insert(PageRecord::Modules(ModulesData::default()));
        assert!(answers.remove(PageId::Modules).is_some());
        assert!(answers.has(PageId::AuthenticationType));
        assert!(!answers.has(PageId::Modules));
    }

    #[test]
    fn test_remove_keys_reports_removed_pages() {
        let mut answers = AnswerSet::new();
        answers.insert(auth(AuthType::Db));
        answers.insert(PageRecord::AuthBackend(AuthBackendConfig::default()));
        let removed = answers.remove_keys(&[PageId::AdminAccount, PageId::AuthBackend]);
        assert_eq!(removed, vec![PageId::AuthBackend]);
        assert_eq!(answers.pages().collect::<Vec<_>>(), vec![PageId::AuthenticationType]);
    }

    #[test]
    fn test_json_keyed_by_page_identifier() {
        let json = r#"{
            "setup_authentication_type": { "type": "ldap" },
            "setup_ldap_discovery": { "domain": "example.com" },
            "setup_welcome": {}
        }"#;
        let answers: AnswerSet = serde_json::from_str(json).unwrap();
        assert_eq!(answers.auth_type(), Some(AuthType::Ldap));
        assert_eq!(answers.ldap_discovery().unwrap().domain, "example.com");
        assert!(answers.has(PageId::Welcome));

        let value = serde_json::to_value(&answers).unwrap();
        assert_eq!(value["setup_authentication_type"]["type"], "ldap");
    }

    #[test]
    fn test_json_rejects_malformed_record() {
        let json = r#"{ "setup_authentication_type": { "type": "kerberos" } }"#;
        let err = serde_json::from_str::<AnswerSet>(json).unwrap_err();
        assert!(err.to_string().contains("setup_authentication_type"));
    }
}
