//! Wizard pages and their fixed ordering
//!
//! The page list is fixed at compile time. Only the *visibility* of a page
//! changes at runtime, never its position.
//!
//! # Page Flow
//!
//! ```text
//! setup_welcome
//!     ↓
//! setup_requirements
//!     ↓
//! setup_authentication_type
//!     ↓
//! setup_preferences_type
//!     ↓
//! setup_db_resource            (db chosen for auth or preferences)
//!     ↓
//! setup_ldap_discovery         (ldap auth)
//!     ↓
//! setup_ldap_discovery_confirm (discovery answered)
//!     ↓
//! setup_ldap_resource          (ldap auth)
//!     ↓
//! setup_authentication_backend
//!     ↓
//! setup_admin_account
//!     ↓
//! setup_general_config
//!     ↓
//! setup_database_creation      (probe says the credentials lack privileges)
//!     ↓
//! setup_modules
//!     ↓
//! setup_summary
//! ```
//!
//! The first and last page are never skipped, which bounds every skip chain.

use serde::{Deserialize, Serialize};
use std::fmt;
use strum::{Display, EnumIter, EnumString};

/// Stable identifier of a wizard page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[repr(u8)]
pub enum PageId {
    #[strum(serialize = "setup_welcome")]
    #[serde(rename = "setup_welcome")]
    Welcome = 0,
    #[strum(serialize = "setup_requirements")]
    #[serde(rename = "setup_requirements")]
    Requirements = 1,
    #[strum(serialize = "setup_authentication_type")]
    #[serde(rename = "setup_authentication_type")]
    AuthenticationType = 2,
    #[strum(serialize = "setup_preferences_type")]
    #[serde(rename = "setup_preferences_type")]
    PreferencesType = 3,
    #[strum(serialize = "setup_db_resource")]
    #[serde(rename = "setup_db_resource")]
    DbResource = 4,
    #[strum(serialize = "setup_ldap_discovery")]
    #[serde(rename = "setup_ldap_discovery")]
    LdapDiscovery = 5,
    #[strum(serialize = "setup_ldap_discovery_confirm")]
    #[serde(rename = "setup_ldap_discovery_confirm")]
    LdapDiscoveryConfirm = 6,
    #[strum(serialize = "setup_ldap_resource")]
    #[serde(rename = "setup_ldap_resource")]
    LdapResource = 7,
    #[strum(serialize = "setup_authentication_backend")]
    #[serde(rename = "setup_authentication_backend")]
    AuthBackend = 8,
    #[strum(serialize = "setup_admin_account")]
    #[serde(rename = "setup_admin_account")]
    AdminAccount = 9,
    #[strum(serialize = "setup_general_config")]
    #[serde(rename = "setup_general_config")]
    GeneralConfig = 10,
    #[strum(serialize = "setup_database_creation")]
    #[serde(rename = "setup_database_creation")]
    DatabaseCreation = 11,
    #[strum(serialize = "setup_modules")]
    #[serde(rename = "setup_modules")]
    Modules = 12,
    #[strum(serialize = "setup_summary")]
    #[serde(rename = "setup_summary")]
    Summary = 13,
}

impl PageId {
    /// Every page in display order.
    pub const ALL: [PageId; 14] = [
        Self::Welcome,
        Self::Requirements,
        Self::AuthenticationType,
        Self::PreferencesType,
        Self::DbResource,
        Self::LdapDiscovery,
        Self::LdapDiscoveryConfirm,
        Self::LdapResource,
        Self::AuthBackend,
        Self::AdminAccount,
        Self::GeneralConfig,
        Self::DatabaseCreation,
        Self::Modules,
        Self::Summary,
    ];

    /// Position of this page in the fixed ordering.
    #[inline]
    pub const fn position(self) -> usize {
        self as usize
    }

    /// Page at the given position, if any.
    pub fn at(position: usize) -> Option<Self> {
        Self::ALL.get(position).copied()
    }

    /// Returns true for the welcome and summary pages, which are never skipped.
    #[inline]
    pub const fn is_sentinel(self) -> bool {
        matches!(self, Self::Welcome | Self::Summary)
    }

    /// The neighbouring page in the given direction, or None at either end.
    pub fn neighbor(self, direction: Direction) -> Option<Self> {
        match direction {
            Direction::Forward => Self::at(self.position() + 1),
            Direction::Backward => self.position().checked_sub(1).and_then(Self::at),
        }
    }

    /// Human-readable page title.
    pub const fn title(self) -> &'static str {
        match self {
            Self::Welcome => "Welcome",
            Self::Requirements => "Requirements",
            Self::AuthenticationType => "Authentication",
            Self::PreferencesType => "Preferences",
            Self::DbResource => "Database Resource",
            Self::LdapDiscovery => "LDAP Discovery",
            Self::LdapDiscoveryConfirm => "LDAP Discovery Results",
            Self::LdapResource => "LDAP Resource",
            Self::AuthBackend => "Authentication Backend",
            Self::AdminAccount => "Administration",
            Self::GeneralConfig => "Configuration",
            Self::DatabaseCreation => "Database Setup",
            Self::Modules => "Modules",
            Self::Summary => "Summary",
        }
    }
}

/// Traversal direction used while resolving skipped pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    #[strum(serialize = "forward")]
    Forward,
    #[strum(serialize = "backward")]
    Backward,
}

/// Labels of the navigation buttons shown on a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonLabels {
    /// Label of the forward button
    pub next: &'static str,
    /// Label of the backward button, absent on the first page
    pub back: Option<&'static str>,
}

impl ButtonLabels {
    /// Labels for the given page.
    pub fn for_page(page: PageId) -> Self {
        let next = match page {
            PageId::Welcome => "Start",
            PageId::Summary => "Install Icinga Web 2",
            _ => "Next",
        };
        let back = (page != PageId::Welcome).then_some("Back");
        Self { next, back }
    }
}

impl fmt::Display for ButtonLabels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.back {
            Some(back) => write!(f, "[ {} ] [ {} ]", back, self.next),
            None => write!(f, "[ {} ]", self.next),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn test_positions_match_ordering() {
        for (index, page) in PageId::ALL.iter().enumerate() {
            assert_eq!(page.position(), index);
            assert_eq!(PageId::at(index), Some(*page));
        }
        assert_eq!(PageId::iter().count(), PageId::ALL.len());
    }

    #[test]
    fn test_identifiers_roundtrip() {
        assert_eq!(PageId::DbResource.to_string(), "setup_db_resource");
        assert_eq!(
            PageId::from_str("setup_ldap_discovery_confirm").unwrap(),
            PageId::LdapDiscoveryConfirm
        );
        let json = serde_json::to_string(&PageId::AuthBackend).unwrap();
        assert_eq!(json, "\"setup_authentication_backend\"");
    }

    #[test]
    fn test_neighbors_stop_at_the_ends() {
        assert_eq!(PageId::Welcome.neighbor(Direction::Backward), None);
        assert_eq!(PageId::Summary.neighbor(Direction::Forward), None);
        assert_eq!(
            PageId::DbResource.neighbor(Direction::Forward),
            Some(PageId::LdapDiscovery)
        );
        assert_eq!(
            PageId::DbResource.neighbor(Direction::Backward),
            Some(PageId::PreferencesType)
        );
    }

    #[test]
    fn test_sentinels() {
        assert!(PageId::Welcome.is_sentinel());
        assert!(PageId::Summary.is_sentinel());
        assert!(!PageId::DatabaseCreation.is_sentinel());
    }

    #[test]
    fn test_button_labels() {
        let welcome = ButtonLabels::for_page(PageId::Welcome);
        assert_eq!(welcome.next, "Start");
        assert_eq!(welcome.back, None);

        let summary = ButtonLabels::for_page(PageId::Summary);
        assert_eq!(summary.next, "Install Icinga Web 2");
        assert_eq!(summary.back, Some("Back"));

        assert_eq!(ButtonLabels::for_page(PageId::Modules).to_string(), "[ Back ] [ Next ]");
    }
}
