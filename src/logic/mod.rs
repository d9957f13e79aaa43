//! Logic modules: per-page decisions of the setup wizard.
//!
//! # Modules
//!
//! - `hooks` - Configure and skip hooks keyed by page
//! - `navigation` - Skip-aware page resolution
//! - `probe` - Database connectivity and privilege probe

pub mod hooks;
pub mod navigation;
pub mod probe;
