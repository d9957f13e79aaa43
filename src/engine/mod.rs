//! Engine modules: translate the wizard answers into an installation plan.
//!
//! The engine sits between the collected answers (what the user chose) and the
//! external installer (which performs the work). It produces ordered,
//! serializable plans and never executes them.

pub mod plan;
