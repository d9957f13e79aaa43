//! Pluggable extension sub-flows.
//!
//! Modules ship their own small setup wizards. The core wizard knows them only
//! through [`SetupExtension`]: whether they are finished, which steps they
//! contribute and which (advisory) requirements they report.
//!
//! # Contract
//!
//! - Extensions are consulted in registration order.
//! - Only extensions selected on `setup_modules` are consulted.
//! - Steps of a finished extension are appended verbatim; the core never
//!   reorders or inspects them.

use crate::answers::AnswerSet;
use crate::engine::plan::Step;
use crate::requirements::RequirementReport;

/// One module's setup sub-flow
pub trait SetupExtension {
    /// Module name as listed on the modules page
    fn name(&self) -> &str;

    /// Returns true once the sub-flow has all the answers it needs
    fn is_finished(&self) -> bool;

    /// Installation steps of this sub-flow, in execution order
    fn steps(&self) -> Vec<Step>;

    /// Requirements of this module. Always reported as optional.
    fn requirements(&self) -> RequirementReport {
        RequirementReport::new()
    }

    /// Forget every answer of the sub-flow
    fn clear_session(&mut self) {}
}

/// Extensions in registration order
#[derive(Default)]
pub struct ExtensionRegistry {
    extensions: Vec<Box<dyn SetupExtension>>,
}

impl std::fmt::Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an extension; later registrations come later in the plan
    pub fn register(&mut self, extension: Box<dyn SetupExtension>) {
        tracing::debug!("Registered setup extension '{}'", extension.name());
        self.extensions.push(extension);
    }

    /// Names of every registered extension
    pub fn names(&self) -> Vec<&str> {
        self.extensions.iter().map(|e| e.name()).collect()
    }

    /// Extensions the user selected on the modules page, in registration order
    pub fn selected<'a>(
        &'a self,
        answers: &'a AnswerSet,
    ) -> impl Iterator<Item = &'a dyn SetupExtension> + 'a {
        let selected = answers.modules().map(|m| m.selected.as_slice()).unwrap_or(&[]);
        self.extensions
            .iter()
            .map(|e| e.as_ref())
            .filter(move |e| selected.iter().any(|name| name == e.name()))
    }

    /// Steps of every selected extension that reports itself finished
    pub fn finished_steps(&self, answers: &AnswerSet) -> Vec<Step> {
        let mut steps = Vec::new();
        for extension in self.selected(answers) {
            if extension.is_finished() {
                steps.extend(extension.steps());
            } else {
                tracing::info!("Extension '{}' is not finished, skipping its steps", extension.name());
            }
        }
        steps
    }

    /// Requirements of the selected extensions, downgraded to optional
    pub fn requirements(&self, answers: &AnswerSet) -> RequirementReport {
        let mut report = RequirementReport::new();
        for extension in self.selected(answers) {
            report.merge(extension.requirements().all_optional());
        }
        report
    }

    /// Clear the session of every registered extension
    pub fn clear_sessions(&mut self) {
        for extension in &mut self.extensions {
            extension.clear_session();
        }
    }

    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }
}
