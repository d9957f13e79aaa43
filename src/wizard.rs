//! Setup Wizard Session
//!
//! `Wizard` is the single owner of a setup session: the answers, the page
//! being shown and everything the page hooks need. The rendering layer talks
//! to it through `show`, `submit` and `back` and receives fully configured
//! pages in return.
//!
//! # Design Principles
//!
//! - **Single Source of Truth**: The wizard owns the answers and the current page
//! - **No Global State**: configuration, environment and probe client are
//!   passed in at construction
//! - **Prune Before Deciding**: stale dependent answers are removed before
//!   the next navigation decision is computed
//! - **Configure Once**: only the page finally displayed is configured
//!
//! # Example
//!
//! ```no_run
//! use websetup::{Environment, SetupConfig, TcpDbTool, Wizard};
//!
//! let config = SetupConfig::default();
//! let environment = Environment::detect(&config.config_dir);
//! let tool = TcpDbTool::new(config.probe_timeout());
//! let wizard = Wizard::new(config, environment, Box::new(tool));
//! let view = wizard.show().unwrap();
//! println!("{}", view.title);
//! ```

use crate::answers::{AnswerSet, PageRecord};
use crate::config::SetupConfig;
use crate::engine::plan::{self, InstallationPlan};
use crate::error::{Result, SetupError};
use crate::extension::{ExtensionRegistry, SetupExtension};
use crate::logic::hooks::{self, HookContext, PageContext, PageHook, PageRegistry};
use crate::logic::navigation::{self, Resolution};
use crate::logic::probe::DbTool;
use crate::pages::{ButtonLabels, Direction, PageId};
use crate::requirements::{Environment, RequirementReport};
use std::fs;
use std::io;

/// A page ready for display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageView {
    pub page: PageId,
    pub title: &'static str,
    pub context: PageContext,
    pub buttons: ButtonLabels,
}

/// Result of submitting a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Record stored; the wizard moved on to this page
    Advanced(PageView),
    /// Record refused; the wizard stays on `page`
    Rejected { page: PageId, errors: Vec<String> },
}

impl SubmitOutcome {
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }
}

/// One setup session
pub struct Wizard {
    config: SetupConfig,
    environment: Environment,
    db_tool: Box<dyn DbTool>,
    registry: PageRegistry,
    extensions: ExtensionRegistry,
    answers: AnswerSet,
    current: PageId,
    direction: Direction,
}

impl std::fmt::Debug for Wizard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wizard")
            .field("config", &self.config)
            .field("current", &self.current)
            .field("direction", &self.direction)
            .field("answers", &self.answers)
            .field("extensions", &self.extensions)
            .finish_non_exhaustive()
    }
}

impl Wizard {
    /// Start a session on the welcome page with the built-in page hooks.
    pub fn new(config: SetupConfig, environment: Environment, db_tool: Box<dyn DbTool>) -> Self {
        Self {
            config,
            environment,
            db_tool,
            registry: PageRegistry::standard(),
            extensions: ExtensionRegistry::new(),
            answers: AnswerSet::new(),
            current: PageId::Welcome,
            direction: Direction::Forward,
        }
    }

    /// Register an extension sub-flow
    pub fn with_extension(mut self, extension: Box<dyn SetupExtension>) -> Self {
        self.extensions.register(extension);
        self
    }

    /// Override the hook of one page
    pub fn with_hook(mut self, page: PageId, hook: Box<dyn PageHook>) -> Self {
        self.registry.replace(page, hook);
        self
    }

    /// Resume with previously stored answers
    pub fn with_answers(mut self, answers: AnswerSet) -> Self {
        self.answers = answers;
        self
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn current_page(&self) -> PageId {
        self.current
    }

    /// Direction of the last navigation
    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn answers(&self) -> &AnswerSet {
        &self.answers
    }

    pub fn config(&self) -> &SetupConfig {
        &self.config
    }

    /// Returns true if the page has a recorded answer
    pub fn has_page_data(&self, page: PageId) -> bool {
        self.answers.has(page)
    }

    fn hook_context(&self) -> HookContext<'_> {
        HookContext {
            answers: &self.answers,
            config: &self.config,
            environment: &self.environment,
            extensions: &self.extensions,
        }
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    /// The current page with its injected context
    pub fn show(&self) -> Result<PageView> {
        let context = self.registry.hook(self.current).configure(&self.hook_context())?;
        Ok(PageView {
            page: self.current,
            title: self.current.title(),
            context,
            buttons: ButtonLabels::for_page(self.current),
        })
    }

    /// Submit the record of the current page and move forward.
    ///
    /// # Errors
    ///
    /// `SetupError::State` if the record belongs to another page or the current
    /// page is the summary. Validation failures are not errors; they come back
    /// as `SubmitOutcome::Rejected`.
    pub fn submit(&mut self, record: PageRecord) -> Result<SubmitOutcome> {
        let page = self.current;
        if record.page() != page {
            return Err(SetupError::state(format!(
                "submitted a record for {} while {} is shown",
                record.page(),
                page
            )));
        }
        if page == PageId::Summary {
            return Err(SetupError::state("the summary page is confirmed with finish()"));
        }

        let hook = self.registry.hook(page);
        let stale = hook.invalidated_by(&self.answers, &record);
        if !stale.is_empty() {
            let removed = self.answers.remove_keys(&stale);
            tracing::info!("Submission of {} invalidated {:?}", page, removed);
        }

        let ctx = HookContext {
            answers: &self.answers,
            config: &self.config,
            environment: &self.environment,
            extensions: &self.extensions,
        };
        let errors = hook.validate(&ctx, &record);
        if !errors.is_empty() {
            tracing::warn!("Rejected submission of {}: {}", page, errors.join("; "));
            return Ok(SubmitOutcome::Rejected { page, errors });
        }

        self.answers.set(page, record)?;
        let next = page.neighbor(Direction::Forward).ok_or_else(|| {
            SetupError::navigation(format!("{} has no following page", page))
        })?;
        self.resolve(next, Direction::Forward)?;
        Ok(SubmitOutcome::Advanced(self.show()?))
    }

    /// Move to the previous displayable page; stays put on the first page.
    pub fn back(&mut self) -> Result<PageView> {
        match self.current.neighbor(Direction::Backward) {
            Some(previous) => {
                self.resolve(previous, Direction::Backward)?;
            }
            None => tracing::debug!("Already on the first page"),
        }
        self.show()
    }

    /// Resolve `requested` through the skip hooks and make the result current.
    pub fn resolve(&mut self, requested: PageId, direction: Direction) -> Result<Resolution> {
        let resolution = navigation::resolve(
            requested,
            direction,
            &self.registry,
            &mut self.answers,
            self.db_tool.as_mut(),
        )?;
        if !resolution.skipped.is_empty() {
            tracing::debug!("Skipped pages {:?}", resolution.skipped);
        }
        tracing::info!("Page {} -> {}", self.current, resolution.page);
        self.current = resolution.page;
        self.direction = direction;
        Ok(resolution)
    }

    // ========================================================================
    // Results
    // ========================================================================

    /// Requirements of the platform and of the selected extensions
    pub fn requirements(&self) -> RequirementReport {
        hooks::collect_requirements(&self.hook_context())
    }

    /// Compile the plan from the current answers, regardless of the page shown
    pub fn plan(&self) -> Result<InstallationPlan> {
        plan::compile(&self.answers, &self.config, &self.extensions)
    }

    /// Confirm the summary page and compile the installation plan.
    pub fn finish(&self) -> Result<InstallationPlan> {
        if self.current != PageId::Summary {
            return Err(SetupError::state(format!(
                "finish() requires the summary page, current page is {}",
                self.current
            )));
        }
        self.plan()
    }

    /// Forget the whole session and remove the setup token.
    ///
    /// A token that cannot be removed is logged, not raised.
    pub fn clear_session(&mut self) {
        self.answers.clear();
        self.current = PageId::Welcome;
        self.direction = Direction::Forward;
        self.extensions.clear_sessions();

        let token = self.config.token_path();
        match fs::remove_file(&token) {
            Ok(()) => tracing::info!("Removed setup token {}", token.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!("No setup token at {}", token.display())
            }
            Err(e) => tracing::warn!("Failed to remove setup token {}: {}", token.display(), e),
        }
    }
}
