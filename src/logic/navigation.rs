//! Skip-aware page resolution.
//!
//! Starting at the requested page, every page whose skip hook fires loses its
//! recorded answer and the walk moves one position further in the requested
//! direction. The first page that is not skipped is returned.
//!
//! The sentinel pages at both ends are never skipped, which bounds the walk.
//! The walk is additionally limited to one visit per page and fails with
//! `SetupError::Navigation` instead of looping if that ever stops holding.

use crate::answers::AnswerSet;
use crate::error::{Result, SetupError};
use crate::logic::hooks::{PageRegistry, SkipContext};
use crate::logic::probe::DbTool;
use crate::pages::{Direction, PageId};

/// Outcome of one resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Page to display
    pub page: PageId,
    /// Pages passed over, in visiting order
    pub skipped: Vec<PageId>,
    /// Skipped pages whose answers were removed
    pub pruned: Vec<PageId>,
}

/// Resolve `requested` to the first page in `direction` that is not skipped.
///
/// Configure hooks are not run here; the caller configures only the returned
/// page.
pub fn resolve(
    requested: PageId,
    direction: Direction,
    registry: &PageRegistry,
    answers: &mut AnswerSet,
    db_tool: &mut dyn DbTool,
) -> Result<Resolution> {
    let mut page = requested;
    let mut skipped = Vec::new();
    let mut pruned = Vec::new();

    for _ in 0..PageId::ALL.len() {
        let skip = {
            let mut ctx = SkipContext {
                answers: &*answers,
                db_tool: &mut *db_tool,
            };
            registry.hook(page).skip(&mut ctx)
        };
        if !skip {
            tracing::debug!("Resolved {} ({}) to {}", requested, direction, page);
            return Ok(Resolution {
                page,
                skipped,
                pruned,
            });
        }

        if page.is_sentinel() {
            tracing::warn!("Sentinel page {} reported itself as skipped", page);
        }
        if answers.remove(page).is_some() {
            tracing::info!("Removed answers of skipped page {}", page);
            pruned.push(page);
        }
        skipped.push(page);

        page = page.neighbor(direction).ok_or_else(|| {
            SetupError::navigation(format!(
                "walked past the {} end while skipping {}",
                direction, page
            ))
        })?;
    }

    Err(SetupError::navigation(format!(
        "no displayable page found from {} within {} steps",
        requested,
        PageId::ALL.len()
    )))
}
