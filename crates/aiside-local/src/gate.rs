//! Cheap pre-check: is there enough in a unit to be worth summarizing?
//!
//! Looks only at direct children and raw markup length; no normalization, no transcript
//! fetches. Any video child is enough on its own, whether or not a transcript exists.

use aiside_core::{BlockStore, Category, Error, Result, SummaryConfig, UsageKey};
use std::ops::ControlFlow;
use tracing::warn;

/// What one child adds to the running total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Contribution {
    /// Raw markup characters of a rich-text child.
    Length(usize),
    /// A media child; the unit passes.
    Sufficient,
    Inert,
}

/// A child whose inspection failed. It contributes nothing.
#[derive(Debug)]
pub struct Skipped {
    pub child: UsageKey,
    pub reason: Error,
}

pub fn inspect_child(
    store: &dyn BlockStore,
    child: &UsageKey,
) -> std::result::Result<Contribution, Skipped> {
    let skipped = |reason| Skipped {
        child: child.clone(),
        reason,
    };
    let meta = store.meta(child).map_err(skipped)?;
    match meta.category {
        Category::RichText => store
            .html(child)
            .map(|markup| Contribution::Length(markup.chars().count()))
            .map_err(skipped),
        Category::Media => Ok(Contribution::Sufficient),
        Category::Unit | Category::Other(_) => Ok(Contribution::Inert),
    }
}

/// True as soon as a video child is seen or the raw markup of the html children seen so far
/// exceeds `cfg.min_size`. Children after that point are not inspected.
///
/// Only per-child failures are absorbed; failing to list the unit's own children is an error.
pub fn is_summarizable(
    store: &dyn BlockStore,
    cfg: &SummaryConfig,
    unit: &UsageKey,
) -> Result<bool> {
    let children = store.children(unit)?;

    let verdict = children.iter().try_fold(0usize, |total, child| {
        match inspect_child(store, child) {
            Ok(Contribution::Sufficient) => ControlFlow::Break(()),
            Ok(Contribution::Length(n)) => {
                let total = total.saturating_add(n);
                if total > cfg.min_size {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(total)
                }
            }
            Ok(Contribution::Inert) => ControlFlow::Continue(total),
            Err(Skipped { child, reason }) => {
                warn!(unit = %unit, child = %child, error = %reason, "summary gate skipped child");
                ControlFlow::Continue(total)
            }
        }
    });
    Ok(verdict.is_break())
}
