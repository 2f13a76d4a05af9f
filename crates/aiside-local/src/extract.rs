//! Summarizable content of a unit, and of whole subtrees.

use crate::gate::is_summarizable;
use crate::normalize::html_to_text;
use aiside_core::{
    BlockMeta, BlockStore, Category, ContentBundle, Error, ExtractedItem, Result, SummaryConfig,
    UsageKey,
};
use std::collections::BTreeSet;
use tracing::debug;

/// Collect the text of a unit's direct children, in order.
///
/// Runs the gate first and returns an empty bundle when it says no. Videos without a
/// transcript are skipped; any other store failure is returned to the caller.
pub fn extract(
    store: &dyn BlockStore,
    cfg: &SummaryConfig,
    unit: &UsageKey,
) -> Result<ContentBundle> {
    let mut bundle = ContentBundle::default();
    if !is_summarizable(store, cfg, unit)? {
        return Ok(bundle);
    }

    for child in store.children(unit)? {
        let meta = store.meta(&child)?;
        let Some(content_type) = meta.category.content_type() else {
            continue;
        };
        let Some(content_text) = block_text(store, cfg, &meta)? else {
            continue;
        };
        bundle.push(ExtractedItem {
            definition_id: meta.definition_id,
            content_type,
            content_text,
            published_on: meta.published_on,
            edited_on: meta.edited_on,
        });
    }
    Ok(bundle)
}

/// A block's own text: normalized markup for html, the transcript for video.
///
/// `None` for other categories, for a video without a transcript, and for blank text.
pub fn block_text(
    store: &dyn BlockStore,
    cfg: &SummaryConfig,
    meta: &BlockMeta,
) -> Result<Option<String>> {
    let text = match meta.category {
        Category::RichText => html_to_text(&store.html(&meta.usage_key)?, &cfg.html_tags_to_remove),
        Category::Media => match store.transcript(&meta.usage_key) {
            Ok(t) => t,
            Err(Error::TranscriptNotFound(_)) => {
                debug!(block = %meta.usage_key, "video has no transcript");
                return Ok(None);
            }
            Err(e) => return Err(e),
        },
        Category::Unit | Category::Other(_) => return Ok(None),
    };
    Ok((!text.trim().is_empty()).then_some(text))
}

/// Text of `root` and everything below it, parents before children.
///
/// Unlike [`extract`] there is no gate and no size check.
pub fn extract_block_content(
    store: &dyn BlockStore,
    cfg: &SummaryConfig,
    root: &UsageKey,
) -> Result<Vec<String>> {
    let mut content = Vec::new();
    let mut seen = BTreeSet::new();
    let mut stack = vec![root.clone()];
    while let Some(key) = stack.pop() {
        if !seen.insert(key.clone()) {
            continue;
        }
        let meta = store.meta(&key)?;
        if let Some(text) = block_text(store, cfg, &meta)? {
            content.push(text);
        }
        stack.extend(store.children(&key)?.into_iter().rev());
    }
    Ok(content)
}
