//! In-memory `BlockStore` built from a JSON block tree.
//!
//! Stands in for the host's modulestore in the CLI and in tests.

use crate::transcript::TranscriptFormat;
use aiside_core::{BlockMeta, BlockStore, Category, Error, Result, Timestamp, UsageKey};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// One node of a serialized block tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockNode {
    pub id: UsageKey,
    #[serde(default)]
    pub category: Option<String>,
    /// Defaults to the usage key.
    #[serde(default)]
    pub definition_id: Option<String>,
    #[serde(default)]
    pub published_on: Option<Timestamp>,
    #[serde(default)]
    pub edited_on: Option<Timestamp>,
    #[serde(default)]
    pub html: Option<String>,
    #[serde(default)]
    pub transcript: Option<TranscriptSource>,
    #[serde(default)]
    pub children: Vec<BlockNode>,
}

impl BlockNode {
    pub fn new(id: UsageKey, category: &str) -> Self {
        Self {
            id,
            category: Some(category.to_string()),
            definition_id: None,
            published_on: None,
            edited_on: None,
            html: None,
            transcript: None,
            children: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptSource {
    #[serde(default)]
    pub format: TranscriptFormat,
    pub body: String,
}

#[derive(Debug)]
struct Entry {
    meta: BlockMeta,
    html: Option<String>,
    transcript: Option<TranscriptSource>,
    children: Vec<UsageKey>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    root: Option<UsageKey>,
    blocks: BTreeMap<UsageKey, Entry>,
}

impl MemoryStore {
    /// Index every node under `root`. Fails on duplicate ids.
    pub fn from_tree(root: BlockNode) -> Result<Self> {
        let mut store = Self {
            root: Some(root.id.clone()),
            blocks: BTreeMap::new(),
        };
        let mut pending = vec![root];
        while let Some(node) = pending.pop() {
            let children: Vec<UsageKey> = node.children.iter().map(|c| c.id.clone()).collect();
            let entry = Entry {
                meta: BlockMeta {
                    usage_key: node.id.clone(),
                    definition_id: node
                        .definition_id
                        .unwrap_or_else(|| node.id.as_str().to_string()),
                    category: Category::from_tag(node.category.as_deref()),
                    published_on: node.published_on,
                    edited_on: node.edited_on,
                },
                html: node.html,
                transcript: node.transcript,
                children,
            };
            if store.blocks.insert(node.id.clone(), entry).is_some() {
                return Err(Error::Store(format!("duplicate block id {}", node.id)));
            }
            pending.extend(node.children);
        }
        Ok(store)
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        let root: BlockNode =
            serde_json::from_str(s).map_err(|e| Error::Store(format!("block tree: {e}")))?;
        Self::from_tree(root)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Store(format!("read {}: {e}", path.display())))?;
        Self::from_json_str(&content)
    }

    pub fn root(&self) -> Option<&UsageKey> {
        self.root.as_ref()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    fn entry(&self, key: &UsageKey) -> Result<&Entry> {
        self.blocks
            .get(key)
            .ok_or_else(|| Error::BlockNotFound(key.to_string()))
    }
}

impl BlockStore for MemoryStore {
    fn children(&self, key: &UsageKey) -> Result<Vec<UsageKey>> {
        Ok(self.entry(key)?.children.clone())
    }

    fn meta(&self, key: &UsageKey) -> Result<BlockMeta> {
        Ok(self.entry(key)?.meta.clone())
    }

    fn html(&self, key: &UsageKey) -> Result<String> {
        Ok(self.entry(key)?.html.clone().unwrap_or_default())
    }

    fn transcript(&self, key: &UsageKey) -> Result<String> {
        match &self.entry(key)?.transcript {
            Some(src) => Ok(src.format.to_text(&src.body)),
            None => Err(Error::TranscriptNotFound(key.to_string())),
        }
    }
}
