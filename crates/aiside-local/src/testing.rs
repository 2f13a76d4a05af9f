//! Block tree builders and store wrappers shared by unit tests.

use crate::memory::{BlockNode, MemoryStore, TranscriptSource};
use crate::transcript::TranscriptFormat;
use aiside_core::{BlockMeta, BlockStore, Error, Result, UsageKey};
use parking_lot::Mutex;
use std::collections::BTreeSet;

pub const COURSE: &str = "course-v1:edX+A+B";

pub fn key(kind: &str, name: &str) -> UsageKey {
    UsageKey::parse(&format!("block-v1:edX+A+B+type@{kind}+block@{name}")).unwrap()
}

pub fn unit(children: Vec<BlockNode>) -> BlockNode {
    let mut u = BlockNode::new(key("vertical", "unit"), "vertical");
    u.children = children;
    u
}

pub fn html(name: &str, markup: &str) -> BlockNode {
    let mut n = BlockNode::new(key("html", name), "html");
    n.html = Some(markup.to_string());
    n
}

pub fn video(name: &str, transcript: Option<&str>) -> BlockNode {
    let mut n = BlockNode::new(key("video", name), "video");
    n.transcript = transcript.map(|t| TranscriptSource {
        format: TranscriptFormat::Txt,
        body: t.to_string(),
    });
    n
}

pub fn other(name: &str, category: &str) -> BlockNode {
    BlockNode::new(key(category, name), category)
}

pub fn store(root: BlockNode) -> MemoryStore {
    MemoryStore::from_tree(root).unwrap()
}

pub fn tags(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|s| s.to_string()).collect()
}

/// Records which blocks had their metadata read.
pub struct CountingStore<S> {
    pub inner: S,
    pub inspected: Mutex<Vec<UsageKey>>,
}

impl<S> CountingStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            inspected: Mutex::new(Vec::new()),
        }
    }

    pub fn inspected(&self) -> Vec<UsageKey> {
        self.inspected.lock().clone()
    }
}

impl<S: BlockStore> BlockStore for CountingStore<S> {
    fn children(&self, key: &UsageKey) -> Result<Vec<UsageKey>> {
        self.inner.children(key)
    }

    fn meta(&self, key: &UsageKey) -> Result<BlockMeta> {
        self.inspected.lock().push(key.clone());
        self.inner.meta(key)
    }

    fn html(&self, key: &UsageKey) -> Result<String> {
        self.inner.html(key)
    }

    fn transcript(&self, key: &UsageKey) -> Result<String> {
        self.inner.transcript(key)
    }
}

/// Fails every call touching one of `broken`, and transcript fetches for `broken_transcripts`.
pub struct FailingStore<S> {
    pub inner: S,
    pub broken: Vec<UsageKey>,
    pub broken_transcripts: Vec<UsageKey>,
}

impl<S> FailingStore<S> {
    fn check(&self, key: &UsageKey) -> Result<()> {
        if self.broken.contains(key) {
            return Err(Error::Store(format!("boom: {key}")));
        }
        Ok(())
    }
}

impl<S: BlockStore> BlockStore for FailingStore<S> {
    fn children(&self, key: &UsageKey) -> Result<Vec<UsageKey>> {
        self.check(key)?;
        self.inner.children(key)
    }

    fn meta(&self, key: &UsageKey) -> Result<BlockMeta> {
        self.check(key)?;
        self.inner.meta(key)
    }

    fn html(&self, key: &UsageKey) -> Result<String> {
        self.check(key)?;
        self.inner.html(key)
    }

    fn transcript(&self, key: &UsageKey) -> Result<String> {
        self.check(key)?;
        if self.broken_transcripts.contains(key) {
            return Err(Error::Store(format!("transcript service down: {key}")));
        }
        self.inner.transcript(key)
    }
}
