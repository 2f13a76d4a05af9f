//! Opaque course and block identifiers.
//!
//! Keys are kept as validated strings: the host owns their full grammar, we only need to
//! recognise the course part of a block usage key and reject obviously malformed input.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const BLOCK_PREFIX: &str = "block-v1:";
const COURSE_PREFIX: &str = "course-v1:";

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CourseKey(String);

impl CourseKey {
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        let body = s.strip_prefix(COURSE_PREFIX).unwrap_or(s);
        // org, course and run, separated by `+` (new style) or `/` (old style).
        let mut parts = body.splitn(3, ['+', '/']);
        let org = parts.next().unwrap_or("");
        let course = parts.next().unwrap_or("");
        let run = parts.next().unwrap_or("");
        if org.is_empty() || course.is_empty() || run.is_empty() || run.contains('/') {
            return Err(Error::InvalidKey(format!("course key {s:?}")));
        }
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CourseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CourseKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CourseKey {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

impl From<CourseKey> for String {
    fn from(k: CourseKey) -> Self {
        k.0
    }
}

/// Usage key of a block, e.g. `block-v1:edX+A+B+type@vertical+block@verticalD`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UsageKey(String);

impl UsageKey {
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() || s.chars().any(char::is_whitespace) {
            return Err(Error::InvalidKey(format!("usage key {s:?}")));
        }
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Course this block belongs to. Only `block-v1:` keys carry one.
    pub fn course_key(&self) -> Result<CourseKey> {
        let body = self
            .0
            .strip_prefix(BLOCK_PREFIX)
            .ok_or_else(|| Error::InvalidKey(format!("no course in usage key {:?}", self.0)))?;
        let (course, _) = body
            .split_once("+type@")
            .ok_or_else(|| Error::InvalidKey(format!("no block type in usage key {:?}", self.0)))?;
        CourseKey::parse(&format!("{COURSE_PREFIX}{course}"))
    }
}

impl fmt::Display for UsageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for UsageKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for UsageKey {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

impl From<UsageKey> for String {
    fn from(k: UsageKey) -> Self {
        k.0
    }
}
