//! Summary hook configuration.
//!
//! Loaded from `aiside.toml` (explicit path or discovered upwards from the working
//! directory), then overlaid with `AISIDE_*` environment tokens. Entry points take the
//! resulting value explicitly; nothing here is process-global.

use crate::{CourseKey, Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

pub const CONFIG_FILE_NAME: &str = "aiside.toml";

/// Default minimum amount of text (characters) a unit needs before it is summarized.
pub const DEFAULT_MIN_SIZE: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryConfig {
    /// Size threshold shared by the gate (raw markup) and the callers (normalized text).
    pub min_size: usize,
    /// Tags whose directly following text is not content. Compared lowercase.
    pub html_tags_to_remove: BTreeSet<String>,
    /// Base URL of the summarization front-end.
    pub hook_host: String,
    /// Path of the launcher script under `hook_host`.
    pub hook_js_path: String,
    /// Hostname the summarization service uses to reach the LMS, when it is not `localhost`.
    pub aispot_lms_name: String,
    pub flags: FlagConfig,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            min_size: DEFAULT_MIN_SIZE,
            html_tags_to_remove: ["script", "style"].into_iter().map(String::from).collect(),
            hook_host: String::new(),
            hook_js_path: String::new(),
            aispot_lms_name: String::new(),
            flags: FlagConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlagConfig {
    pub staff_only: FlagRule,
    pub summaries_configuration: FlagRule,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlagRule {
    pub everyone: bool,
    pub courses: BTreeSet<String>,
}

impl FlagRule {
    pub fn is_enabled(&self, course: &CourseKey) -> bool {
        self.everyone || self.courses.contains(course.as_str())
    }
}

fn env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

impl SummaryConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str::<Self>(s)
            .map(Self::normalized)
            .map_err(|e| Error::Config(e.to_string()))
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("read {}: {e}", path.display())))?;
        toml::from_str::<Self>(&content)
            .map(Self::normalized)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }

    fn normalized(mut self) -> Self {
        self.html_tags_to_remove = lowercase_tags(&self.html_tags_to_remove);
        self
    }

    /// Look for `aiside.toml` in the current directory and its parents.
    pub fn discover() -> Result<Option<Self>> {
        let mut current = std::env::current_dir().map_err(|e| Error::Config(e.to_string()))?;
        loop {
            let candidate = current.join(CONFIG_FILE_NAME);
            if candidate.is_file() {
                return Self::from_toml_file(candidate).map(Some);
            }
            if !current.pop() {
                return Ok(None);
            }
        }
    }

    /// Overlay `AISIDE_*` environment tokens. Blank values are ignored.
    pub fn apply_env(mut self) -> Result<Self> {
        if let Some(v) = env("AISIDE_SUMMARY_HOOK_HOST") {
            self.hook_host = v;
        }
        if let Some(v) = env("AISIDE_SUMMARY_HOOK_JS_PATH") {
            self.hook_js_path = v;
        }
        if let Some(v) = env("AISIDE_AISPOT_LMS_NAME") {
            self.aispot_lms_name = v;
        }
        if let Some(v) = env("AISIDE_SUMMARY_HOOK_MIN_SIZE") {
            self.min_size = v
                .parse()
                .map_err(|_| Error::Config(format!("AISIDE_SUMMARY_HOOK_MIN_SIZE={v:?}")))?;
        }
        if let Some(v) = env("AISIDE_HTML_TAGS_TO_REMOVE") {
            self.html_tags_to_remove = lowercase_tags(v.split(','));
        }
        Ok(self)
    }

    /// Full URL of the launcher script.
    pub fn js_url(&self) -> String {
        format!("{}{}", self.hook_host, self.hook_js_path)
    }
}

fn lowercase_tags<I, S>(tags: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tags.into_iter()
        .map(|t| t.as_ref().trim().to_ascii_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Mutex;

    // Env vars are process-global; serialize tests that mutate them.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn defaults_remove_script_and_style() {
        let cfg = SummaryConfig::default();
        assert_eq!(cfg.min_size, DEFAULT_MIN_SIZE);
        assert!(cfg.html_tags_to_remove.contains("script"));
        assert!(cfg.html_tags_to_remove.contains("style"));
        assert!(cfg.hook_host.is_empty());
    }

    #[test]
    fn toml_overrides_and_lowercases_tags() {
        let cfg = SummaryConfig::from_toml_str(
            r#"
min_size = 40
html_tags_to_remove = ["SCRIPT", "style", "test"]
hook_host = "http://hookhost"
hook_js_path = "/jspath"

[flags.staff_only]
courses = ["course-v1:edX+A+B"]

[flags.summaries_configuration]
everyone = true
"#,
        )
        .unwrap();
        assert_eq!(cfg.min_size, 40);
        assert!(cfg.html_tags_to_remove.contains("script"));
        assert!(cfg.html_tags_to_remove.contains("test"));
        assert_eq!(cfg.js_url(), "http://hookhost/jspath");

        let course = CourseKey::parse("course-v1:edX+A+B").unwrap();
        let other = CourseKey::parse("course-v1:edX+C+D").unwrap();
        assert!(cfg.flags.staff_only.is_enabled(&course));
        assert!(!cfg.flags.staff_only.is_enabled(&other));
        assert!(cfg.flags.summaries_configuration.is_enabled(&other));
    }

    #[test]
    fn invalid_toml_is_a_config_error() {
        let err = SummaryConfig::from_toml_str("min_size = \"lots\"").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn from_toml_file_reads_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "min_size = 7\n").unwrap();
        let cfg = SummaryConfig::from_toml_file(&path).unwrap();
        assert_eq!(cfg.min_size, 7);
        assert!(SummaryConfig::from_toml_file(dir.path().join("missing.toml")).is_err());
    }

    #[test]
    fn env_tokens_overlay_file_values() {
        let _g = ENV_LOCK.lock().unwrap();
        std::env::set_var("AISIDE_SUMMARY_HOOK_HOST", "http://env-host");
        std::env::set_var("AISIDE_SUMMARY_HOOK_MIN_SIZE", "12");
        std::env::set_var("AISIDE_HTML_TAGS_TO_REMOVE", "Script, iframe ,");
        std::env::set_var("AISIDE_AISPOT_LMS_NAME", "   ");
        let cfg = SummaryConfig::default().apply_env();
        std::env::remove_var("AISIDE_SUMMARY_HOOK_HOST");
        std::env::remove_var("AISIDE_SUMMARY_HOOK_MIN_SIZE");
        std::env::remove_var("AISIDE_HTML_TAGS_TO_REMOVE");
        std::env::remove_var("AISIDE_AISPOT_LMS_NAME");

        let cfg = cfg.unwrap();
        assert_eq!(cfg.hook_host, "http://env-host");
        assert_eq!(cfg.min_size, 12);
        assert_eq!(
            cfg.html_tags_to_remove.iter().cloned().collect::<Vec<_>>(),
            vec!["iframe".to_string(), "script".to_string()]
        );
        assert!(cfg.aispot_lms_name.is_empty());
    }

    #[test]
    fn unparsable_min_size_env_is_rejected() {
        let _g = ENV_LOCK.lock().unwrap();
        std::env::set_var("AISIDE_SUMMARY_HOOK_MIN_SIZE", "many");
        let res = SummaryConfig::default().apply_env();
        std::env::remove_var("AISIDE_SUMMARY_HOOK_MIN_SIZE");
        assert!(matches!(res, Err(Error::Config(_))));
    }
}
