//! Host entry points: the summary hook aside and the extractor aside.
//!
//! These sit between the host runtime and the gate/extractor. Handlers answer with a status
//! and a JSON-ready body; the student view never fails and degrades to an empty fragment.

use crate::extract::{extract, extract_block_content};
use crate::settings::is_summary_enabled;
use aiside_core::{
    format_timestamp, BlockMeta, BlockStore, Category, ContentType, CourseKey, CreditService,
    Error, ExtractedItem, FeatureFlags, Result, SettingsStore, SummaryConfig, UsageKey,
    UserService,
};
use serde::Serialize;
use tracing::{error, info};

/// Who is asking, as the runtime reports it.
#[derive(Clone, Copy)]
pub struct Viewer<'a> {
    pub is_staff: bool,
    pub users: &'a dyn UserService,
    pub credit: &'a dyn CreditService,
}

/// Outcome of a handler call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerResponse<T> {
    Forbidden,
    NotFound,
    Ok(T),
}

impl<T> HandlerResponse<T> {
    pub fn status(&self) -> u16 {
        match self {
            Self::Forbidden => 403,
            Self::NotFound => 404,
            Self::Ok(_) => 200,
        }
    }

    pub fn body(&self) -> Option<&T> {
        match self {
            Self::Ok(body) => Some(body),
            _ => None,
        }
    }
}

pub type SummaryResponse = HandlerResponse<SummaryBody>;
pub type ExtractResponse = HandlerResponse<ExtractBody>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SummaryBody {
    Content(UnitSummary),
    /// Not enough text: `{"data": []}`.
    Empty { data: Vec<SummaryItem> },
}

impl SummaryBody {
    pub fn empty() -> Self {
        Self::Empty { data: Vec::new() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitSummary {
    pub content_id: String,
    pub course_id: String,
    pub data: Vec<SummaryItem>,
    pub published_on: Option<String>,
    pub edited_on: Option<String>,
}

/// An extracted item with its dates formatted for the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryItem {
    pub definition_id: String,
    pub content_type: ContentType,
    pub content_text: String,
    pub published_on: Option<String>,
    pub edited_on: Option<String>,
}

impl From<ExtractedItem> for SummaryItem {
    fn from(item: ExtractedItem) -> Self {
        Self {
            definition_id: item.definition_id,
            content_type: item.content_type,
            content_text: item.content_text,
            published_on: item.published_on.as_ref().map(format_timestamp),
            edited_on: item.edited_on.as_ref().map(format_timestamp),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractBody {
    pub content: Vec<String>,
}

/// Markup injected after a unit. Empty means "nothing to show".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Fragment {
    pub content: String,
}

impl Fragment {
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    pub fn body_html(&self) -> &str {
        &self.content
    }
}

/// Injects the summary launcher into units and serves their text to the summarizer.
pub struct SummaryHookAside<'a> {
    pub config: &'a SummaryConfig,
    pub blocks: &'a dyn BlockStore,
    pub flags: &'a dyn FeatureFlags,
    pub settings: &'a dyn SettingsStore,
}

impl<'a> SummaryHookAside<'a> {
    pub fn new(
        config: &'a SummaryConfig,
        blocks: &'a dyn BlockStore,
        flags: &'a dyn FeatureFlags,
        settings: &'a dyn SettingsStore,
    ) -> Self {
        Self {
            config,
            blocks,
            flags,
            settings,
        }
    }

    /// Whether the aside is active for `unit`. Errors are logged and read as "no".
    pub fn should_apply_to_block(&self, unit: &UsageKey, user_is_staff: bool) -> bool {
        self.should_apply_can_fail(unit, user_is_staff)
            .unwrap_or_else(|e| {
                error!(
                    unit = %unit,
                    error = %e,
                    "summary hook aside suppressed error during should_apply_to_block"
                );
                false
            })
    }

    fn should_apply_can_fail(&self, unit: &UsageKey, user_is_staff: bool) -> Result<bool> {
        if self.blocks.meta(unit)?.category != Category::Unit {
            return Ok(false);
        }
        let course = unit.course_key()?;
        if user_is_staff && self.flags.summary_staff_only(&course) {
            return Ok(true);
        }
        if self.flags.summaries_configuration_enabled(&course) {
            return is_summary_enabled(self.flags, self.settings, &course, Some(unit));
        }
        Ok(false)
    }

    /// Summarizable text of a unit, for staff and services only.
    ///
    /// Store failures during extraction are returned; the host maps them to a server error.
    pub fn summary_handler(&self, viewer: &Viewer<'_>, unit: &UsageKey) -> Result<SummaryResponse> {
        if !viewer.is_staff {
            return Ok(HandlerResponse::Forbidden);
        }
        if !self.should_apply_to_block(unit, viewer.is_staff) {
            return Ok(HandlerResponse::NotFound);
        }

        let meta = self.blocks.meta(unit)?;
        let bundle = extract(self.blocks, self.config, unit)?;
        if bundle.total_length < self.config.min_size || bundle.is_empty() {
            return Ok(HandlerResponse::Ok(SummaryBody::empty()));
        }

        Ok(HandlerResponse::Ok(SummaryBody::Content(UnitSummary {
            content_id: unit.to_string(),
            course_id: unit.course_key()?.to_string(),
            data: bundle.items.into_iter().map(SummaryItem::from).collect(),
            published_on: meta.published_on.as_ref().map(format_timestamp),
            edited_on: meta.edited_on.as_ref().map(format_timestamp),
        })))
    }

    /// Launcher fragment for a unit the host has already decided the aside applies to.
    ///
    /// Never fails: errors are logged with the unit key and yield an empty fragment.
    pub fn student_view(
        &self,
        viewer: &Viewer<'_>,
        unit: &UsageKey,
        thirdparty_handler_url: &str,
    ) -> Fragment {
        self.student_view_can_fail(viewer, unit, thirdparty_handler_url)
            .unwrap_or_else(|e| {
                error!(
                    unit = %unit,
                    error = %e,
                    "summary hook aside suppressed error during student_view"
                );
                Fragment::default()
            })
    }

    fn student_view_can_fail(
        &self,
        viewer: &Viewer<'_>,
        unit: &UsageKey,
        thirdparty_handler_url: &str,
    ) -> Result<Fragment> {
        let bundle = extract(self.blocks, self.config, unit)?;
        if bundle.total_length < self.config.min_size {
            return Ok(Fragment::default());
        }

        let meta = self.blocks.meta(unit)?;
        let course = unit.course_key()?;
        info!(unit = %unit, "summary hook injecting launcher");
        render_hook_fragment(
            self.config,
            &user_role_string(viewer.users, viewer.credit, &course),
            &summary_handler_url(self.config, thirdparty_handler_url)?,
            &meta,
            &bundle.items,
        )
    }
}

/// `role` plus the enrollment mode when the credit service knows one; `unknown` without a
/// user.
pub fn user_role_string(
    users: &dyn UserService,
    credit: &dyn CreditService,
    course: &CourseKey,
) -> String {
    let Some(user) = users.current_user() else {
        return "unknown".to_string();
    };
    let role = user.role.unwrap_or_else(|| "unknown".to_string());
    match credit
        .credit_state(&user.id, course)
        .and_then(|c| c.enrollment_mode)
    {
        Some(mode) => format!("{role} {mode}"),
        None => role,
    }
}

/// The authenticated summary handler URL, reachable from the summarizer.
pub fn summary_handler_url(cfg: &SummaryConfig, thirdparty_url: &str) -> Result<String> {
    let mut url = url::Url::parse(thirdparty_url)
        .map_err(|e| Error::InvalidUrl(format!("{thirdparty_url}: {e}")))?;
    let path = url.path().replace("handler_noauth", "handler");
    url.set_path(&path);
    if !cfg.aispot_lms_name.is_empty() && url.host_str() == Some("localhost") {
        url.set_host(Some(&cfg.aispot_lms_name))
            .map_err(|e| Error::InvalidUrl(format!("{}: {e}", cfg.aispot_lms_name)))?;
    }
    Ok(url.to_string())
}

pub fn render_hook_fragment(
    cfg: &SummaryConfig,
    user_role: &str,
    handler_url: &str,
    unit: &BlockMeta,
    items: &[ExtractedItem],
) -> Result<Fragment> {
    let course = unit.usage_key.course_key()?;
    let last_updated = [unit.published_on, unit.edited_on]
        .into_iter()
        .chain(items.iter().flat_map(|i| [i.published_on, i.edited_on]))
        .flatten()
        .max()
        .map(|ts| format_timestamp(&ts))
        .unwrap_or_default();

    let attr = |s: &str| html_escape::encode_double_quoted_attribute(s).into_owned();
    let content = format!(
        r#"
<div>&nbsp;</div>
<div class="summary-hook">
  <div summary-launch>
    <div id="launch-summary-button"
      data-url-api="{url_api}"
      data-course-id="{course_id}"
      data-content-id="{content_id}"
      data-handler-url="{handler_url}"
      data-last-updated="{last_updated}"
      data-user-role="{user_role}"
    >
    </div>
  </div>
  <div id="ai-spot-root"></div>
  <script type="text/javascript" src="{js_url}" defer="defer"></script>
</div>
"#,
        url_api = attr(&cfg.hook_host),
        course_id = attr(course.as_str()),
        content_id = attr(unit.usage_key.as_str()),
        handler_url = attr(handler_url),
        last_updated = attr(&last_updated),
        user_role = attr(user_role),
        js_url = attr(&cfg.js_url()),
    );
    Ok(Fragment { content })
}

/// Serves the text of any block and its descendants, for staff and services only.
pub struct ExtractorAside<'a> {
    pub config: &'a SummaryConfig,
    pub blocks: &'a dyn BlockStore,
}

impl<'a> ExtractorAside<'a> {
    pub fn new(config: &'a SummaryConfig, blocks: &'a dyn BlockStore) -> Self {
        Self { config, blocks }
    }

    pub fn extract_handler(&self, user_is_staff: bool, root: &UsageKey) -> Result<ExtractResponse> {
        if !user_is_staff {
            return Ok(HandlerResponse::Forbidden);
        }
        match extract_block_content(self.blocks, self.config, root) {
            Ok(content) => Ok(HandlerResponse::Ok(ExtractBody { content })),
            Err(Error::BlockNotFound(_)) => Ok(HandlerResponse::NotFound),
            Err(e) => Err(e),
        }
    }
}
