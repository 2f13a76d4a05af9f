//! Local implementations for `aiside`.
//!
//! Everything here runs in-process and synchronously: the text normalizer, the
//! summarizability gate and extractor, caption conversion, the in-memory block store, the
//! settings stores, and the aside entry points that a host runtime calls.

pub mod aside;
pub mod extract;
pub mod flags;
pub mod gate;
pub mod memory;
pub mod normalize;
pub mod services;
pub mod settings;
pub mod transcript;

#[cfg(test)]
mod testing;

pub use aside::{
    render_hook_fragment, summary_handler_url, user_role_string, ExtractBody, ExtractResponse,
    ExtractorAside, Fragment, HandlerResponse, SummaryBody, SummaryHookAside, SummaryItem,
    SummaryResponse, UnitSummary, Viewer,
};
pub use extract::{block_text, extract, extract_block_content};
pub use flags::StaticFlags;
pub use gate::{inspect_child, is_summarizable, Contribution, Skipped};
pub use memory::{BlockNode, MemoryStore, TranscriptSource};
pub use normalize::{cleanup_text, html_to_text};
pub use services::{StaticCredit, StaticUser};
pub use settings::{FileSettings, MemorySettings, SettingsTables, SettingsUpdate};
pub use transcript::{srt_to_text, vtt_to_text, TranscriptFormat};
