//! Caption files to plain transcript text.
//!
//! Small and deterministic: headers, cue ids, timing lines and NOTE/STYLE blocks are dropped,
//! a cue's lines are joined with a space, and each cue lands on its own line.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptFormat {
    /// Already plain text.
    #[default]
    Txt,
    Srt,
    Vtt,
}

impl TranscriptFormat {
    pub fn to_text(self, body: &str) -> String {
        match self {
            Self::Txt => body.trim().to_string(),
            Self::Srt => srt_to_text(body),
            Self::Vtt => vtt_to_text(body),
        }
    }
}

pub fn srt_to_text(srt: &str) -> String {
    cues_to_text(srt)
}

pub fn vtt_to_text(vtt: &str) -> String {
    cues_to_text(vtt)
}

// SRT and WebVTT agree on what matters here: cues are blank-line separated blocks whose text
// follows a `-->` timing line. Blocks without a timing line (WEBVTT header, NOTE, STYLE,
// REGION) carry no spoken text.
fn cues_to_text(captions: &str) -> String {
    let captions = captions.trim_start_matches('\u{feff}');
    let mut out = String::new();
    let mut block: Vec<&str> = Vec::new();
    for line in captions.lines().chain(std::iter::once("")) {
        let l = line.trim();
        if !l.is_empty() {
            block.push(l);
            continue;
        }
        if let Some(timing) = block.iter().position(|l| l.contains("-->")) {
            let mut cue = String::new();
            for text in &block[timing + 1..] {
                for word in strip_cue_markup(text).split_whitespace() {
                    if !cue.is_empty() {
                        cue.push(' ');
                    }
                    cue.push_str(word);
                }
            }
            if !cue.is_empty() {
                if !out.is_empty() {
                    out.push('\n');
                }
                out.push_str(&cue);
            }
        }
        block.clear();
    }
    out
}

/// Drop `<i>`, `<v Speaker>`, `<00:00:01.000>` and friends.
fn strip_cue_markup(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut in_tag = false;
    for ch in line.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    out
}
