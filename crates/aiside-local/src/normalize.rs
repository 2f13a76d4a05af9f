//! Markup to plain text.
//!
//! This is a tolerant tag stream, not a DOM parser: course authors write all kinds of broken
//! markup and we only need the text. A single `is_content` flag is overwritten by every start
//! tag; end tags never touch it. So `<p>a <script>x</script> b</p>` keeps `a` but drops `b`
//! when `script` is removed, since nothing re-opens content until the next start tag.

use std::collections::BTreeSet;

/// Elements whose body is raw text up to the matching close tag.
const RAW_TEXT_TAGS: [&str; 2] = ["script", "style"];

/// Extract the readable text of `html`, skipping text that directly follows a start tag whose
/// (lowercase) name is in `tags_to_remove`.
///
/// Never fails: anything that does not parse as markup is treated as text, and an unterminated
/// construct at the end of input is dropped.
pub fn html_to_text(html: &str, tags_to_remove: &BTreeSet<String>) -> String {
    cleanup_text(&collect_content(html, tags_to_remove))
}

/// Collapse whitespace runs inside lines, strip each line and drop blank ones.
pub fn cleanup_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.split('\n') {
        let mut words = line.split_whitespace();
        let Some(first) = words.next() else {
            continue;
        };
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(first);
        for w in words {
            out.push(' ');
            out.push_str(w);
        }
    }
    out
}

struct Collector<'a> {
    tags_to_remove: &'a BTreeSet<String>,
    is_content: bool,
    out: String,
}

impl Collector<'_> {
    fn start_tag(&mut self, name: &str) {
        self.is_content = !self.tags_to_remove.contains(name);
    }

    fn data(&mut self, s: &str) {
        if self.is_content {
            self.out.push_str(s);
        }
    }

    fn entity(&mut self, name: &str) {
        if self.is_content {
            self.out.push('&');
            self.out.push_str(name);
            self.out.push(';');
        }
    }
}

enum Markup {
    /// A lone `<`.
    Text,
    /// End tag, comment, declaration or processing instruction of this many bytes.
    Skip(usize),
    StartTag {
        name: String,
        consumed: usize,
        self_closing: bool,
    },
    Unterminated,
}

fn collect_content(html: &str, tags_to_remove: &BTreeSet<String>) -> String {
    let mut c = Collector {
        tags_to_remove,
        is_content: true,
        out: String::with_capacity(html.len()),
    };
    let mut rest = html;
    while !rest.is_empty() {
        let Some(at) = rest.find(['<', '&']) else {
            c.data(rest);
            break;
        };
        c.data(&rest[..at]);
        rest = &rest[at..];

        if rest.starts_with('&') {
            match entity_ref(rest) {
                Some((name, consumed)) => {
                    c.entity(name);
                    rest = &rest[consumed..];
                }
                None => {
                    c.data("&");
                    rest = &rest[1..];
                }
            }
            continue;
        }

        match markup(rest) {
            Markup::Text => {
                c.data("<");
                rest = &rest[1..];
            }
            Markup::Skip(consumed) => rest = &rest[consumed..],
            Markup::StartTag {
                name,
                consumed,
                self_closing,
            } => {
                c.start_tag(&name);
                rest = &rest[consumed..];
                if !self_closing && RAW_TEXT_TAGS.contains(&name.as_str()) {
                    let Some(end) = find_close_tag(rest, &name) else {
                        break;
                    };
                    c.data(&rest[..end]);
                    rest = &rest[end..];
                }
            }
            Markup::Unterminated => break,
        }
    }
    c.out
}

/// `&name`, `&#123` or `&#x7b`, with an optional `;`. Returns the name and bytes consumed.
fn entity_ref(s: &str) -> Option<(&str, usize)> {
    let body = &s[1..];
    let bytes = body.as_bytes();
    let len = match *bytes.first()? {
        b'#' => {
            let (prefix, digits) = match bytes.get(1) {
                Some(b'x' | b'X') => (
                    2,
                    bytes[2..].iter().take_while(|b| b.is_ascii_hexdigit()).count(),
                ),
                _ => (
                    1,
                    bytes[1..].iter().take_while(|b| b.is_ascii_digit()).count(),
                ),
            };
            if digits == 0 {
                return None;
            }
            prefix + digits
        }
        b if b.is_ascii_alphabetic() => {
            1 + bytes[1..]
                .iter()
                .take_while(|b| b.is_ascii_alphanumeric() || matches!(**b, b'-' | b'.'))
                .count()
        }
        _ => return None,
    };
    let consumed = 1 + len + usize::from(bytes.get(len) == Some(&b';'));
    Some((&body[..len], consumed))
}

fn markup(s: &str) -> Markup {
    match s.as_bytes().get(1) {
        Some(b'!') if s.starts_with("<!--") => s[4..]
            .find("-->")
            .map_or(Markup::Unterminated, |end| Markup::Skip(4 + end + 3)),
        Some(b'!' | b'?' | b'/') => skip_past_gt(s),
        Some(b) if b.is_ascii_alphabetic() => start_tag(s),
        _ => Markup::Text,
    }
}

fn skip_past_gt(s: &str) -> Markup {
    s.find('>')
        .map_or(Markup::Unterminated, |end| Markup::Skip(end + 1))
}

fn start_tag(s: &str) -> Markup {
    let name_end = s[1..]
        .find(|c: char| c.is_whitespace() || c == '/' || c == '>')
        .map_or(s.len(), |i| i + 1);
    let name = s[1..name_end].to_ascii_lowercase();

    // Attribute values may contain `>` when quoted.
    let mut quote: Option<char> = None;
    let mut after_eq = false;
    let mut prev = '\0';
    for (i, ch) in s[name_end..].char_indices() {
        if let Some(q) = quote {
            if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '>' => {
                return Markup::StartTag {
                    name,
                    consumed: name_end + i + 1,
                    self_closing: prev == '/',
                }
            }
            '"' | '\'' if after_eq => {
                quote = Some(ch);
                after_eq = false;
            }
            '=' => after_eq = true,
            c if c.is_whitespace() => continue,
            _ => after_eq = false,
        }
        prev = ch;
    }
    Markup::Unterminated
}

/// Byte offset of the close tag for `name` (ASCII case-insensitive) in `s`. The name must end
/// at `>`, `/`, whitespace or end of input, so `</scripts>` does not close `script`.
fn find_close_tag(s: &str, name: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let name = name.as_bytes();
    let mut from = 0;
    while let Some(i) = s[from..].find("</") {
        let at = from + i;
        let name_end = at + 2 + name.len();
        let matches_name = bytes
            .get(at + 2..name_end)
            .is_some_and(|candidate| candidate.eq_ignore_ascii_case(name));
        let ends_name = bytes
            .get(name_end)
            .map_or(true, |b| matches!(b, b'>' | b'/') || b.is_ascii_whitespace());
        if matches_name && ends_name {
            return Some(at);
        }
        from = at + 2;
    }
    None
}
