//! Best-effort streaming HTML tag scanner.
//!
//! Turns raw markup into a flat stream of start-tag / end-tag / text events
//! for the link and form extractors. This is not a conforming HTML parser:
//! it never fails on malformed input, ignores nesting entirely, and skips
//! comments and declarations. Mailing-list HTML is routinely broken, so
//! "keep going and emit what you can" is the required behavior here.

use std::borrow::Cow;

/// A parsed start tag with its attributes.
///
/// Tag and attribute names are lowercased; attribute values are
/// entity-decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub name: String,
    attrs: Vec<(String, String)>,
}

impl Tag {
    /// Value for `name` (lowercase), if present. A repeated attribute
    /// resolves to its last occurrence.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .rev()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// One event in the markup stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HtmlEvent<'a> {
    /// `<name attr=value …>` (also emitted for self-closing tags).
    Start(Tag),
    /// `</name>`.
    End(String),
    /// Character data between tags, entity-decoded.
    Text(Cow<'a, str>),
}

/// Iterator over [`HtmlEvent`]s of a raw HTML string.
pub struct HtmlScanner<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> HtmlScanner<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    /// Consume a text run up to the next `<` (or end of input).
    fn scan_text(&mut self) -> Option<HtmlEvent<'a>> {
        let rest = self.rest();
        let end = rest.find('<').unwrap_or(rest.len());
        // A lone `<` that opens nothing plausible is swallowed as text below,
        // so `end` can be 0 only when we are called on a real tag.
        let text = &rest[..end];
        self.pos += end;
        if text.is_empty() {
            None
        } else {
            Some(HtmlEvent::Text(unescape(text)))
        }
    }

    /// Skip past the next `>` (or to end of input). Used for comments and
    /// declarations.
    fn skip_past(&mut self, needle: &str) {
        let rest = self.rest();
        match rest.find(needle) {
            Some(idx) => self.pos += idx + needle.len(),
            None => self.pos = self.input.len(),
        }
    }

    /// Parse `</name …>` starting at `self.pos` (which points at `</`).
    fn scan_end_tag(&mut self) -> Option<HtmlEvent<'a>> {
        let rest = &self.rest()[2..];
        let close = match rest.find('>') {
            Some(idx) => idx,
            None => {
                // Unterminated end tag: consume everything, emit nothing.
                self.pos = self.input.len();
                return None;
            }
        };
        let name: String = rest[..close]
            .trim()
            .chars()
            .take_while(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();
        self.pos += 2 + close + 1;
        if name.is_empty() {
            None
        } else {
            Some(HtmlEvent::End(name))
        }
    }

    /// Parse `<name attr=value …>` starting at `self.pos` (pointing at `<`).
    fn scan_start_tag(&mut self) -> Option<HtmlEvent<'a>> {
        let rest = &self.rest()[1..];
        let bytes = rest.as_bytes();

        let mut i = 0;
        while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'-') {
            i += 1;
        }
        let name = rest[..i].to_ascii_lowercase();

        let mut attrs = Vec::new();
        loop {
            // Skip whitespace and stray slashes (self-closing syntax).
            while i < bytes.len() && (bytes[i].is_ascii_whitespace() || bytes[i] == b'/') {
                i += 1;
            }
            if i >= bytes.len() {
                // Unterminated tag: consume everything, still emit the tag.
                self.pos = self.input.len();
                return Some(HtmlEvent::Start(Tag { name, attrs }));
            }
            if bytes[i] == b'>' {
                self.pos += 1 + i + 1;
                return Some(HtmlEvent::Start(Tag { name, attrs }));
            }

            // Attribute name
            let attr_start = i;
            while i < bytes.len()
                && !bytes[i].is_ascii_whitespace()
                && bytes[i] != b'='
                && bytes[i] != b'>'
                && bytes[i] != b'/'
            {
                i += 1;
            }
            let attr_name = rest[attr_start..i].to_ascii_lowercase();

            // Optional value
            while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            let value = if i < bytes.len() && bytes[i] == b'=' {
                i += 1;
                while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                    i += 1;
                }
                if i < bytes.len() && (bytes[i] == b'"' || bytes[i] == b'\'') {
                    let quote = bytes[i];
                    i += 1;
                    let val_start = i;
                    while i < bytes.len() && bytes[i] != quote {
                        i += 1;
                    }
                    let val = &rest[val_start..i];
                    if i < bytes.len() {
                        i += 1; // closing quote
                    }
                    val
                } else {
                    let val_start = i;
                    while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b'>' {
                        i += 1;
                    }
                    &rest[val_start..i]
                }
            } else {
                ""
            };

            if !attr_name.is_empty() {
                attrs.push((attr_name, unescape(value).into_owned()));
            }
        }
    }
}

impl<'a> Iterator for HtmlScanner<'a> {
    type Item = HtmlEvent<'a>;

    fn next(&mut self) -> Option<HtmlEvent<'a>> {
        loop {
            if self.pos >= self.input.len() {
                return None;
            }
            let rest = self.rest();
            if let Some(stripped) = rest.strip_prefix('<') {
                if stripped.starts_with("!--") {
                    self.skip_past("-->");
                    continue;
                }
                if stripped.starts_with('!') || stripped.starts_with('?') {
                    self.skip_past(">");
                    continue;
                }
                if stripped.starts_with('/') {
                    match self.scan_end_tag() {
                        Some(event) => return Some(event),
                        None => continue,
                    }
                }
                if stripped
                    .chars()
                    .next()
                    .is_some_and(|c| c.is_ascii_alphabetic())
                {
                    match self.scan_start_tag() {
                        Some(event) => return Some(event),
                        None => continue,
                    }
                }
                // Stray `<`: swallow it as text together with what follows.
                let after = &rest[1..];
                let end = after.find('<').map(|i| i + 1).unwrap_or(rest.len());
                let text = &rest[..end];
                self.pos += end;
                return Some(HtmlEvent::Text(unescape(text)));
            }
            match self.scan_text() {
                Some(event) => return Some(event),
                None => continue,
            }
        }
    }
}

/// Decode the handful of character references that actually occur in
/// mailing-list markup. Unknown references pass through untouched.
fn unescape(input: &str) -> Cow<'_, str> {
    if !input.contains('&') {
        return Cow::Borrowed(input);
    }

    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];

        // Search raw bytes so the window never splits a multibyte character.
        let semi = match rest.as_bytes().iter().take(12).position(|&b| b == b';') {
            Some(idx) => idx,
            None => {
                out.push('&');
                rest = &rest[1..];
                continue;
            }
        };
        let entity = &rest[1..semi];
        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            "nbsp" => Some(' '),
            _ => entity
                .strip_prefix('#')
                .and_then(|num| {
                    if let Some(hex) = num.strip_prefix('x').or_else(|| num.strip_prefix('X')) {
                        u32::from_str_radix(hex, 16).ok()
                    } else {
                        num.parse::<u32>().ok()
                    }
                })
                .and_then(char::from_u32),
        };
        match decoded {
            Some(c) => {
                out.push(c);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}
