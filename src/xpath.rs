//! Minimal tag scanner for Kannel's `status.xml` output.
//!
//! This is not an XML parser. It locates literal `<name>` / `</name>` pairs and
//! returns the text between them, which is all the status page needs.

use serde::{Deserialize, Serialize};

/// How the closing tag of an element is located.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanMode {
    /// Search for the closing tag only after the opening tag.
    #[default]
    Anchored,
    /// Search for the closing tag from the start of the working text. A
    /// closing tag that precedes the opening tag yields an empty span.
    Legacy,
}

/// Location of one element inside a text buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Span {
    inner_start: usize,
    inner_end: usize,
    /// Offset just past the closing tag used to advance sibling iteration.
    next: usize,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TagScanner {
    mode: ScanMode,
}

impl TagScanner {
    pub fn new(mode: ScanMode) -> Self {
        Self { mode }
    }

    fn locate(&self, text: &str, name: &str) -> Option<Span> {
        let open = format!("<{}>", name);
        let close = format!("</{}>", name);

        let open_at = text.find(&open)?;
        let inner_start = open_at + open.len();

        match self.mode {
            ScanMode::Anchored => {
                let close_at = inner_start + text[inner_start..].find(&close)?;
                Some(Span {
                    inner_start,
                    inner_end: close_at,
                    next: close_at + close.len(),
                })
            }
            ScanMode::Legacy => {
                let close_at = text.find(&close)?;
                // Closing tag before the opening tag collapses to an empty span.
                let inner_end = close_at.max(inner_start);
                Some(Span {
                    inner_start,
                    inner_end,
                    next: close_at + close.len(),
                })
            }
        }
    }

    /// Inner text of the first `<name>...</name>` in `text`.
    pub fn element<'a>(&self, text: &'a str, name: &str) -> Option<&'a str> {
        self.locate(text, name)
            .map(|span| &text[span.inner_start..span.inner_end])
    }

    /// Follow a slash separated path of tag names, narrowing the working text
    /// to each match in turn.
    ///
    /// ```text
    /// extract("gateway/sms/inbound", doc) => text of <inbound> under <sms> under <gateway>
    /// ```
    pub fn extract<'a>(&self, path: &str, document: &'a str) -> Option<&'a str> {
        path.split('/')
            .filter(|segment| !segment.is_empty())
            .try_fold(document, |node, segment| self.element(node, segment))
    }

    /// Iterate the bodies of sibling elements named `name` inside `body`.
    pub fn elements<'a, 'n>(&self, name: &'n str, body: &'a str) -> Elements<'a, 'n> {
        Elements {
            scanner: *self,
            name,
            rest: body,
        }
    }
}

/// Lazy sequence of same-named element bodies.
///
/// Ends at the first missing or empty element. A body that contains the
/// literal closing tag of its own element ends the sequence early.
pub struct Elements<'a, 'n> {
    scanner: TagScanner,
    name: &'n str,
    rest: &'a str,
}

impl<'a, 'n> Iterator for Elements<'a, 'n> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        let span = self.scanner.locate(self.rest, self.name)?;
        let body = &self.rest[span.inner_start..span.inner_end];
        if body.is_empty() {
            self.rest = "";
            return None;
        }
        self.rest = &self.rest[span.next..];
        Some(body)
    }
}

/// Path lookup with the default scanner.
pub fn extract_by_path<'a>(path: &str, document: &'a str) -> Option<&'a str> {
    TagScanner::default().extract(path, document)
}
