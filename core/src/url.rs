//! URL templates
//!
//! A template is built once per endpoint from the namespace chain's URL
//! segments. Path slots either appear explicitly as `{n}` inside a segment or,
//! when not referenced, are appended as trailing segments in slot order.

use crate::error::DefinitionError;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Literal(String),
    Slot(usize),
}

/// A resolved URL with numbered path slots
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTemplate {
    parts: Vec<Part>,
    slots: usize,
}

impl UrlTemplate {
    /// Join segments and lay out `slots` path slots
    ///
    /// Empty segments are skipped. The first segment keeps its leading part
    /// (scheme, host or a leading `/`); the others are trimmed of slashes.
    ///
    /// # Errors
    ///
    /// Returns [`DefinitionError::UnknownPlaceholder`] if a segment references
    /// `{n}` with `n >= slots`.
    pub fn compose<S: AsRef<str>>(segments: &[S], slots: usize, endpoint: &str) -> Result<Self, DefinitionError> {
        let mut joined = String::new();
        for (i, segment) in segments.iter().enumerate() {
            let segment = segment.as_ref();
            let segment = if i == 0 {
                segment.trim_end_matches('/')
            } else {
                segment.trim_matches('/')
            };
            if segment.is_empty() {
                continue;
            }
            if !joined.is_empty() {
                joined.push('/');
            }
            joined.push_str(segment);
        }

        let mut parts = parse_placeholders(&joined);
        let mut referenced = vec![false; slots];
        for part in &parts {
            if let Part::Slot(index) = *part {
                match referenced.get_mut(index) {
                    Some(seen) => *seen = true,
                    None => {
                        return Err(DefinitionError::UnknownPlaceholder {
                            endpoint: endpoint.to_string(),
                            index,
                        });
                    },
                }
            }
        }

        let mut has_content = !joined.is_empty();
        for (index, _) in referenced.iter().enumerate().filter(|(_, seen)| !**seen) {
            if has_content {
                parts.push(Part::Literal("/".to_string()));
            }
            parts.push(Part::Slot(index));
            has_content = true;
        }

        Ok(Self { parts, slots })
    }

    /// Number of path slots
    #[must_use]
    pub const fn slots(&self) -> usize {
        self.slots
    }

    /// Substitute slot values, percent-encoding each
    ///
    /// Missing values render as empty strings; the payload assembler reports
    /// unfilled slots before a URL is ever rendered.
    #[must_use]
    pub fn render(&self, values: &[String]) -> String {
        let mut url = String::new();
        for part in &self.parts {
            match part {
                Part::Literal(text) => url.push_str(text),
                Part::Slot(index) => {
                    if let Some(value) = values.get(*index) {
                        url.push_str(&urlencoding::encode(value));
                    }
                },
            }
        }
        url
    }
}

impl fmt::Display for UrlTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for part in &self.parts {
            match part {
                Part::Literal(text) => f.write_str(text)?,
                Part::Slot(index) => write!(f, "{{{index}}}")?,
            }
        }
        Ok(())
    }
}

fn parse_placeholders(text: &str) -> Vec<Part> {
    let mut parts = Vec::new();
    let mut literal = String::new();
    let mut rest = text;

    while let Some(open) = rest.find('{') {
        let after = &rest[open + 1..];
        let slot = after
            .find('}')
            .and_then(|close| after[..close].parse::<usize>().ok().map(|index| (close, index)));

        match slot {
            Some((close, index)) => {
                literal.push_str(&rest[..open]);
                if !literal.is_empty() {
                    parts.push(Part::Literal(std::mem::take(&mut literal)));
                }
                parts.push(Part::Slot(index));
                rest = &after[close + 1..];
            },
            None => {
                literal.push_str(&rest[..=open]);
                rest = after;
            },
        }
    }
    literal.push_str(rest);
    if !literal.is_empty() {
        parts.push(Part::Literal(literal));
    }
    parts
}
