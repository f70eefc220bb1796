//! Named-placeholder templates.
//!
//! Templates use `{name}` placeholders; `{{` and `}}` emit literal braces.
//! Rendering is a pure function of the template and an explicit
//! name-to-value map, so a missing name is an ordinary error value.

use std::collections::HashMap;
use thiserror::Error;

/// Errors from parsing or rendering a template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("prompt template references missing parameter '{name}'")]
    MissingPlaceholder { name: String },

    #[error("malformed template: {0}")]
    Malformed(String),
}

/// Values available to a render call, keyed by placeholder name.
pub type Params<'a> = HashMap<&'a str, String>;

/// A segment of a parsed template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Literal text, emitted as-is.
    Literal(String),
    /// A `{name}` substitution point.
    Placeholder(String),
}

/// A parsed template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    /// Parse a template string into literal and placeholder segments.
    pub fn parse(input: &str) -> Result<Template, TemplateError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = input.char_indices().peekable();

        while let Some((pos, c)) = chars.next() {
            match c {
                '{' => {
                    if matches!(chars.peek(), Some((_, '{'))) {
                        chars.next();
                        literal.push('{');
                        continue;
                    }

                    let mut name = String::new();
                    let mut closed = false;
                    for (_, inner) in chars.by_ref() {
                        match inner {
                            '}' => {
                                closed = true;
                                break;
                            }
                            '{' => {
                                return Err(TemplateError::Malformed(format!(
                                    "nested '{{' inside placeholder at byte {pos}"
                                )));
                            }
                            other => name.push(other),
                        }
                    }

                    if !closed {
                        return Err(TemplateError::Malformed(format!(
                            "unclosed placeholder at byte {pos}"
                        )));
                    }
                    if name.trim().is_empty() {
                        return Err(TemplateError::Malformed(format!(
                            "empty placeholder at byte {pos}"
                        )));
                    }

                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Placeholder(name));
                }
                '}' => {
                    if matches!(chars.peek(), Some((_, '}'))) {
                        chars.next();
                        literal.push('}');
                        continue;
                    }
                    return Err(TemplateError::Malformed(format!(
                        "unmatched '}}' at byte {pos}"
                    )));
                }
                other => literal.push(other),
            }
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Template { segments })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Placeholder names in order of first appearance.
    pub fn placeholders(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for segment in &self.segments {
            if let Segment::Placeholder(name) = segment {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
        }
        names
    }

    /// Substitute every placeholder from `params`.
    ///
    /// Fails on the first placeholder that has no entry. Substituted values
    /// are inserted verbatim and never re-parsed.
    pub fn render(&self, params: &Params<'_>) -> Result<String, TemplateError> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(name) => {
                    let value = params.get(name.as_str()).ok_or_else(|| {
                        TemplateError::MissingPlaceholder { name: name.clone() }
                    })?;
                    out.push_str(value);
                }
            }
        }
        Ok(out)
    }
}

/// Parse and render in one step.
pub fn substitute(template: &str, params: &Params<'_>) -> Result<String, TemplateError> {
    Template::parse(template)?.render(params)
}
