//! Predicate trees produced by segment matchers.
//!
//! A [`Condition`] is evaluated directly against a path segment. Rendering a
//! condition with [`Condition::render`] gives a readable boolean expression
//! for logs and route dumps; it is never compiled or evaluated as text.

use regex::Regex;
use regex_syntax::hir::{Class, Hir, HirKind};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::expression::SegmentExpression;
use crate::error::RoutingError;

/// A regex compiled for whole-segment matching.
///
/// The source text is kept verbatim (it is the match hash of regex matchers);
/// the compiled form is anchored as `^(?:source)$`.
#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CompiledPattern {
    source: String,
    regex: Regex,
    spans_separator: bool,
}

impl CompiledPattern {
    /// Compile `source` anchored to the whole segment.
    pub fn new(source: impl Into<String>) -> Result<Self, RoutingError> {
        let source = source.into();
        let regex = Regex::new(&format!("^(?:{source})$"))
            .map_err(|e| RoutingError::invalid_pattern(source.clone(), e.to_string()))?;
        let hir = regex_syntax::parse(&source)
            .map_err(|e| RoutingError::invalid_pattern(source.clone(), e.to_string()))?;
        Ok(Self {
            spans_separator: can_match_separator(&hir),
            source,
            regex,
        })
    }

    /// Whether some string containing `/` matches the pattern.
    ///
    /// Segments never contain the separator, so such a pattern behaves
    /// differently once it is embedded in a whole-path regex.
    #[must_use]
    pub fn spans_separator(&self) -> bool {
        self.spans_separator
    }

    /// The pattern text as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// The anchored compiled regex.
    #[must_use]
    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    /// Number of capture groups in the pattern, not counting group 0.
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.regex.captures_len() - 1
    }

    #[must_use]
    pub fn is_match(&self, segment: &str) -> bool {
        self.regex.is_match(segment)
    }
}

fn can_match_separator(hir: &Hir) -> bool {
    match hir.kind() {
        HirKind::Empty | HirKind::Look(_) => false,
        HirKind::Literal(literal) => literal.0.contains(&b'/'),
        HirKind::Class(Class::Unicode(class)) => class.ranges().iter().any(|r| r.start() <= '/' && '/' <= r.end()),
        HirKind::Class(Class::Bytes(class)) => class.ranges().iter().any(|r| r.start() <= b'/' && b'/' <= r.end()),
        HirKind::Repetition(repetition) => repetition.max != Some(0) && can_match_separator(&repetition.sub),
        HirKind::Capture(capture) => can_match_separator(&capture.sub),
        HirKind::Concat(children) | HirKind::Alternation(children) => children.iter().any(can_match_separator),
    }
}

impl PartialEq for CompiledPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for CompiledPattern {}

impl fmt::Debug for CompiledPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CompiledPattern").field(&self.source).finish()
    }
}

impl TryFrom<String> for CompiledPattern {
    type Error = RoutingError;

    fn try_from(source: String) -> Result<Self, Self::Error> {
        CompiledPattern::new(source)
    }
}

impl From<CompiledPattern> for String {
    fn from(pattern: CompiledPattern) -> Self {
        pattern.source
    }
}

/// Boolean test deciding whether a segment satisfies a matcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// Segment equals the literal exactly
    Literal(String),
    /// Segment is non-empty
    Wildcard,
    /// Segment matches the anchored regex
    Pattern(CompiledPattern),
    /// Segment satisfies a named expression
    Expression(SegmentExpression),
    /// Every child condition holds, evaluated in order
    All(Vec<Condition>),
}

impl Condition {
    /// Evaluate the condition against one path segment.
    #[must_use]
    pub fn evaluate(&self, segment: &str) -> bool {
        match self {
            Condition::Literal(literal) => segment == literal,
            Condition::Wildcard => !segment.is_empty(),
            Condition::Pattern(pattern) => pattern.is_match(segment),
            Condition::Expression(expression) => expression.evaluate(segment),
            Condition::All(children) => children.iter().all(|c| c.evaluate(segment)),
        }
    }

    /// Render the condition as a boolean expression over `segment_var`.
    ///
    /// ```
    /// use routeforge::matchers::Condition;
    ///
    /// let c = Condition::All(vec![
    ///     Condition::Literal("a".into()),
    ///     Condition::Literal("b".into()),
    /// ]);
    /// assert_eq!(c.render("$x"), r#"$x == "a" && $x == "b""#);
    /// ```
    #[must_use]
    pub fn render(&self, segment_var: &str) -> String {
        match self {
            Condition::Literal(literal) => format!("{segment_var} == {literal:?}"),
            Condition::Wildcard => format!("{segment_var} != \"\""),
            Condition::Pattern(pattern) => format!("{segment_var} =~ /{}/", pattern.as_str()),
            Condition::Expression(expression) => expression.render(segment_var),
            Condition::All(children) => children
                .iter()
                .map(|child| match child {
                    Condition::All(_) => format!("({})", child.render(segment_var)),
                    _ => child.render(segment_var),
                })
                .collect::<Vec<_>>()
                .join(" && "),
        }
    }
}

/// How a matched parameter value is taken from its segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extractor {
    /// The whole segment is the value
    Segment,
    /// The value is the given capture group of the owning regex matcher
    Group(usize),
}
