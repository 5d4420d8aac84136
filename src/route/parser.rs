//! Path-template parsing.
//!
//! Converts templates such as `/users/{id:\d+}/posts/{slug}` into one
//! [`SegmentMatcher`] per segment. Parameter keys are the positions of the
//! parameter names in the route, in template order.

use std::collections::BTreeMap;

use crate::error::RoutingError;
use crate::matchers::{
    AnyMatcher, CompoundMatcher, ExpressionMatcher, ParameterMatcher, SegmentMatcher, StaticMatcher,
};

/// Default pattern for a placeholder without an explicit regex.
pub const DEFAULT_PARAMETER_PATTERN: &str = "[^/]+";

/// A parsed route path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPath {
    /// Normalised template (leading `/`, no trailing `/` except for the root)
    pub template: String,
    /// One matcher per segment
    pub segments: Vec<SegmentMatcher>,
    /// Parameter names indexed by parameter key
    pub parameter_names: Vec<String>,
    /// True when at least one segment carries an expression constraint
    pub constrained: bool,
}

impl ParsedPath {
    /// A path without parameters can be served from the static map.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.parameter_names.is_empty() && !self.constrained
    }

    /// Whether the route must be dispatched segment by segment: it carries a
    /// constraint, or a segment pattern could match across a `/`.
    #[must_use]
    pub fn needs_segment_tree(&self) -> bool {
        self.constrained || self.segments.iter().any(|s| s.regex_fragment().is_none())
    }
}

#[derive(Debug)]
enum Piece {
    Literal(String),
    Param { name: String, pattern: Option<String> },
}

/// Normalise a path or template: ensure a leading `/` and drop a trailing `/`.
#[must_use]
pub fn normalize_path(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

/// Split a normalised path into segments; the root has none.
#[must_use]
pub fn split_segments(path: &str) -> Vec<&str> {
    if path == "/" {
        Vec::new()
    } else {
        path.trim_start_matches('/').split('/').collect()
    }
}

/// Parse `template`, ANDing `constraints` (parameter name → expression text)
/// onto the segments holding those parameters.
pub fn parse_path(template: &str, constraints: &BTreeMap<String, String>) -> Result<ParsedPath, RoutingError> {
    let normalized = normalize_path(template);
    let mut segments = Vec::new();
    let mut parameter_names: Vec<String> = Vec::new();
    let mut constrained_params = Vec::new();

    for raw in split_segments(&normalized) {
        if raw.is_empty() {
            return Err(RoutingError::invalid_pattern(template, "empty path segment"));
        }
        let pieces = split_pieces(raw).map_err(|reason| RoutingError::invalid_pattern(template, reason))?;
        let first_key = parameter_names.len();
        let mut names = Vec::new();
        for piece in &pieces {
            if let Piece::Param { name, .. } = piece {
                if parameter_names.contains(name) || names.contains(name) {
                    return Err(RoutingError::invalid_pattern(
                        template,
                        format!("parameter '{name}' appears more than once"),
                    ));
                }
                names.push(name.clone());
            }
        }

        let mut matcher = segment_matcher(first_key, &names, &pieces)?;

        if let Some(name) = names.iter().find(|n| constraints.contains_key(*n)) {
            let whole_segment = pieces.len() == 1 && names.len() == 1;
            if !whole_segment {
                return Err(RoutingError::invalid_pattern(
                    template,
                    format!("constraint on '{name}' requires it to fill its whole segment"),
                ));
            }
            let expression = ExpressionMatcher::new(constraints[name].clone(), [first_key])?;
            matcher = CompoundMatcher::new(vec![matcher, expression.into()])?.into();
            constrained_params.push(name.clone());
        }

        parameter_names.extend(names);
        segments.push(matcher);
    }

    if let Some(unknown) = constraints.keys().find(|k| !parameter_names.contains(k)) {
        return Err(RoutingError::invalid_pattern(
            template,
            format!("constraint refers to unknown parameter '{unknown}'"),
        ));
    }

    Ok(ParsedPath {
        template: normalized,
        segments,
        parameter_names,
        constrained: !constrained_params.is_empty(),
    })
}

fn segment_matcher(first_key: usize, names: &[String], pieces: &[Piece]) -> Result<SegmentMatcher, RoutingError> {
    match pieces {
        [Piece::Literal(literal)] => Ok(StaticMatcher::new(literal.clone(), [])?.into()),
        [Piece::Param { pattern: None, .. }] => Ok(AnyMatcher::new([first_key]).into()),
        _ => {
            let mut regex = String::new();
            for piece in pieces {
                match piece {
                    Piece::Literal(literal) => regex.push_str(&regex::escape(literal)),
                    Piece::Param { pattern, .. } => {
                        let inner = pattern.as_deref().unwrap_or(DEFAULT_PARAMETER_PATTERN);
                        regex.push('(');
                        regex.push_str(&to_non_capturing(inner));
                        regex.push(')');
                    }
                }
            }
            Ok(ParameterMatcher::new(first_key, names.to_vec(), regex)?.into())
        }
    }
}

fn split_pieces(segment: &str) -> Result<Vec<Piece>, String> {
    let mut pieces = Vec::new();
    let mut literal = String::new();
    let mut chars = segment.chars();

    while let Some(c) = chars.next() {
        match c {
            '{' => {
                let mut depth = 1;
                let mut body = String::new();
                for c in chars.by_ref() {
                    match c {
                        '{' => depth += 1,
                        '}' => depth -= 1,
                        _ => {}
                    }
                    if depth == 0 {
                        break;
                    }
                    body.push(c);
                }
                if depth != 0 {
                    return Err(format!("unclosed '{{' in segment '{segment}'"));
                }
                if !literal.is_empty() {
                    pieces.push(Piece::Literal(std::mem::take(&mut literal)));
                }
                pieces.push(parse_placeholder(&body)?);
            }
            '}' => return Err(format!("unmatched '}}' in segment '{segment}'")),
            _ => literal.push(c),
        }
    }
    if !literal.is_empty() {
        pieces.push(Piece::Literal(literal));
    }
    Ok(pieces)
}

fn parse_placeholder(body: &str) -> Result<Piece, String> {
    let (name, pattern) = match body.split_once(':') {
        Some((name, pattern)) => (name.trim(), Some(pattern.trim())),
        None => (body.trim(), None),
    };
    let valid_name = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid_name {
        return Err(format!("invalid parameter name '{name}'"));
    }
    if pattern == Some("") {
        return Err(format!("empty pattern for parameter '{name}'"));
    }
    Ok(Piece::Param {
        name: name.to_string(),
        pattern: pattern.map(str::to_string),
    })
}

/// Rewrite capturing groups in `pattern` as non-capturing ones so that each
/// placeholder owns exactly one capture group.
pub(crate) fn to_non_capturing(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len() + 4);
    let mut in_class = false;
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            '\\' => {
                out.push(c);
                if let Some(next) = chars.get(i + 1) {
                    out.push(*next);
                }
                i += 2;
                continue;
            }
            '[' if !in_class => in_class = true,
            ']' if in_class => in_class = false,
            '(' if !in_class => {
                let rest: String = chars[i + 1..].iter().take(3).collect();
                if rest.starts_with("?P<") || (rest.starts_with("?<") && !rest.starts_with("?<=") && !rest.starts_with("?<!")) {
                    // named group: drop the name
                    out.push_str("(?:");
                    i += 1;
                    while i < chars.len() && chars[i] != '>' {
                        i += 1;
                    }
                    i += 1;
                    continue;
                }
                if !rest.starts_with('?') {
                    out.push_str("(?:");
                    i += 1;
                    continue;
                }
            }
            _ => {}
        }
        out.push(c);
        i += 1;
    }
    out
}
