//! # Segment Matchers
//!
//! A route path is split on `/` and every segment is described by a
//! [`SegmentMatcher`]: the rule deciding whether a request segment satisfies
//! the route, and which route parameters (identified by integer keys) the
//! segment yields.
//!
//! ## Variants
//!
//! | Variant | Matches | Match hash |
//! |---|---|---|
//! | [`StaticMatcher`] | the literal exactly | the literal |
//! | [`AnyMatcher`] | any non-empty segment | empty |
//! | [`RegexMatcher`] | the anchored regex | the pattern |
//! | [`ParameterMatcher`] | the anchored regex, one group per declared name | the pattern |
//! | [`ExpressionMatcher`] | a [`SegmentExpression`] | the expression text |
//! | [`CompoundMatcher`] | every child, in order | the children's hashes, each prefixed with its length |
//!
//! ## Merging
//!
//! Routes sharing a path prefix often use the same rule at the same depth
//! (`/users/{id}` and `/users/{id}/posts`). Such matchers are merged into one
//! by unioning their parameter keys. Merging is only legal when both matchers
//! have the same rule ([`SegmentMatcher::same_rule`], equivalently equal
//! [`SegmentMatcher::hash`]); anything else is
//! [`RoutingError::IncompatibleMatcher`].
//!
//! Merge order is deterministic: the receiver's keys stay first and the
//! other matcher's new keys are appended. When both regex matchers map the
//! same key to different capture groups, the receiver (the earlier
//! registered route) wins.

mod condition;
mod expression;
mod variants;


pub use condition::{CompiledPattern, Condition, Extractor};
pub use expression::SegmentExpression;
pub use variants::{
    AnyMatcher, ExpressionMatcher, ParameterKeys, ParameterMatcher, RegexFragment, RegexMatcher,
    StaticMatcher,
};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::RoutingError;

/// The matching rule for one path segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SegmentMatcher {
    Static(StaticMatcher),
    Any(AnyMatcher),
    Regex(RegexMatcher),
    Parameter(ParameterMatcher),
    Expression(ExpressionMatcher),
    Compound(CompoundMatcher),
}

impl SegmentMatcher {
    /// Variant name used as the prefix of [`hash`](Self::hash).
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            SegmentMatcher::Static(_) => "Static",
            SegmentMatcher::Any(_) => "Any",
            SegmentMatcher::Regex(_) => "Regex",
            SegmentMatcher::Parameter(_) => "Parameter",
            SegmentMatcher::Expression(_) => "Expression",
            SegmentMatcher::Compound(_) => "Compound",
        }
    }

    fn match_hash(&self) -> String {
        match self {
            SegmentMatcher::Static(m) => m.literal().to_string(),
            SegmentMatcher::Any(_) => String::new(),
            SegmentMatcher::Regex(m) => m.pattern().to_string(),
            SegmentMatcher::Parameter(m) => m.as_regex().pattern().to_string(),
            SegmentMatcher::Expression(m) => m.expression().text().to_string(),
            // length-prefixed: child hashes may themselves contain ','
            SegmentMatcher::Compound(m) => m
                .children
                .iter()
                .map(|child| {
                    let hash = child.hash();
                    format!("{}:{hash}", hash.len())
                })
                .collect::<Vec<_>>()
                .join(","),
        }
    }

    /// Textual fingerprint of the matching rule: `TypeName:matchHash`.
    #[must_use]
    pub fn hash(&self) -> String {
        format!("{}:{}", self.type_name(), self.match_hash())
    }

    /// Structural equality of the matching rule, ignoring parameter keys.
    #[must_use]
    pub fn same_rule(&self, other: &SegmentMatcher) -> bool {
        match (self, other) {
            (SegmentMatcher::Static(a), SegmentMatcher::Static(b)) => a.literal() == b.literal(),
            (SegmentMatcher::Any(_), SegmentMatcher::Any(_)) => true,
            (SegmentMatcher::Regex(a), SegmentMatcher::Regex(b)) => a.pattern() == b.pattern(),
            (SegmentMatcher::Parameter(a), SegmentMatcher::Parameter(b)) => {
                a.as_regex().pattern() == b.as_regex().pattern()
            }
            (SegmentMatcher::Expression(a), SegmentMatcher::Expression(b)) => a.expression() == b.expression(),
            (SegmentMatcher::Compound(a), SegmentMatcher::Compound(b)) => {
                a.children.len() == b.children.len()
                    && a.children.iter().zip(&b.children).all(|(x, y)| x.same_rule(y))
            }
            _ => false,
        }
    }

    /// Ordered parameter keys this matcher captures.
    #[must_use]
    pub fn parameter_keys(&self) -> Vec<usize> {
        match self {
            SegmentMatcher::Static(m) => m.keys().as_slice().to_vec(),
            SegmentMatcher::Any(m) => m.keys().as_slice().to_vec(),
            SegmentMatcher::Regex(m) => m.keys().as_slice().to_vec(),
            SegmentMatcher::Parameter(m) => m.as_regex().keys().as_slice().to_vec(),
            SegmentMatcher::Expression(m) => m.keys().as_slice().to_vec(),
            SegmentMatcher::Compound(m) => m.parameter_keys().as_slice().to_vec(),
        }
    }

    /// Union the parameter keys of an equivalent matcher into this one.
    pub fn merge_parameter_keys(&mut self, other: &SegmentMatcher) -> Result<(), RoutingError> {
        if !self.same_rule(other) {
            return Err(RoutingError::IncompatibleMatcher {
                left: self.hash(),
                right: other.hash(),
            });
        }
        match (self, other) {
            (SegmentMatcher::Static(a), SegmentMatcher::Static(b)) => a.keys_mut().merge(b.keys()),
            (SegmentMatcher::Any(a), SegmentMatcher::Any(b)) => a.keys_mut().merge(b.keys()),
            (SegmentMatcher::Regex(a), SegmentMatcher::Regex(b)) => a.merge(b),
            (SegmentMatcher::Parameter(a), SegmentMatcher::Parameter(b)) => a.regex_mut().merge(b.as_regex()),
            (SegmentMatcher::Expression(a), SegmentMatcher::Expression(b)) => a.keys_mut().merge(b.keys()),
            (SegmentMatcher::Compound(a), SegmentMatcher::Compound(b)) => {
                for (x, y) in a.children.iter_mut().zip(&b.children) {
                    x.merge_parameter_keys(y)?;
                }
            }
            // same_rule already rejected mismatched variants
            _ => {}
        }
        Ok(())
    }

    /// The predicate deciding whether a segment matches.
    #[must_use]
    pub fn condition(&self) -> Condition {
        match self {
            SegmentMatcher::Static(m) => m.condition(),
            SegmentMatcher::Any(_) => Condition::Wildcard,
            SegmentMatcher::Regex(m) => m.condition(),
            SegmentMatcher::Parameter(m) => m.as_regex().condition(),
            SegmentMatcher::Expression(m) => m.condition(),
            SegmentMatcher::Compound(m) => Condition::All(m.children.iter().map(SegmentMatcher::condition).collect()),
        }
    }

    /// [`condition`](Self::condition) rendered over `segment_var`.
    #[must_use]
    pub fn condition_expression(&self, segment_var: &str) -> String {
        self.condition().render(segment_var)
    }

    #[must_use]
    pub fn matches(&self, segment: &str) -> bool {
        self.condition().evaluate(segment)
    }

    /// How each captured parameter is taken from a matching segment.
    ///
    /// For compound matchers a [`Extractor::Group`] refers to the capture
    /// group of the child owning that key; the first child owning a key wins.
    #[must_use]
    pub fn matched_parameter_extractors(&self) -> BTreeMap<usize, Extractor> {
        match self {
            SegmentMatcher::Static(m) => m.extractors(),
            SegmentMatcher::Any(m) => m.extractors(),
            SegmentMatcher::Regex(m) => m.extractors(),
            SegmentMatcher::Parameter(m) => m.as_regex().extractors(),
            SegmentMatcher::Expression(m) => m.extractors(),
            SegmentMatcher::Compound(m) => {
                let mut out = BTreeMap::new();
                for child in &m.children {
                    for (key, extractor) in child.matched_parameter_extractors() {
                        out.entry(key).or_insert(extractor);
                    }
                }
                out
            }
        }
    }

    /// Evaluate against `segment` and return the captured parameter values,
    /// or `None` when the segment does not match.
    #[must_use]
    pub fn extract(&self, segment: &str) -> Option<BTreeMap<usize, String>> {
        match self {
            SegmentMatcher::Static(m) => m.extract(segment),
            SegmentMatcher::Any(m) => m.extract(segment),
            SegmentMatcher::Regex(m) => m.extract(segment),
            SegmentMatcher::Parameter(m) => m.as_regex().extract(segment),
            SegmentMatcher::Expression(m) => m.extract(segment),
            SegmentMatcher::Compound(m) => {
                let mut out = BTreeMap::new();
                for child in &m.children {
                    for (key, value) in child.extract(segment)? {
                        out.entry(key).or_insert(value);
                    }
                }
                Some(out)
            }
        }
    }

    /// The segment's contribution to a group-count dispatch regex, or `None`
    /// when the rule cannot be expressed as a regex (expressions, compounds,
    /// and patterns that can match across a `/`).
    #[must_use]
    pub fn regex_fragment(&self) -> Option<RegexFragment> {
        match self {
            SegmentMatcher::Static(m) => Some(m.fragment()),
            SegmentMatcher::Any(m) => Some(m.fragment()),
            SegmentMatcher::Regex(m) => m.fragment(),
            SegmentMatcher::Parameter(m) => m.as_regex().fragment(),
            SegmentMatcher::Expression(_) | SegmentMatcher::Compound(_) => None,
        }
    }
}

impl From<StaticMatcher> for SegmentMatcher {
    fn from(m: StaticMatcher) -> Self {
        SegmentMatcher::Static(m)
    }
}

impl From<AnyMatcher> for SegmentMatcher {
    fn from(m: AnyMatcher) -> Self {
        SegmentMatcher::Any(m)
    }
}

impl From<RegexMatcher> for SegmentMatcher {
    fn from(m: RegexMatcher) -> Self {
        SegmentMatcher::Regex(m)
    }
}

impl From<ParameterMatcher> for SegmentMatcher {
    fn from(m: ParameterMatcher) -> Self {
        SegmentMatcher::Parameter(m)
    }
}

impl From<ExpressionMatcher> for SegmentMatcher {
    fn from(m: ExpressionMatcher) -> Self {
        SegmentMatcher::Expression(m)
    }
}

impl From<CompoundMatcher> for SegmentMatcher {
    fn from(m: CompoundMatcher) -> Self {
        SegmentMatcher::Compound(m)
    }
}

/// Several matchers for the same segment, combined with logical AND.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompoundMatcher {
    children: Vec<SegmentMatcher>,
}

impl CompoundMatcher {
    pub fn new(children: Vec<SegmentMatcher>) -> Result<Self, RoutingError> {
        if children.is_empty() {
            return Err(RoutingError::invalid_pattern(
                "",
                "a compound matcher needs at least one child",
            ));
        }
        Ok(Self { children })
    }

    #[must_use]
    pub fn children(&self) -> &[SegmentMatcher] {
        &self.children
    }

    /// Union of the children's keys, in child order.
    #[must_use]
    pub fn parameter_keys(&self) -> ParameterKeys {
        ParameterKeys::new(self.children.iter().flat_map(SegmentMatcher::parameter_keys))
    }
}
