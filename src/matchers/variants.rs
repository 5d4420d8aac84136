use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::condition::{CompiledPattern, Condition, Extractor};
use super::expression::SegmentExpression;
use crate::error::RoutingError;

/// Ordered, de-duplicated list of route parameter keys captured by a matcher.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterKeys(Vec<usize>);

impl ParameterKeys {
    pub fn new(keys: impl IntoIterator<Item = usize>) -> Self {
        let mut out = ParameterKeys::default();
        for key in keys {
            out.push(key);
        }
        out
    }

    /// Append `key` unless it is already present.
    pub fn push(&mut self, key: usize) {
        if !self.0.contains(&key) {
            self.0.push(key);
        }
    }

    /// Union with `other`: existing keys keep their position, new ones follow
    /// in `other`'s order.
    pub fn merge(&mut self, other: &ParameterKeys) {
        for key in &other.0 {
            self.push(*key);
        }
    }

    #[must_use]
    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn whole_segment(&self, segment: &str) -> BTreeMap<usize, String> {
        self.0.iter().map(|k| (*k, segment.to_string())).collect()
    }

    fn segment_extractors(&self) -> BTreeMap<usize, Extractor> {
        self.0.iter().map(|k| (*k, Extractor::Segment)).collect()
    }
}

/// Regex text contributed by one segment to a route's dispatch regex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegexFragment {
    /// Pattern for the segment, without separators or anchors
    pub pattern: String,
    /// For each capture group in `pattern`, the parameter keys it feeds
    pub groups: Vec<Vec<usize>>,
}

impl RegexFragment {
    fn whole_segment(body: String, keys: &ParameterKeys) -> Self {
        if keys.is_empty() {
            RegexFragment {
                pattern: body,
                groups: Vec::new(),
            }
        } else {
            RegexFragment {
                pattern: format!("({body})"),
                groups: vec![keys.as_slice().to_vec()],
            }
        }
    }
}

/// Matches a segment equal to a literal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticMatcher {
    literal: String,
    keys: ParameterKeys,
}

impl StaticMatcher {
    pub fn new(literal: impl Into<String>, keys: impl IntoIterator<Item = usize>) -> Result<Self, RoutingError> {
        let literal = literal.into();
        if literal.contains('/') {
            return Err(RoutingError::invalid_pattern(
                literal,
                "a static segment cannot contain '/'",
            ));
        }
        Ok(Self {
            literal,
            keys: ParameterKeys::new(keys),
        })
    }

    #[must_use]
    pub fn literal(&self) -> &str {
        &self.literal
    }

    pub(super) fn keys(&self) -> &ParameterKeys {
        &self.keys
    }

    pub(super) fn keys_mut(&mut self) -> &mut ParameterKeys {
        &mut self.keys
    }

    pub(super) fn condition(&self) -> Condition {
        Condition::Literal(self.literal.clone())
    }

    pub(super) fn extract(&self, segment: &str) -> Option<BTreeMap<usize, String>> {
        (segment == self.literal).then(|| self.keys.whole_segment(segment))
    }

    pub(super) fn extractors(&self) -> BTreeMap<usize, Extractor> {
        self.keys.segment_extractors()
    }

    pub(super) fn fragment(&self) -> RegexFragment {
        RegexFragment::whole_segment(regex::escape(&self.literal), &self.keys)
    }
}

/// Matches any non-empty segment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnyMatcher {
    keys: ParameterKeys,
}

impl AnyMatcher {
    pub fn new(keys: impl IntoIterator<Item = usize>) -> Self {
        Self {
            keys: ParameterKeys::new(keys),
        }
    }

    pub(super) fn keys(&self) -> &ParameterKeys {
        &self.keys
    }

    pub(super) fn keys_mut(&mut self) -> &mut ParameterKeys {
        &mut self.keys
    }

    pub(super) fn extract(&self, segment: &str) -> Option<BTreeMap<usize, String>> {
        (!segment.is_empty()).then(|| self.keys.whole_segment(segment))
    }

    pub(super) fn extractors(&self) -> BTreeMap<usize, Extractor> {
        self.keys.segment_extractors()
    }

    pub(super) fn fragment(&self) -> RegexFragment {
        RegexFragment::whole_segment("[^/]+".to_string(), &self.keys)
    }
}

/// Matches a segment against a regex; parameter values come from capture groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegexMatcher {
    pattern: CompiledPattern,
    keys: ParameterKeys,
    #[serde(with = "group_pairs")]
    groups: BTreeMap<usize, usize>,
}

impl RegexMatcher {
    /// `key_to_group` pairs each parameter key with the capture group holding
    /// its value; the order of the pairs is the order of the keys.
    pub fn new(
        pattern: impl Into<String>,
        key_to_group: impl IntoIterator<Item = (usize, usize)>,
    ) -> Result<Self, RoutingError> {
        let pattern = CompiledPattern::new(pattern)?;
        let group_count = pattern.group_count();
        let mut keys = ParameterKeys::default();
        let mut groups = BTreeMap::new();
        for (key, group) in key_to_group {
            if group == 0 || group > group_count {
                return Err(RoutingError::invalid_pattern(
                    pattern.as_str(),
                    format!("parameter {key} refers to group {group} but the pattern has {group_count} groups"),
                ));
            }
            keys.push(key);
            groups.entry(key).or_insert(group);
        }
        Ok(Self {
            pattern,
            keys,
            groups,
        })
    }

    #[must_use]
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    #[must_use]
    pub fn group_count(&self) -> usize {
        self.pattern.group_count()
    }

    /// Capture group for a parameter key.
    #[must_use]
    pub fn group_for(&self, key: usize) -> Option<usize> {
        self.groups.get(&key).copied()
    }

    pub(super) fn keys(&self) -> &ParameterKeys {
        &self.keys
    }

    /// Union keys and key→group entries; on a conflicting key the receiver's
    /// group is kept.
    pub(super) fn merge(&mut self, other: &RegexMatcher) {
        self.keys.merge(&other.keys);
        for (key, group) in &other.groups {
            self.groups.entry(*key).or_insert(*group);
        }
    }

    pub(super) fn condition(&self) -> Condition {
        Condition::Pattern(self.pattern.clone())
    }

    pub(super) fn extract(&self, segment: &str) -> Option<BTreeMap<usize, String>> {
        let caps = self.pattern.regex().captures(segment)?;
        Some(
            self.keys
                .as_slice()
                .iter()
                .filter_map(|key| {
                    let group = self.groups.get(key)?;
                    caps.get(*group).map(|m| (*key, m.as_str().to_string()))
                })
                .collect(),
        )
    }

    pub(super) fn extractors(&self) -> BTreeMap<usize, Extractor> {
        self.groups
            .iter()
            .map(|(key, group)| (*key, Extractor::Group(*group)))
            .collect()
    }

    /// `None` when the pattern can match a `/`: inside a whole-path regex it
    /// would consume neighbouring segments.
    pub(super) fn fragment(&self) -> Option<RegexFragment> {
        if self.pattern.spans_separator() {
            return None;
        }
        let groups = (1..=self.group_count())
            .map(|g| {
                self.keys
                    .as_slice()
                    .iter()
                    .copied()
                    .filter(|k| self.groups.get(k) == Some(&g))
                    .collect()
            })
            .collect();
        Some(RegexFragment {
            pattern: format!("(?:{})", self.pattern.as_str()),
            groups,
        })
    }
}

// Integer map keys do not survive the buffering of internally tagged enums,
// so the key→group map is stored as a list of pairs.
mod group_pairs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::collections::BTreeMap;

    pub fn serialize<S: Serializer>(map: &BTreeMap<usize, usize>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(map.iter())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BTreeMap<usize, usize>, D::Error> {
        Ok(Vec::<(usize, usize)>::deserialize(deserializer)?.into_iter().collect())
    }
}

/// A regex matcher built for declared path parameters: the i-th name is
/// captured by the i-th group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterMatcher {
    names: Vec<String>,
    regex: RegexMatcher,
}

impl ParameterMatcher {
    /// Keys are assigned consecutively from `first_key`, one per name.
    pub fn new(first_key: usize, names: Vec<String>, pattern: impl Into<String>) -> Result<Self, RoutingError> {
        let regex = RegexMatcher::new(
            pattern,
            names.iter().enumerate().map(|(i, _)| (first_key + i, i + 1)),
        )?;
        if regex.group_count() != names.len() {
            return Err(RoutingError::invalid_pattern(
                regex.pattern(),
                format!(
                    "{} parameter names but {} capture groups",
                    names.len(),
                    regex.group_count()
                ),
            ));
        }
        Ok(Self { names, regex })
    }

    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    #[must_use]
    pub fn as_regex(&self) -> &RegexMatcher {
        &self.regex
    }

    pub(super) fn regex_mut(&mut self) -> &mut RegexMatcher {
        &mut self.regex
    }
}

/// Matches a segment satisfying a free-form expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpressionMatcher {
    expression: SegmentExpression,
    keys: ParameterKeys,
}

impl ExpressionMatcher {
    pub fn new(expression: impl Into<String>, keys: impl IntoIterator<Item = usize>) -> Result<Self, RoutingError> {
        Ok(Self {
            expression: SegmentExpression::parse(expression)?,
            keys: ParameterKeys::new(keys),
        })
    }

    #[must_use]
    pub fn expression(&self) -> &SegmentExpression {
        &self.expression
    }

    pub(super) fn keys(&self) -> &ParameterKeys {
        &self.keys
    }

    pub(super) fn keys_mut(&mut self) -> &mut ParameterKeys {
        &mut self.keys
    }

    pub(super) fn condition(&self) -> Condition {
        Condition::Expression(self.expression.clone())
    }

    pub(super) fn extract(&self, segment: &str) -> Option<BTreeMap<usize, String>> {
        self.expression
            .evaluate(segment)
            .then(|| self.keys.whole_segment(segment))
    }

    pub(super) fn extractors(&self) -> BTreeMap<usize, Extractor> {
        self.keys.segment_extractors()
    }
}
