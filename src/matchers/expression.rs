//! Free-form segment expressions.
//!
//! An expression is carried as text (the text is its identity when matchers
//! are merged) and parsed once into a [`Test`] tree.
//!
//! | Text | Holds when the segment |
//! |---|---|
//! | `numeric` | parses as a finite number (`42`, `-1.5`, `1e3`) |
//! | `alpha` / `alnum` | is ASCII letters / letters and digits |
//! | `hex` | is ASCII hex digits |
//! | `lower` / `upper` | has no upper / lower case letters and is non-empty |
//! | `slug` | is lowercase ASCII letters, digits, `-` or `_` |
//! | `uuid` | is an `8-4-4-4-12` hex UUID |
//! | `len:N` / `min_len:N` / `max_len:N` | has exactly / at least / at most N chars |
//! | `in:a\|b\|c` | is one of the listed values |
//! | `!expr` | does not satisfy `expr` |

use serde::{Deserialize, Serialize};

use crate::error::RoutingError;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Test {
    Numeric,
    Alpha,
    Alnum,
    Hex,
    Lower,
    Upper,
    Slug,
    Uuid,
    Len(usize),
    MinLen(usize),
    MaxLen(usize),
    OneOf(Vec<String>),
    Not(Box<Test>),
}

/// A parsed segment expression together with its source text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SegmentExpression {
    text: String,
    test: Test,
}

impl SegmentExpression {
    /// Parse an expression; unknown forms are rejected as invalid patterns.
    pub fn parse(text: impl Into<String>) -> Result<Self, RoutingError> {
        let text = text.into();
        let test = parse_test(text.trim()).map_err(|reason| RoutingError::invalid_pattern(&text, reason))?;
        Ok(Self { text, test })
    }

    /// The expression exactly as written.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn evaluate(&self, segment: &str) -> bool {
        evaluate(&self.test, segment)
    }

    /// Render as a call over `segment_var`, e.g. `numeric($x)`.
    #[must_use]
    pub fn render(&self, segment_var: &str) -> String {
        render(&self.test, segment_var)
    }
}

impl TryFrom<String> for SegmentExpression {
    type Error = RoutingError;

    fn try_from(text: String) -> Result<Self, Self::Error> {
        SegmentExpression::parse(text)
    }
}

impl From<SegmentExpression> for String {
    fn from(expression: SegmentExpression) -> Self {
        expression.text
    }
}

fn parse_test(text: &str) -> Result<Test, String> {
    if let Some(rest) = text.strip_prefix('!') {
        return Ok(Test::Not(Box::new(parse_test(rest.trim())?)));
    }
    if let Some((name, arg)) = text.split_once(':') {
        let count = || {
            arg.trim()
                .parse::<usize>()
                .map_err(|_| format!("'{name}' expects a length, got '{arg}'"))
        };
        return match name.trim() {
            "len" => Ok(Test::Len(count()?)),
            "min_len" => Ok(Test::MinLen(count()?)),
            "max_len" => Ok(Test::MaxLen(count()?)),
            "in" => {
                let values: Vec<String> = arg.split('|').map(str::to_string).collect();
                if values.iter().any(|v| v.is_empty()) {
                    return Err("'in' values cannot be empty".to_string());
                }
                Ok(Test::OneOf(values))
            }
            other => Err(format!("unknown expression '{other}'")),
        };
    }
    match text {
        "numeric" => Ok(Test::Numeric),
        "alpha" => Ok(Test::Alpha),
        "alnum" => Ok(Test::Alnum),
        "hex" => Ok(Test::Hex),
        "lower" => Ok(Test::Lower),
        "upper" => Ok(Test::Upper),
        "slug" => Ok(Test::Slug),
        "uuid" => Ok(Test::Uuid),
        "" => Err("empty expression".to_string()),
        other => Err(format!("unknown expression '{other}'")),
    }
}

fn evaluate(test: &Test, segment: &str) -> bool {
    let non_empty = !segment.is_empty();
    match test {
        Test::Numeric => segment.parse::<f64>().map(f64::is_finite).unwrap_or(false),
        Test::Alpha => non_empty && segment.chars().all(|c| c.is_ascii_alphabetic()),
        Test::Alnum => non_empty && segment.chars().all(|c| c.is_ascii_alphanumeric()),
        Test::Hex => non_empty && segment.chars().all(|c| c.is_ascii_hexdigit()),
        Test::Lower => non_empty && !segment.chars().any(char::is_uppercase),
        Test::Upper => non_empty && !segment.chars().any(char::is_lowercase),
        Test::Slug => {
            non_empty
                && segment
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
        }
        Test::Uuid => is_uuid(segment),
        Test::Len(n) => segment.chars().count() == *n,
        Test::MinLen(n) => segment.chars().count() >= *n,
        Test::MaxLen(n) => segment.chars().count() <= *n,
        Test::OneOf(values) => values.iter().any(|v| v == segment),
        Test::Not(inner) => !evaluate(inner, segment),
    }
}

fn is_uuid(segment: &str) -> bool {
    let groups: Vec<&str> = segment.split('-').collect();
    groups.len() == 5
        && groups
            .iter()
            .zip([8, 4, 4, 4, 12])
            .all(|(g, len)| g.len() == len && g.chars().all(|c| c.is_ascii_hexdigit()))
}

fn render(test: &Test, var: &str) -> String {
    match test {
        Test::Numeric => format!("numeric({var})"),
        Test::Alpha => format!("alpha({var})"),
        Test::Alnum => format!("alnum({var})"),
        Test::Hex => format!("hex({var})"),
        Test::Lower => format!("lower({var})"),
        Test::Upper => format!("upper({var})"),
        Test::Slug => format!("slug({var})"),
        Test::Uuid => format!("uuid({var})"),
        Test::Len(n) => format!("len({var}) == {n}"),
        Test::MinLen(n) => format!("len({var}) >= {n}"),
        Test::MaxLen(n) => format!("len({var}) <= {n}"),
        Test::OneOf(values) => format!("{var} in [{}]", values.join(", ")),
        Test::Not(inner) => format!("!({})", render(inner, var)),
    }
}
