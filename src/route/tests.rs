#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::parser::to_non_capturing;
use super::*;
use crate::matchers::SegmentMatcher;
use std::io::Write;

fn parse(template: &str) -> Result<ParsedPath, RoutingError> {
    parse_path(template, &BTreeMap::new())
}

fn constrained(template: &str, name: &str, expression: &str) -> Result<ParsedPath, RoutingError> {
    parse_path(template, &BTreeMap::from([(name.to_string(), expression.to_string())]))
}

#[test]
fn test_normalize_path() {
    assert_eq!(normalize_path(""), "/");
    assert_eq!(normalize_path("/"), "/");
    assert_eq!(normalize_path("users/"), "/users");
    assert_eq!(normalize_path("/a/b//"), "/a/b");
}

#[test]
fn test_split_segments() {
    assert!(split_segments("/").is_empty());
    assert_eq!(split_segments("/a/b"), vec!["a", "b"]);
}

#[test]
fn test_root_is_static() {
    let parsed = parse("/").unwrap();
    assert_eq!(parsed.template, "/");
    assert!(parsed.segments.is_empty());
    assert!(parsed.is_static());
}

#[test]
fn test_literal_and_placeholder_segments() {
    let parsed = parse("/users/{id}").unwrap();
    assert_eq!(parsed.parameter_names, vec!["id"]);
    assert_eq!(parsed.segments[0].hash(), "Static:users");
    assert!(matches!(parsed.segments[1], SegmentMatcher::Any(_)));
    assert_eq!(parsed.segments[1].parameter_keys(), vec![0]);
    assert!(!parsed.is_static());
    assert!(!parsed.constrained);
}

#[test]
fn test_regex_placeholder_with_quantifier_braces() {
    let parsed = parse(r"/posts/{year:\d{4}}/{slug}").unwrap();
    assert_eq!(parsed.parameter_names, vec!["year", "slug"]);
    assert_eq!(parsed.segments[1].hash(), r"Parameter:(\d{4})");
    assert!(parsed.segments[1].matches("2024"));
    assert!(!parsed.segments[1].matches("24"));
    assert_eq!(parsed.segments[2].parameter_keys(), vec![1]);
}

#[test]
fn test_mixed_segment_keys_follow_template_order() {
    let parsed = parse("/a/{x}/{y}.{ext}").unwrap();
    assert_eq!(parsed.parameter_names, vec!["x", "y", "ext"]);
    let last = &parsed.segments[2];
    assert_eq!(last.parameter_keys(), vec![1, 2]);
    let values = last.extract("report.pdf").unwrap();
    assert_eq!(values[&1], "report");
    assert_eq!(values[&2], "pdf");
    assert!(last.extract("report").is_none());
}

#[test]
fn test_literal_prefix_uses_default_pattern() {
    let parsed = parse("/post-{id}").unwrap();
    let seg = &parsed.segments[0];
    assert_eq!(seg.hash(), r"Parameter:post\-([^/]+)");
    assert_eq!(seg.extract("post-42").unwrap()[&0], "42");
    assert!(seg.regex_fragment().is_some());
    assert!(!parsed.needs_segment_tree());
}

#[test]
fn test_separator_spanning_pattern_needs_segment_tree() {
    let parsed = parse("/files/{p:.+}").unwrap();
    assert!(!parsed.constrained);
    assert!(parsed.needs_segment_tree());
    assert!(constrained("/n/{id}", "id", "numeric").unwrap().needs_segment_tree());
}

#[test]
fn test_user_groups_become_non_capturing() {
    let parsed = parse("/f/{kind:(jpg|png)}").unwrap();
    let values = parsed.segments[1].extract("png").unwrap();
    assert_eq!(values[&0], "png");
}

#[test]
fn test_to_non_capturing() {
    assert_eq!(to_non_capturing("(a|b)"), "(?:a|b)");
    assert_eq!(to_non_capturing("(?P<n>x)"), "(?:x)");
    assert_eq!(to_non_capturing("(?<n>x)"), "(?:x)");
    assert_eq!(to_non_capturing("(?:x)"), "(?:x)");
    assert_eq!(to_non_capturing("(?<=a)b"), "(?<=a)b");
    assert_eq!(to_non_capturing(r"[(]\("), r"[(]\(");
}

#[test]
fn test_constraint_builds_compound_segment() {
    let parsed = constrained("/n/{id}", "id", "numeric").unwrap();
    assert!(parsed.constrained);
    assert!(!parsed.is_static());
    let seg = &parsed.segments[1];
    assert!(matches!(seg, SegmentMatcher::Compound(_)));
    assert_eq!(seg.hash(), "Compound:4:Any:,18:Expression:numeric");
    assert_eq!(seg.extract("12").unwrap()[&0], "12");
    assert!(seg.extract("ab").is_none());
}

#[test]
fn test_constraint_errors() {
    let err = constrained("/n/{id}", "other", "numeric").unwrap_err();
    assert!(err.to_string().contains("unknown parameter 'other'"), "{err}");

    let err = constrained("/n/{id}.json", "id", "numeric").unwrap_err();
    assert!(err.to_string().contains("whole segment"), "{err}");

    assert!(constrained("/n/{id}", "id", "nonsense").is_err());
}

#[test]
fn test_template_errors() {
    for bad in [
        "/a//b",
        "/a/{id}/{id}",
        "/a/{id",
        "/a/id}",
        "/a/{1x}",
        "/a/{}",
        "/a/{x:}",
        r"/a/{x:(\d+}",
    ] {
        let err = parse(bad).unwrap_err();
        assert!(matches!(err, RoutingError::InvalidPattern { .. }), "{bad}: {err}");
    }
}

#[test]
fn test_collection_helpers_keep_registration_order() {
    let mut routes = RouteCollection::new();
    routes.get("/a", "a").name = Some("a".into());
    routes.post("/b", "b");
    routes.delete("/c/{id}", "c").constraints.insert("id".into(), "numeric".into());
    assert_eq!(routes.len(), 3);
    assert_eq!(routes.routes()[0].name.as_deref(), Some("a"));
    assert_eq!(routes.routes()[1].methods, vec![Method::POST]);
    assert_eq!(routes.routes()[2].constraints["id"], "numeric");
}

#[test]
fn test_method_builder_dedupes() {
    let route = RouteDefinition::new(Method::GET, "/x", "x")
        .method(Method::POST)
        .method(Method::GET);
    assert_eq!(route.methods, vec![Method::GET, Method::POST]);
}

#[test]
fn test_from_yaml_str() {
    let routes = RouteCollection::from_yaml_str(
        r#"
routes:
  - path: /
    handler: home
  - name: user_edit
    methods: [get, POST]
    path: /user/{id}/edit
    handler: users.edit
    where:
      id: numeric
"#,
    )
    .unwrap();
    assert_eq!(routes.len(), 2);
    assert_eq!(routes.routes()[0].methods, vec![Method::GET]);
    let edit = &routes.routes()[1];
    assert_eq!(edit.name.as_deref(), Some("user_edit"));
    assert_eq!(edit.methods, vec![Method::GET, Method::POST]);
    assert_eq!(edit.constraints["id"], "numeric");
}

#[test]
fn test_from_yaml_str_rejects_bad_entries() {
    let err = RouteCollection::from_yaml_str("routes:\n  - path: /x\n    handler: x\n    methods: [\"BAD METHOD\"]\n")
        .unwrap_err();
    assert!(matches!(err, RoutingError::RouteLoad { .. }));

    let err = RouteCollection::from_yaml_str("routes:\n  - path: /x\n    handler: x\n    methods: []\n").unwrap_err();
    assert!(err.to_string().contains("declares no methods"), "{err}");

    assert!(RouteCollection::from_yaml_str("routes:\n  - path: /x\n").is_err());
}

#[test]
fn test_from_json_file() {
    let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    file.write_all(br#"{"routes":[{"name":"about","path":"/about","handler":"pages.about"}]}"#)
        .unwrap();
    let routes = RouteCollection::from_file(file.path()).unwrap();
    assert_eq!(routes.routes()[0].handler, "pages.about");

    let missing = RouteCollection::from_file("/definitely/not/here.yaml").unwrap_err();
    assert!(matches!(missing, RoutingError::RouteLoad { .. }));
}
