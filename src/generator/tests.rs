#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::*;
use crate::route::RouteDefinition;
use http::Method;
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn collection(routes: Vec<RouteDefinition>) -> RouteCollection {
    routes.into_iter().collect()
}

fn sample_routes() -> RouteCollection {
    collection(vec![
        RouteDefinition::new(Method::GET, "/", "home").named("home"),
        RouteDefinition::new(Method::GET, "/u/{id}", "user").named("user"),
        RouteDefinition::new(Method::GET, "/p/{a}/{b}", "pair"),
        RouteDefinition::new(Method::GET, "/n/{id}", "num")
            .named("numeric")
            .where_expression("id", "numeric"),
    ])
}

/// Counts how often the wrapped generator actually compiles.
#[derive(Clone)]
struct SpyGenerator {
    inner: GroupCountBasedGenerator,
    calls: Arc<AtomicUsize>,
}

impl SpyGenerator {
    fn new() -> Self {
        Self {
            inner: GroupCountBasedGenerator::new(sample_routes()),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DataGenerator for SpyGenerator {
    fn data(&self) -> Result<RouteData, RoutingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.data()
    }
}

#[test]
fn test_routes_are_placed_by_kind() {
    let data = GroupCountBasedGenerator::new(sample_routes()).data().unwrap();
    assert_eq!(data.format_version, ROUTE_DATA_FORMAT_VERSION);
    assert_eq!(data.static_routes["GET"]["/"].handler, "home");
    assert_eq!(data.dynamic_routes["GET"].len(), 1);
    assert_eq!(data.dynamic_routes["GET"][0].route_map.len(), 2);
    assert_eq!(data.constrained_routes["GET"].len(), 1);
    assert_eq!(data.constrained_routes["GET"][0].descriptor.index, 3);
    assert_eq!(data.route_count(), 4);
}

#[test]
fn test_chunk_regex_and_group_counts() {
    let data = GroupCountBasedGenerator::new(sample_routes()).data().unwrap();
    let chunk = &data.dynamic_routes["GET"][0];
    assert_eq!(chunk.regex, "^(?:/u/([^/]+)()|/p/([^/]+)/([^/]+)())$");

    // id is group 1, marker 2; a and b are groups 3 and 4, marker 5
    let user = &chunk.route_map[&3];
    assert_eq!(user.descriptor.handler, "user");
    assert_eq!(user.parameters, vec![("id".to_string(), 1)]);

    let pair = &chunk.route_map[&6];
    assert_eq!(pair.descriptor.handler, "pair");
    assert_eq!(pair.parameters, vec![("a".to_string(), 3), ("b".to_string(), 4)]);
}

#[test]
fn test_chunk_size_splits_dynamic_routes() {
    let routes = collection(
        (0..5)
            .map(|i| RouteDefinition::new(Method::GET, format!("/r{i}/{{id}}"), format!("h{i}")))
            .collect(),
    );
    let data = GroupCountBasedGenerator::new(routes).with_chunk_size(2).data().unwrap();
    let chunks = &data.dynamic_routes["GET"];
    assert_eq!(chunks.len(), 3);
    assert_eq!(chunks[2].route_map.len(), 1);
    // group numbering restarts in every chunk
    assert!(chunks[1].route_map.contains_key(&3));
}

#[test]
fn test_chunk_size_zero_is_clamped() {
    let generator = GroupCountBasedGenerator::new(sample_routes()).with_chunk_size(0);
    let data = generator.data().unwrap();
    assert_eq!(data.dynamic_routes["GET"].len(), 2);
}

#[test]
fn test_from_config_uses_chunk_size() {
    let config = CompilerConfig {
        chunk_size: 1,
        ..CompilerConfig::default()
    };
    let data = GroupCountBasedGenerator::from_config(sample_routes(), &config).data().unwrap();
    assert_eq!(data.dynamic_routes["GET"].len(), 2);
}

#[test]
fn test_every_method_gets_an_entry() {
    let routes = collection(vec![RouteDefinition::new(Method::GET, "/x/{id}", "x").method(Method::PUT)]);
    let data = GroupCountBasedGenerator::new(routes).data().unwrap();
    assert!(data.dynamic_routes.contains_key("GET"));
    assert!(data.dynamic_routes.contains_key("PUT"));
    assert_eq!(data.route_count(), 2);
}

#[test]
fn test_first_static_registration_wins() {
    let routes = collection(vec![
        RouteDefinition::new(Method::GET, "/about", "first"),
        RouteDefinition::new(Method::GET, "/about/", "second"),
    ]);
    let data = GroupCountBasedGenerator::new(routes).data().unwrap();
    assert_eq!(data.static_routes["GET"].len(), 1);
    assert_eq!(data.static_routes["GET"]["/about"].handler, "first");
}

#[test]
fn test_named_routes() {
    let data = GroupCountBasedGenerator::new(sample_routes()).data().unwrap();
    assert_eq!(data.named_routes["home"], NamedRoute::Static("/".to_string()));
    assert_eq!(
        data.named_routes["numeric"],
        NamedRoute::Template {
            path: "/n/{id}".to_string(),
            params: vec!["id".to_string()],
        }
    );
    assert!(!data.named_routes.values().any(|r| matches!(r, NamedRoute::Template { path, .. } if path == "/p/{a}/{b}")));
}

#[test]
fn test_duplicate_route_name_is_rejected() {
    let routes = collection(vec![
        RouteDefinition::new(Method::GET, "/a", "a").named("dup"),
        RouteDefinition::new(Method::GET, "/b", "b").named("dup"),
    ]);
    let err = GroupCountBasedGenerator::new(routes).data().unwrap_err();
    assert!(matches!(err, RoutingError::DuplicateRouteName { name } if name == "dup"));
}

#[test]
fn test_empty_route_name_is_rejected() {
    let routes = collection(vec![RouteDefinition::new(Method::GET, "/a", "a").named("")]);
    assert!(GroupCountBasedGenerator::new(routes).data().is_err());
}

#[test]
fn test_invalid_template_fails_compilation() {
    let routes = collection(vec![RouteDefinition::new(Method::GET, "/a/{id", "a")]);
    let err = GroupCountBasedGenerator::new(routes).data().unwrap_err();
    assert!(matches!(err, RoutingError::InvalidPattern { .. }));
}

#[test]
fn test_compilation_is_deterministic() {
    let generator = GroupCountBasedGenerator::new(sample_routes());
    let a = serde_json::to_vec(&generator.data().unwrap()).unwrap();
    let b = serde_json::to_vec(&generator.data().unwrap()).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_route_data_serde_round_trip_preserves_matchers() {
    let data = GroupCountBasedGenerator::new(sample_routes()).data().unwrap();
    let json = serde_json::to_string(&data).unwrap();
    let back: RouteData = serde_json::from_str(&json).unwrap();
    assert_eq!(back, data);
    let constrained = &back.constrained_routes["GET"][0];
    assert!(constrained.matchers[1].matches("42"));
    assert!(!constrained.matchers[1].matches("x"));
}

#[test]
fn test_cache_compiles_once_across_instances() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("routes.cache.json");
    let spy = SpyGenerator::new();

    let first = CachedDataGenerator::new(spy.clone(), &path);
    let a = first.data().unwrap();
    let _ = first.data().unwrap();
    assert_eq!(spy.calls(), 1);
    assert!(path.exists());

    let second = CachedDataGenerator::new(spy.clone(), &path);
    let b = second.data().unwrap();
    assert_eq!(spy.calls(), 1);
    assert_eq!(a, b);
}

#[test]
fn test_cache_files_are_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    let one = dir.path().join("one.json");
    let two = dir.path().join("two.json");
    CachedDataGenerator::new(GroupCountBasedGenerator::new(sample_routes()), &one)
        .data()
        .unwrap();
    CachedDataGenerator::new(GroupCountBasedGenerator::new(sample_routes()), &two)
        .data()
        .unwrap();
    assert_eq!(fs::read(&one).unwrap(), fs::read(&two).unwrap());
}

#[test]
fn test_corrupt_cache_is_recompiled() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("routes.cache.json");
    fs::write(&path, b"{ not json").unwrap();

    let spy = SpyGenerator::new();
    let cached = CachedDataGenerator::new(spy.clone(), &path);
    assert!(matches!(cached.read_cache(), Err(RoutingError::CacheDecode { .. })));
    let data = cached.data().unwrap();
    assert_eq!(spy.calls(), 1);
    assert_eq!(cached.read_cache().unwrap(), data);
}

#[test]
fn test_version_mismatch_is_recompiled() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("routes.cache.json");
    let mut stale = serde_json::to_value(RouteData::default()).unwrap();
    stale["format_version"] = serde_json::json!(ROUTE_DATA_FORMAT_VERSION + 1);
    fs::write(&path, serde_json::to_vec(&stale).unwrap()).unwrap();

    let spy = SpyGenerator::new();
    let data = CachedDataGenerator::new(spy.clone(), &path).data().unwrap();
    assert_eq!(spy.calls(), 1);
    assert_eq!(data.format_version, ROUTE_DATA_FORMAT_VERSION);
    assert_eq!(data.route_count(), 4);
}

#[test]
fn test_clear_forces_recompile() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("routes.cache.json");
    let spy = SpyGenerator::new();
    let mut cached = CachedDataGenerator::new(spy.clone(), &path);

    cached.data().unwrap();
    cached.clear().unwrap();
    assert!(!path.exists());
    // clearing twice is fine
    cached.clear().unwrap();

    cached.data().unwrap();
    assert_eq!(spy.calls(), 2);
    assert!(path.exists());
}

#[test]
fn test_cache_write_leaves_no_temp_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("routes.cache.json");
    CachedDataGenerator::new(GroupCountBasedGenerator::new(sample_routes()), &path)
        .data()
        .unwrap();
    let entries: Vec<_> = fs::read_dir(path.parent().unwrap())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(entries, vec![std::ffi::OsString::from("routes.cache.json")]);
}

#[test]
fn test_unwritable_cache_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    // a regular file where the cache directory should be
    let blocker = dir.path().join("blocker");
    fs::write(&blocker, b"").unwrap();
    let cached = CachedDataGenerator::new(
        GroupCountBasedGenerator::new(sample_routes()),
        blocker.join("routes.cache.json"),
    );
    assert!(matches!(cached.data(), Err(RoutingError::CacheWrite { .. })));
}

#[test]
fn test_compile_errors_are_not_cached() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("routes.cache.json");
    let routes = collection(vec![RouteDefinition::new(Method::GET, "/a/{id", "a")]);
    let cached = CachedDataGenerator::new(GroupCountBasedGenerator::new(routes), &path);
    assert!(cached.data().is_err());
    assert!(!path.exists());
}
