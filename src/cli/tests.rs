//! Unit tests for CLI commands
#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::commands::parse_params;
use crate::cli::{run_cli, Cli, Commands};
use clap::Parser;
use std::io::Write;
use tempfile::NamedTempFile;

const ROUTES: &str = r#"
routes:
  - name: home
    path: /
    handler: home
  - name: user_edit
    path: /user/{id}/edit
    handler: users.edit
    methods: [GET, POST]
  - name: order
    path: /orders/{id}
    handler: orders.show
    where:
      id: numeric
"#;

fn routes_file() -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    file.write_all(ROUTES.as_bytes()).unwrap();
    file
}

fn run(args: &[&str]) -> anyhow::Result<String> {
    let cli = Cli::try_parse_from(args)?;
    let mut out = Vec::new();
    run_cli(cli, &mut out)?;
    Ok(String::from_utf8(out).unwrap())
}

#[test]
fn test_match_command_parses() {
    let cli = Cli::try_parse_from(["routeforge", "match", "--routes", "r.yaml", "GET", "/x"]).unwrap();
    match cli.command {
        Commands::Match { routes, method, path } => {
            assert_eq!(routes.to_string_lossy(), "r.yaml");
            assert_eq!(method, "GET");
            assert_eq!(path, "/x");
        }
        _ => panic!("Expected Match command"),
    }
}

#[test]
fn test_url_command_collects_params() {
    let cli = Cli::try_parse_from([
        "routeforge",
        "url",
        "--routes",
        "r.yaml",
        "user_edit",
        "id=1",
        "tab=a=b",
        "--absolute",
    ])
    .unwrap();
    match cli.command {
        Commands::Url { name, params, absolute, .. } => {
            assert_eq!(name, "user_edit");
            assert_eq!(params, vec!["id=1", "tab=a=b"]);
            assert!(absolute);
        }
        _ => panic!("Expected Url command"),
    }
}

#[test]
fn test_parse_params() {
    let pairs = parse_params(&["id=1".to_string(), "q=a=b".to_string()]).unwrap();
    assert_eq!(pairs[1], ("q".to_string(), "a=b".to_string()));
    assert!(parse_params(&["novalue".to_string()]).is_err());
    assert!(parse_params(&["=x".to_string()]).is_err());
}

#[test]
fn test_run_match() {
    let file = routes_file();
    let path = file.path().to_str().unwrap();
    let out = run(&["routeforge", "match", "--routes", path, "post", "/user/7/edit"]).unwrap();
    assert!(out.contains("handler: users.edit"));
    assert!(out.contains("name: user_edit"));
    assert!(out.contains("param id=7"));

    let out = run(&["routeforge", "match", "--routes", path, "GET", "/orders/12"]).unwrap();
    assert!(out.contains("handler: orders.show"));
}

#[test]
fn test_run_match_reports_allowed_methods() {
    let file = routes_file();
    let path = file.path().to_str().unwrap();
    let err = run(&["routeforge", "match", "--routes", path, "DELETE", "/user/7/edit"]).unwrap_err();
    assert!(err.to_string().contains("allowed: GET, POST"), "{err}");

    let err = run(&["routeforge", "match", "--routes", path, "GET", "/orders/abc"]).unwrap_err();
    assert!(err.to_string().contains("no route matches"));
}

#[test]
fn test_run_url() {
    let file = routes_file();
    let path = file.path().to_str().unwrap();
    let out = run(&["routeforge", "url", "--routes", path, "user_edit", "id=123"]).unwrap();
    assert_eq!(out.trim(), "/user/123/edit");

    let out = run(&[
        "routeforge",
        "url",
        "--routes",
        path,
        "user_edit",
        "id=5",
        "--absolute",
        "--scheme",
        "https",
        "--host",
        "example.com",
        "--script-name",
        "/app/index.php",
    ])
    .unwrap();
    assert_eq!(out.trim(), "https://example.com/app/user/5/edit");

    assert!(run(&["routeforge", "url", "--routes", path, "user_edit"]).is_err());
}

#[test]
fn test_run_compile_writes_cache() {
    let file = routes_file();
    let dir = tempfile::tempdir().unwrap();
    let cache = dir.path().join("routes.cache.json");
    let out = run(&[
        "routeforge",
        "compile",
        "--routes",
        file.path().to_str().unwrap(),
        "--cache",
        cache.to_str().unwrap(),
    ])
    .unwrap();
    assert!(out.contains("compiled 4 routes"), "{out}");
    assert!(out.contains("1 constrained"));
    assert!(cache.exists());
}

#[test]
fn test_run_dump() {
    let file = routes_file();
    let out = run(&["routeforge", "dump", "--routes", file.path().to_str().unwrap()]).unwrap();
    assert!(out.contains("[static] GET / -> home"));
    assert!(out.contains("[constrained] GET /orders/{id} -> orders.show"));
}
