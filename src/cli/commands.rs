use crate::{
    config::CompilerConfig,
    generator::{CachedDataGenerator, DataGenerator, GroupCountBasedGenerator, RouteData},
    route::RouteCollection,
    router::RouteTable,
    url_generator::{RequestContext, UrlGenerator},
};
use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use http::Method;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// Command-line interface for routeforge
///
/// Compiles route files, resolves requests against them and generates URLs.
#[derive(Parser)]
#[command(name = "routeforge")]
#[command(about = "Route compiler and matcher", long_about = None)]
pub struct Cli {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Compile a route file and report what was built
    ///
    /// With `--cache` (or `ROUTEFORGE_CACHE_PATH`) the compiled data is
    /// written to the cache file, or read from it when already present.
    Compile {
        /// Path to the route file (YAML or JSON)
        #[arg(short, long)]
        routes: PathBuf,

        /// Cache file for the compiled route data
        #[arg(long)]
        cache: Option<PathBuf>,

        /// Routes per alternation regex (overrides ROUTEFORGE_CHUNK_SIZE)
        #[arg(long)]
        chunk_size: Option<usize>,
    },
    /// Match a request against a route file
    Match {
        /// Path to the route file (YAML or JSON)
        #[arg(short, long)]
        routes: PathBuf,

        /// HTTP method, e.g. GET
        method: String,

        /// Request path, e.g. /user/123/edit
        path: String,
    },
    /// Generate the URL of a named route
    Url {
        /// Path to the route file (YAML or JSON)
        #[arg(short, long)]
        routes: PathBuf,

        /// Route name
        name: String,

        /// Parameters as key=value pairs
        params: Vec<String>,

        /// Emit an absolute URL
        #[arg(long, default_value_t = false)]
        absolute: bool,

        /// Scheme used for absolute URLs
        #[arg(long, default_value = "http")]
        scheme: String,

        /// Host used for absolute URLs
        #[arg(long, default_value = "localhost")]
        host: String,

        /// Front controller path; its directory becomes the base path
        #[arg(long)]
        script_name: Option<String>,
    },
    /// Print every compiled route, grouped by table
    Dump {
        /// Path to the route file (YAML or JSON)
        #[arg(short, long)]
        routes: PathBuf,
    },
}

/// Execute the CLI command provided by the user
///
/// Command output goes to `out`; logs go to stderr.
///
/// # Errors
///
/// Returns an error if:
/// - The route file cannot be loaded or compiled
/// - The cache file cannot be written
/// - No route matches in `match`
/// - URL generation fails in `url`
pub fn run_cli(cli: Cli, out: &mut impl Write) -> anyhow::Result<()> {
    match cli.command {
        Commands::Compile {
            routes,
            cache,
            chunk_size,
        } => {
            let mut config = CompilerConfig::from_env();
            if let Some(size) = chunk_size {
                config.chunk_size = size.max(1);
            }
            if cache.is_some() {
                config.cache_path = cache;
                config.cache_enabled = true;
            }
            let data = compile(&routes, &config)?;
            writeln!(
                out,
                "compiled {} routes: {} static, {} chunks, {} constrained, {} named",
                data.route_count(),
                data.static_routes.values().map(|m| m.len()).sum::<usize>(),
                data.dynamic_routes.values().map(Vec::len).sum::<usize>(),
                data.constrained_routes.values().map(Vec::len).sum::<usize>(),
                data.named_routes.len()
            )?;
            if let Some(path) = config.effective_cache_path() {
                writeln!(out, "cache: {}", path.display())?;
            }
        }
        Commands::Match {
            routes,
            method,
            path,
        } => {
            let table = load_table(&routes)?;
            let method: Method = method
                .to_uppercase()
                .parse()
                .with_context(|| format!("invalid HTTP method '{method}'"))?;
            let Some(matched) = table.route(&method, &path) else {
                let allowed = table.allowed_methods(&path);
                if allowed.is_empty() {
                    return Err(anyhow!("no route matches {method} {path}"));
                }
                let allowed: Vec<String> = allowed.iter().map(Method::to_string).collect();
                return Err(anyhow!(
                    "method {method} not allowed for {path} (allowed: {})",
                    allowed.join(", ")
                ));
            };
            writeln!(out, "handler: {}", matched.handler())?;
            if let Some(name) = &matched.descriptor.name {
                writeln!(out, "name: {name}")?;
            }
            for (key, value) in &matched.params {
                writeln!(out, "param {key}={value}")?;
            }
        }
        Commands::Url {
            routes,
            name,
            params,
            absolute,
            scheme,
            host,
            script_name,
        } => {
            let table = load_table(&routes)?;
            let pairs = parse_params(&params)?;
            let mut urls = UrlGenerator::from_table(&table);
            if absolute || script_name.is_some() {
                let script = script_name.as_deref().unwrap_or("/");
                urls = urls.with_context(RequestContext::from_script_name(scheme, host, script));
            }
            writeln!(out, "{}", urls.generate(&name, pairs, absolute)?)?;
        }
        Commands::Dump { routes } => {
            let table = load_table(&routes)?;
            for line in table.dump_routes() {
                writeln!(out, "{line}")?;
            }
        }
    }
    Ok(())
}

fn compile(routes: &Path, config: &CompilerConfig) -> anyhow::Result<RouteData> {
    let collection = RouteCollection::from_file(routes)?;
    let generator = GroupCountBasedGenerator::from_config(collection, config);
    let data = match config.effective_cache_path() {
        Some(path) => CachedDataGenerator::new(generator, path).data()?,
        None => generator.data()?,
    };
    info!(routes = data.route_count(), "Route file compiled");
    Ok(data)
}

fn load_table(routes: &Path) -> anyhow::Result<RouteTable> {
    let data = compile(routes, &CompilerConfig::from_env())?;
    Ok(RouteTable::from_data(data)?)
}

/// Split `key=value` arguments; a value may itself contain `=`.
pub(crate) fn parse_params(params: &[String]) -> anyhow::Result<Vec<(String, String)>> {
    params
        .iter()
        .map(|p| {
            p.split_once('=')
                .filter(|(k, _)| !k.is_empty())
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .ok_or_else(|| anyhow!("invalid parameter '{p}', expected key=value"))
        })
        .collect()
}
