use clap::Parser;
use routeforge::cli::{run_cli, Cli};
use routeforge::logging::{init_logging_with_config, LogConfig};

fn main() {
    let cli = Cli::parse();
    if let Err(err) = init_logging_with_config(&LogConfig::from_env()) {
        eprintln!("warning: {err:#}");
    }
    let stdout = std::io::stdout();
    if let Err(err) = run_cli(cli, &mut stdout.lock()) {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
