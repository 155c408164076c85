use repo_spider::cli::commands::{CliArgs, Commands};
use repo_spider::cli::handlers::{handle_config, handle_github, handle_local};
use repo_spider::util::logging::{init_logging, parse_level, LoggingConfig};
use repo_spider::VERSION;

use clap::Parser;
use tracing::{debug, Level};

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();
    init_logging_from_args(&args);

    debug!("repo-spider v{} starting", VERSION);
    debug!("Arguments: {:?}", args);

    let exit_code = match &args.command {
        Commands::Github(github_args) => handle_github(github_args).await,
        Commands::Local(local_args) => handle_local(local_args).await,
        Commands::Config(config_args) => handle_config(config_args),
    };

    std::process::exit(exit_code);
}

/// `--log-level` wins, then `-v`/`-q`, then `REPO_SPIDER_LOG_LEVEL`.
fn init_logging_from_args(args: &CliArgs) {
    let mut config = LoggingConfig::from_env();
    if let Some(level_str) = &args.log_level {
        config.level = parse_level(level_str);
    } else if args.verbose {
        config.level = Level::DEBUG;
    } else if args.quiet {
        config.level = Level::ERROR;
    }
    init_logging(config);
}
