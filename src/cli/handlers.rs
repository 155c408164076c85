//! Command handlers
//!
//! Each handler returns the process exit code: 0 when the run finished with
//! no failed candidates, 1 when some candidate failed, 2 when the run could
//! not start or enumeration failed.

use super::commands::{ConfigArgs, GithubArgs, LocalArgs, SpiderArgs};
use super::output::{OutputFormat, OutputFormatter};
use crate::config::{ConfigError, SpiderConfig};
use crate::extract::{default_extractors, ExtractionEngine};
use crate::gate::FreshnessPolicy;
use crate::materialize::{CloneMaterializer, LocalMaterializer, Materializer};
use crate::source::{GitHubSearchClient, GitHubSearchSource, LocalTreeSource, RepositorySource, SearchCriteria};
use crate::spider::{ManifestSubprojectFinder, Spider, SpiderOptions, SpiderSummary};
use crate::store::FileAnalysisStore;
use chrono::Duration as ChronoDuration;
use std::sync::Arc;
use tracing::{debug, error};

pub const EXIT_OK: i32 = 0;
pub const EXIT_CANDIDATE_FAILURES: i32 = 1;
pub const EXIT_RUN_FAILED: i32 = 2;

/// Local walks default to one repository at a time.
const LOCAL_POOL_SIZE: usize = 1;

pub async fn handle_github(args: &GithubArgs) -> i32 {
    let queries = args.queries();
    if queries.is_empty() {
        eprintln!("Error: nothing to search for\n\nHelp: pass --org NAME or --query QUERY");
        return EXIT_RUN_FAILED;
    }

    let mut config = build_config(&args.spider, None);
    if let Some(dir) = &args.clone_dir {
        config = config.with_clone_dir(dir.clone());
    }
    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        return EXIT_RUN_FAILED;
    }

    let client = match GitHubSearchClient::new(&config.github_api, config.github_token.clone()) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("{}", e.help_message());
            return EXIT_RUN_FAILED;
        }
    };
    let source = GitHubSearchSource::new(Arc::new(client));

    let mut criteria = SearchCriteria::new(queries);
    criteria.max_examined = args.max_examined;
    criteria.max_kept = args.max_kept;

    let materializer = Arc::new(CloneMaterializer::new(config.clone_config()));
    run(&config, &args.spider, materializer, &source, &criteria).await
}

pub async fn handle_local(args: &LocalArgs) -> i32 {
    let config = build_config(&args.spider, Some(LOCAL_POOL_SIZE));
    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        return EXIT_RUN_FAILED;
    }

    let source = LocalTreeSource::new(&args.path);
    let criteria = SearchCriteria {
        max_kept: args.max_kept,
        ..Default::default()
    };

    run(&config, &args.spider, Arc::new(LocalMaterializer::new()), &source, &criteria).await
}

pub fn handle_config(args: &ConfigArgs) -> i32 {
    let config = SpiderConfig::default();
    let formatter = OutputFormatter::new(args.format.into());
    match formatter.format_config(&config) {
        Ok(output) => {
            println!("{}", output);
            match config.validate() {
                Ok(()) => EXIT_OK,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    EXIT_RUN_FAILED
                }
            }
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            EXIT_RUN_FAILED
        }
    }
}

/// Environment configuration overridden by command line flags.
/// `default_pool_size` wins over the environment when `--pool-size` is absent.
fn build_config(args: &SpiderArgs, default_pool_size: Option<usize>) -> SpiderConfig {
    let mut config = SpiderConfig::default();

    if let Some(workspace) = &args.workspace {
        config = config.with_workspace(workspace.clone());
    }
    if let Some(dir) = &args.data_dir {
        config = config.with_data_dir(dir.clone());
    }
    if let Some(pool_size) = args.pool_size.or(default_pool_size) {
        config = config.with_pool_size(pool_size);
    }
    if let Some(secs) = args.timeout {
        config = config.with_candidate_timeout(secs);
    }

    debug!(config = ?config, "Effective configuration");
    config
}

fn freshness(args: &SpiderArgs) -> Result<FreshnessPolicy, ConfigError> {
    if args.update {
        return Ok(FreshnessPolicy::NeverKeep);
    }
    let Some(hours) = args.max_age_hours else {
        return Ok(FreshnessPolicy::AlwaysKeep);
    };

    i64::try_from(hours)
        .ok()
        .and_then(ChronoDuration::try_hours)
        .map(FreshnessPolicy::KeepYoungerThan)
        .ok_or_else(|| ConfigError::ParseError {
            field: "--max-age-hours".to_string(),
            error: format!("{} hours is out of range", hours),
        })
}

fn spider_options(config: &SpiderConfig, args: &SpiderArgs) -> Result<SpiderOptions, ConfigError> {
    let mut options = SpiderOptions::default()
        .with_workspace(config.workspace_id.clone())
        .with_pool_size(config.pool_size)
        .with_freshness(freshness(args)?);
    if let Some(timeout) = config.candidate_timeout() {
        options = options.with_candidate_timeout(timeout);
    }
    if args.subprojects {
        options = options.with_subproject_finder(Arc::new(ManifestSubprojectFinder::new()));
    }
    Ok(options)
}

async fn run(
    config: &SpiderConfig,
    args: &SpiderArgs,
    materializer: Arc<dyn Materializer>,
    source: &dyn RepositorySource,
    criteria: &SearchCriteria,
) -> i32 {
    let options = match spider_options(config, args) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("Error: {}\n\nHelp: use a smaller --max-age-hours or --update", e);
            return EXIT_RUN_FAILED;
        }
    };
    let store = Arc::new(FileAnalysisStore::new(&config.data_dir, &config.workspace_id));
    let engine = Arc::new(ExtractionEngine::new(default_extractors()));
    let spider = Spider::new(materializer, engine, store, options);

    match spider.run(source, criteria).await {
        Ok(summary) => report(&summary, args.format.into()),
        Err(e) => {
            error!(error = %e, "Spider run aborted");
            eprintln!("{}", e.help_message());
            EXIT_RUN_FAILED
        }
    }
}

fn report(summary: &SpiderSummary, format: OutputFormat) -> i32 {
    match OutputFormatter::new(format).format_summary(summary) {
        Ok(output) => println!("{}", output),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return EXIT_RUN_FAILED;
        }
    }

    if summary.has_failures() {
        EXIT_CANDIDATE_FAILURES
    } else {
        EXIT_OK
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands::{CliArgs, Commands};
    use clap::Parser;
    use serial_test::serial;

    fn local_args(extra: &[&str]) -> LocalArgs {
        let mut argv = vec!["repo-spider", "local", "/src"];
        argv.extend_from_slice(extra);
        match CliArgs::parse_from(argv).command {
            Commands::Local(local) => local,
            _ => panic!("Expected Local command"),
        }
    }

    #[test]
    fn test_freshness_from_flags() {
        assert_eq!(freshness(&local_args(&[]).spider).unwrap(), FreshnessPolicy::AlwaysKeep);
        assert_eq!(
            freshness(&local_args(&["--update"]).spider).unwrap(),
            FreshnessPolicy::NeverKeep
        );
        assert_eq!(
            freshness(&local_args(&["--max-age-hours", "6"]).spider).unwrap(),
            FreshnessPolicy::KeepYoungerThan(ChronoDuration::hours(6))
        );
    }

    #[test]
    fn test_huge_max_age_is_rejected() {
        for hours in ["10000000000000000", "18446744073709551615"] {
            let err = freshness(&local_args(&["--max-age-hours", hours]).spider).unwrap_err();
            assert!(matches!(err, ConfigError::ParseError { .. }));
        }
    }

    #[tokio::test]
    #[serial]
    async fn test_local_with_huge_max_age_fails_run() {
        let tree = tempfile::TempDir::new().unwrap();
        let args = match CliArgs::parse_from([
            "repo-spider",
            "local",
            tree.path().to_str().unwrap(),
            "--max-age-hours",
            "10000000000000000",
        ])
        .command
        {
            Commands::Local(local) => local,
            _ => panic!("Expected Local command"),
        };
        assert_eq!(handle_local(&args).await, EXIT_RUN_FAILED);
    }

    #[test]
    #[serial]
    fn test_local_pool_size_defaults_to_one() {
        let config = build_config(&local_args(&[]).spider, Some(LOCAL_POOL_SIZE));
        assert_eq!(config.pool_size, 1);

        let config = build_config(&local_args(&["--pool-size", "8"]).spider, Some(LOCAL_POOL_SIZE));
        assert_eq!(config.pool_size, 8);
    }

    #[test]
    #[serial]
    fn test_flags_override_environment() {
        let args = local_args(&["--workspace", "acme", "--timeout", "0", "--data-dir", "/var/spider"]);
        let config = build_config(&args.spider, None);

        assert_eq!(config.workspace_id, "acme");
        assert!(config.candidate_timeout().is_none());
        assert_eq!(config.data_dir, std::path::PathBuf::from("/var/spider"));
    }

    #[test]
    fn test_report_exit_codes() {
        let empty = SpiderSummary::empty();
        assert_eq!(report(&empty, OutputFormat::Json), EXIT_OK);

        let mut failed = SpiderSummary::empty();
        failed.repositories_detected = 1;
        failed.failed.push(crate::spider::SpiderFailure {
            repo_url: "u".to_string(),
            while_trying_to: crate::model::Stage::Clone,
            message: "cannot clone".to_string(),
        });
        assert_eq!(report(&failed, OutputFormat::Json), EXIT_CANDIDATE_FAILURES);
    }

    #[tokio::test]
    async fn test_github_without_queries_fails_fast() {
        let args = match CliArgs::parse_from(["repo-spider", "github"]).command {
            Commands::Github(github) => github,
            _ => panic!("Expected Github command"),
        };
        assert_eq!(handle_github(&args).await, EXIT_RUN_FAILED);
    }
}
