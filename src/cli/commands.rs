use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Discover repositories, extract fingerprints and persist the analyses
#[derive(Parser, Debug)]
#[command(
    name = "repo-spider",
    about = "Spider repositories and persist fingerprint analyses",
    version,
    author,
    long_about = "repo-spider enumerates repositories from GitHub search or a local \
                  directory tree, clones or opens each one, runs the fingerprint \
                  extractors over it and stores one JSON analysis per repository."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - only log errors"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Spider repositories found by GitHub search",
        long_about = "Runs one or more GitHub repository searches and spiders every result.\n\n\
                      Examples:\n  \
                      repo-spider github --org atomist\n  \
                      repo-spider github --query 'language:rust stars:>100' --max-kept 50\n  \
                      repo-spider github --org acme --update --pool-size 10"
    )]
    Github(GithubArgs),

    #[command(
        about = "Spider every git checkout below a directory",
        long_about = "Walks a directory tree and spiders every directory containing .git. \
                      Repositories are processed one at a time unless --pool-size is given.\n\n\
                      Examples:\n  \
                      repo-spider local ~/src\n  \
                      repo-spider local . --workspace personal --format human"
    )]
    Local(LocalArgs),

    #[command(about = "Show the effective configuration")]
    Config(ConfigArgs),
}

/// Options shared by every spidering command
#[derive(Args, Debug, Clone)]
pub struct SpiderArgs {
    #[arg(short = 'w', long, value_name = "ID", help = "Workspace id namespacing stored analyses")]
    pub workspace: Option<String>,

    #[arg(
        short = 'u',
        long,
        conflicts_with = "max_age_hours",
        help = "Re-analyse repositories that already have a stored analysis"
    )]
    pub update: bool,

    #[arg(
        long,
        value_name = "HOURS",
        help = "Re-analyse stored analyses older than this many hours"
    )]
    pub max_age_hours: Option<u64>,

    #[arg(long, value_name = "N", help = "Repositories processed per batch")]
    pub pool_size: Option<usize>,

    #[arg(
        long,
        value_name = "SECONDS",
        help = "Give up on a repository after this many seconds (0 disables)"
    )]
    pub timeout: Option<u64>,

    #[arg(long, value_name = "DIR", help = "Directory holding stored analyses")]
    pub data_dir: Option<PathBuf>,

    #[arg(long, help = "Analyse each manifest-bearing sub-directory as its own project")]
    pub subprojects: bool,

    #[arg(short = 'f', long, value_enum, default_value = "json", help = "Output format")]
    pub format: OutputFormatArg,
}

#[derive(Args, Debug, Clone)]
pub struct GithubArgs {
    #[arg(long, value_name = "ORG", help = "Spider every repository of an organisation")]
    pub org: Vec<String>,

    #[arg(short = 'Q', long, value_name = "QUERY", help = "GitHub repository search query")]
    pub query: Vec<String>,

    #[arg(long, value_name = "N", help = "Stop a query after examining this many results")]
    pub max_examined: Option<usize>,

    #[arg(long, value_name = "N", help = "Stop a query after keeping this many repositories")]
    pub max_kept: Option<usize>,

    #[arg(long, value_name = "DIR", help = "Keep clones here and refresh them on later runs")]
    pub clone_dir: Option<PathBuf>,

    #[command(flatten)]
    pub spider: SpiderArgs,
}

impl GithubArgs {
    /// `--org` values become `org:NAME` queries, followed by `--query` values.
    pub fn queries(&self) -> Vec<String> {
        self.org
            .iter()
            .map(|org| format!("org:{}", org))
            .chain(self.query.iter().cloned())
            .collect()
    }
}

#[derive(Args, Debug, Clone)]
pub struct LocalArgs {
    #[arg(value_name = "PATH", default_value = ".", help = "Directory to walk")]
    pub path: PathBuf,

    #[arg(long, value_name = "N", help = "Stop after this many repositories")]
    pub max_kept: Option<usize>,

    #[command(flatten)]
    pub spider: SpiderArgs,
}

#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    #[arg(short = 'f', long, value_enum, default_value = "human", help = "Output format")]
    pub format: OutputFormatArg,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Json,
    Yaml,
    Human,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => super::output::OutputFormat::Json,
            OutputFormatArg::Yaml => super::output::OutputFormat::Yaml,
            OutputFormatArg::Human => super::output::OutputFormat::Human,
        }
    }
}
