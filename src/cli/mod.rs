pub mod commands;
pub mod handlers;
pub mod output;

pub use commands::{CliArgs, Commands, ConfigArgs, GithubArgs, LocalArgs, SpiderArgs};
pub use output::{OutputFormat, OutputFormatter};
