//! CLI interface module

pub mod commands;

use std::fmt;

use colored::Colorize;

use crate::cli::{Commands, ConfigCommands};
use crate::runtime::{StartupContext, prepare_startup};
use commands::{
    assign_slots, generate_config, record_visit, show_priorities, show_ranking, show_selection,
};

#[derive(Debug)]
pub enum CliError {
    StorageError(String),
    ParseError(String),
    CommandError(String),
}

impl CliError {
    /// Format as simple output
    pub fn format_simple(&self) -> String {
        match self {
            CliError::StorageError(msg) => format!("Storage error: {}", msg),
            CliError::ParseError(msg) => format!("Parse error: {}", msg),
            CliError::CommandError(msg) => format!("Command error: {}", msg),
        }
    }

    /// Format as colored output
    pub fn format_colored(&self) -> String {
        match self {
            CliError::StorageError(msg) => {
                format!("{} {}", "Storage error:".red().bold(), msg.white())
            }
            CliError::ParseError(msg) => {
                format!("{} {}", "Parse error:".yellow().bold(), msg.white())
            }
            CliError::CommandError(msg) => {
                format!("{} {}", "Command error:".red().bold(), msg.white())
            }
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for CliError {}

impl From<crate::errors::ReaccessError> for CliError {
    fn from(err: crate::errors::ReaccessError) -> Self {
        match err {
            crate::errors::ReaccessError::Validation(msg)
            | crate::errors::ReaccessError::DateParse(msg) => CliError::ParseError(msg),
            crate::errors::ReaccessError::NotFound(msg) => CliError::CommandError(msg),
            other => CliError::StorageError(other.to_string()),
        }
    }
}

/// Run a CLI command from clap-parsed input
pub async fn run_cli_command(cmd: Commands) -> Result<(), CliError> {
    match cmd {
        Commands::Select {
            slot,
            rss,
            limit,
            order,
            site_id,
        } => show_selection(&connect().await?, slot, rss, limit, order, site_id).await,

        Commands::Priorities { period, ids } => {
            show_priorities(&connect().await?, period, ids).await
        }

        Commands::Ranking { period, limit } => show_ranking(&connect().await?, period, limit).await,

        Commands::Record {
            metric,
            site_id,
            url,
            date,
        } => record_visit(&connect().await?, metric, site_id, url, date).await,

        Commands::Assign { site_id, link, rss } => {
            assign_slots(&connect().await?, site_id, link, rss).await
        }

        // 生成配置不需要连接数据库
        Commands::Config {
            action: ConfigCommands::Generate { output_path, force },
        } => generate_config(output_path, force).await,
    }
}

async fn connect() -> Result<StartupContext, CliError> {
    prepare_startup()
        .await
        .map_err(|e| CliError::StorageError(format!("{:#}", e)))
}
