pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "showcase")]
#[command(about = "Showcase CLI - administration for the project showcase service")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Apply pending database migrations")]
    Migrate,

    #[command(about = "Issue an access token for a user")]
    Token(commands::token::TokenArgs),

    #[command(about = "Report upload storage usage")]
    Usage,

    #[command(about = "Approve or reject a pending project")]
    Review(commands::review::ReviewArgs),

    #[command(about = "Show the review history of a project")]
    Reviews {
        #[arg(help = "Project id")]
        project_id: i64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Migrate => commands::migrate::handle(output_format).await,
        Commands::Token(args) => commands::token::handle(args, output_format),
        Commands::Usage => commands::usage::handle(output_format).await,
        Commands::Review(args) => commands::review::handle(args, output_format).await,
        Commands::Reviews { project_id } => {
            commands::review::history(project_id, output_format).await
        }
    }
}
