//! git-rv - review-branch workflow tool
//!
//! CLI binary for exporting, syncing and landing changes through a hosted
//! code review.

use anyhow::Result;
use clap::{Parser, Subcommand};
use git_rv::workflow::ExportOptions;
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "git-rv")]
#[command(about = "Work with hosted code reviews from feature branches")]
#[command(version)]
struct Cli {
    /// Path to the git repository (defaults to current directory)
    #[arg(short, long, global = true)]
    path: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export the current branch's changes to the review server
    Export {
        /// Review server to export to
        #[arg(long)]
        server: Option<String>,

        /// Make the review restricted-access
        #[arg(long)]
        private: bool,

        /// CC addresses, comma separated
        #[arg(long, value_delimiter = ',')]
        cc: Option<Vec<String>>,

        /// Reviewer addresses, comma separated
        #[arg(long, value_delimiter = ',')]
        reviewers: Option<Vec<String>>,

        /// Subject for the patch, instead of picking a commit message
        #[arg(long)]
        title: Option<String>,

        /// Description for the patch; requires --title
        #[arg(long, requires = "title")]
        message: Option<String>,

        /// Don't ask the server to mail reviewers about the upload
        #[arg(long)]
        no_mail: bool,
    },

    /// Sync the current review branch with its tracked remote branch
    Sync {
        /// Continue a sync halted at a merge conflict
        #[arg(long = "continue")]
        continuing: bool,
    },

    /// Land an approved review on the remote as a single commit
    Submit {
        /// Don't close the review issue after landing
        #[arg(long)]
        leave_open: bool,
    },

    /// Show the review metadata for the current branch
    Getinfo {
        /// Refresh the metadata from the review server first
        #[arg(short, long)]
        pull: bool,
    },

    /// Rename a review branch, keeping its review metadata
    Rename {
        /// Current branch name
        source: String,
        /// Desired new name
        target: String,
    },

    /// Delete a review branch together with its review metadata
    Delete {
        /// Name of the branch to delete
        branch: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let path = cli.path.unwrap_or_else(|| PathBuf::from("."));

    match cli.command {
        Commands::Export {
            server,
            private,
            cc,
            reviewers,
            title,
            message,
            no_mail,
        } => {
            let options = ExportOptions {
                server,
                private,
                cc,
                reviewers,
                title,
                message,
                send_mail: !no_mail,
            };
            cli::run_export(&path, options).await?;
        }
        Commands::Sync { continuing } => {
            cli::run_sync(&path, continuing).await?;
        }
        Commands::Submit { leave_open } => {
            cli::run_submit(&path, leave_open).await?;
        }
        Commands::Getinfo { pull } => {
            cli::run_getinfo(&path, pull).await?;
        }
        Commands::Rename { source, target } => {
            cli::run_rename(&path, source, target).await?;
        }
        Commands::Delete { branch } => {
            cli::run_delete(&path, branch).await?;
        }
    }

    Ok(())
}
