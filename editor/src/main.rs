//! `jdrec-editor`: search, edit and reindex job descriptions from a terminal.
//!
//! Usage:
//!   jdrec-editor recommend "Backend Developer"            # selector list
//!   jdrec-editor recommend "Backend Developer" --pick 1   # full JD of entry 1
//!   jdrec-editor save --title "Backend Developer" --file jd.txt
//!   jdrec-editor refresh

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use jdrec_editor::display::{pick, read_jd, selector_list};
use jdrec_editor::{ClientError, DEFAULT_SERVER_URL, RecommenderClient};
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "jdrec-editor", version, about = "Job description editor")]
struct Cli {
    /// Recommender server URL
    #[arg(long, env = "JDREC_SERVER", default_value = DEFAULT_SERVER_URL)]
    server: String,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Find job descriptions for a position
    Recommend {
        /// Position name
        position: String,

        /// Number of recommendations
        #[arg(short, long)]
        k: Option<usize>,

        /// Print the full JD of this entry (1-based)
        #[arg(long)]
        pick: Option<usize>,
    },

    /// Save a job description and reindex
    Save {
        /// Job title
        #[arg(short, long)]
        title: String,

        /// JD text
        #[arg(long, conflicts_with = "file")]
        jd: Option<String>,

        /// Read the JD from a file; stdin is used when neither is given
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Overwrite a corpus file the server cannot parse
        #[arg(long)]
        force: bool,
    },

    /// Reload every job description from the corpus file
    Refresh,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "jdrec_editor=debug"
    } else {
        "jdrec_editor=warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let client = RecommenderClient::new(&cli.server)?;

    match cli.command {
        Command::Recommend {
            position,
            k,
            pick: selected,
        } => {
            let recommendations = client
                .recommend(&position, k)
                .await
                .context("failed to get recommendations")?;

            match selected {
                Some(index) => {
                    let rec = pick(&recommendations, index).with_context(|| {
                        format!(
                            "no recommendation {index}; {} available",
                            recommendations.len()
                        )
                    })?;
                    println!("{}", rec.jd);
                }
                None => {
                    for line in selector_list(&recommendations) {
                        println!("{line}");
                    }
                }
            }
        }
        Command::Save {
            title,
            jd,
            file,
            force,
        } => {
            let jd = read_jd(jd, file.as_deref(), std::io::stdin().lock())
                .context("failed to read job description")?;

            match client.upsert(&title, &jd, force).await {
                Ok(result) => println!("{}", result.message),
                Err(ClientError::StaleIndex(detail)) => {
                    warn!("{detail}");
                    println!(
                        "JD for '{}' saved, but the index is stale; run `jdrec-editor refresh`.",
                        title.trim()
                    );
                }
                Err(e) => return Err(e).context("failed to save job description"),
            }
        }
        Command::Refresh => {
            let message = client.reload().await.context("failed to reload data")?;
            println!("{message}");
        }
    }

    Ok(())
}
