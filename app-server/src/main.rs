//! `jdrec-server`: serves job description recommendations over HTTP.
//!
//! Usage:
//!   jdrec-server                                  # 127.0.0.1:8000, ./jds.json
//!   jdrec-server --config jdrec.toml              # settings from a file
//!   jdrec-server --provider hash --in-memory      # offline, no persistence

use std::path::PathBuf;

use clap::Parser;
use jdrec_app_server::ServerConfig;
use jdrec_retrieval::EmbeddingProviderType;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "jdrec-server", version, about = "Job description recommender API")]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, env = "JDREC_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind
    #[arg(long, env = "JDREC_HOST")]
    host: Option<String>,

    /// Port to bind
    #[arg(short, long, env = "JDREC_PORT")]
    port: Option<u16>,

    /// Corpus file (JSON array of {title, jd})
    #[arg(long, env = "JDREC_CORPUS")]
    corpus: Option<PathBuf>,

    /// Vector store directory
    #[arg(long, env = "JDREC_STORAGE", conflicts_with = "in_memory")]
    storage: Option<PathBuf>,

    /// Keep the vector store in memory only
    #[arg(long)]
    in_memory: bool,

    /// Embedding provider: openai or hash
    #[arg(long, env = "JDREC_EMBEDDING_PROVIDER")]
    provider: Option<EmbeddingProviderType>,

    /// Embedding model name
    #[arg(long, env = "JDREC_EMBEDDING_MODEL")]
    model: Option<String>,

    /// Base URL of an OpenAI-compatible embedding endpoint
    #[arg(long, env = "JDREC_EMBEDDING_URL")]
    base_url: Option<String>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn into_config(self) -> anyhow::Result<ServerConfig> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::load(path)?,
            None => ServerConfig::default(),
        };

        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }

        let recommender = &mut config.recommender;
        if let Some(corpus) = self.corpus {
            recommender.corpus_path = corpus;
        }
        if let Some(storage) = self.storage {
            recommender.storage_path = Some(storage);
        }
        if self.in_memory {
            recommender.storage_path = None;
        }
        if let Some(provider) = self.provider {
            recommender.embedding.provider = provider;
        }
        if let Some(model) = self.model {
            recommender.embedding.model = Some(model);
        }
        if let Some(base_url) = self.base_url {
            recommender.embedding.base_url = Some(base_url);
        }

        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "jdrec_app_server=debug,jdrec_retrieval=debug,jdrec_vector_store=debug,jdrec_embeddings=debug,tower_http=debug"
    } else {
        "jdrec_app_server=info,jdrec_retrieval=info,jdrec_vector_store=info,jdrec_embeddings=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let config = cli.into_config()?;
    jdrec_app_server::run(config).await
}
