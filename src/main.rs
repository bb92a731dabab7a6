use std::path::PathBuf;
use std::sync::Arc;

use civicrag::config::AppConfig;
use civicrag::database::Database;
use civicrag::embeddings::EmbeddingClient;
use civicrag::models::NewCommunityPost;
use civicrag::models::PostCategory;
use civicrag::rag::ChatService;
use civicrag::Result;
use clap::Parser;
use clap::Subcommand;
use tracing::info;
use tracing::warn;

#[derive(Parser)]
#[command(name = "civicrag")]
#[command(about = "Retrieval-augmented chat backend for community engagement data")]
#[command(version)]
struct Cli {
    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the API server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        /// Port to bind to
        #[arg(short, long, default_value = "3000")]
        port: u16,
        /// Disable CORS headers
        #[arg(long)]
        no_cors: bool,
    },
    /// Initialize the database schema
    Init,
    /// Seed community posts from a text file (one post per line),
    /// generating an embedding for each post at ingestion
    Seed {
        /// Path to the posts file
        #[arg(short, long, default_value = "data/community_posts.txt")]
        file: PathBuf,
        /// Author recorded for the seeded posts
        #[arg(long, default_value = "seed")]
        author: String,
    },
    /// Ask a single question from the command line
    Ask {
        /// User identifier for history lookup and persistence
        #[arg(short, long, default_value = "cli")]
        user_id: String,
        /// The question to ask
        query: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = AppConfig::load()?;

    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    civicrag::logging::init_logging_with_config(Some(&config))?;

    match cli.command {
        Commands::Serve {
            host,
            port,
            no_cors,
        } => {
            civicrag::api::serve_api(&config, host, port, !no_cors).await?;
        }
        Commands::Init => {
            let database = Database::from_config(&config).await?;
            database.init_schema(config.embedding_dimension()).await?;
            info!("Database schema initialized");
        }
        Commands::Seed { file, author } => {
            seed_posts(&config, &file, &author).await?;
        }
        Commands::Ask { user_id, query } => {
            let service = ChatService::from_config(&config).await?;
            let answer = service.handle(&user_id, &query).await;

            println!("{}", answer.text);
            if !answer.retrieved_posts.is_empty() {
                println!("\nBased on {} community post(s)", answer.retrieved_posts.len());
            }
            if !answer.suggested_questions.is_empty() {
                println!("\nYou could also ask:");
                for question in &answer.suggested_questions {
                    println!("  - {question}");
                }
            }
        }
    }

    Ok(())
}

/// Seed community posts from a plain-text file, one post per non-empty
/// line. Each post is embedded once at ingestion; lines that fail to
/// embed are skipped so one bad line doesn't abort the whole run.
async fn seed_posts(config: &AppConfig, file: &PathBuf, author: &str) -> Result<()> {
    let database = Arc::new(Database::from_config(config).await?);
    let embedder = EmbeddingClient::from_config(config)?;

    let content = std::fs::read_to_string(file)?;
    let lines: Vec<&str> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    info!("Seeding {} posts from {}", lines.len(), file.display());

    let mut saved = 0usize;
    for line in lines {
        let embedding = match embedder.generate(line).await {
            Ok(embedding) => embedding,
            Err(e) => {
                warn!("Skipping post, embedding failed: {e}");
                continue;
            }
        };

        let title: String = line.chars().take(40).collect();
        let post = NewCommunityPost {
            author: author.to_string(),
            title: format!("{title}..."),
            content: line.to_string(),
            category: PostCategory::Discussion,
        };

        match database.insert_post(&post, embedding).await {
            Ok(stored) => {
                info!("Saved: {}", stored.title);
                saved += 1;
            }
            Err(e) => warn!("Failed to save post: {e}"),
        }
    }

    info!("Finished seeding {saved} posts");
    Ok(())
}
