mod app;
mod config;
mod db;
mod error;
mod http;
mod models;
mod queue;
mod services;

use app::QueueService;
use config::Config;
use error::Result;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (RUST_LOG overrides; service events at info by default)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("muzily=info,warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    // Parse command line arguments
    let args: Vec<String> = std::env::args().collect();

    // Load configuration
    let config = Config::load()?;

    // Initialize the queue service
    let queue = QueueService::new(&config).await?;

    // Check for --list flag (print a ranked stream and exit)
    if args.len() >= 3 && args[1] == "--list" {
        print_queue(&queue, &args[2]).await?;
        return Ok(());
    }

    // Check for --recompute flag (rebuild cached tallies and exit)
    if args.len() >= 3 && args[1] == "--recompute" {
        let count = queue.recompute_collection(&args[2]).await?;
        println!("Recomputed {} tallies", count);
        return Ok(());
    }

    http::serve(&config, queue).await
}

async fn print_queue(queue: &QueueService, creator_id: &str) -> Result<()> {
    let entries = queue.list_queue(creator_id, None).await?;
    if entries.is_empty() {
        println!("Queue is empty");
        return Ok(());
    }

    for (position, entry) in entries.iter().enumerate() {
        let item = &entry.item;
        let tally = item.tally();
        println!(
            "{:>3}. [+{} / -{}] {} ({})",
            position + 1,
            tally.upvotes,
            tally.downvotes,
            item.title,
            item.extracted_id
        );
    }
    Ok(())
}
