//! Console driver: one conversation over stdin/stdout.
//!
//! Usage: `convo-engine [conversation-id]` (defaults to `console`).

use std::error::Error;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use convo_engine::adapters::{
    FileFactRepository, FileTranscriptStore, InMemoryFactRepository, InMemoryTranscriptStore,
    RegexIntentClassifier, SystemClock,
};
use convo_engine::application::{ConversationService, RespondCommand};
use convo_engine::config::{AppConfig, LogFormat, LoggingConfig, StorageConfig};
use convo_engine::domain::catalog::Catalog;
use convo_engine::domain::chat::EngineBlueprint;
use convo_engine::ports::{FactRepository, TranscriptStore};

const DEFAULT_CONVERSATION: &str = "console";

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = AppConfig::load()?;
    init_tracing(&config.logging);
    config.validate()?;

    let catalog = Catalog::load(&config.engine.resource_path)?;
    let classifier = RegexIntentClassifier::from_spec(catalog.classifier())?;
    let blueprint = EngineBlueprint::new(catalog, Arc::new(classifier))?;

    let (repository, transcript) = storage(&config.storage);
    let service = ConversationService::new(
        Arc::new(blueprint),
        repository,
        transcript,
        Arc::new(SystemClock),
    )
    .with_rng_seed(config.engine.rng_seed);

    let conversation_id = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONVERSATION.to_string());
    info!(conversation_id = %conversation_id, "Console session started");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let message = line.trim();
        if message.is_empty() {
            continue;
        }
        match service
            .handle(RespondCommand::new(conversation_id.clone(), message))
            .await
        {
            Ok(result) => println!("{}", result.reply),
            Err(e) => error!(code = %e.code(), error = %e, "Turn failed"),
        }
    }

    service.end_conversation(&conversation_id).await?;
    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    // Replies go to stdout, so logs stay on stderr
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    let _ = match logging.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.try_init(),
    };
}

fn storage(config: &StorageConfig) -> (Arc<dyn FactRepository>, Arc<dyn TranscriptStore>) {
    if config.is_file_backed() {
        (
            Arc::new(FileFactRepository::new(&config.facts_dir)),
            Arc::new(FileTranscriptStore::new(&config.transcripts_dir)),
        )
    } else {
        (
            Arc::new(InMemoryFactRepository::new()),
            Arc::new(InMemoryTranscriptStore::new()),
        )
    }
}
