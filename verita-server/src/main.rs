use std::sync::Arc;

use clap::Parser;
use tokio::sync::broadcast;
use tracing_subscriber::{fmt, EnvFilter};
use verita_core::blob::{BlobStore, HttpBlobStore};
use verita_core::store::{PgRecordStore, RecordStore};
use verita_core::summarize::SummarizerClient;
use verita_core::vision::VisionClient;
use verita_core::{ApiCredentials, VeraGatewayClient, VeritaConfig, VerificationGateway};

use verita_server::http::{start_http_server, HttpState};
use verita_server::subsystems::claims::ClaimExtractor;
use verita_server::subsystems::evidence::{EvidenceSearch, FeedEvidenceSearch};
use verita_server::subsystems::media::{BlobMediaAnalyzer, MediaAnalyzer};
use verita_server::subsystems::orchestrator::FactCheckOrchestrator;
use verita_server::subsystems::url::{PageSummaryAnalyzer, UrlAnalyzer};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "verita.toml")]
    config: String,

    #[arg(long)]
    health: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (dev convenience — production uses real env vars)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Init logging
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    // Load config
    let config = match VeritaConfig::load(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", args.config, e);
            std::process::exit(1);
        }
    };

    // Connect to DB
    let pool = match verita_core::db::create_pool(&config.database).await {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Failed to connect to database: {}", e);
            std::process::exit(1);
        }
    };

    if args.health {
        match verita_core::db::health_check(&pool).await {
            Ok(v) => println!("✅ PostgreSQL connected: {}", v),
            Err(e) => {
                println!("❌ PostgreSQL connection failed: {}", e);
                std::process::exit(1);
            }
        }

        println!("✅ Verita DB health check passed");
        return Ok(());
    }

    // Credentials come from the environment; each missing key is logged
    // here once instead of failing on first use.
    let credentials = ApiCredentials::from_env();

    // Wire the pipeline: store, external capability clients, subsystems.
    let store: Arc<dyn RecordStore> = Arc::new(PgRecordStore::new(pool.clone()));

    let gateway: Arc<dyn VerificationGateway> = Arc::new(VeraGatewayClient::new(
        &config.gateway,
        credentials.vera_api_key.clone(),
    )?);

    let evidence: Arc<dyn EvidenceSearch> = Arc::new(FeedEvidenceSearch::new(&config.evidence)?);

    let blob: Arc<dyn BlobStore> = Arc::new(HttpBlobStore::new(
        &config.blob,
        credentials.blob_api_key.clone(),
    )?);
    let vision = VisionClient::new(&config.vision, credentials.gemini_api_key.clone())?;
    let media: Arc<dyn MediaAnalyzer> = Arc::new(BlobMediaAnalyzer::new(
        blob,
        Arc::clone(&store),
        vision,
    ));

    let summarizer = if credentials.perplexity_api_key.is_empty() {
        None
    } else {
        Some(SummarizerClient::new(
            &config.summarizer,
            credentials.perplexity_api_key.clone(),
        )?)
    };
    let urls: Arc<dyn UrlAnalyzer> = Arc::new(PageSummaryAnalyzer::new(
        summarizer,
        Arc::clone(&evidence),
    ));

    let orchestrator = Arc::new(FactCheckOrchestrator::new(
        store,
        gateway,
        evidence,
        media,
        urls,
        ClaimExtractor::heuristic(),
    ));

    // Shutdown broadcast wired to Ctrl+C
    let (tx, _rx) = broadcast::channel(1);
    let shutdown_tx = tx.clone();

    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to listen for Ctrl+C");
        tracing::info!("Shutdown signal received");
        let _ = shutdown_tx.send(());
    });

    let state = Arc::new(HttpState {
        orchestrator,
        pool: Some(pool),
        config,
    });

    start_http_server(state, tx.subscribe()).await?;

    Ok(())
}
