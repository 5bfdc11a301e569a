use anyhow::Context;
use clap::Parser;
use es_core::SignalStorage;
use es_inference::{
    EventClassifier, EventRules, FeatureExtractor, ModelConfig, ModelProvider, Scorer,
    ScoringWeights, SentimentBackend, DEFAULT_MAX_SENTIMENT_CHARS,
};
use es_ingest::logging::init_logging;
use es_ingest::{
    ArticleFetcher, FeedReader, FetcherConfig, PipelineConfig, RetryPolicy, SignalPipeline, Worker,
    DEFAULT_FEEDS,
};
use es_storage::{create_storage, StorageConfig, StorageKind};
use es_web::AppState;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HumanDuration(Duration);

impl FromStr for HumanDuration {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut total_seconds = 0u64;
        let mut current_number = String::new();
        let mut has_unit = false;

        for c in s.chars() {
            if c.is_ascii_digit() {
                current_number.push(c);
            } else if let Ok(num) = current_number.parse::<u64>() {
                let unit = match c {
                    's' => 1,
                    'm' => 60,
                    'h' => 3600,
                    'd' => 86400,
                    _ => return Err(format!("Invalid duration unit: {}", c)),
                };
                total_seconds = total_seconds.saturating_add(num.saturating_mul(unit));
                current_number.clear();
                has_unit = true;
            } else if !c.is_whitespace() {
                return Err(format!("Invalid character in duration: {}", c));
            }
        }

        // A trailing bare number counts as seconds.
        if !current_number.is_empty() {
            let num = current_number
                .parse::<u64>()
                .map_err(|_| "Invalid number in duration".to_string())?;
            total_seconds = total_seconds.saturating_add(num);
            has_unit = true;
        }

        if !has_unit {
            return Err("Duration must include a number".to_string());
        }
        if total_seconds == 0 {
            return Err("Duration must be longer than zero".to_string());
        }

        Ok(HumanDuration(Duration::from_secs(total_seconds)))
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Economic signals from news feeds", long_about = None)]
struct Cli {
    #[arg(long, env = "ES_STORAGE", value_enum, default_value_t = StorageKind::Sqlite)]
    storage: StorageKind,
    #[arg(long, env = "ES_DATABASE", default_value = "signals.db")]
    database: PathBuf,
    /// Feed URLs to refresh, comma separated
    #[arg(long = "feed", env = "ES_FEEDS", value_delimiter = ',')]
    feeds: Vec<String>,
    #[arg(long, env = "ES_SENTIMENT_BACKEND", value_enum, default_value_t = SentimentBackend::Lexicon)]
    sentiment_backend: SentimentBackend,
    /// Classification endpoint for the http sentiment backend
    #[arg(long, env = "ES_SENTIMENT_URL")]
    sentiment_url: Option<String>,
    #[arg(long, env = "ES_SENTIMENT_TOKEN", hide_env_values = true)]
    sentiment_token: Option<String>,
    /// JSON lexicon replacing the bundled financial lexicon
    #[arg(long, env = "ES_LEXICON")]
    lexicon: Option<PathBuf>,
    /// JSON name → entity label map replacing the bundled gazetteer
    #[arg(long, env = "ES_GAZETTEER")]
    gazetteer: Option<PathBuf>,
    /// JSON event rule table replacing the built-in one
    #[arg(long, env = "ES_EVENT_RULES")]
    event_rules: Option<PathBuf>,
    /// JSON scoring weights replacing the built-in ones
    #[arg(long, env = "ES_WEIGHTS")]
    weights: Option<PathBuf>,
    #[arg(long, env = "ES_MAX_SENTIMENT_CHARS", default_value_t = DEFAULT_MAX_SENTIMENT_CHARS)]
    max_sentiment_chars: usize,
    #[arg(long, env = "ES_RETRY_ATTEMPTS", default_value_t = 3)]
    retry_attempts: u32,
    /// Timeout for each HTTP request (e.g. 20s, 1m)
    #[arg(long, env = "ES_HTTP_TIMEOUT", default_value = "20s")]
    http_timeout: HumanDuration,
    /// Score articles whose text could not be extracted
    #[arg(long, env = "ES_SCORE_EMPTY")]
    score_empty: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Pull the configured feeds and score new articles
    Refresh {
        /// Run in periodic mode with the specified interval (e.g. 1h, 30m, 1h15m30s)
        #[arg(long)]
        interval: Option<HumanDuration>,
    },
    /// Score a stored article again
    Reprocess { article_id: i64 },
    /// Print stored signals, newest first
    Signals {
        #[arg(long, default_value_t = 100)]
        limit: usize,
        #[arg(long, default_value_t = 0)]
        offset: usize,
    },
    /// Serve the HTTP API
    Serve {
        #[arg(long, env = "ES_ADDR", default_value = "127.0.0.1:8000")]
        addr: SocketAddr,
        /// Abandon background jobs running longer than this
        #[arg(long)]
        job_timeout: Option<HumanDuration>,
    },
}

impl Cli {
    fn storage_config(&self) -> StorageConfig {
        StorageConfig {
            kind: self.storage,
            sqlite_path: self.database.clone(),
        }
    }

    fn model_config(&self) -> ModelConfig {
        ModelConfig {
            sentiment_backend: self.sentiment_backend,
            lexicon_path: self.lexicon.clone(),
            sentiment_url: self.sentiment_url.clone(),
            api_token: self.sentiment_token.clone(),
            request_timeout: self.http_timeout.0,
            gazetteer_path: self.gazetteer.clone(),
        }
    }

    fn fetcher_config(&self) -> FetcherConfig {
        FetcherConfig {
            timeout: self.http_timeout.0,
            retry: RetryPolicy::default().with_max_attempts(self.retry_attempts),
            ..FetcherConfig::default()
        }
    }

    fn pipeline_config(&self) -> PipelineConfig {
        let feed_urls: Vec<String> = self
            .feeds
            .iter()
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty())
            .collect();
        PipelineConfig {
            feed_urls: if feed_urls.is_empty() {
                DEFAULT_FEEDS.iter().map(|f| f.to_string()).collect()
            } else {
                feed_urls
            },
            score_empty_articles: self.score_empty,
        }
    }
}

async fn check_storage(storage: &Arc<dyn SignalStorage>, kind: StorageKind) -> anyhow::Result<()> {
    let mut last_error = None;
    for attempt in 1..=3 {
        match tokio::time::timeout(Duration::from_secs(10), storage.list_signals(1, 0)).await {
            Ok(Ok(_)) => {
                info!("🏦 Storage backend healthy (using {})", kind);
                return Ok(());
            }
            Ok(Err(e)) => last_error = Some(anyhow::Error::new(e)),
            Err(_) => last_error = Some(anyhow::anyhow!("storage health check timed out")),
        }
        if attempt < 3 {
            info!("Storage health check failed, retrying {}/3...", attempt);
            tokio::time::sleep(Duration::from_secs(2)).await;
        }
    }
    Err(last_error.unwrap_or_else(|| anyhow::anyhow!("storage health check failed")))
}

fn build_pipeline(cli: &Cli, storage: Arc<dyn SignalStorage>) -> anyhow::Result<SignalPipeline> {
    let models = ModelProvider::load(&cli.model_config()).context("loading models")?;
    let extractor = FeatureExtractor::new(Arc::new(models)).with_max_sentiment_chars(cli.max_sentiment_chars);

    let rules = match &cli.event_rules {
        Some(path) => EventRules::from_file(path)
            .with_context(|| format!("reading event rules from {}", path.display()))?,
        None => EventRules::default(),
    };
    let weights = match &cli.weights {
        Some(path) => ScoringWeights::from_file(path)
            .with_context(|| format!("reading scoring weights from {}", path.display()))?,
        None => ScoringWeights::default(),
    };

    let fetcher_config = cli.fetcher_config();
    let feeds = FeedReader::new(&fetcher_config)?;
    let articles = ArticleFetcher::new(&fetcher_config)?;
    let config = cli.pipeline_config();
    info!("📡 {} feeds configured", config.feed_urls.len());

    Ok(SignalPipeline::new(storage, Arc::new(feeds), Arc::new(articles), extractor)
        .with_classifier(EventClassifier::new(rules))
        .with_scorer(Scorer::new(weights))
        .with_config(config))
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    run(Cli::parse()).await
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let storage = create_storage(&cli.storage_config())
        .await
        .with_context(|| format!("opening {} storage", cli.storage))?;
    check_storage(&storage, cli.storage).await?;

    match cli.command {
        Commands::Signals { limit, offset } => {
            print_json(&storage.list_signals(limit, offset).await?)?;
        }
        Commands::Refresh { interval } => {
            let pipeline = build_pipeline(&cli, storage)?;
            match interval {
                Some(interval) => {
                    info!("Running in periodic mode with {}s interval", interval.0.as_secs());
                    loop {
                        info!("Starting refresh cycle");
                        if let Err(e) = pipeline.refresh().await {
                            error!("Error during refresh: {}", e);
                        }
                        info!("Waiting {}s before next refresh", interval.0.as_secs());
                        tokio::time::sleep(interval.0).await;
                    }
                }
                None => {
                    let summary = pipeline.refresh().await?;
                    print_json(&summary.counts())?;
                }
            }
        }
        Commands::Reprocess { article_id } => {
            let pipeline = build_pipeline(&cli, storage)?;
            let signal = pipeline
                .reprocess(article_id)
                .await
                .with_context(|| format!("reprocessing article {}", article_id))?;
            print_json(&signal)?;
        }
        Commands::Serve { addr, job_timeout } => {
            let pipeline = build_pipeline(&cli, storage)?;
            let (worker, _join) = Worker::spawn(pipeline.clone(), 64, job_timeout.map(|t| t.0));
            es_web::serve(addr, AppState::new(pipeline, worker)).await?;
        }
    }

    Ok(())
}
