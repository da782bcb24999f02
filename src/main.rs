mod llm_http;

use clap::{Args, Parser, Subcommand};
use insight_engine::config::EngineConfig;
use insight_engine::llm::LanguageModelClient;
use insight_engine::synthetic::generate_synthetic_records;
use insight_engine::{
    format_percent, AnalysisRequest, CommunityProfile, CommunityType, ContentRecord,
    InsightEngine, SemanticAnalysis,
};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::llm_http::HttpLanguageModelClient;

#[derive(Parser)]
#[command(name = "insight-engine", about = "Community insight analysis engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Analyze a JSON array of content records.
    Analyze(AnalyzeArgs),
    /// Print deterministic synthetic records.
    Sample(SampleArgs),
    /// Write the default configuration file.
    InitConfig(InitConfigArgs),
}

#[derive(Args, Debug, Clone)]
struct AnalyzeArgs {
    /// Records file; reads stdin when omitted.
    #[arg(long)]
    input: Option<PathBuf>,
    #[arg(long, default_value = "general")]
    community_type: String,
    #[arg(long, default_value_t = 0.5)]
    confidence: f64,
    #[arg(long, value_delimiter = ',')]
    secondary: Vec<String>,
    /// Semantic analysis JSON (jargon, vulnerability markers).
    #[arg(long)]
    semantic: Option<PathBuf>,
    #[arg(long)]
    analysis_id: Option<String>,
    #[arg(long)]
    config: Option<PathBuf>,
    /// Skip the language model and use fallback questions.
    #[arg(long)]
    offline: bool,
}

#[derive(Args, Debug, Clone)]
struct SampleArgs {
    #[arg(long, default_value_t = 40)]
    count: usize,
    #[arg(long, default_value_t = 42)]
    seed: u64,
    #[arg(long, value_delimiter = ',', default_value = "community")]
    communities: Vec<String>,
}

#[derive(Args, Debug, Clone)]
struct InitConfigArgs {
    #[arg(long, default_value = "config/insight.toml")]
    path: PathBuf,
}

#[tokio::main]
async fn main() {
    load_dotenv();
    init_tracing();
    if let Err(err) = run().await {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), String> {
    let cli = Cli::parse();
    match cli.command {
        Command::Analyze(args) => run_analyze(args).await,
        Command::Sample(args) => run_sample(args),
        Command::InitConfig(args) => {
            EngineConfig::default().write(&args.path)?;
            println!("Wrote default configuration to {}", args.path.display());
            Ok(())
        }
    }
}

async fn run_analyze(args: AnalyzeArgs) -> Result<(), String> {
    let (config, config_path) = EngineConfig::load(args.config.clone())?;
    if let Some(path) = config_path.filter(|path| path.exists()) {
        info!(path = %path.display(), "loaded configuration");
    }

    let primary = CommunityType::from_str(&args.community_type)
        .ok_or_else(|| format!("invalid community type: {}", args.community_type))?;
    let secondary = args
        .secondary
        .iter()
        .filter(|value| !value.trim().is_empty())
        .map(|value| {
            CommunityType::from_str(value)
                .ok_or_else(|| format!("invalid secondary community type: {}", value))
        })
        .collect::<Result<Vec<_>, String>>()?;
    let profile = CommunityProfile::new(primary, validate_confidence(args.confidence)?)
        .with_secondary(secondary);

    let records = read_records(args.input.as_deref())?;
    let mut request = AnalysisRequest::new(records, profile);
    if let Some(id) = args.analysis_id {
        request = request.with_analysis_id(id);
    }
    if let Some(path) = args.semantic.as_deref() {
        request = request.with_semantic(read_semantic(path)?);
    }

    let llm: Option<Arc<dyn LanguageModelClient>> = if args.offline {
        None
    } else {
        match HttpLanguageModelClient::from_env(&config.llm) {
            Some(client) => Some(Arc::new(client) as Arc<dyn LanguageModelClient>),
            None => {
                warn!("LLM_API_KEY is not set; using fallback questions");
                None
            }
        }
    };

    let engine = InsightEngine::new(config, llm);
    let report = engine.analyze(request).await;
    info!(
        analysis_id = %report.analysis_id,
        confidence = %format_percent(report.insights.metadata.confidence_score),
        "report ready"
    );

    let payload = serde_json::to_string_pretty(&report)
        .map_err(|err| format!("failed to serialize report: {}", err))?;
    println!("{}", payload);
    Ok(())
}

fn run_sample(args: SampleArgs) -> Result<(), String> {
    let communities: Vec<&str> = args
        .communities
        .iter()
        .map(|name| name.trim())
        .filter(|name| !name.is_empty())
        .collect();
    let records = generate_synthetic_records(args.count, args.seed, &communities);
    let payload = serde_json::to_string_pretty(&records)
        .map_err(|err| format!("failed to serialize records: {}", err))?;
    println!("{}", payload);
    Ok(())
}

fn read_records(path: Option<&Path>) -> Result<Vec<ContentRecord>, String> {
    let raw = match path {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|err| format!("failed reading {}: {}", path.display(), err))?,
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .map_err(|err| format!("failed reading stdin: {}", err))?;
            buffer
        }
    };
    if raw.trim().is_empty() {
        return Err("missing records: pass --input or pipe a JSON array on stdin".to_string());
    }
    serde_json::from_str(&raw).map_err(|err| format!("invalid records JSON: {}", err))
}

fn read_semantic(path: &Path) -> Result<SemanticAnalysis, String> {
    let raw = std::fs::read_to_string(path)
        .map_err(|err| format!("failed reading {}: {}", path.display(), err))?;
    serde_json::from_str(&raw).map_err(|err| format!("invalid semantic JSON: {}", err))
}

fn validate_confidence(value: f64) -> Result<f64, String> {
    if !(0.0..=1.0).contains(&value) {
        return Err(format!("invalid confidence (0-1): {}", value));
    }
    Ok(value)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn load_dotenv() {
    let _ = dotenvy::dotenv();
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    let manifest_path = Path::new(manifest_dir).join(".env");
    let _ = dotenvy::from_path(manifest_path);
}
