use agent_core::Context;
use agent_llm::{ConfiguredModels, ModelCatalog};
use agent_stock::{
    DataProvider, EastMoneyKlineClient, JsonLinesSink, MarketPhase, MarketSnapshot, ProviderRegistry,
    RiskControlProvider, SeatTagger, StockConfig, StockPredictor, market_now,
};
use agent_utils::Config;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

const DEFAULT_LLM_CONFIG: &str = "conf/llm_config.json";

#[derive(Parser, Debug)]
#[command(name = "stock-agent", author, version, about = "A-share prediction pipeline", long_about = None)]
struct Args {
    /// Model catalogue; falls back to LLM_* environment variables when absent
    #[arg(long, global = true)]
    llm_config: Option<PathBuf>,

    /// Seat tag table used when summarizing dragon-tiger lists
    #[arg(long, global = true)]
    seats: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one prediction and print it as a JSON line
    Predict {
        code: String,
        #[arg(long)]
        model: Option<String>,
    },
    /// Extract stock mentions from a screenshot
    Recognize {
        image: PathBuf,
        #[arg(long)]
        model: Option<String>,
    },
    /// Review a collected market snapshot
    Review {
        snapshot: PathBuf,
        /// Produce the pre-market outlook instead of the post-close review
        #[arg(long)]
        pre_market: bool,
        #[arg(long)]
        model: Option<String>,
    },
    /// Run the deterministic risk-control check only
    Risk { code: String },
    /// Print the current trading-session phase
    Phase,
}

#[derive(Serialize)]
struct PhaseReport {
    now: String,
    phase: MarketPhase,
    live: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    agent_utils::init_tracing_with(&Config::from_env());

    let args = Args::parse();
    let config = StockConfig::default();

    match args.command {
        Command::Predict { ref code, ref model } => {
            let predictor = predictor(&args, config)?
                .with_sink(Arc::new(JsonLinesSink::stdout()));
            predictor.predict(code, model.as_deref()).await?;
        }
        Command::Recognize { ref image, ref model } => {
            let bytes = tokio::fs::read(image).await?;
            let stocks = predictor(&args, config)?
                .recognize_image(&bytes, model.as_deref())
                .await?;
            println!("{}", serde_json::to_string_pretty(&stocks)?);
        }
        Command::Review {
            ref snapshot,
            pre_market,
            ref model,
        } => {
            let snapshot = MarketSnapshot::load(snapshot)?;
            if snapshot.is_empty() {
                warn!(date = %snapshot.date, "Snapshot has no market data");
            }
            let predictor = predictor(&args, config)?;
            let out = if pre_market {
                serde_json::to_string_pretty(&predictor.analyze_market(&snapshot, model.as_deref()).await?)?
            } else {
                serde_json::to_string_pretty(&predictor.review_market(&snapshot, model.as_deref()).await?)?
            };
            println!("{out}");
        }
        Command::Risk { ref code } => {
            let provider = risk_provider(&config);
            let report = provider.fetch(&Context::new().with_stock_code(code), code).await?;
            println!("{report}");
        }
        Command::Phase => {
            let now = market_now();
            let phase = MarketPhase::classify(now.naive_local());
            let report = PhaseReport {
                now: now.format("%Y-%m-%d %H:%M:%S %:z").to_string(),
                phase,
                live: phase.is_live(),
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

fn risk_provider(config: &StockConfig) -> RiskControlProvider {
    RiskControlProvider::new(
        Arc::new(EastMoneyKlineClient::new().with_timeout(config.provider_timeout)),
        config.stock_days,
        config.benchmark_days,
    )
}

fn predictor(args: &Args, config: StockConfig) -> anyhow::Result<StockPredictor> {
    let catalog = load_catalog(args.llm_config.as_deref())?;
    let models = ConfiguredModels::new(catalog).with_timeout(config.model_timeout.as_secs());
    let registry = ProviderRegistry::new().with(Arc::new(risk_provider(&config)));

    let mut predictor = StockPredictor::new(Arc::new(models), Arc::new(registry), config)?;
    if let Some(path) = &args.seats {
        let tagger = SeatTagger::load(path)?;
        info!(path = %path.display(), seats = tagger.len(), "Loaded seat tags");
        predictor = predictor.with_seat_tagger(Arc::new(tagger));
    }
    Ok(predictor)
}

/// An explicit path must load; the default path is optional
fn load_catalog(path: Option<&Path>) -> anyhow::Result<Option<ModelCatalog>> {
    if let Some(path) = path {
        return Ok(Some(ModelCatalog::load(path)?));
    }
    let default = Path::new(DEFAULT_LLM_CONFIG);
    if default.exists() {
        return Ok(Some(ModelCatalog::load(default)?));
    }
    let catalog = ModelCatalog::from_env()?;
    if catalog.is_none() {
        warn!("No model configuration found; model-backed commands will fail");
    }
    Ok(catalog)
}
