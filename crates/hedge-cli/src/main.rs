//! Command-line interface for the AI hedge fund analysis service

mod output;

use anyhow::{Context, bail};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use futures::StreamExt;
use hedge_client::{
    AnalysisRequest, ApiClient, ClientConfig, ModelProvider, RunResult, StreamEvent,
    StreamingAnalysisClient,
};
use hedge_utils::{AppConfig, LogFormat};
use std::process::ExitCode;
use tracing::{info, warn};

/// Exit code used when the user interrupts a run
const EXIT_INTERRUPTED: u8 = 130;

#[derive(Parser, Debug)]
#[command(name = "hedge")]
#[command(version, about = "Run AI hedge fund analyses from the terminal", long_about = None)]
struct Cli {
    /// Backend base URL (default: $HEDGE_API_BASE or http://localhost:8000)
    #[arg(long, global = true)]
    api_base: Option<String>,

    /// Log output format: plain or json (default: $HEDGE_LOG_FORMAT or plain)
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Stream an analysis run and print the portfolio decisions
    Run(RunArgs),
    /// List available analysts
    Analysts,
    /// List LLM providers
    Providers,
    /// List models offered by a provider
    Models { provider: ModelProvider },
    /// Show whether a local model server is running
    Status { provider: ModelProvider },
    /// Search stocks by ticker or company name
    Search { query: String },
    /// Show company facts for a ticker
    Facts { ticker: String },
    /// Check which tickers the backend can resolve
    Validate {
        #[arg(required = true)]
        tickers: Vec<String>,
    },
    /// Check that the backend is reachable
    Health,
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Ticker symbols, comma separated (e.g. AAPL,MSFT,NVDA)
    #[arg(short, long, value_delimiter = ',', required = true)]
    tickers: Vec<String>,

    /// Analyst identifiers, comma separated (see `hedge analysts`)
    #[arg(short, long, value_delimiter = ',', required = true)]
    analysts: Vec<String>,

    /// LLM provider
    #[arg(short, long, default_value = "OpenAI")]
    provider: ModelProvider,

    /// Model name as the provider knows it
    #[arg(short, long, default_value = "gpt-4o")]
    model: String,

    /// First day of the analysis window (YYYY-MM-DD)
    #[arg(long)]
    start_date: Option<NaiveDate>,

    /// Last day of the analysis window (YYYY-MM-DD)
    #[arg(long)]
    end_date: Option<NaiveDate>,

    #[arg(long)]
    initial_cash: Option<f64>,

    #[arg(long)]
    margin_requirement: Option<f64>,

    /// Include the reasoning column in result tables
    #[arg(long)]
    show_reasoning: bool,
}

impl RunArgs {
    fn to_request(&self) -> hedge_client::Result<AnalysisRequest> {
        let mut builder = AnalysisRequest::builder()
            .tickers(&self.tickers)
            .analysts(self.analysts.iter().map(|a| a.trim().to_string()))
            .model(self.provider, self.model.clone());

        if let Some(date) = self.start_date {
            builder = builder.start_date(date);
        }
        if let Some(date) = self.end_date {
            builder = builder.end_date(date);
        }
        if let Some(cash) = self.initial_cash {
            builder = builder.initial_cash(cash);
        }
        if let Some(margin) = self.margin_requirement {
            builder = builder.margin_requirement(margin);
        }
        builder.build()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let mut app = AppConfig::from_env()?.with_app_name("hedge");
    if let Some(format) = cli.log_format {
        app.log_format = format;
    }
    app.init_logging()?;

    let config = client_config(cli.api_base.as_deref())?;
    info!("Using backend at {}", config.base_url);

    execute(cli.command, config).await
}

async fn execute(command: Commands, config: ClientConfig) -> anyhow::Result<ExitCode> {
    if let Commands::Run(args) = &command {
        return run_analysis(config, args).await;
    }

    let api = ApiClient::new(config)?;
    match command {
        Commands::Run(_) => {}
        Commands::Health => {
            let base = &api.config().base_url;
            if api.health().await {
                println!("Backend at {base} is healthy");
            } else {
                println!("Backend at {base} is unreachable");
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Analysts => {
            println!("{}", output::analysts_table(&api.analysts().await?));
        }
        Commands::Providers => {
            println!("{}", output::providers_table(&api.providers().await?));
        }
        Commands::Models { provider } => {
            let models = api.provider_models(provider).await?;
            if models.is_empty() {
                println!("No models available for {provider}");
            } else {
                println!("{}", output::models_table(&models));
            }
        }
        Commands::Status { provider } => {
            let status = api.provider_status(provider).await?;
            println!("{}", output::status_table(provider.as_str(), &status));
        }
        Commands::Search { query } => {
            let results = api.search_stocks(&query).await?;
            if results.is_empty() {
                println!("No stocks match '{query}'");
            } else {
                println!("{}", output::search_table(&results));
            }
        }
        Commands::Facts { ticker } => {
            println!("{}", output::facts_table(&api.stock_facts(&ticker).await?));
        }
        Commands::Validate { tickers } => {
            let validation = api.validate_tickers(&tickers).await?;
            println!("{}", output::validation_table(&validation));
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn client_config(api_base: Option<&str>) -> anyhow::Result<ClientConfig> {
    let mut builder = ClientConfig::builder();
    if let Some(base) = api_base {
        builder = builder.base_url(base);
    }
    builder
        .with_env()
        .build()
        .context("Invalid client configuration")
}

/// Stream one run: progress to stdout as it arrives, then the result tables
async fn run_analysis(config: ClientConfig, args: &RunArgs) -> anyhow::Result<ExitCode> {
    let request = args.to_request().context("Invalid analysis request")?;
    let client = StreamingAnalysisClient::new(config)?;

    let mut events = client.events(&request);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut listening = true;

    loop {
        tokio::select! {
            signal = &mut ctrl_c, if listening => match signal {
                Ok(()) => {
                    events.cancel();
                    info!("Run cancelled by user");
                    return Ok(ExitCode::from(EXIT_INTERRUPTED));
                }
                Err(e) => {
                    warn!("Failed to listen for Ctrl-C: {}", e);
                    listening = false;
                }
            },
            event = events.next() => match event {
                Some(StreamEvent::Progress(update)) => println!("{update}"),
                Some(StreamEvent::Complete(result)) => {
                    print_result(&request, &result, args.show_reasoning);
                    return Ok(ExitCode::SUCCESS);
                }
                Some(StreamEvent::Error(message)) => {
                    eprintln!("Analysis failed: {message}");
                    return Ok(ExitCode::FAILURE);
                }
                None => bail!("Run ended without a result"),
            },
        }
    }
}

fn print_result(request: &AnalysisRequest, result: &RunResult, show_reasoning: bool) {
    println!("\nPortfolio decisions");
    println!("{}", output::decisions_table(result, show_reasoning));

    for ticker in request.tickers() {
        if result.signals_for(ticker).next().is_none() {
            continue;
        }
        println!("\nAnalyst signals for {ticker}");
        println!("{}", output::signals_table(result, ticker, show_reasoning));
    }
}
