use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use pairlabel::labeling::{process_file, FailurePolicy, PromptTemplate, QueryDriver, QueryWindow};
use pairlabel::provider::{
    list_available_models, load_model, probe_model, BedrockClient, ProviderConfig,
};
use pairlabel::tables::{read_input_records, RawResponseWriter};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const DEFAULT_MODEL: &str = "anthropic.claude-3-5-sonnet-20240620-v1:0";

#[derive(Parser)]
#[command(name = "pairlabel", version, about = "Sentence-pair labeling with hosted LLMs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// List the foundation models visible to the configured account.
    Models {
        #[command(flatten)]
        provider: ProviderArgs,
    },
    /// Send a greeting to check that the model answers.
    Probe {
        #[command(flatten)]
        provider: ProviderArgs,
        #[arg(long, default_value = DEFAULT_MODEL)]
        model: String,
    },
    /// Label each sentence pair of the input table and append raw responses.
    Query(QueryArgs),
    /// Extract labels from raw responses and write the cleaned dataset.
    Process {
        #[arg(long, default_value = "llm_output.csv")]
        input: PathBuf,
        #[arg(long, default_value = "training_data.csv")]
        output: PathBuf,
    },
    /// List models, query, then process, in sequence.
    Run {
        #[command(flatten)]
        query: QueryArgs,
        #[arg(long, default_value = "training_data.csv")]
        output: PathBuf,
    },
}

#[derive(Args)]
struct ProviderArgs {
    /// Overrides AWS_REGION.
    #[arg(long)]
    region: Option<String>,
    #[arg(long, default_value_t = 120)]
    timeout_secs: u64,
}

#[derive(Args)]
struct QueryArgs {
    #[command(flatten)]
    provider: ProviderArgs,
    #[arg(long, default_value = DEFAULT_MODEL)]
    model: String,
    #[arg(long, default_value = "10k_input.xlsx")]
    input: PathBuf,
    #[arg(long, default_value = "llm_output.csv")]
    raw_output: PathBuf,
    /// First row index to query (inclusive).
    #[arg(long, default_value_t = 0)]
    start: usize,
    /// Row index at which to stop (exclusive).
    #[arg(long)]
    end: Option<usize>,
    /// JSON file with `system` and `user` prompt templates.
    #[arg(long)]
    prompt: Option<PathBuf>,
    #[arg(long, default_value_t = 1024)]
    max_tokens: u32,
    /// Stop at the first failed model call instead of recording it and continuing.
    #[arg(long)]
    fail_fast: bool,
}

impl ProviderArgs {
    fn load(&self) -> anyhow::Result<ProviderConfig> {
        let mut config =
            ProviderConfig::from_env()?.with_timeout(Duration::from_secs(self.timeout_secs));
        if let Some(region) = &self.region {
            config = config.with_region(region.clone());
        }
        Ok(config)
    }
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn run_query(args: &QueryArgs, config: ProviderConfig) -> anyhow::Result<()> {
    let config = config.with_max_tokens(args.max_tokens);
    let model = load_model(config, &args.model)?;
    let template = match &args.prompt {
        Some(path) => PromptTemplate::from_path(path)?,
        None => PromptTemplate::default(),
    };
    let policy = if args.fail_fast {
        FailurePolicy::Abort
    } else {
        FailurePolicy::Continue
    };

    let records = read_input_records(&args.input)
        .with_context(|| format!("cannot load input table {:?}", args.input))?;
    let mut writer = RawResponseWriter::open(&args.raw_output)?;
    let driver = QueryDriver::new(Arc::new(model), template)
        .with_window(QueryWindow::new(args.start, args.end))
        .with_policy(policy);
    let outcome = driver.run(&records, &mut writer)?;

    info!(
        written = writer.written(),
        failed = outcome.failed_rows.len(),
        halted_at = ?outcome.halted_at,
        "raw responses saved"
    );
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    match cli.command {
        Commands::Models { provider } => {
            let client = BedrockClient::new(provider.load()?)?;
            list_available_models(&client)?;
        }
        Commands::Probe { provider, model } => {
            let model = load_model(provider.load()?, &model)?;
            if probe_model(&model) {
                println!("Model test successful!");
            } else {
                println!("Model test failed. Please check your Bedrock key and settings.");
            }
        }
        Commands::Query(args) => {
            let config = args.provider.load()?;
            run_query(&args, config)?;
        }
        Commands::Process { input, output } => {
            let report = process_file(&input, &output)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Run { query, output } => {
            let config = query.provider.load()?;
            let client = BedrockClient::new(config.clone())?;
            if let Err(err) = list_available_models(&client) {
                error!("model listing failed: {:#}", err);
            }
            if let Err(err) = run_query(&query, config) {
                error!("query stage ended with an error: {:#}", err);
            }
            info!("query stage ended");
            let report = process_file(&query.raw_output, &output)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}
