//! CLI command definitions for deckbench.
//!
//! `run` drives a full evaluation against a counterparty, `respond` handles one
//! case locally, and `sanitize`/`select` expose the offline building blocks.

use crate::benchmark::HttpBenchmarkClient;
use crate::changeset::{ChangesetSanitizer, ChangesetSummary};
use crate::dispatch::{DispatchCoordinator, RunConfig};
use crate::exchange::A2aClient;
use crate::llm::LiteLlmClient;
use crate::protocol::{reply_text, render_tag, RunRequest, TAG_BATTLE_ID, TAG_BENCHMARK_API_URL, TAG_CASE_ID, TAG_WHITE_AGENT_ID};
use crate::reporting::{EventReporter, HttpEventReporter};
use crate::responder::{CaseResponder, ResponderConfig};
use crate::schema::ShapeIndex;
use crate::selection::{CaseSelector, DifficultyCounts};
use anyhow::Context;
use clap::Parser;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// PowerPoint-editing benchmark orchestrator.
#[derive(Parser)]
#[command(name = "deckbench")]
#[command(about = "Run and answer PowerPoint-editing benchmark evaluations")]
#[command(version)]
#[command(
    long_about = "deckbench resets a slide-editing benchmark, samples cases by difficulty, dispatches them one by one to an agent under test and reports the aggregate score.\n\nExample usage:\n  deckbench run --white-agent-url http://localhost:9002/ --num-cases 10"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Run a full evaluation against a counterparty agent.
    Run(RunArgs),

    /// Handle a single case locally: fetch, generate, sanitize and submit.
    Respond(RespondArgs),

    /// Sanitize a raw changeset file against a datamodel file.
    Sanitize(SanitizeArgs),

    /// Preview the cases a run would select.
    Select(SelectArgs),
}

/// Arguments for the `run` command.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// YAML configuration file; flags override its values.
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// File holding a tagged run request; its tags override everything else.
    #[arg(long)]
    pub request: Option<PathBuf>,

    /// Counterparty agent endpoint.
    #[arg(long, env = "WHITE_AGENT_URL")]
    pub white_agent_url: Option<String>,

    /// Benchmark service base URL.
    #[arg(long, env = "PPT_BENCHMARK_API_URL")]
    pub benchmark_api_url: Option<String>,

    /// Agent id submissions and results are keyed by.
    #[arg(long, env = "PPT_WHITE_AGENT_ID")]
    pub white_agent_id: Option<String>,

    /// Number of cases to dispatch.
    #[arg(short = 'n', long, env = "PPT_NUM_CASES")]
    pub num_cases: Option<usize>,

    /// Battle id for event reporting.
    #[arg(long, env = "AGENTBEATS_BATTLE_ID")]
    pub battle_id: Option<String>,

    /// Event reporting backend.
    #[arg(long, env = "AGENTBEATS_BACKEND_URL")]
    pub backend_url: Option<String>,

    /// `reported_by` name on emitted events.
    #[arg(long, env = "AGENT_NAME")]
    pub reporter_name: Option<String>,

    /// Fixed seed for case selection.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Print the full run record as JSON instead of the status line.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `respond` command.
#[derive(Parser, Debug)]
pub struct RespondArgs {
    /// YAML configuration file; flags override its values.
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Case to handle.
    #[arg(long)]
    pub case_id: String,

    /// Benchmark service base URL.
    #[arg(long, env = "PPT_BENCHMARK_API_URL")]
    pub benchmark_api_url: Option<String>,

    /// Agent id to submit under.
    #[arg(long, env = "PPT_WHITE_AGENT_ID")]
    pub white_agent_id: Option<String>,

    /// Battle id for event reporting.
    #[arg(long, env = "AGENTBEATS_BATTLE_ID")]
    pub battle_id: Option<String>,

    /// Event reporting backend.
    #[arg(long, env = "AGENTBEATS_BACKEND_URL")]
    pub backend_url: Option<String>,

    /// Model used for changeset generation.
    #[arg(short = 'm', long, env = "PPT_MODEL")]
    pub model: Option<String>,

    /// OpenAI-compatible API base URL.
    #[arg(long, env = "LITELLM_API_BASE")]
    pub api_base: Option<String>,

    /// API key for the LLM endpoint.
    #[arg(long, env = "LITELLM_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,
}

/// Arguments for the `sanitize` command.
#[derive(Parser, Debug)]
pub struct SanitizeArgs {
    /// Raw changeset JSON file.
    #[arg(long)]
    pub changeset: PathBuf,

    /// Datamodel JSON file (either `{slides: [...]}` or `{shapes: [...]}`).
    #[arg(long)]
    pub datamodel: PathBuf,

    /// Write the sanitized changeset here instead of stdout.
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,
}

/// Arguments for the `select` command.
#[derive(Parser, Debug)]
pub struct SelectArgs {
    /// Scenario ids: a `GET /scenarios` response, a JSON array, or one id per line.
    #[arg(long)]
    pub ids: PathBuf,

    /// Number of cases to select.
    #[arg(short = 'n', long, default_value = "10")]
    pub count: usize,

    /// Fixed seed for reproducible selection.
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Parse CLI arguments.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Run the CLI by parsing arguments and executing the command.
pub async fn run() -> anyhow::Result<()> {
    run_with_cli(parse_cli()).await
}

/// Run the CLI with the parsed arguments.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Run(args) => run_evaluation_command(args).await,
        Commands::Respond(args) => run_respond_command(args).await,
        Commands::Sanitize(args) => run_sanitize_command(args),
        Commands::Select(args) => run_select_command(args),
    }
}

fn load_run_config(args: &RunArgs) -> anyhow::Result<RunConfig> {
    let mut config = match &args.config {
        Some(path) => RunConfig::from_yaml_file(path)?,
        None => RunConfig::default(),
    };
    if let Some(url) = &args.white_agent_url {
        config = config.with_white_agent_url(url);
    }
    if let Some(url) = &args.benchmark_api_url {
        config = config.with_benchmark_api_url(url);
    }
    if let Some(id) = &args.white_agent_id {
        config = config.with_white_agent_id(id);
    }
    if let Some(n) = args.num_cases {
        config = config.with_num_cases(n);
    }
    if let Some(battle_id) = &args.battle_id {
        config = config.with_battle_id(battle_id);
    }
    if let Some(url) = &args.backend_url {
        config = config.with_backend_url(url);
    }
    if let Some(name) = &args.reporter_name {
        config = config.with_reporter_name(name);
    }
    if let Some(seed) = args.seed {
        config = config.with_seed(seed);
    }
    config.validate()?;
    Ok(config)
}

async fn run_evaluation_command(args: RunArgs) -> anyhow::Result<()> {
    let config = load_run_config(&args)?;
    let request = match &args.request {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read run request {}", path.display()))?;
            RunRequest::from_text(&text)
        }
        None => RunRequest::default(),
    };

    let benchmark = Arc::new(HttpBenchmarkClient::with_timeouts(
        config.benchmark_timeout(),
        config.submit_timeout(),
    )?);
    let counterparty = Arc::new(A2aClient::new(config.exchange_timeout())?);
    let reporter = Arc::new(HttpEventReporter::new(&config.backend_url, config.report_timeout())?);
    let report_timeout = config.report_timeout();
    let coordinator = DispatchCoordinator::new(config, benchmark, counterparty, reporter.clone());

    let outcome = coordinator.execute(&request).await;
    reporter.flush(report_timeout).await;
    let run = outcome?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&run)?);
    } else {
        println!("{}", run.status_line());
    }
    Ok(())
}

fn load_responder_config(args: &RespondArgs) -> anyhow::Result<ResponderConfig> {
    let mut config = match &args.config {
        Some(path) => ResponderConfig::from_yaml_file(path)?,
        None => ResponderConfig::default(),
    };
    if let Some(url) = &args.benchmark_api_url {
        config = config.with_benchmark_api_url(url);
    }
    if let Some(id) = &args.white_agent_id {
        config = config.with_white_agent_id(id);
    }
    if let Some(battle_id) = &args.battle_id {
        config = config.with_battle_id(battle_id);
    }
    if let Some(url) = &args.backend_url {
        config = config.with_backend_url(url);
    }
    if let Some(model) = &args.model {
        config = config.with_model(model);
    }
    if let Some(api_base) = &args.api_base {
        config = config.with_api_base(api_base);
    }
    if let Some(api_key) = &args.api_key {
        config = config.with_api_key(api_key);
    }
    Ok(config)
}

async fn run_respond_command(args: RespondArgs) -> anyhow::Result<()> {
    let config = load_responder_config(&args)?;

    let mut fields = vec![
        render_tag(TAG_BENCHMARK_API_URL, &config.benchmark_api_url),
        render_tag(TAG_CASE_ID, &args.case_id),
        render_tag(TAG_WHITE_AGENT_ID, &config.white_agent_id),
    ];
    if let Some(battle_id) = &config.battle_id {
        fields.push(render_tag(TAG_BATTLE_ID, battle_id));
    }

    let benchmark = Arc::new(HttpBenchmarkClient::with_timeouts(
        config.benchmark_timeout(),
        config.submit_timeout(),
    )?);
    let llm = Arc::new(LiteLlmClient::new(
        config.api_base.clone(),
        config.api_key.clone(),
        config.model.clone(),
        config.llm_timeout(),
    )?);
    let reporter = Arc::new(HttpEventReporter::new(&config.backend_url, config.report_timeout())?);
    let report_timeout = config.report_timeout();
    let responder = CaseResponder::new(config, benchmark, llm, reporter.clone());

    let reply = responder.handle(&fields.join("\n")).await;
    reporter.flush(report_timeout).await;
    println!("{}", reply_text(&reply));
    Ok(())
}

fn read_json(path: &Path) -> anyhow::Result<Value> {
    let content = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {}", path.display()))
}

fn run_sanitize_command(args: SanitizeArgs) -> anyhow::Result<()> {
    let raw = read_json(&args.changeset)?;
    let index = ShapeIndex::from_datamodel(&read_json(&args.datamodel)?);
    let changeset = ChangesetSanitizer::new(&index).sanitize(&raw);

    let summary = ChangesetSummary::from_changeset(&changeset);
    info!(
        shapes = index.len(),
        added = summary.added,
        modified = summary.modified,
        deleted = summary.deleted,
        approx_fields_changed = summary.approx_fields_changed,
        unrecognized_fields = summary.unrecognized_fields,
        "Sanitized changeset"
    );

    let rendered = serde_json::to_string_pretty(&changeset)?;
    match &args.output {
        Some(path) => {
            fs::write(path, rendered + "\n").with_context(|| format!("Failed to write {}", path.display()))?;
            info!(path = %path.display(), "Wrote sanitized changeset");
        }
        None => println!("{rendered}"),
    }
    Ok(())
}

/// Reads scenario ids from `{ids: [...]}`, a JSON array, or plain lines.
fn parse_scenario_ids(content: &str) -> Vec<String> {
    let strings = |items: &Vec<Value>| -> Vec<String> {
        items.iter().filter_map(Value::as_str).map(str::to_string).collect()
    };
    match serde_json::from_str::<Value>(content) {
        Ok(Value::Array(items)) => strings(&items),
        Ok(Value::Object(obj)) => obj.get("ids").and_then(Value::as_array).map(strings).unwrap_or_default(),
        _ => content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect(),
    }
}

fn run_select_command(args: SelectArgs) -> anyhow::Result<()> {
    let content = fs::read_to_string(&args.ids).with_context(|| format!("Failed to read {}", args.ids.display()))?;
    let ids = parse_scenario_ids(&content);
    anyhow::ensure!(!ids.is_empty(), "No scenario ids in {}", args.ids.display());

    let mut selector = CaseSelector::new();
    if let Some(seed) = args.seed {
        selector = selector.with_seed(seed);
    }
    let chosen = selector.select(&ids, args.count);
    let counts = DifficultyCounts::tally(&chosen);
    info!(
        available = ids.len(),
        selected = chosen.len(),
        simple = counts.simple,
        medium = counts.medium,
        hard = counts.hard,
        unknown = counts.unknown,
        "Selected cases"
    );
    for case_id in chosen {
        println!("{case_id}");
    }
    Ok(())
}
