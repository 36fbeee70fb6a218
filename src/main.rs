use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use lakecat::config::{LlmConfig, WarehouseConfig};
use lakecat::generator::{CatalogGenerator, GenerateOptions};
use lakecat::llm::LlmClient;
use lakecat::sink::{write_catalog, OutputTarget};
use lakecat::warehouse::WarehouseClient;

#[derive(Parser)]
#[command(name = "lakecat")]
#[command(about = "Generates catalog contexts from the warehouse information_schema")]
struct Args {
    /// Warehouse catalog to scan (ex: dev)
    #[arg(long)]
    table_catalog: String,

    /// Warehouse schema to scan (ex: diamond)
    #[arg(long)]
    table_schema: String,

    /// SQL LIKE filter on table names (ex: mart_%)
    #[arg(long, default_value = "%")]
    table_like: String,

    /// Additional regex filter on table names (search semantics, ex: ^mart_.*_core$)
    #[arg(long)]
    table_regex: Option<String>,

    /// Optional prefix for catalog ids (ex: diamond_)
    #[arg(long)]
    id_prefix: Option<String>,

    /// Enrich descricao/contexto with an LLM (validated, with deterministic fallback)
    #[arg(long)]
    use_llm: bool,

    /// Model serving endpoint (default: env LLM_ENDPOINT)
    #[arg(long)]
    llm_endpoint: Option<String>,

    /// LLM temperature
    #[arg(long, default_value_t = 0.0)]
    llm_temperature: f64,

    /// Output path (JSON); omit to write the document to stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Also print the JSON to stdout when --output is given
    #[arg(long)]
    stdout: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let warehouse = WarehouseClient::new(WarehouseConfig::from_env()?)?;
    let options = GenerateOptions {
        table_catalog: args.table_catalog.clone(),
        table_schema: args.table_schema.clone(),
        table_like: args.table_like.clone(),
        table_regex: args.table_regex.clone(),
        id_prefix: args.id_prefix.clone(),
    };

    let report = if args.use_llm {
        let llm = LlmClient::new(LlmConfig::from_env(
            args.llm_endpoint.clone(),
            args.llm_temperature,
        )?)?;
        CatalogGenerator::new(&warehouse)
            .with_model(&llm)
            .run(&options)
            .await?
    } else {
        CatalogGenerator::new(&warehouse).run(&options).await?
    };

    let target = match &args.output {
        Some(path) => OutputTarget::File(path.clone()),
        None => OutputTarget::Stdout,
    };
    write_catalog(&report.catalog, &target, args.stdout)?;

    match &args.output {
        Some(path) => info!(
            "OK: {} contextos gerados em '{}'.",
            report.catalog.len(),
            path.display()
        ),
        None => info!("OK: {} contextos gerados.", report.catalog.len()),
    }
    Ok(())
}
