//! Binary entry point for the Tessera CLI.
#![forbid(unsafe_code)]

use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tessera::{
    id::{random_hex_id, IdStrategy},
    model::TypeSchema,
    sql::{synth, Operation, Statement},
    Config, IdGenerator, ModelRegistry, SnowflakeGenerator,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "tessera",
    version,
    about = "Inspect synthesized statements and generate record keys",
    disable_help_subcommand = true
)]
struct Cli {
    #[arg(long, global = true, value_name = "FILE", help = "TOML configuration file")]
    config: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        value_enum,
        default_value_t = OutputFormat::Text,
        help = "Output format for structured responses"
    )]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[command(about = "Print every statement shape for a TOML-described record type")]
    Statements {
        #[arg(long, value_name = "FILE", help = "Record type schema (TOML)")]
        schema: PathBuf,
    },

    #[command(about = "Generate record keys")]
    Id {
        #[arg(long, value_enum, default_value_t = StrategyArg::Snowflake)]
        strategy: StrategyArg,

        #[arg(long, default_value_t = 1, help = "Number of keys to generate")]
        count: usize,
    },

    #[command(about = "Decode a snowflake id using the configured epoch")]
    Decode {
        #[arg(value_name = "ID")]
        id: i64,
    },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum StrategyArg {
    Snowflake,
    Hex,
}

#[derive(Serialize)]
struct StatementsReport {
    record: String,
    table: String,
    key: Option<String>,
    strategy: String,
    statements: Vec<Statement>,
    skipped: Vec<&'static str>,
}

#[derive(Serialize)]
struct DecodedId {
    id: i64,
    timestamp_millis: i64,
    datacenter: u8,
    worker: u8,
    sequence: u16,
}

fn main() {
    init_tracing();
    if let Err(err) = run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tessera=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init();
}

fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    }
    .with_env()?;

    match cli.command {
        Command::Statements { schema } => {
            let text = std::fs::read_to_string(&schema)?;
            let schema = TypeSchema::from_toml_str(&text)?;
            let registry = ModelRegistry::new(config)?;
            let report = statements_report(&registry, &schema);
            emit(&cli.format, &report, || print_statements_text(&report))?;
        }
        Command::Id { strategy, count } => {
            let registry = ModelRegistry::new(config)?;
            let generators = registry.generators();
            let ids = match strategy {
                StrategyArg::Snowflake => {
                    let Some(IdGenerator::Snowflake(generator)) =
                        generators.generator(generators.resolve(None))
                    else {
                        return Err("snowflake generator unavailable".into());
                    };
                    (0..count)
                        .map(|_| generator.next_id().map(|id| id.to_string()))
                        .collect::<Result<Vec<_>, _>>()?
                }
                StrategyArg::Hex => (0..count).map(|_| random_hex_id()).collect(),
            };
            emit(&cli.format, &ids, || {
                for id in &ids {
                    println!("{id}");
                }
            })?;
        }
        Command::Decode { id } => {
            let registry = ModelRegistry::new(config)?;
            let IdStrategy::Snowflake { begin_time_millis } = registry.generators().resolve(None)
            else {
                return Err("snowflake strategy unavailable".into());
            };
            let generator = SnowflakeGenerator::new(begin_time_millis, registry.generators().node());
            let node = SnowflakeGenerator::extract_node(id);
            let decoded = DecodedId {
                id,
                timestamp_millis: generator.extract_timestamp(id),
                datacenter: node.datacenter(),
                worker: node.worker(),
                sequence: SnowflakeGenerator::extract_sequence(id),
            };
            emit(&cli.format, &decoded, || {
                println!("id:           {}", decoded.id);
                println!("timestamp_ms: {}", decoded.timestamp_millis);
                println!("datacenter:   {}", decoded.datacenter);
                println!("worker:       {}", decoded.worker);
                println!("sequence:     {}", decoded.sequence);
            })?;
        }
    }
    Ok(())
}

fn statements_report(registry: &ModelRegistry, schema: &TypeSchema) -> StatementsReport {
    let model = registry.describe(schema);
    let mut statements = Vec::new();
    let mut skipped = Vec::new();
    for operation in Operation::ALL {
        match synth::statement(&model, operation) {
            Ok(statement) => statements.push(statement),
            Err(_) => skipped.push(operation.name()),
        }
    }
    StatementsReport {
        record: model.type_name().to_string(),
        table: model.model_name().to_string(),
        key: model.id_field().map(|field| field.property.clone()),
        strategy: format!("{:?}", model.id_strategy()),
        statements,
        skipped,
    }
}

fn print_statements_text(report: &StatementsReport) {
    println!("record:   {}", report.record);
    println!("table:    {}", report.table);
    println!(
        "key:      {}",
        report.key.as_deref().unwrap_or("<none>")
    );
    println!("strategy: {}", report.strategy);
    for statement in &report.statements {
        println!();
        println!("{}", statement.id);
        println!("  {}", statement.script);
        if let Some(key) = &statement.generated_key {
            println!("  generated key: {}", key.column);
        }
    }
    if !report.skipped.is_empty() {
        println!();
        println!("skipped (no primary key): {}", report.skipped.join(", "));
    }
}

fn emit<T, F>(format: &OutputFormat, value: &T, printer: F) -> Result<(), Box<dyn Error>>
where
    T: Serialize,
    F: Fn(),
{
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(value)?;
            println!("{json}");
        }
        OutputFormat::Text => printer(),
    }
    Ok(())
}
