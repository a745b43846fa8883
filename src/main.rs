//! xbexpr - evaluate dBASE expressions from the command line

use anyhow::{bail, Context, Result};
use clap::Parser as ClapParser;
use log::info;
use std::fs;
use std::path::{Path, PathBuf};
use xbexpr::{Expression, ExpressionConfig, Filter, MemoryTable, RecordCursor, Table, TableSpec};

/// Parse and evaluate dBASE expressions
#[derive(ClapParser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Expressions to evaluate
    #[arg(required = true)]
    expressions: Vec<String>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// JSON file with expression settings
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// JSON table description; expressions are evaluated for every record
    #[arg(short, long)]
    table: Option<PathBuf>,

    /// Only evaluate records matching this Logical expression (needs --table)
    #[arg(short, long)]
    filter: Option<String>,

    /// Print the parsed tree after each evaluation
    #[arg(long)]
    tree: bool,

    /// Print the index key bytes as hex
    #[arg(short, long)]
    key: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.debug { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => ExpressionConfig::default(),
    };

    match &args.table {
        Some(path) => {
            let spec: TableSpec = load_json(path).context("Failed to load table")?;
            let table = MemoryTable::from_spec(&spec)
                .with_context(|| format!("Invalid table in {}", path.display()))?;
            run_over_table(&args, &table, &config)
        }
        None => {
            if args.filter.is_some() {
                bail!("--filter needs --table");
            }
            let mut expressions = parse_all(&args.expressions, None, &config)?;
            for expression in &mut expressions {
                print_result(&args, expression, None)?;
            }
            Ok(())
        }
    }
}

fn run_over_table(args: &Args, table: &MemoryTable, config: &ExpressionConfig) -> Result<()> {
    let records: Vec<u32> = match &args.filter {
        Some(condition) => Filter::with_config(table, condition, config.clone())
            .with_context(|| format!("Invalid filter '{}'", condition))?
            .matching_records()?,
        None => (1..=table.record_count()?).collect(),
    };
    info!(
        "Evaluating {} expressions over {} of {} records in {}",
        args.expressions.len(),
        records.len(),
        table.record_count()?,
        table.name()
    );

    let mut expressions = parse_all(&args.expressions, Some(table as &dyn Table), config)?;
    for recno in records {
        table.goto_record(recno)?;
        for expression in &mut expressions {
            print_result(args, expression, Some(recno))?;
        }
    }
    Ok(())
}

fn parse_all<'t>(
    texts: &[String],
    table: Option<&'t dyn Table>,
    config: &ExpressionConfig,
) -> Result<Vec<Expression<'t>>> {
    texts
        .iter()
        .map(|text| {
            Expression::parse_with_config(table, text, config.clone())
                .with_context(|| format!("Failed to parse '{}'", text))
        })
        .collect()
}

fn print_result(args: &Args, expression: &mut Expression<'_>, recno: Option<u32>) -> Result<()> {
    expression
        .evaluate()
        .with_context(|| format!("Failed to evaluate '{}'", expression.text()))?;

    let prefix = recno.map(|n| format!("#{} ", n)).unwrap_or_default();
    println!(
        "{}{} => {} {}({})",
        prefix,
        expression.text(),
        expression.value()?,
        expression.return_type(),
        expression.result_len()
    );
    if args.key {
        let key: String = expression
            .index_key()?
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect();
        println!("  key: {}", key);
    }
    if args.tree {
        print!("{}", expression.dump_tree());
    }
    Ok(())
}

fn load_config(path: &Path) -> Result<ExpressionConfig> {
    load_json(path).context("Failed to load configuration")
}

fn load_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Failed to parse {}", path.display()))
}
