//! Production Cost Calculator
//!
//! Command-line front end: lists the catalog, costs a product for a
//! quantity, saves and exports the result, and shows the dashboard.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{Local, Utc};
use clap::{Parser, Subcommand};

use cost_calculator::aggregate;
use cost_calculator::api::{CatalogClient, DEFAULT_API_URL};
use cost_calculator::calculator;
use cost_calculator::export::{format_currency, format_decimal};
use cost_calculator::history::HistoryStore;
use cost_calculator::logging::{self, LogFormat, LoggingConfig};
use cost_calculator::models::HistoryEntry;
use cost_calculator::session::CostSession;

#[derive(Parser)]
#[command(name = "cost-calculator")]
#[command(about = "Production cost calculator for bill-of-materials products")]
struct Cli {
    /// Path to the SQLite database holding the query history
    #[arg(short, long, env = "COST_DATABASE", default_value = "cost_history.db")]
    database: PathBuf,

    /// Base URL of the catalog backend
    #[arg(long, env = "COST_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,

    /// HTTP request timeout in seconds
    #[arg(long, env = "COST_TIMEOUT_SECS", default_value = "30")]
    timeout_secs: u64,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, env = "COST_LOG_LEVEL", default_value = "warn")]
    log_level: String,

    /// Log output format
    #[arg(long, env = "COST_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered products with their unit cost
    Products,

    /// List raw materials with their standard-unit cost
    Materials {
        /// Only show materials without a cost mapping
        #[arg(long)]
        unmapped: bool,
    },

    /// Show a product's bill of materials
    Product {
        /// Product ID
        id: i64,
    },

    /// Calculate the production cost of a product
    Calc {
        /// Product ID
        id: i64,

        /// Quantity to produce (whole units)
        #[arg(short, long)]
        quantity: String,

        /// Save the result to the query history
        #[arg(long)]
        save: bool,

        /// Export the result as a spreadsheet
        #[arg(long)]
        xlsx: bool,

        /// Export the result as a PDF report
        #[arg(long)]
        pdf: bool,

        /// Directory for exported files
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,

        /// Show the line-item table
        #[arg(short, long)]
        verbose: bool,
    },

    /// Show cost totals, shares and saved queries
    Dashboard,

    /// List saved queries
    History,

    /// Delete all saved queries
    ClearHistory {
        /// Do not ask for confirmation
        #[arg(long)]
        yes: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init_logging(&LoggingConfig {
        level: cli.log_level.clone(),
        format: cli.log_format,
    })?;

    let store = HistoryStore::open(&cli.database)
        .with_context(|| format!("Failed to open {}", cli.database.display()))?;
    let client = || CatalogClient::new(&cli.api_url, Duration::from_secs(cli.timeout_secs));

    match cli.command {
        Commands::Products => {
            let products = client()?.list_products()?;
            if products.is_empty() {
                println!("No products registered.");
            } else {
                println!("{:>6} {:<40} {:>16}", "ID", "Product", "Unit cost");
                println!("{}", "-".repeat(64));
                for p in products {
                    println!(
                        "{:>6} {:<40} {:>16}",
                        p.id,
                        p.name,
                        format_currency(p.total_cost.unwrap_or(0.0))
                    );
                }
            }
        }

        Commands::Materials { unmapped } => {
            let materials = client()?.list_materials()?;
            let shown: Vec<_> = materials
                .iter()
                .filter(|m| !unmapped || !m.is_mapped())
                .collect();

            if shown.is_empty() {
                println!("No raw materials to show.");
            } else {
                println!("{:>6} {:<40} {:<6} {:>16}", "ID", "Material", "Unit", "Cost / unit");
                println!("{}", "-".repeat(71));
                for m in shown {
                    let cost = match m.standard_unit_cost {
                        Some(cost) => format_currency(cost),
                        None => "unmapped".to_string(),
                    };
                    println!(
                        "{:>6} {:<40} {:<6} {:>16}",
                        m.id,
                        m.name,
                        m.standard_unit.as_deref().unwrap_or("-"),
                        cost
                    );
                }
            }
        }

        Commands::Product { id } => {
            let product = client()?.get_product(id)?;
            println!("Product: {}", product.name);
            println!("  ID: {}", product.id);
            println!(
                "  Cost per unit: {}",
                format_currency(calculator::bill_of_materials_cost(&product.raw_materials))
            );

            if product.raw_materials.is_empty() {
                println!("  No raw materials.");
            } else {
                println!("  Raw materials:");
                for m in &product.raw_materials {
                    let cost = match m.unit_cost {
                        Some(cost) => format_currency(cost),
                        None => "unmapped".to_string(),
                    };
                    println!(
                        "    {} {} {} @ {}",
                        format_decimal(m.quantity_used_per_unit),
                        m.standard_unit.as_deref().unwrap_or("-"),
                        m.name,
                        cost
                    );
                }
            }
        }

        Commands::Calc {
            id,
            quantity,
            save,
            xlsx,
            pdf,
            out_dir,
            verbose,
        } => {
            let product = client()?.get_product(id)?;
            let product_name = product.name.clone();
            let mut session = CostSession::new();
            session.select_product(product);

            let computation = session.calculate(&quantity)?;
            if verbose {
                println!("{}", calculator::format_computation(computation));
            }
            println!("{}", calculator::summarize_computation(computation, &product_name));

            if save {
                let entry = session.save_query(&store, Utc::now())?;
                println!("Query saved ({}).", entry.id);
            }

            let today = Local::now().date_naive();
            if xlsx {
                let (name, bytes) = session.export_spreadsheet(today)?;
                write_export(&out_dir, &name, &bytes)?;
            }
            if pdf {
                let (name, bytes) = session.export_pdf(today)?;
                write_export(&out_dir, &name, &bytes)?;
            }
        }

        Commands::Dashboard => {
            let client = client()?;
            let products = client.list_products()?;
            let materials = client.list_materials()?;

            println!("{}", aggregate::summarize(&products, &materials));
            print_history(&store.load_all());
        }

        Commands::History => {
            print_history(&store.load_all());
        }

        Commands::ClearHistory { yes } => {
            if !store.is_stored()? {
                println!("No saved queries.");
            } else if yes || confirm("Delete the whole query history?")? {
                store.clear_all()?;
                println!("Query history cleared.");
            } else {
                println!("Cancelled.");
            }
        }
    }

    Ok(())
}

fn write_export(dir: &Path, name: &str, bytes: &[u8]) -> Result<()> {
    let path = dir.join(name);
    std::fs::write(&path, bytes).with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::info!(path = %path.display(), bytes = bytes.len(), "exported report");
    println!("Exported {}", path.display());
    Ok(())
}

fn print_history(entries: &[HistoryEntry]) {
    println!("Saved queries:");
    if entries.is_empty() {
        println!("  No queries saved yet.");
        return;
    }
    println!("  {:<12} {:<30} {:>10} {:>16}", "Date", "Product", "Quantity", "Total cost");
    for e in entries {
        println!(
            "  {:<12} {:<30} {:>10} {:>16}",
            e.queried_at.with_timezone(&Local).format("%d/%m/%Y"),
            e.product_name,
            e.produced_quantity,
            format_currency(e.total_cost)
        );
    }
}

/// Ask a yes/no question on stdin; anything but `y`/`yes` is a no
fn confirm(question: &str) -> Result<bool> {
    print!("{} [y/N] ", question);
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}
