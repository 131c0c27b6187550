use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use listcraft_core::{ReconcileConfig, Reconciler};
use std::path::PathBuf;

mod formatter;

#[derive(Parser)]
#[command(name = "listmerge")]
#[command(about = "Reconcile supplier price lists into a formula-bearing base workbook", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the base price list (.xlsx/.xlsm)
    #[arg(value_name = "BASE")]
    base: PathBuf,

    /// Paths to supplier lists (.xlsx/.xls/.ods/.csv), applied in order
    #[arg(value_name = "SUPPLIER", required = true)]
    suppliers: Vec<PathBuf>,

    /// Write the updated workbook here; without it the base file is only
    /// analyzed and summarized
    #[arg(short, long, value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// Also write the discounted offer table here (.xlsx or .csv)
    #[arg(long, value_name = "OFFERS")]
    offers: Option<PathBuf>,

    /// Path to configuration file (TOML)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "human")]
    format: OutputFormat,

    /// Override the configured offer discount rate (e.g. 0.15)
    #[arg(long, value_name = "RATE")]
    discount: Option<f64>,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Human-readable colored output
    Human,
    /// JSON output for scripting
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = if let Some(config_path) = &cli.config {
        ReconcileConfig::from_file(config_path)
            .with_context(|| format!("Failed to load config from {}", config_path.display()))?
    } else {
        // Try to load default config from current directory if it exists
        let default_config_path = PathBuf::from("listmerge.toml");
        if default_config_path.exists() {
            ReconcileConfig::from_file(&default_config_path).with_context(|| {
                format!(
                    "Failed to load config from {}",
                    default_config_path.display()
                )
            })?
        } else {
            ReconcileConfig::default()
        }
    };

    if let Some(rate) = cli.discount {
        anyhow::ensure!(
            (0.0..1.0).contains(&rate),
            "Discount rate must be in [0, 1), got {rate}"
        );
        config.offers.discount = rate;
    }

    let reconciler = Reconciler::with_config(config);

    // All reconciliation happens in memory; nothing is written until every
    // supplier list has been applied, so a failure leaves the inputs alone.
    let mut list = listcraft_core::load_price_list(&cli.base)
        .with_context(|| format!("Failed to load base list: {}", cli.base.display()))?;

    let mut report = listcraft_core::ReconcileReport::default();
    for supplier_path in &cli.suppliers {
        let records = listcraft_core::load_supplier(supplier_path, reconciler.config())
            .with_context(|| {
                format!("Failed to load supplier list: {}", supplier_path.display())
            })?;
        let pass = reconciler.reconcile(&mut list, &records)?;

        report.updated += pass.updated;
        report.inserted += pass.inserted;
        report.unmatched_base = pass.unmatched_base;
        report.unmatched_supplier += pass.unmatched_supplier;
        report.advisories.extend(pass.advisories);
    }

    let offers = if cli.offers.is_some() {
        reconciler.generate_offers(&list, &mut report)?
    } else {
        Vec::new()
    };

    if let Some(output) = &cli.output {
        listcraft_core::write_price_list(&cli.base, output, &list)
            .with_context(|| format!("Failed to write updated list: {}", output.display()))?;
    }

    if let Some(offers_path) = &cli.offers {
        listcraft_core::write_offers(offers_path, &offers, reconciler.config())
            .with_context(|| format!("Failed to write offers: {}", offers_path.display()))?;
    }

    match cli.format {
        OutputFormat::Human => {
            formatter::print_human(cli.output.as_deref(), cli.offers.as_deref(), &report);
        }
        OutputFormat::Json => {
            formatter::print_json(cli.output.as_deref(), cli.offers.as_deref(), &report)?;
        }
    }

    Ok(())
}
