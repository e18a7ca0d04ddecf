//! Homescore CLI
//!
//! Command-line front end over the evaluation engine:
//! - Add, edit and delete candidate homes
//! - Favorite and compare-select homes
//! - Answer checklist items and see the derived rating

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use homescore::evaluation::{AnswerValue, EvaluationSchema, ScoreAggregator};
use homescore::property::{NewProperty, OfferIntent, PropertyPatch, PropertyRecord};
use homescore::{HomescoreConfig, MutationCoordinator, SqliteRecordStore};

// ──────────────────────────────────────────────────────────────────────────────
// COMMAND LINE
// ──────────────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "homescore", version, about = "Evaluate and compare candidate homes")]
struct Cli {
    #[arg(long, global = true, help = "Output machine-readable JSON")]
    json: bool,
    #[arg(long, global = true, env = "HOMESCORE_DB", help = "SQLite database path")]
    db: Option<PathBuf>,
    #[arg(long, global = true, env = "HOMESCORE_USER", help = "User the session acts for")]
    user: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the inspection checklist
    Schema,
    /// List homes, newest first
    List,
    /// Show one home with its evaluation progress
    Show { id: String },
    Add {
        address: String,
        #[arg(long)]
        price: f64,
        #[arg(long, default_value_t = 0)]
        bedrooms: u32,
        #[arg(long, default_value_t = 0.0)]
        bathrooms: f32,
        #[arg(long)]
        neighborhood: Option<String>,
        #[arg(long)]
        year_built: Option<i32>,
        #[arg(long)]
        taxes: Option<f64>,
        #[arg(long)]
        sqft: Option<u32>,
    },
    Edit {
        id: String,
        #[arg(long)]
        address: Option<String>,
        #[arg(long)]
        price: Option<f64>,
        #[arg(long)]
        bedrooms: Option<u32>,
        #[arg(long)]
        bathrooms: Option<f32>,
        #[arg(long)]
        neighborhood: Option<String>,
        #[arg(long, value_enum)]
        offer: Option<OfferArg>,
    },
    Favorite { id: String },
    /// Toggle a home in or out of the comparison set
    Compare { id: String },
    ClearCompare,
    /// Answer one checklist item, e.g. `rate <id> exteriors roof_condition good`
    Rate {
        id: String,
        category: String,
        item: String,
        value: String,
        /// Observation kept with rating and radio items (500 characters max)
        #[arg(long)]
        note: Option<String>,
    },
    /// Remove the answer and note for one checklist item
    Unrate {
        id: String,
        category: String,
        item: String,
    },
    Delete { id: String },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum OfferArg {
    Yes,
    Maybe,
    No,
    Unset,
}

impl From<OfferArg> for OfferIntent {
    fn from(arg: OfferArg) -> Self {
        match arg {
            OfferArg::Yes => OfferIntent::Yes,
            OfferArg::Maybe => OfferIntent::Maybe,
            OfferArg::No => OfferIntent::No,
            OfferArg::Unset => OfferIntent::Unset,
        }
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// MAIN ENTRY POINT
// ──────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let mut config = HomescoreConfig::from_env();
    let cli = Cli::parse();
    if let Some(db) = cli.db.clone() {
        config.database_path = db;
    }
    if let Some(user) = cli.user.clone() {
        config.user_id = user;
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Commands::Schema = cli.command {
        return print_schema(cli.json);
    }

    let store = Arc::new(
        SqliteRecordStore::new(&config.database_path)
            .await
            .with_context(|| format!("Failed to open {}", config.database_path.display()))?,
    );
    let coordinator = MutationCoordinator::new(config.user_id.clone(), store)
        .with_workspace_name(config.workspace_name.clone());
    coordinator.reload().await?;
    debug!("Session ready for user {}", config.user_id);

    run(&coordinator, cli.command, cli.json).await
}

async fn run(coordinator: &MutationCoordinator, command: Commands, json: bool) -> Result<()> {
    match command {
        Commands::Schema => print_schema(json)?,
        Commands::List => {
            let records = coordinator.records().await;
            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else if records.is_empty() {
                println!("No homes yet. Add one with `homescore add <address> --price <amount>`.");
            } else {
                for record in &records {
                    print_summary_line(record);
                }
                println!("\n{} home(s), {} selected for comparison", records.len(), coordinator.compare_count().await);
            }
        }
        Commands::Show { id } => {
            let record = coordinator.get(&id).await.context("No home with that id")?;
            print_detail(coordinator, &record, json)?;
        }
        Commands::Add { address, price, bedrooms, bathrooms, neighborhood, year_built, taxes, sqft } => {
            let input = NewProperty {
                address,
                neighborhood,
                price,
                bedrooms,
                bathrooms,
                year_built,
                property_taxes: taxes,
                square_footage: sqft,
                primary_photo: None,
            };
            let record = coordinator.create(input).await?;
            print_result(&record, json, "Home added")?;
        }
        Commands::Edit { id, address, price, bedrooms, bathrooms, neighborhood, offer } => {
            let mut patch = PropertyPatch::new();
            if let Some(address) = address {
                patch = patch.address(address);
            }
            if let Some(price) = price {
                patch = patch.price(price);
            }
            if let Some(bedrooms) = bedrooms {
                patch = patch.bedrooms(bedrooms);
            }
            if let Some(bathrooms) = bathrooms {
                patch = patch.bathrooms(bathrooms);
            }
            if let Some(neighborhood) = neighborhood {
                patch = patch.neighborhood(Some(neighborhood).filter(|n| !n.trim().is_empty()));
            }
            if let Some(offer) = offer {
                patch = patch.offer_intent(offer.into());
            }
            if patch.is_empty() {
                bail!("Nothing to change; pass at least one field");
            }
            let record = coordinator.update(&id, patch).await?;
            print_result(&record, json, "Home updated")?;
        }
        Commands::Favorite { id } => {
            let record = coordinator.toggle_favorite(&id).await?;
            let message = if record.favorite { "Added to favorites" } else { "Removed from favorites" };
            print_result(&record, json, message)?;
        }
        Commands::Compare { id } => {
            let record = coordinator.toggle_compare(&id).await?;
            let message = if record.compare_selected { "Selected for comparison" } else { "Removed from comparison" };
            print_result(&record, json, message)?;
        }
        Commands::ClearCompare => {
            coordinator.clear_compare_selection().await?;
            println!("Comparison cleared");
        }
        Commands::Rate { id, category, item, value, note } => {
            let record = coordinator.get(&id).await.context("No home with that id")?;
            let schema = coordinator.schema();
            let kind = schema
                .item(&category, &item)
                .map(|i| i.kind)
                .with_context(|| format!("Unknown checklist item {}/{}", category, item))?;
            let answer = AnswerValue::parse(kind, &value).map_err(anyhow::Error::msg)?;

            let mut answers = record.answers.clone();
            answers.set(category.clone(), item.clone(), answer);
            let record = match note {
                Some(note) => {
                    let mut notes = record.notes.clone();
                    notes.set(category, item, note);
                    coordinator.save_evaluation_with_notes(&id, answers, notes).await?
                }
                None => coordinator.save_evaluation(&id, answers).await?,
            };
            print_result(&record, json, &format!("Rating now {:.1}", record.overall_rating))?;
        }
        Commands::Unrate { id, category, item } => {
            let record = coordinator.get(&id).await.context("No home with that id")?;
            let mut answers = record.answers.clone();
            if answers.clear(&category, &item).is_none() {
                bail!("{}/{} has no answer", category, item);
            }
            let mut notes = record.notes.clone();
            notes.clear(&category, &item);
            let record = coordinator.save_evaluation_with_notes(&id, answers, notes).await?;
            print_result(&record, json, &format!("Rating now {:.1}", record.overall_rating))?;
        }
        Commands::Delete { id } => {
            coordinator.delete(&id).await?;
            println!("Home deleted");
        }
    }
    Ok(())
}

// ──────────────────────────────────────────────────────────────────────────────
// OUTPUT
// ──────────────────────────────────────────────────────────────────────────────

fn print_schema(json: bool) -> Result<()> {
    let schema = EvaluationSchema::standard();
    if json {
        println!("{}", serde_json::to_string_pretty(schema)?);
        return Ok(());
    }
    for category in schema.categories() {
        println!("{} [{}]", category.title, category.id);
        for item in &category.items {
            let options = if item.options.is_empty() {
                String::new()
            } else {
                format!(" ({})", item.options.join(" / "))
            };
            println!("  {:<28} {:<18} {}{}", item.id, item.kind.to_string(), item.label, options);
        }
    }
    println!(
        "\n{} items, {} rated",
        schema.item_count(),
        schema.score_bearing_item_count()
    );
    Ok(())
}

fn print_summary_line(record: &PropertyRecord) {
    let flags = format!(
        "{}{}",
        if record.favorite { "♥" } else { " " },
        if record.compare_selected { "⚖" } else { " " }
    );
    println!(
        "{} {}  {:<32} ${:>12.0}  {:.1}/5  {}",
        flags, record.id, record.address, record.price, record.overall_rating, record.evaluation_status
    );
}

fn print_detail(coordinator: &MutationCoordinator, record: &PropertyRecord, json: bool) -> Result<()> {
    let aggregator = ScoreAggregator::new(coordinator.schema());
    if json {
        let detail = serde_json::json!({
            "record": record,
            "completion": aggregator.completion_percentage(&record.answers),
            "categories": aggregator.category_progress(&record.answers),
        });
        println!("{}", serde_json::to_string_pretty(&detail)?);
        return Ok(());
    }

    print_summary_line(record);
    if let Some(neighborhood) = &record.neighborhood {
        println!("  Neighborhood: {}", neighborhood);
    }
    println!("  {} bed / {} bath, offer intent: {}", record.bedrooms, record.bathrooms, record.offer_intent);
    println!("  Completion: {}%", aggregator.completion_percentage(&record.answers));
    for progress in aggregator.category_progress(&record.answers) {
        println!("    {:<22} {}/{}", progress.title, progress.answered, progress.total);
    }
    if !record.notes.is_empty() {
        println!("  Notes:");
        for (category, item, note) in record.notes.iter() {
            println!("    {}/{}: {}", category, item, note);
        }
    }
    Ok(())
}

fn print_result(record: &PropertyRecord, json: bool, message: &str) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(record)?);
    } else {
        println!("{}", message);
        print_summary_line(record);
    }
    Ok(())
}
