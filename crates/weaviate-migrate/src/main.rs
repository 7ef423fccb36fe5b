//! weaviate-migrate CLI
//!
//! Copies Weaviate schemas and objects between instances.
//! Pedantic lints relaxed for CLI ergonomics.

// CLI tool - relax pedantic lints for ergonomics
#![allow(clippy::pedantic)]

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use weaviate_migrate::{MigrationConfig, MigrationDecision, Pipeline, WeaviateClient};

#[derive(Parser)]
#[command(name = "weaviate-migrate")]
#[command(version)]
#[command(about = "Copy Weaviate schemas and objects between instances", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file path
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// .env file to load before reading the configuration
    #[arg(long, value_name = "FILE", global = true)]
    env_file: Option<PathBuf>,

    /// Source instance URL (overrides the config file)
    #[arg(long, env = "WEAVIATE_SOURCE_URL", global = true)]
    source_url: Option<String>,

    /// Destination instance URL (overrides the config file)
    #[arg(long, env = "WEAVIATE_DEST_URL", global = true)]
    dest_url: Option<String>,

    /// Batch size override
    #[arg(long, global = true)]
    batch_size: Option<usize>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Migrate every class that needs it, skipping classes that fail
    Sync {
        /// Restrict to these classes
        #[arg(long = "class", value_name = "CLASS")]
        classes: Vec<String>,
    },

    /// Recreate every class on the destination and copy all objects
    Replicate {
        /// Restrict to these classes
        #[arg(long = "class", value_name = "CLASS")]
        classes: Vec<String>,
    },

    /// Rebuild one class through a temporary class
    Swap {
        /// Class to rebuild
        #[arg(long)]
        class: String,
    },

    /// Show what sync would do without writing anything
    Plan {
        /// Restrict to these classes
        #[arg(long = "class", value_name = "CLASS")]
        classes: Vec<String>,
    },

    /// Show the source schema
    Schema {
        /// Print one class as JSON
        #[arg(long)]
        class: Option<String>,
    },

    /// Validate configuration file
    Validate,

    /// Generate example configuration
    Init {
        /// Output file path
        #[arg(short, long, default_value = "migration.yaml")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    load_env(cli.env_file.as_deref())?;

    match &cli.command {
        Some(Commands::Init { output }) => generate_config(output),
        Some(Commands::Validate) => validate_config(&cli),
        Some(Commands::Schema { class }) => show_schema(&cli, class.as_deref()).await,
        Some(Commands::Plan { classes }) => show_plan(&cli, classes).await,
        Some(Commands::Replicate { classes }) => {
            let pipeline = Pipeline::new(load_config(&cli)?)?;
            let stats = pipeline.replicate(classes).await?;
            print_stats(&stats);
            Ok(())
        }
        Some(Commands::Swap { class }) => {
            let pipeline = Pipeline::new(load_config(&cli)?)?;
            let stats = pipeline.swap(class).await?;
            print_stats(&stats);
            Ok(())
        }
        Some(Commands::Sync { classes }) => run_sync(&cli, classes).await,
        None => run_sync(&cli, &[]).await,
    }
}

fn load_env(env_file: Option<&Path>) -> anyhow::Result<()> {
    match env_file {
        Some(path) => {
            dotenvy::from_path(path)?;
            info!("Loaded environment from {:?}", path);
        }
        None => {
            dotenvy::dotenv().ok();
        }
    }
    Ok(())
}

fn load_config(cli: &Cli) -> anyhow::Result<MigrationConfig> {
    let mut config = match (&cli.config, &cli.source_url, &cli.dest_url) {
        (Some(path), _, _) => {
            info!("Loading configuration from {:?}", path);
            MigrationConfig::from_file(path)?
        }
        (None, Some(source), Some(dest)) => MigrationConfig::from_urls(source, dest),
        _ => anyhow::bail!(
            "no configuration: pass --config <FILE> or both --source-url and --dest-url"
        ),
    };

    if cli.config.is_some() {
        if let Some(url) = &cli.source_url {
            config.source.url = url.clone();
        }
        if let Some(url) = &cli.dest_url {
            config.destination.url = url.clone();
        }
    }
    if let Some(bs) = cli.batch_size {
        config.options.batch_size = bs;
    }

    config.validate()?;
    Ok(config)
}

async fn run_sync(cli: &Cli, classes: &[String]) -> anyhow::Result<()> {
    let pipeline = Pipeline::new(load_config(cli)?)?;
    let stats = pipeline.sync(classes).await?;
    print_stats(&stats);
    Ok(())
}

fn print_stats(stats: &weaviate_migrate::MigrationStats) {
    println!("\nMigration complete");
    println!("   Classes migrated: {}", stats.classes_migrated);
    println!("   Classes skipped:  {}", stats.classes_skipped);
    println!("   Classes failed:   {}", stats.classes_failed);
    println!("   Objects copied:   {}", stats.objects.processed);
    println!("   Objects failed:   {}", stats.objects.failed);
    println!("   Duration:         {:.2}s", stats.duration_secs);
    println!("   Throughput:       {:.0} objects/sec", stats.throughput());
}

fn validate_config(cli: &Cli) -> anyhow::Result<()> {
    let config = load_config(cli)?;

    println!("Configuration is valid");
    println!("   Source:      {}", config.source.url);
    println!("   Destination: {}", config.destination.url);
    println!("   Batch size:  {}", config.options.batch_size);
    println!(
        "   Default vectorizer: {}",
        config.defaults.vectorizer.vectorizer_name()
    );
    let mut names: Vec<_> = config.classes.keys().collect();
    names.sort();
    for name in names {
        let policy = config.policy_for(name);
        println!(
            "   Policy {}: vectorizer={} enforce={}",
            name,
            policy.vectorizer.vectorizer_name(),
            policy.enforce_vectorizer
        );
    }

    Ok(())
}

async fn show_schema(cli: &Cli, class: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(cli)?;
    let client = WeaviateClient::with_options(&config.source, &config.options);

    if let Some(class) = class {
        let schema = client.get_class(class).await?;
        println!("{}", serde_json::to_string_pretty(&schema)?);
        return Ok(());
    }

    let classes = client.get_schema().await?;
    println!("\nSource classes ({}):", client.base_url());
    if classes.is_empty() {
        println!("   No classes found.");
    }
    for schema in &classes {
        println!(
            "   - {} (vectorizer: {}, {} properties)",
            schema.class,
            schema.vectorizer_name(),
            schema.properties.len()
        );
    }

    Ok(())
}

async fn show_plan(cli: &Cli, classes: &[String]) -> anyhow::Result<()> {
    let pipeline = Pipeline::new(load_config(cli)?)?;
    let plan = pipeline.plan(classes).await?;

    println!("\nMigration plan:");
    for (class, decision) in &plan {
        let (verdict, reason) = plan_line(decision);
        println!("   {:<8} {} ({})", verdict, class, reason);
    }

    Ok(())
}

fn plan_line(decision: &weaviate_migrate::Result<MigrationDecision>) -> (&'static str, String) {
    match decision {
        Ok(d) if d.needs_migration => ("MIGRATE", d.reason.clone()),
        Ok(d) => ("skip", d.reason.clone()),
        Err(e) => ("ERROR", e.to_string()),
    }
}

fn generate_config(output: &Path) -> anyhow::Result<()> {
    std::fs::write(output, CONFIG_TEMPLATE)?;
    println!("Generated configuration: {:?}", output);
    println!(
        "   Edit the file and run: weaviate-migrate plan --config {:?}",
        output
    );
    Ok(())
}

const CONFIG_TEMPLATE: &str = r#"# weaviate-migrate configuration
source:
  url: http://prod.example.com:8090
  # api_key: your-weaviate-key  # Optional

destination:
  url: http://localhost:8095
  # api_key: your-weaviate-key  # Optional
  embedding_api_key_env: OPENAI_API_KEY

options:
  batch_size: 100
  sleep_between_batches_ms: 100
  temp_suffix: _temp
  request_timeout_secs: 30
  insert_timeout_secs: 60
  insert_retry:
    max_attempts: 3
    initial_delay_ms: 2000
    max_delay_ms: 2000
    # Set to stop retrying on 4xx responses other than 429
    fail_fast: false
  fetch_retry:
    max_attempts: 6
    initial_delay_ms: 5000
    max_delay_ms: 60000
    backoff_multiplier: 2.0

# Policy for classes not listed under `classes`
defaults:
  vectorizer:
    type: none
  enforce_vectorizer: false

classes:
  ConstructionProducts:
    vectorizer:
      type: enabled
      module: text2vec-openai
      vectorize_class_name: false
    enforce_vectorizer: true
"#;
