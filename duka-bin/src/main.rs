//! Terminal front end for the Duka agent: a seeded demo shop and an
//! interactive chat loop that plays the customer side of a WhatsApp
//! conversation.

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncBufReadExt;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use duka_config::{ConfigLoader, DukaConfig};
use duka_core::{BusinessContext, InventoryItem, SettlementAccount};
use duka_llm::{ChatProvider, MockProvider, OpenAiProvider};
use duka_runtime::{Engine, InboundMessage};
use duka_store::{MemoryCatalog, MemoryEscalations, MemoryMedia, MemoryMessageLog, MemoryOrders};

/// Duka — conversational commerce agent for WhatsApp-first merchants
#[derive(Parser)]
#[command(name = "duka", version, about, long_about = None)]
struct Cli {
    /// Path to duka.toml config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level override (e.g. debug, info, warn, error)
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the demo shop in the terminal (default)
    Chat {
        /// Customer phone to impersonate
        #[arg(long, default_value = "+2348001112222")]
        phone: String,
    },
    /// Show the effective configuration
    Config {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let loader = ConfigLoader::load(cli.config.as_deref())?;
    let mut config = loader.get();
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    init_tracing(&config);

    match cli.command.unwrap_or(Commands::Chat { phone: "+2348001112222".into() }) {
        Commands::Chat { phone } => cmd_chat(config, phone).await,
        Commands::Config { json } => cmd_config(&config, json),
    }
}

fn init_tracing(config: &DukaConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone()));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if config.logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn cmd_config(config: &DukaConfig, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(config)?);
    } else {
        println!("{}", toml::to_string_pretty(config)?);
    }
    Ok(())
}

async fn cmd_chat(config: DukaConfig, phone: String) -> anyhow::Result<()> {
    println!("🛍  Duka demo shop — Ada's Cakes");
    println!("   You are chatting as {phone}");
    println!("   Type 'exit' or Ctrl+C to quit");
    println!();

    let provider: Arc<dyn ChatProvider> = match &config.provider.api_key {
        Some(key) => Arc::new(
            OpenAiProvider::new(key.clone())
                .with_base_url(config.provider.base_url.clone(), "openai".to_string()),
        ),
        None => {
            eprintln!("⚠️  No API key configured (OPENAI_API_KEY or [provider] api_key).");
            eprintln!("   Running with a mock model: only deterministic flows will answer.");
            eprintln!();
            Arc::new(MockProvider::new("mock"))
        }
    };

    let catalog = Arc::new(MemoryCatalog::new());
    catalog.seed_business(demo_business(), demo_inventory());

    let engine = Engine::new(
        config,
        provider,
        catalog,
        Arc::new(MemoryOrders::new()),
        Arc::new(MemoryMedia::new()),
        Arc::new(MemoryEscalations::new()),
        Arc::new(MemoryMessageLog::new()),
    );

    let stdin = tokio::io::stdin();
    let reader = tokio::io::BufReader::new(stdin);
    let mut lines = reader.lines();

    loop {
        eprint!("\x1b[36myou>\x1b[0m ");
        use std::io::Write;
        std::io::stderr().flush().ok();

        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) | Err(_) => break,
        };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed == "exit" || trimmed == "quit" {
            println!("👋 Bye!");
            break;
        }

        let reply = engine
            .process_message(InboundMessage {
                phone: phone.clone(),
                text: trimmed.to_string(),
                message_id: Uuid::new_v4().to_string(),
                destination: demo_business().whatsapp_number,
                channel: "whatsapp".to_string(),
                business_id: None,
            })
            .await;
        println!("\x1b[32mduka>\x1b[0m {}", reply.text);
    }

    Ok(())
}

fn demo_business() -> BusinessContext {
    BusinessContext {
        business_id: "demo-adas-cakes".into(),
        name: "Ada's Cakes".into(),
        whatsapp_number: "+2349003334444".into(),
        description: Some("Fresh cakes and small chops, baked daily in Lagos".into()),
        tone: Some("warm, upbeat, a little playful".into()),
        website: Some("https://adascakes.example".into()),
        instagram: Some("@adascakes".into()),
        pickup_instructions: Some("Shop 4, Ikeja City Mall, 9am-7pm".into()),
        settlement: Some(SettlementAccount {
            bank_name: "GTBank".into(),
            account_number: "0123456789".into(),
            account_name: "Ada's Cakes Ltd".into(),
        }),
        currency_symbol: "₦".into(),
        channels: vec!["whatsapp".into()],
    }
}

fn demo_inventory() -> Vec<InventoryItem> {
    vec![
        InventoryItem {
            name: "Chocolate Cake".into(),
            price: Some(Decimal::from(5000)),
            available: true,
            image_ref: Some("chocolate.jpg".into()),
        },
        InventoryItem {
            name: "Red Velvet Cake".into(),
            price: Some(Decimal::from(6500)),
            available: true,
            image_ref: Some("red-velvet.jpg".into()),
        },
        InventoryItem {
            name: "Meat Pie (box of 6)".into(),
            price: Some(Decimal::from(3000)),
            available: true,
            image_ref: None,
        },
        InventoryItem {
            name: "Small Chops Platter".into(),
            price: Some(Decimal::from(8000)),
            available: true,
            image_ref: None,
        },
        InventoryItem {
            name: "Wedding Cake (3-tier)".into(),
            price: None,
            available: true,
            image_ref: None,
        },
    ]
}
