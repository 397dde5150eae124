//! Catalog CLI
//!
//! Command-line interface for the product catalog API.

use std::time::Duration;

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;

use catalog_client::{CatalogClient, ListOptions};
use catalog_types::CreateProductRequest;
use exchange_rates::{
    DEFAULT_URL_TEMPLATE, GatewayConfig, HttpRateGateway, RateCurrency, RateGateway, RateKey,
};

#[derive(Parser)]
#[command(name = "catalog")]
#[command(author, version, about = "Product catalog API CLI client", long_about = None)]
struct Cli {
    /// Base URL of the Catalog API
    #[arg(long, env = "CATALOG_API_URL", default_value = "http://localhost:3000")]
    api_url: String,

    /// Bearer token for write operations
    #[arg(long, env = "CATALOG_API_TOKEN")]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Product operations
    Product {
        #[command(subcommand)]
        action: ProductCommands,
    },
    /// Query the exchange-rate provider directly
    Rate {
        /// Currency code (USD, GBP, CHF, ...)
        #[arg(long, default_value = "USD")]
        currency: RateCurrency,
        /// Application date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Provider URL template with {currency} and {date} placeholders
        #[arg(long, env = "EXCHANGE_RATE_API_URL_TEMPLATE", default_value = DEFAULT_URL_TEMPLATE)]
        url_template: String,
        /// Request timeout in milliseconds
        #[arg(long, env = "EXCHANGE_RATE_API_TIMEOUT_MS", default_value = "5000")]
        timeout_ms: u64,
    },
    /// Check API health
    Health,
}

#[derive(Subcommand)]
enum ProductCommands {
    /// Create a new product
    Create {
        /// Product code, exactly 10 characters
        code: String,
        /// Product name
        #[arg(long)]
        name: String,
        /// Price in EUR
        #[arg(long)]
        price: Decimal,
        /// Mark the product as available
        #[arg(long)]
        available: bool,
    },
    /// Get product details
    Get {
        /// Product code
        code: String,
    },
    /// List products
    List {
        /// Page number (0-based)
        #[arg(long)]
        page: Option<u32>,
        /// Page size (1-100)
        #[arg(long)]
        size: Option<u32>,
        /// Sort as property(,asc|desc)
        #[arg(long)]
        sort: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let mut client = CatalogClient::new(&cli.api_url);
    if let Some(token) = cli.token {
        client = client.with_token(token);
    }

    match cli.command {
        Commands::Health => {
            let healthy = client.health().await?;
            if healthy {
                println!("✓ API is healthy");
            } else {
                println!("✗ API is not healthy");
                std::process::exit(1);
            }
        }

        Commands::Product { action } => match action {
            ProductCommands::Create {
                code,
                name,
                price,
                available,
            } => {
                let req = CreateProductRequest {
                    code: Some(code),
                    name: Some(name),
                    price_eur: Some(price),
                    available: Some(available),
                };
                let product = client.create_product(&req).await?;
                println!("{}", serde_json::to_string_pretty(&product)?);
            }
            ProductCommands::Get { code } => {
                let product = client.get_product(&code).await?;
                println!("{}", serde_json::to_string_pretty(&product)?);
            }
            ProductCommands::List { page, size, sort } => {
                let page = client
                    .list_products(&ListOptions { page, size, sort })
                    .await?;
                println!("{}", serde_json::to_string_pretty(&page)?);
            }
        },

        Commands::Rate {
            currency,
            date,
            url_template,
            timeout_ms,
        } => {
            let date = date.unwrap_or_else(|| chrono::Local::now().date_naive());
            let gateway = HttpRateGateway::new(GatewayConfig {
                url_template,
                timeout: Duration::from_millis(timeout_ms),
                ..GatewayConfig::default()
            })?;

            let key = RateKey::new(currency, date);
            println!("GET {}", gateway.request_url(key));
            let rate = gateway.fetch_rate(key).await?;
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "currency": currency.code(),
                    "date": date.to_string(),
                    "rate": rate.to_string(),
                }))?
            );
        }
    }

    Ok(())
}
