//! Gateway CLI
//!
//! Command-line interface for the payment gateway API.

use anyhow::Result;
use clap::{Parser, Subcommand};

use gateway_client::GatewayClient;
use gateway_types::{CreateInvoiceRequest, InvoiceId, InvoiceStatus};

#[derive(Parser)]
#[command(name = "gateway")]
#[command(author, version, about = "Payment gateway API CLI client", long_about = None)]
struct Cli {
    /// Base URL of the gateway API
    #[arg(long, env = "GATEWAY_API_URL", default_value = "http://localhost:3000")]
    api_url: String,

    /// API key for authentication
    #[arg(long, env = "GATEWAY_API_KEY")]
    api_key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Account operations
    Account {
        #[command(subcommand)]
        action: AccountCommands,
    },
    /// Invoice operations
    Invoice {
        #[command(subcommand)]
        action: InvoiceCommands,
    },
    /// Check API health
    Health,
}

#[derive(Subcommand)]
enum AccountCommands {
    /// Register a new account and print its API key
    Create {
        /// Account name
        name: String,
        /// Contact email
        #[arg(long)]
        email: String,
    },
    /// Show the account owning the API key
    Me,
}

#[derive(Subcommand)]
enum InvoiceCommands {
    /// Charge a card
    Create {
        #[arg(long)]
        amount: f64,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "credit_card")]
        payment_type: String,
        #[arg(long)]
        card_number: String,
        #[arg(long, default_value = "")]
        holder_name: String,
        /// Expiration month (1-12)
        #[arg(long)]
        exp_month: u32,
        /// Expiration year (four digits)
        #[arg(long)]
        exp_year: i32,
        #[arg(long)]
        cvv: String,
    },
    /// Get invoice details
    Get {
        /// Invoice ID (UUID)
        id: String,
    },
    /// List invoices for the API key's account
    List,
    /// Approve a pending invoice
    Approve {
        /// Invoice ID (UUID)
        id: String,
    },
    /// Reject a pending invoice
    Reject {
        /// Invoice ID (UUID)
        id: String,
    },
}

fn parse_invoice_id(s: &str) -> Result<InvoiceId> {
    s.parse()
        .map_err(|_| anyhow::anyhow!("Invalid invoice ID: {}", s))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let mut client = GatewayClient::new(&cli.api_url);
    if let Some(key) = cli.api_key {
        client = client.with_api_key(key);
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

        Commands::Account { action } => match action {
            AccountCommands::Create { name, email } => {
                let created = client.create_account(&name, &email).await?;
                print_json(&created)?;
                eprintln!("Store the api_key now; it cannot be shown again.");
            }
            AccountCommands::Me => print_json(&client.me().await?)?,
        },

        Commands::Invoice { action } => match action {
            InvoiceCommands::Create {
                amount,
                description,
                payment_type,
                card_number,
                holder_name,
                exp_month,
                exp_year,
                cvv,
            } => {
                let req = CreateInvoiceRequest {
                    api_key: String::new(),
                    amount,
                    description,
                    payment_type,
                    card_number,
                    holder_name,
                    expiration_month: exp_month,
                    expiration_year: exp_year,
                    cvv,
                };
                print_json(&client.create_invoice(&req).await?)?;
            }
            InvoiceCommands::Get { id } => {
                let invoice_id = parse_invoice_id(&id)?;
                print_json(&client.get_invoice(invoice_id).await?)?;
            }
            InvoiceCommands::List => print_json(&client.list_invoices().await?)?,
            InvoiceCommands::Approve { id } => {
                let invoice_id = parse_invoice_id(&id)?;
                let invoice = client
                    .update_invoice_status(invoice_id, InvoiceStatus::Approved)
                    .await?;
                print_json(&invoice)?;
            }
            InvoiceCommands::Reject { id } => {
                let invoice_id = parse_invoice_id(&id)?;
                let invoice = client
                    .update_invoice_status(invoice_id, InvoiceStatus::Rejected)
                    .await?;
                print_json(&invoice)?;
            }
        },
    }

    Ok(())
}
