// Interactive entry point for the library chat assistant

use std::io::Write;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use library_chat::inspect::{inspect_catalog, relationships, KeyHint, TableStatus};
use library_chat::{
    is_quit_command, CatalogStore, Config, LanguageModel, LibraryChatBot, SupabaseStore, Turn,
};

#[derive(Parser)]
#[command(name = "library-chat")]
#[command(about = "Ask questions about the library catalog in plain English")]
struct Cli {
    /// Hide intent, search terms and query diagnostics
    #[arg(long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive session (default)
    Chat,

    /// Answer a single question and exit
    Ask {
        question: String,
        /// Print the whole turn as JSON
        #[arg(long)]
        json: bool,
    },

    /// Sample the catalog tables and report their columns
    Inspect {
        /// Rows sampled per table
        #[arg(long, default_value_t = 5)]
        limit: u32,
    },
}

const EXAMPLES: [(&str, &str); 6] = [
    ("Book searches", "Find books by J.K. Rowling"),
    ("Member info", "Show details for john@email.com"),
    ("Loans", "Who borrowed Harry Potter?"),
    ("Availability", "Is The C Programming Language available?"),
    ("Fines", "Show overdue books"),
    ("Reservations", "Show pending reservations"),
];

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so they never interleave with answers
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,library_chat=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!(model = %config.gemini_model, limit = config.result_limit, "Configuration loaded");

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Chat => {
            let bot = LibraryChatBot::from_config(&config);
            run_chat(&bot, cli.quiet).await?;
        }
        Commands::Ask { question, json } => {
            let bot = LibraryChatBot::from_config(&config);
            let turn = bot.handle(&question).await;
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&turn).context("Failed to serialize turn")?
                );
            } else {
                print_turn(&turn, cli.quiet);
            }
        }
        Commands::Inspect { limit } => {
            run_inspect(&SupabaseStore::from_config(&config), limit).await;
        }
    }

    Ok(())
}

async fn run_chat<S, M>(bot: &LibraryChatBot<S, M>, quiet: bool) -> Result<()>
where
    S: CatalogStore,
    M: LanguageModel,
{
    print_banner();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{} ", "Ask me anything about the library:".bright_white().bold());
        std::io::stdout().flush().context("Failed to flush stdout")?;

        let Some(line) = lines.next_line().await.context("Failed to read input")? else {
            println!();
            break;
        };

        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if is_quit_command(input) {
            break;
        }

        println!("{}", "Looking that up...".dimmed());
        let turn = bot.handle(input).await;
        print_turn(&turn, quiet);
        println!("{}", "-".repeat(70).dimmed());
    }

    println!("{}", "Thanks for using the library assistant. Goodbye!".bright_blue());
    Ok(())
}

fn print_banner() {
    let rule = "=".repeat(70);
    println!("{}", rule.bright_cyan());
    println!("{}", "  LIBRARY CATALOG ASSISTANT".bright_cyan().bold());
    println!("{}", rule.bright_cyan());
    println!("I can help with:");
    for (topic, example) in EXAMPLES {
        println!("  {} {}", format!("{topic}:").bright_green(), format!("'{example}'").dimmed());
    }
    println!();
    println!("Type {} to exit.", "'quit'".yellow());
    println!();
}

fn print_turn(turn: &Turn, quiet: bool) {
    if !quiet {
        println!("{} {}", "Intent:".cyan(), turn.intent);
        println!("{} {}", "Search terms:".cyan(), turn.terms);
        if let Some(plan) = &turn.plan {
            println!("{} {}", "Query:".cyan(), plan.to_sql());
            if turn.lookup_failed {
                println!("{}", "Catalog lookup failed".yellow());
            } else {
                println!("{} {}", "Rows:".cyan(), turn.row_count);
            }
        }
    }
    println!();
    println!("{} {}", "Library Assistant:".bright_green().bold(), turn.answer);
    println!();
}

async fn run_inspect(store: &SupabaseStore, limit: u32) {
    println!("{}", "CATALOG INSPECTION".bright_cyan().bold());
    println!("{} {}", "Endpoint:".cyan(), store.client().base_url());

    let reports = inspect_catalog(store, limit).await;

    for report in &reports {
        println!();
        println!("{}", report.table.as_str().to_uppercase().bright_white().bold());
        match &report.status {
            TableStatus::Present { sampled, columns } => {
                println!("  {} sample rows, {} columns", sampled, columns.len());
                for (i, column) in columns.iter().enumerate() {
                    let key = match &column.key {
                        Some(KeyHint::Primary) => " [PRIMARY KEY]".yellow().to_string(),
                        Some(KeyHint::Foreign(_)) => " [FOREIGN KEY]".yellow().to_string(),
                        None => String::new(),
                    };
                    println!(
                        "  {:2}. {:20} | {:8} | {:40}{}",
                        i + 1,
                        column.name,
                        column.kind.as_str(),
                        column.sample,
                        key
                    );
                }
            }
            TableStatus::Empty => println!("  {}", "No rows".yellow()),
            TableStatus::Missing => println!("  {}", "Table does not exist".red()),
            TableStatus::Unavailable { reason } => {
                println!("  {} {}", "Sampling failed:".red(), reason)
            }
        }
    }

    let edges = relationships(&reports);
    println!();
    println!("{}", "RELATIONSHIPS".bright_cyan().bold());
    if edges.is_empty() {
        println!("  none detected");
    }
    for (from, column, to) in &edges {
        println!("  {from}.{column} -> {to}.{column}");
    }

    let present = reports
        .iter()
        .filter(|r| matches!(r.status, TableStatus::Present { .. }))
        .count();
    println!();
    println!(
        "{} {} of {} tables have data, {} relationships",
        "Summary:".cyan(),
        present,
        reports.len(),
        edges.len()
    );
}
