use anyhow::Result;
use clap::Parser;
use colored::*;

mod api_client;
mod auth;
mod live_client;
mod output;
mod scenarios;

use api_client::ApiClient;
use auth::{login, UserCredentials};
use live_client::Connection;
use output::print_test_summary;

#[derive(Parser)]
#[command(name = "realtime-test-client")]
#[command(about = "Events Channel Integration Testing Tool")]
struct Cli {
    /// Base URL of the backend (e.g., http://localhost:4000)
    #[arg(long)]
    base_url: String,

    /// User 1 credentials (format: email:password)
    #[arg(long)]
    user1: String,

    /// User 2 credentials (format: email:password)
    #[arg(long)]
    user2: String,

    /// Conversation both users participate in (required for the message scenario)
    #[arg(long)]
    conversation_id: Option<String>,

    /// Test scenario to run
    #[arg(long, value_enum)]
    scenario: ScenarioChoice,

    /// Enable verbose output
    #[arg(long, short)]
    verbose: bool,
}

#[derive(clap::ValueEnum, Clone)]
enum ScenarioChoice {
    /// Test basic events connectivity without creating any data
    ConnectionTest,
    /// Test the connection-established timezone handshake
    TimezoneTest,
    /// Test message-sent/message-received delivery (requires a shared conversation)
    MessageRoundtrip,
    /// Test reminder-shared delivery
    ReminderShared,
    /// Run all tests including those requiring conversation data
    All,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
    }

    println!("{}", "=== SETUP PHASE ===".bright_white().bold());

    // Parse credentials
    let user1_creds = UserCredentials::parse(&cli.user1)?;
    let user2_creds = UserCredentials::parse(&cli.user2)?;

    // Authenticate users
    println!("{} Authenticating users...", "→".blue());
    let client = reqwest::Client::new();
    let user1 = login(&client, &cli.base_url, &user1_creds).await?;
    let user2 = login(&client, &cli.base_url, &user2_creds).await?;

    println!(
        "{} User 1 authenticated (ID: {})",
        "✓".green(),
        user1.user_id
    );
    println!(
        "{} User 2 authenticated (ID: {})",
        "✓".green(),
        user2.user_id
    );

    let api_client = ApiClient::new(client.clone(), cli.base_url.clone());

    // Establish events connections
    println!("\n{} Establishing events connections...", "→".blue());
    let mut conn1 =
        Connection::establish(&cli.base_url, &user1.token, "User 1 (Agent)".to_string()).await?;

    let mut conn2 = Connection::establish(
        &cli.base_url,
        &user2.token,
        "User 2 (Teammate)".to_string(),
    )
    .await?;

    println!("{} User 1 events connection established", "✓".green());
    println!("{} User 2 events connection established", "✓".green());

    // Run test scenarios
    println!("\n{}", "=== TEST PHASE ===".bright_white().bold());

    let mut results = Vec::new();

    match cli.scenario {
        ScenarioChoice::ConnectionTest => {
            results.push(scenarios::test_connection(&user1, &user2, &mut conn1, &mut conn2).await?);
        }
        ScenarioChoice::TimezoneTest => {
            results.push(scenarios::test_timezone_handshake(&user1, &mut conn1).await?);
        }
        ScenarioChoice::MessageRoundtrip => {
            let conversation_id = cli
                .conversation_id
                .as_deref()
                .expect("--conversation-id is required for MessageRoundtrip");
            results.push(
                scenarios::test_message_roundtrip(
                    &user1,
                    &user2,
                    conversation_id,
                    &api_client,
                    &mut conn1,
                    &mut conn2,
                )
                .await?,
            );
        }
        ScenarioChoice::ReminderShared => {
            results.push(
                scenarios::test_reminder_shared(&user1, &user2, &api_client, &mut conn1, &mut conn2)
                    .await?,
            );
        }
        ScenarioChoice::All => {
            results.push(scenarios::test_connection(&user1, &user2, &mut conn1, &mut conn2).await?);
            results.push(scenarios::test_timezone_handshake(&user1, &mut conn1).await?);
            results.push(
                scenarios::test_reminder_shared(&user1, &user2, &api_client, &mut conn1, &mut conn2)
                    .await?,
            );
            let conversation_id = cli
                .conversation_id
                .as_deref()
                .expect("--conversation-id is required for the All scenarios");
            results.push(
                scenarios::test_message_roundtrip(
                    &user1,
                    &user2,
                    conversation_id,
                    &api_client,
                    &mut conn1,
                    &mut conn2,
                )
                .await?,
            );
        }
    }

    // Tear the channels down before reporting
    conn1.disconnect();
    conn2.disconnect();

    // Print summary
    println!("\n{}", "=== RESULTS ===".bright_white().bold());
    print_test_summary(&results);

    let all_passed = results.iter().all(|r| r.passed);

    if all_passed {
        println!("\n{}", "All tests passed! ✓".bright_green().bold());
    } else {
        println!("\n{}", "Some tests failed! ✗".bright_red().bold());
    }

    std::process::exit(if all_passed { 0 } else { 1 });
}
