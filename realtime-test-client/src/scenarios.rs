use anyhow::Result;
use colored::*;
use events::EventKind;
use std::time::{Duration, Instant};

use crate::api_client::ApiClient;
use crate::auth::AuthenticatedUser;
use crate::live_client::Connection;
use crate::output::{print_event, TestResult};

pub async fn test_connection(
    user1: &AuthenticatedUser,
    user2: &AuthenticatedUser,
    conn1: &mut Connection,
    conn2: &mut Connection,
) -> Result<TestResult> {
    let start = Instant::now();

    println!("\n{}", "=== TEST: Connection Test ===".bright_cyan().bold());
    println!(
        "{}",
        "Testing basic events connectivity without creating any data".bright_white()
    );

    println!(
        "{} User 1 ({}) events connection: established",
        "✓".green(),
        user1.user_id
    );
    println!(
        "{} User 2 ({}) events connection: established",
        "✓".green(),
        user2.user_id
    );

    // Wait a bit to ensure connections are stable
    println!(
        "{} Waiting 2 seconds to verify connections stay alive...",
        "→".blue()
    );
    tokio::time::sleep(Duration::from_secs(2)).await;

    if !conn1.connected() || !conn2.connected() {
        return Ok(TestResult {
            scenario: "connection_test".to_string(),
            passed: false,
            message: Some("A connection dropped during the stability window".to_string()),
            duration: start.elapsed(),
        });
    }

    println!("{} Connections remain stable", "✓".green());

    Ok(TestResult {
        scenario: "connection_test".to_string(),
        passed: true,
        message: Some("Events connections established and maintained successfully".to_string()),
        duration: start.elapsed(),
    })
}

pub async fn test_timezone_handshake(
    _user1: &AuthenticatedUser,
    conn1: &mut Connection,
) -> Result<TestResult> {
    let start = Instant::now();

    println!(
        "\n{}",
        "=== TEST: Timezone Handshake ===".bright_cyan().bold()
    );

    println!(
        "{} Waiting for connection-established envelope...",
        "→".blue()
    );

    match conn1
        .wait_for_event(&EventKind::ConnectionEstablished, Duration::from_secs(5))
        .await
    {
        Ok(envelope) => {
            print_event(&conn1.user_label, &envelope);

            match (envelope.timezone.as_deref(), conn1.timezone()) {
                (Some(sent), Some(cached)) if sent == cached => {
                    println!("{} Display timezone cached: {}", "✓".green(), cached);
                    Ok(TestResult {
                        scenario: "timezone_handshake".to_string(),
                        passed: true,
                        message: None,
                        duration: start.elapsed(),
                    })
                }
                (sent, cached) => {
                    println!("{} Timezone mismatch!", "✗".red());
                    Ok(TestResult {
                        scenario: "timezone_handshake".to_string(),
                        passed: false,
                        message: Some(format!(
                            "Envelope carried {:?}, client cached {:?}",
                            sent, cached
                        )),
                        duration: start.elapsed(),
                    })
                }
            }
        }
        Err(e) => {
            println!("{} Timeout waiting for event: {}", "✗".red(), e);
            Ok(TestResult {
                scenario: "timezone_handshake".to_string(),
                passed: false,
                message: Some(format!("Timeout: {}", e)),
                duration: start.elapsed(),
            })
        }
    }
}

pub async fn test_message_roundtrip(
    user1: &AuthenticatedUser,
    _user2: &AuthenticatedUser,
    conversation_id: &str,
    api_client: &ApiClient,
    conn1: &mut Connection,
    conn2: &mut Connection,
) -> Result<TestResult> {
    let start = Instant::now();

    println!(
        "\n{}",
        "=== TEST: Message Round-Trip ===".bright_cyan().bold()
    );

    println!("{} User 1 sending message...", "→".blue());

    let message = api_client
        .send_message(&user1.token, conversation_id, "Test message - round trip")
        .await?;

    let message_id = message["id"].as_str().unwrap_or_default().to_string();
    println!("{} Message accepted (ID: {})", "✓".green(), message_id);

    println!(
        "{} Waiting for User 1 to receive message-sent event...",
        "→".blue()
    );

    let sent = conn1
        .wait_for_event(&EventKind::MessageSent, Duration::from_secs(5))
        .await;

    println!(
        "{} Waiting for User 2 to receive message-received event...",
        "→".blue()
    );

    match conn2
        .wait_for_event(&EventKind::MessageReceived, Duration::from_secs(5))
        .await
    {
        Ok(envelope) => {
            print_event(&conn2.user_label, &envelope);

            let received_conversation_id = envelope.data["conversation_id"]
                .as_str()
                .unwrap_or_default();

            if received_conversation_id == conversation_id && sent.is_ok() {
                println!("{} Event data verified correctly", "✓".green());
                Ok(TestResult {
                    scenario: "message_roundtrip".to_string(),
                    passed: true,
                    message: None,
                    duration: start.elapsed(),
                })
            } else {
                println!("{} Event data mismatch!", "✗".red());
                Ok(TestResult {
                    scenario: "message_roundtrip".to_string(),
                    passed: false,
                    message: Some(format!(
                        "Expected conversation_id={}, got conversation_id={}; sender event: {}",
                        conversation_id,
                        received_conversation_id,
                        if sent.is_ok() { "received" } else { "missing" }
                    )),
                    duration: start.elapsed(),
                })
            }
        }
        Err(e) => {
            println!("{} Timeout waiting for event: {}", "✗".red(), e);
            Ok(TestResult {
                scenario: "message_roundtrip".to_string(),
                passed: false,
                message: Some(format!("Timeout: {}", e)),
                duration: start.elapsed(),
            })
        }
    }
}

pub async fn test_reminder_shared(
    user1: &AuthenticatedUser,
    user2: &AuthenticatedUser,
    api_client: &ApiClient,
    _conn1: &mut Connection,
    conn2: &mut Connection,
) -> Result<TestResult> {
    let start = Instant::now();

    println!("\n{}", "=== TEST: Reminder Shared ===".bright_cyan().bold());

    println!("{} User 1 sharing reminder with User 2...", "→".blue());

    api_client
        .share_reminder(&user1.token, &user2.user_id, "Test reminder - shared")
        .await?;

    println!(
        "{} Waiting for User 2 to receive reminder-shared event...",
        "→".blue()
    );

    match conn2
        .wait_for_event(&EventKind::ReminderShared, Duration::from_secs(5))
        .await
    {
        Ok(envelope) => {
            print_event(&conn2.user_label, &envelope);

            let received_title = envelope.data["title"].as_str().unwrap_or_default();

            if received_title == "Test reminder - shared" {
                println!("{} Event data verified correctly", "✓".green());
                Ok(TestResult {
                    scenario: "reminder_shared".to_string(),
                    passed: true,
                    message: None,
                    duration: start.elapsed(),
                })
            } else {
                Ok(TestResult {
                    scenario: "reminder_shared".to_string(),
                    passed: false,
                    message: Some(format!("Title mismatch: {}", received_title)),
                    duration: start.elapsed(),
                })
            }
        }
        Err(e) => Ok(TestResult {
            scenario: "reminder_shared".to_string(),
            passed: false,
            message: Some(format!("Timeout: {}", e)),
            duration: start.elapsed(),
        }),
    }
}
