//! verita-cli — terminal frontend for the Verita fact-check HTTP API
//!
//! # Subcommands
//! - `verify <query> [--requester <id>] [--json]` — synchronous verification
//! - `history [--json]`                           — list past fact-checks
//! - `get <id>`                                   — show one fact-check
//! - `status`                                     — show server health

use clap::{Parser, Subcommand};
use serde::Deserialize;

const DEFAULT_SERVER: &str = "http://127.0.0.1:8790";
const DEFAULT_REQUESTER: &str = "cli";

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Debug, Parser)]
#[command(
    name = "verita-cli",
    version,
    about = "Verita fact-check — terminal frontend for the HTTP API"
)]
struct Cli {
    /// Verita HTTP server URL (overrides VERITA_HTTP_URL env var)
    #[arg(long, env = "VERITA_HTTP_URL", default_value = DEFAULT_SERVER)]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Verify a claim and print the verdict
    Verify {
        /// The claim text to verify
        query: String,

        /// Requester identity recorded with the fact-check
        #[arg(long, default_value = DEFAULT_REQUESTER)]
        requester: String,

        /// Output the raw JSON response
        #[arg(long)]
        json: bool,
    },

    /// List past fact-checks, newest first
    History {
        /// Output the raw JSON response
        #[arg(long)]
        json: bool,
    },

    /// Show one fact-check by id
    Get {
        /// Fact-check record id
        id: String,
    },

    /// Show Verita server status
    Status,
}

// ============================================================================
// API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactCheckRecord {
    pub id: String,
    pub requester_id: String,
    pub query: String,
    pub response: Option<String>,
    pub status: String,
    pub created_at: String,
}

// ============================================================================
// Output formatting
// ============================================================================

/// One-line history entry: status tag, short id, truncated query.
pub fn format_history_line(record: &FactCheckRecord) -> String {
    let id_hex = record.id.replace('-', "");
    let short_id = &id_hex[..8.min(id_hex.len())];
    let query_preview: String = record.query.chars().take(60).collect();
    format!(
        "[{:<9}] #{} {} — {}",
        record.status, short_id, record.created_at, query_preview
    )
}

/// Full record rendering for `get`.
pub fn format_record(record: &FactCheckRecord) -> String {
    let mut out = String::new();
    out.push_str(&format!("Id:        {}\n", record.id));
    out.push_str(&format!("Requester: {}\n", record.requester_id));
    out.push_str(&format!("Status:    {}\n", record.status));
    out.push_str(&format!("Created:   {}\n", record.created_at));
    out.push_str(&format!("Query:     {}\n", record.query));
    match &record.response {
        Some(response) => out.push_str(&format!("Response:  {}\n", response)),
        None => out.push_str("Response:  (pending)\n"),
    }
    out
}

// ============================================================================
// HTTP Client Calls
// ============================================================================

fn http_client(timeout_secs: u64) -> anyhow::Result<reqwest::blocking::Client> {
    Ok(reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()?)
}

fn do_verify(server: &str, requester: &str, query: &str, json_output: bool) -> anyhow::Result<()> {
    let client = http_client(60)?;

    let url = format!("{}/fact-check/verify-external", server);
    let body = serde_json::json!({
        "requesterId": requester,
        "query": query,
    });

    let resp = match client.post(&url).json(&body).send() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("verita-cli: connection failed to {}: {}", url, e);
            std::process::exit(1);
        }
    };

    let status = resp.status();
    let value: serde_json::Value = match resp.json() {
        Ok(v) => v,
        Err(e) => {
            eprintln!("verita-cli: failed to parse response: {}", e);
            std::process::exit(1);
        }
    };

    if !status.is_success() {
        let reason = value["error"].as_str().unwrap_or("unknown error");
        let retryable = value["retryable"].as_bool().unwrap_or(false);
        eprintln!(
            "verita-cli: verification failed (HTTP {}): {}{}",
            status,
            reason,
            if retryable { " (retryable)" } else { "" }
        );
        std::process::exit(1);
    }

    if json_output {
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!("{}", value["result"].as_str().unwrap_or(""));
    }

    Ok(())
}

fn do_history(server: &str, json_output: bool) -> anyhow::Result<()> {
    let client = http_client(15)?;

    let url = format!("{}/fact-check", server);
    let resp = match client.get(&url).send() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("verita-cli: connection failed to {}: {}", url, e);
            std::process::exit(1);
        }
    };

    if !resp.status().is_success() {
        eprintln!("verita-cli: server returned {}", resp.status());
        std::process::exit(1);
    }

    if json_output {
        let value: serde_json::Value = resp.json()?;
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    let records: Vec<FactCheckRecord> = match resp.json() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("verita-cli: failed to parse history: {}", e);
            std::process::exit(1);
        }
    };

    if records.is_empty() {
        eprintln!("No fact-checks recorded yet.");
        return Ok(());
    }

    for record in &records {
        println!("{}", format_history_line(record));
    }

    Ok(())
}

fn do_get(server: &str, id: &str) -> anyhow::Result<()> {
    let client = http_client(15)?;

    let url = format!("{}/fact-check/{}", server, id);
    let resp = match client.get(&url).send() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("verita-cli: connection failed to {}: {}", url, e);
            std::process::exit(1);
        }
    };

    if resp.status().as_u16() == 404 {
        eprintln!("verita-cli: no fact-check with id {}", id);
        std::process::exit(1);
    }
    if !resp.status().is_success() {
        eprintln!("verita-cli: server returned {}", resp.status());
        std::process::exit(1);
    }

    let record: FactCheckRecord = match resp.json() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("verita-cli: failed to parse record: {}", e);
            std::process::exit(1);
        }
    };

    print!("{}", format_record(&record));
    Ok(())
}

fn do_status(server: &str) -> anyhow::Result<()> {
    let client = http_client(10)?;

    let url = format!("{}/health", server);
    match client.get(&url).send() {
        Ok(r) if r.status().is_success() => {
            let body: serde_json::Value = r.json().unwrap_or_default();
            println!("Verita server: {}", body["status"].as_str().unwrap_or("unknown"));
            println!("Version:       {}", body["version"].as_str().unwrap_or("?"));
            println!("Database:      {}", body["database"].as_str().unwrap_or("?"));
        }
        Ok(r) => {
            eprintln!("verita-cli: server unhealthy (HTTP {})", r.status());
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("verita-cli: cannot reach {} — {}", url, e);
            std::process::exit(1);
        }
    }

    Ok(())
}

// ============================================================================
// Main
// ============================================================================

fn main() {
    let cli = Cli::parse();
    let server = cli.server.trim_end_matches('/').to_string();

    let result = match cli.command {
        Commands::Verify {
            query,
            requester,
            json,
        } => do_verify(&server, &requester, &query, json),
        Commands::History { json } => do_history(&server, json),
        Commands::Get { id } => do_get(&server, &id),
        Commands::Status => do_status(&server),
    };

    if let Err(e) = result {
        eprintln!("verita-cli: {}", e);
        std::process::exit(1);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn mock_record(status: &str, response: Option<&str>) -> FactCheckRecord {
        FactCheckRecord {
            id: "7b5c24ab-1234-5678-9abc-def012345678".to_string(),
            requester_id: "u1".to_string(),
            query: "Is the earth flat?".to_string(),
            response: response.map(|s| s.to_string()),
            status: status.to_string(),
            created_at: "2026-08-06T10:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_history_line_contains_status_and_short_id() {
        let line = format_history_line(&mock_record("completed", Some("No.")));
        assert!(line.starts_with("[completed]"));
        assert!(line.contains("#7b5c24ab"));
        assert!(line.contains("Is the earth flat?"));
    }

    #[test]
    fn test_history_line_truncates_long_queries() {
        let mut record = mock_record("pending", None);
        record.query = "Q".repeat(200);
        let line = format_history_line(&record);
        assert!(line.len() < 150, "line too long: {}", line.len());
    }

    #[test]
    fn test_format_record_shows_pending_placeholder() {
        let rendered = format_record(&mock_record("pending", None));
        assert!(rendered.contains("Response:  (pending)"));
        assert!(rendered.contains("Status:    pending"));
    }

    #[test]
    fn test_format_record_shows_response() {
        let rendered = format_record(&mock_record("completed", Some("No, it is round.")));
        assert!(rendered.contains("Response:  No, it is round."));
    }

    #[test]
    fn test_record_deserializes_from_api_shape() {
        let json = serde_json::json!({
            "id": "7b5c24ab-1234-5678-9abc-def012345678",
            "requesterId": "u1",
            "query": "q",
            "response": null,
            "status": "pending",
            "createdAt": "2026-08-06T10:00:00Z",
            "updatedAt": "2026-08-06T10:00:00Z"
        });
        let record: FactCheckRecord = serde_json::from_value(json).unwrap();
        assert_eq!(record.requester_id, "u1");
        assert!(record.response.is_none());
    }
}
