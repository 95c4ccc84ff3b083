//! Display utilities for the CLI
//!
//! Results go to stdout, diagnostics to stderr.

use apdl_core::{AgreementRecord, Response};
use colored::*;

/// Print a success message
pub fn success(message: &str) {
    println!("{} {}", "✓".bright_green(), message);
}

/// Print an error message with its code
pub fn error(code: &str, message: &str) {
    eprintln!(
        "{} {} {}",
        "✗".bright_red(),
        format!("[{code}]").bright_black(),
        message.bright_red()
    );
}

/// Print a labeled value
pub fn labeled(label: &str, value: &str) {
    println!("  {}: {}", label.bright_white(), value.bright_cyan());
}

/// Print an invocation response. Returns whether it succeeded.
pub fn response(response: &Response) -> bool {
    if response.is_ok() {
        success(&response.payload_str());
    } else {
        error(response.code.unwrap_or("ERROR"), &response.message);
    }
    response.is_ok()
}

/// Print the agreement record as a summary followed by its stored JSON
pub fn record(record: &AgreementRecord, raw: &[u8]) {
    let status = if record.status.is_terminal() {
        format!("{} (final)", record.status)
    } else {
        record.status.to_string()
    };
    labeled("Status", &status);
    labeled(
        "Owner",
        &format!(
            "{} ({}:{})",
            record.owner.public_key, record.owner.ip_address, record.owner.port
        ),
    );
    labeled(
        "User",
        &format!(
            "{} ({}:{})",
            record.user.public_key, record.user.ip_address, record.user.port
        ),
    );
    labeled("Deposit", &record.deposit_amount.to_string());
    labeled("Expiry", &record.expiry.to_rfc3339());
    println!();

    // Pretty-print when the stored bytes are JSON, otherwise echo them
    match serde_json::from_slice::<serde_json::Value>(raw)
        .and_then(|value| serde_json::to_string_pretty(&value))
    {
        Ok(pretty) => println!("{pretty}"),
        Err(_) => println!("{}", String::from_utf8_lossy(raw)),
    }
}
