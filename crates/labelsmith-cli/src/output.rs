//! Terminal formatting for human-readable output

use std::fmt::Display;

use colored::Colorize;

/// Heading above a block of fields
pub(crate) fn section(title: &str) {
    println!("{}", title.to_uppercase().cyan().bold());
}

/// One indented `name: value` line
pub(crate) fn kv(name: &str, value: impl Display) {
    println!("  {:<10} {value}", format!("{name}:").bold());
}

/// Non-fatal notice on stderr
pub(crate) fn warn(msg: &str) {
    eprintln!("{}: {msg}", "warning".yellow().bold());
}

/// Fatal error on stderr
pub(crate) fn error(msg: &str) {
    eprintln!("{}: {msg}", "error".red().bold());
}
