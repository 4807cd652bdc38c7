//! CrudStack Compile - inspect the requests a descriptor set produces.
//!
//! Loads a JSON descriptor set, registers every operation in it (failing on
//! the first invalid declaration), then compiles one call and prints the
//! resulting storage request as JSON on stdout.
//!
//! # Usage
//!
//! ```text
//! crudstack-compile books.json                      # list operations
//! crudstack-compile books.json deleteBook :author=Tolkien :id=7
//! ```
//!
//! Argument values are parsed as JSON and fall back to plain strings, so
//! `:id=7` binds a number and `:author=Tolkien` binds a string.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `CRUDSTACK_TABLE_PREFIX` | *(empty)* | Prepended to every table name |
//! | `CRUDSTACK_CONSISTENT_READ` | `false` | Request strongly consistent reads |
//! | `LOG_LEVEL` | `warn` | Log level filter |
//! | `CRUDSTACK_MAX_PAGES` | *(unset)* | Most pages a non-paging read may drain |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |

use std::collections::HashMap;
use std::io::Write;

use anyhow::{Context, Result, bail};
use serde_json::Value;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crudstack_core::{ArgValue, Compiler, CrudConfig, DescriptorSet};

const USAGE: &str = "usage: crudstack-compile <descriptors.json> [operation [name=value ...]]";

fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

fn log_level() -> String {
    std::env::var("LOG_LEVEL").unwrap_or_else(|_| "warn".to_string())
}

/// Split `name=value` pairs into named arguments.
fn parse_arguments(pairs: &[String]) -> Result<HashMap<String, ArgValue>> {
    pairs
        .iter()
        .map(|pair| {
            let (name, raw) = pair
                .split_once('=')
                .with_context(|| format!("expected name=value, got {pair:?}"))?;
            let value = serde_json::from_str::<Value>(raw)
                .unwrap_or_else(|_| Value::String(raw.to_owned()));
            Ok((name.to_owned(), ArgValue::from(value)))
        })
        .collect()
}

fn main() -> Result<()> {
    init_tracing(&log_level())?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(path) = args.first() else {
        bail!(USAGE);
    };

    let set = DescriptorSet::from_path(path)?;
    let compiler = Compiler::builder()
        .config(CrudConfig::from_env())
        .descriptor_set(set)
        .build()
        .with_context(|| format!("failed to register operations from {path}"))?;
    info!(
        operations = compiler.operation_names().len(),
        "registered descriptor set"
    );

    let mut stdout = std::io::stdout().lock();
    let Some(operation) = args.get(1) else {
        for name in compiler.operation_names() {
            writeln!(stdout, "{name}")?;
        }
        return Ok(());
    };

    let arguments = parse_arguments(&args[2..])?;
    let request = compiler
        .compile_named(operation, arguments)
        .with_context(|| format!("failed to compile {operation}"))?;
    serde_json::to_writer_pretty(&mut stdout, &request)?;
    writeln!(stdout)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_parse_json_and_fall_back_to_strings() {
        let parsed = parse_arguments(&["id=7".to_owned(), "author=Tolkien".to_owned()]).unwrap();
        assert_eq!(parsed["id"], ArgValue::from(serde_json::json!(7)));
        assert_eq!(parsed["author"], ArgValue::from("Tolkien"));
    }

    #[test]
    fn test_should_reject_pairs_without_equals() {
        assert!(parse_arguments(&["id".to_owned()]).is_err());
    }
}
