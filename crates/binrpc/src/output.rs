use std::io::{IsTerminal, Write};

use binrpc_codec::{Record, StructItem, Value};
use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use serde_json::json;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct CallOutput<'a> {
    method: &'a str,
    records: Vec<serde_json::Value>,
}

/// JSON view of a record. Structs become `[{"key", "value"}]` arrays so that
/// member order and duplicate keys survive.
pub fn record_to_json(record: &Record) -> serde_json::Value {
    match record.value() {
        Value::Integer(v) => json!(v),
        Value::Text(v) => json!(v),
        Value::Fixed(v) => json!(v),
        Value::Aggregate(items) => serde_json::Value::Array(
            items
                .iter()
                .map(|item| json!({ "key": item.key, "value": record_to_json(&item.value) }))
                .collect(),
        ),
    }
}

pub fn print_records(method: &str, records: &[Record], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = CallOutput {
                method,
                records: records.iter().map(record_to_json).collect(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["KEY", "TYPE", "VALUE"]);
            for (index, record) in records.iter().enumerate() {
                for (key, leaf) in flatten(&index.to_string(), record) {
                    table.add_row(vec![key, leaf.type_tag().to_string(), scalar_text(leaf)]);
                }
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            let mut out = String::new();
            for record in records {
                render_pretty(record, 0, &mut out);
            }
            print!("{out}");
        }
        OutputFormat::Raw => {
            let mut out = String::new();
            for record in records {
                render_raw(record, &mut out);
            }
            let mut stdout = std::io::stdout();
            let _ = stdout.write_all(out.as_bytes());
            let _ = stdout.flush();
        }
    }
}

/// Dotted key paths for every scalar leaf, in wire order.
fn flatten<'a>(prefix: &str, record: &'a Record) -> Vec<(String, &'a Record)> {
    match record.value() {
        Value::Aggregate(items) => items
            .iter()
            .flat_map(|item| flatten(&format!("{prefix}.{}", item.key), &item.value))
            .collect(),
        _ => vec![(prefix.to_string(), record)],
    }
}

fn scalar_text(record: &Record) -> String {
    match record.value() {
        Value::Integer(v) => v.to_string(),
        Value::Text(v) => v.clone(),
        Value::Fixed(v) => format!("{v:.3}"),
        Value::Aggregate(items) => format!("<struct {} members>", items.len()),
    }
}

fn render_pretty(record: &Record, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    match record.value() {
        Value::Aggregate(items) => {
            out.push_str(&format!("{indent}{{\n"));
            for StructItem { key, value } in items {
                if let Value::Aggregate(_) = value.value() {
                    out.push_str(&format!("{indent}  {key}:\n"));
                    render_pretty(value, depth + 2, out);
                } else {
                    out.push_str(&format!("{indent}  {key}: {}\n", scalar_text(value)));
                }
            }
            out.push_str(&format!("{indent}}}\n"));
        }
        _ => out.push_str(&format!("{indent}{}\n", scalar_text(record))),
    }
}

fn render_raw(record: &Record, out: &mut String) {
    match record.value() {
        Value::Aggregate(items) => {
            for item in items {
                out.push_str(&format!("{}\t{}\n", item.key, scalar_text(&item.value)));
            }
        }
        _ => {
            out.push_str(&scalar_text(record));
            out.push('\n');
        }
    }
}
