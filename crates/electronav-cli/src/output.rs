use console::style;
use serde::Serialize;
use serde_json::{json, Value};
use std::fmt::Display;
use tabled::{settings::Style, Table, Tabled};

/// Output format mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
}

/// Where a status line goes
#[derive(Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

/// Writes command results either for a terminal or as `{"status", ...}` JSON documents.
///
/// In JSON mode each command is expected to print exactly one document on stdout.
pub struct OutputWriter {
    format: OutputFormat,
}

fn emit(stream: Stream, value: &Value) {
    match stream {
        Stream::Stdout => println!("{:#}", value),
        Stream::Stderr => eprintln!("{:#}", value),
    }
}

impl OutputWriter {
    pub fn new(json: bool) -> Self {
        let format = if json { OutputFormat::Json } else { OutputFormat::Human };
        Self { format }
    }

    fn status(
        &self,
        stream: Stream,
        symbol: console::StyledObject<&str>,
        status: &str,
        message: impl Display,
    ) {
        match (self.format, stream) {
            (OutputFormat::Human, Stream::Stdout) => println!("{} {}", symbol, message),
            (OutputFormat::Human, Stream::Stderr) => eprintln!("{} {}", symbol, message),
            (OutputFormat::Json, _) => emit(
                stream,
                &json!({
                    "status": status,
                    "message": message.to_string(),
                }),
            ),
        }
    }

    pub fn success(&self, message: impl Display) {
        self.status(Stream::Stdout, style("✓").green().bold(), "success", message);
    }

    pub fn info(&self, message: impl Display) {
        self.status(Stream::Stdout, style("ℹ").blue().bold(), "info", message);
    }

    /// Warnings go to stderr in both modes
    pub fn warning(&self, message: impl Display) {
        self.status(Stream::Stderr, style("⚠").yellow().bold(), "warning", message);
    }

    /// Rows as a rounded table, or as the JSON `data` array
    pub fn table<T: Tabled + Serialize>(&self, rows: Vec<T>) -> anyhow::Result<()> {
        if self.is_json() {
            return self.result(rows);
        }
        if rows.is_empty() {
            println!("{}", style("(no data)").dim());
        } else {
            let mut table = Table::new(rows);
            table.with(Style::rounded());
            println!("{}", table);
        }
        Ok(())
    }

    pub fn data<T: Serialize>(&self, data: &T) -> anyhow::Result<()> {
        println!("{}", serde_json::to_string_pretty(data)?);
        Ok(())
    }

    pub fn result<T: Serialize>(&self, data: T) -> anyhow::Result<()> {
        match self.format {
            OutputFormat::Human => self.data(&data),
            OutputFormat::Json => {
                emit(
                    Stream::Stdout,
                    &json!({
                        "status": "success",
                        "data": serde_json::to_value(data)?,
                    }),
                );
                Ok(())
            }
        }
    }

    pub fn kv(&self, key: impl Display, value: impl Display) {
        match self.format {
            OutputFormat::Human => println!("{}: {}", style(key).bold(), value),
            OutputFormat::Json => emit(Stream::Stdout, &json!({ key.to_string(): value.to_string() })),
        }
    }

    pub fn section(&self, title: impl Display) {
        if self.format == OutputFormat::Human {
            println!("\n{}", style(title).bold().underlined());
        }
    }

    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }
}

/// Millimetre point for human output
pub fn fmt_point(p: [f64; 3]) -> String {
    format!("({:.3}, {:.3}, {:.3})", p[0], p[1], p[2])
}
