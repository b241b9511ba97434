//! Result formatting
//!
//! Text output is one hostname per line; JSON output is JSON lines carrying
//! attribution (`host`, `source`, `timestamp`, `ips` when verified).

use crate::config::OutputFormat;
use crate::engine::AttributedHost;
use crate::error::Result;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Output formatter
pub trait Formatter: Send + Sync {
    /// Write `hosts` to `writer`
    fn format(&self, hosts: &[AttributedHost], writer: &mut dyn Write) -> Result<()>;
}

/// One hostname per line
#[derive(Debug, Clone, Copy, Default)]
pub struct TextFormatter {
    sorted: bool,
}

impl TextFormatter {
    /// Create a text formatter, optionally sorting by hostname
    pub fn new(sorted: bool) -> Self {
        Self { sorted }
    }
}

impl Formatter for TextFormatter {
    fn format(&self, hosts: &[AttributedHost], writer: &mut dyn Write) -> Result<()> {
        for host in ordered(hosts, self.sorted) {
            writeln!(writer, "{}", host.host)?;
        }
        Ok(())
    }
}

/// JSON lines
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormatter {
    sorted: bool,
}

impl JsonFormatter {
    /// Create a JSON lines formatter, optionally sorting by hostname
    pub fn new(sorted: bool) -> Self {
        Self { sorted }
    }
}

impl Formatter for JsonFormatter {
    fn format(&self, hosts: &[AttributedHost], writer: &mut dyn Write) -> Result<()> {
        for host in ordered(hosts, self.sorted) {
            serde_json::to_writer(&mut *writer, host)?;
            writer.write_all(b"\n")?;
        }
        Ok(())
    }
}

/// Formatter for the configured output format
pub fn formatter_for(format: OutputFormat, sorted: bool) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Text => Box::new(TextFormatter::new(sorted)),
        OutputFormat::Json => Box::new(JsonFormatter::new(sorted)),
    }
}

/// Write formatted results to `path`, or to stdout when `path` is `None` or `-`
pub fn write_results(
    hosts: &[AttributedHost],
    formatter: &dyn Formatter,
    path: Option<&Path>,
) -> Result<()> {
    match path.filter(|p| p.as_os_str() != "-") {
        Some(path) => {
            let mut writer = BufWriter::new(File::create(path)?);
            formatter.format(hosts, &mut writer)?;
            writer.flush()?;
        }
        None => {
            let stdout = io::stdout();
            let mut writer = stdout.lock();
            formatter.format(hosts, &mut writer)?;
            writer.flush()?;
        }
    }
    Ok(())
}

fn ordered(hosts: &[AttributedHost], sorted: bool) -> Vec<&AttributedHost> {
    let mut refs: Vec<&AttributedHost> = hosts.iter().collect();
    if sorted {
        refs.sort_by(|a, b| a.host.cmp(&b.host));
    }
    refs
}
