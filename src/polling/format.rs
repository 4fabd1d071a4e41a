//! Rendering of update records for stdout.

use std::fmt;
use std::io::Write;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::telegram::Update;

/// How each update record is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Two-space indented JSON.
    #[default]
    Pretty,
    /// One compact JSON object per line.
    Jsonl,
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(OutputFormat::Pretty),
            "jsonl" | "compact" => Ok(OutputFormat::Jsonl),
            other => Err(Error::config(format!(
                "unsupported format {:?} (expected pretty or jsonl)",
                other
            ))),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Pretty => f.write_str("pretty"),
            OutputFormat::Jsonl => f.write_str("jsonl"),
        }
    }
}

/// Re-serialize one raw record, newline-terminated.
pub fn format_update(raw: &str, format: OutputFormat) -> Result<Vec<u8>> {
    let value: serde_json::Value =
        serde_json::from_str(raw).map_err(|e| Error::decode("update json", e))?;

    let mut out = match format {
        OutputFormat::Pretty => serde_json::to_vec_pretty(&value),
        OutputFormat::Jsonl => serde_json::to_vec(&value),
    }
    .map_err(|e| Error::decode("re-encode update", e))?;

    out.push(b'\n');
    Ok(out)
}

/// Format and write a sequence of updates, flushing once at the end.
pub fn write_updates<W: Write>(out: &mut W, updates: &[Update], format: OutputFormat) -> Result<()> {
    for update in updates {
        out.write_all(&format_update(&update.raw, format)?)?;
    }
    out.flush()?;
    Ok(())
}

/// Pretty-print a JSON result, falling back to the text as received.
pub fn pretty_json(raw: &str) -> String {
    serde_json::from_str::<serde_json::Value>(raw)
        .ok()
        .and_then(|value| serde_json::to_string_pretty(&value).ok())
        .unwrap_or_else(|| raw.to_string())
}
