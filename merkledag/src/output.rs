//! Text and JSON rendering of command results.
//!
//! In JSON mode every result is wrapped in an [`Envelope`] carrying the
//! success flag and result code next to the command's own fields.

use anyhow::Result;
use merkledag_core::{Hash, Link};
use serde::{Serialize, Serializer};
use std::io::{self, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Text,
    Json,
}

pub struct OutputWriter {
    format: Format,
}

impl OutputWriter {
    pub fn new(json: bool) -> Self {
        let format = if json { Format::Json } else { Format::Text };
        Self { format }
    }

    /// Print `report` as an enveloped JSON object, or the text from `render`.
    ///
    /// `render` only runs in text mode.
    pub fn emit<T: Serialize>(&self, report: &T, render: impl FnOnce() -> String) -> Result<()> {
        let mut out = io::stdout().lock();
        if self.format == Format::Json {
            let envelope = Envelope {
                success: true,
                result_code: 0,
                report,
            };
            serde_json::to_writer_pretty(&mut out, &envelope)?;
            out.write_all(b"\n")?;
        } else {
            out.write_all(render().as_bytes())?;
        }
        out.flush()?;
        Ok(())
    }

    /// Report a failed command on stderr.
    pub fn emit_error(&self, error: &anyhow::Error, result_code: u8) {
        let message = format!("{:#}", error);
        let mut err = io::stderr().lock();
        if self.format == Format::Json {
            let envelope = Envelope {
                success: false,
                result_code,
                report: &ErrorReport { error: message },
            };
            if let Ok(json) = serde_json::to_string_pretty(&envelope) {
                let _ = writeln!(err, "{}", json);
            }
        } else {
            let _ = writeln!(err, "Error: {}", message);
        }
    }
}

#[derive(Serialize)]
struct Envelope<'a, T: Serialize> {
    success: bool,
    result_code: u8,
    #[serde(flatten)]
    report: &'a T,
}

#[derive(Serialize)]
struct ErrorReport {
    error: String,
}

#[derive(Debug, Serialize)]
pub struct InitReport {
    pub root: String,
    pub algorithm: String,
}

#[derive(Debug, Serialize)]
pub struct AddReport {
    pub roots: Vec<AddedRoot>,
}

/// Hashes in command output are hex strings, matching what the CLI accepts.
fn as_hex<S: Serializer>(hash: &Hash, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&hash.to_hex())
}

#[derive(Debug, Serialize)]
pub struct AddedRoot {
    #[serde(serialize_with = "as_hex")]
    pub hash: Hash,
    pub path: String,
}

/// Links of one object, as listed by `ls`.
#[derive(Debug, Serialize)]
pub struct LsReport {
    #[serde(serialize_with = "as_hex")]
    pub hash: Hash,
    pub kind: &'static str,
    pub links: Vec<LinkEntry>,
}

#[derive(Debug, Serialize)]
pub struct LinkEntry {
    pub name: String,
    #[serde(serialize_with = "as_hex")]
    pub hash: Hash,
    pub size: u64,
}

impl From<Link> for LinkEntry {
    fn from(link: Link) -> Self {
        Self {
            name: link.name,
            hash: link.hash,
            size: link.size,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StatReport {
    #[serde(serialize_with = "as_hex")]
    pub hash: Hash,
    pub kind: &'static str,
    pub links: usize,
    /// Content bytes: blob data length, or the sum of link sizes.
    pub size: u64,
    pub encoded_size: u64,
    pub location: String,
}

#[derive(Debug, Serialize)]
pub struct MaterializeReport {
    #[serde(serialize_with = "as_hex")]
    pub hash: Hash,
    pub destination: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_flattens_report() {
        let report = InitReport {
            root: "/tmp/store".to_string(),
            algorithm: "blake3-256".to_string(),
        };
        let envelope = Envelope {
            success: true,
            result_code: 0,
            report: &report,
        };
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["result_code"], 0);
        assert_eq!(value["algorithm"], "blake3-256");
    }

    #[test]
    fn test_ls_report_links() {
        let hash = merkledag_core::Algorithm::Blake3.digest(b"c");
        let report = LsReport {
            hash,
            kind: "tree",
            links: vec![Link::new("c.txt", hash, 15).into()],
        };
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["hash"], hash.to_hex());
        assert_eq!(value["links"][0]["name"], "c.txt");
        assert_eq!(value["links"][0]["size"], 15);
        assert_eq!(value["links"][0]["hash"], hash.to_hex());
    }
}
