//! Provenance of generated files
//!
//! Generated test files carry a header naming the trace they came from, a
//! short fingerprint of its content and the generation time. The output
//! directory also gets a `.utsynth_meta.yaml` record listing what was
//! written, so a later run (or a reviewer) can tell whether the suite is
//! stale with respect to the trace.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;

/// File name of the record kept in the output directory
pub const META_FILE_NAME: &str = ".utsynth_meta.yaml";

/// Short `sha256:` fingerprint of some content
pub fn fingerprint(content: &[u8]) -> String {
    let hash = Sha256::digest(content);
    format!("sha256:{}", hex::encode(&hash[..8]))
}

/// Where a generated file came from
#[derive(Debug, Clone, PartialEq)]
pub struct Provenance {
    /// Trace file name
    pub source: String,
    /// `Type.Method` of the unit under test
    pub target: String,
    pub fingerprint: String,
    pub generated_at: DateTime<Utc>,
}

impl Provenance {
    pub fn new(source: impl Into<String>, target: impl Into<String>, trace_content: &[u8]) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            fingerprint: fingerprint(trace_content),
            generated_at: Utc::now(),
        }
    }

    /// Comment lines without the comment marker
    pub fn header_lines(&self) -> Vec<String> {
        vec![
            format!("GENERATED FROM: {} ({})", self.source, self.target),
            format!("TRACE HASH: {}", self.fingerprint),
            format!("GENERATED: {}", self.generated_at.to_rfc3339()),
            "DO NOT EDIT - regenerate from the trace".to_string(),
        ]
    }
}

/// Record of one generation run
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GenerationRecord {
    /// `Type.Method` of the unit under test
    pub target: String,

    /// Fingerprint of the trace file content
    pub trace_hash: String,

    /// Names of the generated boundary cases, in suite order
    #[serde(default)]
    pub cases: Vec<String>,

    /// Generated files relative to the output directory
    #[serde(default)]
    pub generated_files: Vec<String>,

    #[serde(with = "chrono::serde::ts_seconds")]
    #[schemars(with = "i64")]
    pub generated_at: DateTime<Utc>,

    /// utsynth version that generated this
    pub tool_version: String,
}

impl GenerationRecord {
    pub fn new(provenance: &Provenance) -> Self {
        Self {
            target: provenance.target.clone(),
            trace_hash: provenance.fingerprint.clone(),
            cases: Vec::new(),
            generated_files: Vec::new(),
            generated_at: provenance.generated_at,
            tool_version: crate::VERSION.to_string(),
        }
    }

    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let path = dir.join(META_FILE_NAME);
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path)?;
        let record = serde_norway::from_str(&content)
            .map_err(|e| Error::Other(format!("Failed to parse {}: {}", META_FILE_NAME, e)))?;
        Ok(Some(record))
    }

    pub fn save_to_dir(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)?;
        let mut content = String::from(
            "# AUTO-GENERATED - DO NOT EDIT\n\
             # Records the trace each generated suite was built from\n\n",
        );
        content.push_str(&serde_norway::to_string(self)?);
        std::fs::write(dir.join(META_FILE_NAME), content)?;
        Ok(())
    }

    /// Whether `trace_content` differs from the trace this record was built from
    pub fn is_stale(&self, trace_content: &[u8]) -> bool {
        self.trace_hash != fingerprint(trace_content)
    }

    pub fn track_file(&mut self, name: &str) {
        if !self.generated_files.iter().any(|f| f == name) {
            self.generated_files.push(name.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_fingerprint_shape() {
        let fp = fingerprint(b"[]");
        assert!(fp.starts_with("sha256:"));
        assert_eq!(fp.len(), "sha256:".len() + 16);
        assert_ne!(fp, fingerprint(b"[ ]"));
    }

    #[test]
    fn test_record_round_trip() {
        let dir = TempDir::new().unwrap();
        assert!(GenerationRecord::load_from_dir(dir.path()).unwrap().is_none());

        let provenance = Provenance::new("funcIORec.json", "Calculator.Add", b"[1]");
        let mut record = GenerationRecord::new(&provenance);
        record.cases.push("NegativeInput".into());
        record.track_file("CalculatorTests.cs");
        record.track_file("CalculatorTests.cs");
        record.save_to_dir(dir.path()).unwrap();

        let loaded = GenerationRecord::load_from_dir(dir.path()).unwrap().unwrap();
        assert_eq!(loaded.generated_files, vec!["CalculatorTests.cs".to_string()]);
        assert_eq!(loaded.cases, vec!["NegativeInput".to_string()]);
        assert!(!loaded.is_stale(b"[1]"));
        assert!(loaded.is_stale(b"[2]"));
    }

    #[test]
    fn test_header_lines() {
        let provenance = Provenance::new("funcIORec.json", "Calculator.Add", b"[]");
        let lines = provenance.header_lines();
        assert_eq!(lines[0], "GENERATED FROM: funcIORec.json (Calculator.Add)");
        assert!(lines[1].starts_with("TRACE HASH: sha256:"));
    }
}
