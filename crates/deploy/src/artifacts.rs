//! Compiled contract artifacts.
//!
//! Reads creation bytecode from Hardhat (`artifacts/contracts/X.sol/X.json`, `bytecode`
//! is a hex string) and Foundry (`out/X.sol/X.json`, `bytecode.object`) build outputs.

use std::path::{Path, PathBuf};

use alloy_core::primitives::Bytes;
use anyhow::{Context, Result};
use serde::Deserialize;

/// Directories that never contain deployable artifacts.
const SKIPPED_DIRS: &[&str] = &["build-info", "cache"];

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BytecodeField {
    Hex(String),
    Object { object: String },
}

impl BytecodeField {
    fn as_hex(&self) -> &str {
        match self {
            Self::Hex(hex) => hex,
            Self::Object { object } => object,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ArtifactFile {
    bytecode: BytecodeField,
}

/// Lookup of compiled artifacts below a root directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Locate the artifact file of contract `name`.
    ///
    /// Tries `<root>/<name>.json`, then `<root>/**/<name>.sol/<name>.json` in the usual
    /// compiler layouts, then any `<name>.json` below the root.
    pub fn find(&self, name: &str) -> Result<PathBuf> {
        let file_name = format!("{name}.json");
        let source_dir = format!("{name}.sol");

        let candidates = [
            self.root.join(&file_name),
            self.root.join(&source_dir).join(&file_name),
            self.root.join("contracts").join(&source_dir).join(&file_name),
            self.root
                .join("contracts")
                .join("test")
                .join(&source_dir)
                .join(&file_name),
        ];

        if let Some(path) = candidates.into_iter().find(|p| p.is_file()) {
            return Ok(path);
        }

        find_recursive(&self.root, &file_name)?.with_context(|| {
            format!(
                "Artifact {} not found under {}",
                name,
                self.root.display()
            )
        })
    }

    /// Read the creation bytecode of contract `name`.
    pub fn bytecode(&self, name: &str) -> Result<Bytes> {
        let path = self.find(name)?;
        let content = std::fs::read_to_string(&path)
            .context(format!("Failed to read artifact {}", path.display()))?;
        let artifact: ArtifactFile = serde_json::from_str(&content)
            .context(format!("Failed to parse artifact {}", path.display()))?;

        let hex_code = artifact.bytecode.as_hex().trim_start_matches("0x");
        if hex_code.is_empty() {
            anyhow::bail!(
                "Artifact {} has no bytecode (abstract contract or interface?)",
                path.display()
            );
        }
        if hex_code.contains("__") {
            anyhow::bail!(
                "Artifact {} has unlinked library placeholders",
                path.display()
            );
        }

        let code = hex::decode(hex_code)
            .context(format!("Invalid bytecode hex in {}", path.display()))?;

        tracing::debug!(
            artifact = %name,
            path = %path.display(),
            size = code.len(),
            "Loaded artifact"
        );
        Ok(code.into())
    }
}

fn find_recursive(dir: &Path, file_name: &str) -> Result<Option<PathBuf>> {
    if !dir.is_dir() {
        return Ok(None);
    }

    let mut entries = std::fs::read_dir(dir)
        .context(format!("Failed to read directory {}", dir.display()))?
        .collect::<Result<Vec<_>, _>>()
        .context(format!("Failed to read directory {}", dir.display()))?;
    entries.sort_by_key(|entry| entry.file_name());

    for entry in entries {
        let path = entry.path();
        if path.is_dir() {
            let skipped = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| SKIPPED_DIRS.contains(&n));
            if skipped {
                continue;
            }
            if let Some(found) = find_recursive(&path, file_name)? {
                return Ok(Some(found));
            }
        } else if path.file_name().and_then(|n| n.to_str()) == Some(file_name) {
            return Ok(Some(path));
        }
    }

    Ok(None)
}
