use crate::manifest::Manifest;
use anyhow::{Context, Result};
use log::{debug, warn};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const MANIFEST_EXTENSIONS: [&str; 3] = ["yaml", "yml", "json"];

/// Manifest scanner for traversing directories.
///
/// The `ManifestScanner` recursively walks a directory to find all YAML and JSON manifests.
/// Hidden directories and `target`/`node_modules` are skipped. A root that is a file is
/// returned as the only manifest.
///
/// # Example
///
/// ```no_run
/// use schema_depict::scanner::ManifestScanner;
/// use std::path::PathBuf;
///
/// let scanner = ManifestScanner::new(PathBuf::from("./events"));
/// let result = scanner.scan().unwrap();
/// println!("Found {} manifests", result.manifest_files.len());
/// ```
pub struct ManifestScanner {
    root_path: PathBuf,
}

/// Result of a directory scan.
pub struct ScanResult {
    /// Manifest paths in a stable (sorted) order
    pub manifest_files: Vec<PathBuf>,
    /// Warning messages for any issues encountered (e.g., inaccessible directories)
    pub warnings: Vec<String>,
}

impl ManifestScanner {
    pub fn new(root_path: PathBuf) -> Self {
        Self { root_path }
    }

    /// Scans the directory tree and collects all manifest files.
    ///
    /// Inaccessible entries are logged and recorded in the result; scanning continues.
    ///
    /// # Errors
    ///
    /// Returns an error if the root path does not exist.
    pub fn scan(&self) -> Result<ScanResult> {
        if !self.root_path.exists() {
            anyhow::bail!("Path does not exist: {}", self.root_path.display());
        }
        if self.root_path.is_file() {
            return Ok(ScanResult {
                manifest_files: vec![self.root_path.clone()],
                warnings: Vec::new(),
            });
        }

        let mut manifest_files = Vec::new();
        let mut warnings = Vec::new();

        for entry in WalkDir::new(&self.root_path)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                if e.path() == self.root_path {
                    return true;
                }
                let file_name = e.file_name().to_string_lossy();
                !file_name.starts_with('.') && file_name != "target" && file_name != "node_modules"
            })
        {
            match entry {
                Ok(entry) => {
                    let path = entry.path();
                    if path.is_file() && is_manifest(path) {
                        debug!("Found manifest: {}", path.display());
                        manifest_files.push(path.to_path_buf());
                    }
                }
                Err(e) => {
                    let warning = format!("Failed to access path: {}", e);
                    warn!("{}", warning);
                    warnings.push(warning);
                }
            }
        }

        Ok(ScanResult {
            manifest_files,
            warnings,
        })
    }

    /// Scans and merges every manifest found under the root.
    ///
    /// When the root is a single file, a parse failure is an error. Inside a directory,
    /// files that fail to parse are skipped with a warning.
    pub fn load(&self) -> Result<Manifest> {
        let result = self.scan()?;
        if self.root_path.is_file() {
            return Manifest::from_path(&self.root_path)
                .with_context(|| format!("Failed to load manifest: {}", self.root_path.display()));
        }
        if result.manifest_files.is_empty() {
            anyhow::bail!("No manifests found under {}", self.root_path.display());
        }

        let mut merged = Manifest::default();
        for path in &result.manifest_files {
            match Manifest::from_path(path) {
                Ok(manifest) => merged.merge(manifest),
                Err(e) => warn!("Skipping {}: {}", path.display(), e),
            }
        }
        Ok(merged)
    }
}

fn is_manifest(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| MANIFEST_EXTENSIONS.contains(&ext))
        .unwrap_or(false)
}
