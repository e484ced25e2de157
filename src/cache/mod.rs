//! Per-run cache of source file lines
//!
//! CDD Principle: Infrastructure Layer - Cache avoids re-reading a source file for every violation in it
//! - SourceCache acts as a repository of loaded line arrays keyed by path
//! - A cache lives for one filtering run only, so edited files are never served stale

use crate::domain::violations::{MisraError, MisraResult};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Lines of every source file read during one run
#[derive(Debug, Default)]
pub struct SourceCache {
    files: HashMap<PathBuf, Vec<String>>,
    hits: u64,
    misses: u64,
}

/// Statistics about cache usage
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheStatistics {
    /// Number of distinct files loaded
    pub total_files: usize,
    pub cache_hits: u64,
    pub cache_misses: u64,
    /// Hit rate as a fraction in `0.0..=1.0`
    pub hit_rate: f64,
}

impl CacheStatistics {
    /// Format statistics for display
    pub fn format_display(&self) -> String {
        format!(
            "Source cache: {} files, {:.1}% hit rate ({} hits, {} misses)",
            self.total_files,
            self.hit_rate * 100.0,
            self.cache_hits,
            self.cache_misses
        )
    }
}

impl SourceCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines of `path`, loading the file on first use.
    ///
    /// Bytes that are not valid UTF-8 are replaced rather than rejected; only
    /// the ASCII comment markers matter to callers.
    pub fn lines(&mut self, path: &Path) -> MisraResult<&[String]> {
        if self.files.contains_key(path) {
            self.hits += 1;
        } else {
            self.misses += 1;
            let lines = load_lines(path)?;
            tracing::debug!("Loaded {} lines from {}", lines.len(), path.display());
            self.files.insert(path.to_path_buf(), lines);
        }

        Ok(self.files.get(path).map(Vec::as_slice).unwrap_or_default())
    }

    /// Get cache statistics
    pub fn statistics(&self) -> CacheStatistics {
        let lookups = self.hits + self.misses;
        CacheStatistics {
            total_files: self.files.len(),
            cache_hits: self.hits,
            cache_misses: self.misses,
            hit_rate: if lookups > 0 { self.hits as f64 / lookups as f64 } else { 0.0 },
        }
    }
}

fn load_lines(path: &Path) -> MisraResult<Vec<String>> {
    let bytes = fs::read(path).map_err(|source| MisraError::SourceFileRead {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(String::from_utf8_lossy(&bytes).lines().map(str::to_owned).collect())
}
