//! # File Management Module
//!
//! Questo modulo gestisce la discovery dei file immagine e le utilità sulle
//! dimensioni.
//!
//! ## Responsabilità:
//! - Listing non-ricorsivo dei file direttamente dentro la input directory
//! - Determinazione dei formati supportati (estensione case-insensitive)
//! - Somma delle dimensioni per il log di pre-run
//! - Formattazione human-readable delle dimensioni (unità binarie)
//!
//! ## Formati supportati in input:
//! JPEG, JPG, PNG, WebP, AVIF

use crate::error::OptimizeError;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Extensions eligible for the batch input set
pub const SUPPORTED_INPUT_EXT: &[&str] = &["jpeg", "jpg", "png", "webp", "avif"];

/// Manages image file discovery and size utilities
pub struct FileManager;

impl FileManager {
    /// Check if a file has a supported image extension
    pub fn is_supported_format(path: &Path) -> bool {
        path.extension()
            .map(|ext| {
                let ext_lower = ext.to_string_lossy().to_lowercase();
                SUPPORTED_INPUT_EXT.contains(&ext_lower.as_str())
            })
            .unwrap_or(false)
    }

    /// List eligible files directly inside `input_dir` (non-recursive) and
    /// the sum of their sizes. The list is sorted by file name so a batch
    /// always dispatches the same input set for the same directory.
    pub fn analyze_folder(input_dir: &Path) -> Result<(Vec<PathBuf>, u64), OptimizeError> {
        let mut files = Vec::new();
        let mut total_size = 0u64;

        for entry in WalkDir::new(input_dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let path = entry.path();
            if Self::is_supported_format(path) {
                total_size += entry.metadata().map(|m| m.len()).unwrap_or(0);
                files.push(path.to_path_buf());
            }
        }

        files.sort();
        Ok((files, total_size))
    }

    /// Get human-readable file size in binary units. `0` maps to `"0 B"`,
    /// anything below 1 KB stays a whole number of bytes, larger values are
    /// shown with two decimals in the largest fitting unit.
    pub fn format_size(size: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB"];
        let mut size = size as f64;
        let mut unit_index = 0;

        while size >= 1024.0 && unit_index < UNITS.len() - 1 {
            size /= 1024.0;
            unit_index += 1;
        }

        if unit_index == 0 {
            format!("{} {}", size as u64, UNITS[unit_index])
        } else {
            format!("{:.2} {}", size, UNITS[unit_index])
        }
    }
}
