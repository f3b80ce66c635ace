//! # Batch Result Module
//!
//! Questo modulo definisce il risultato per-file prodotto dal worker di
//! ottimizzazione e i totali aggregati consumati dai report writer.
//!
//! ## Invarianti:
//! - Ogni file dispatchato produce esattamente un `OptimizationResult`,
//!   successo o fallimento - nessun drop silenzioso
//! - I risultati sono append-only: creati dal worker, consumati una volta
//!   dai report writer, mai mutati
//! - In caso di errore `optimized_bytes == original_bytes` e
//!   `reduction_pct == 0.0`: un'ottimizzazione fallita è un no-op, non un
//!   file che si è ridotto a zero
//! - L'ordine della lista è l'ordine di completamento, non l'ordine di input

use std::fmt;

/// Outcome of optimizing one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileStatus {
    Ok,
    Error(String),
}

impl FileStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, FileStatus::Ok)
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileStatus::Ok => write!(f, "ok"),
            FileStatus::Error(msg) => write!(f, "error: {msg}"),
        }
    }
}

/// One processed file, success or failure
#[derive(Debug, Clone)]
pub struct OptimizationResult {
    /// Source file base name
    pub filename: String,
    pub status: FileStatus,
    pub original_bytes: u64,
    pub optimized_bytes: u64,
    /// Relative decrease from original to optimized size; negative when the
    /// output grew
    pub reduction_pct: f64,
    /// Written output path, empty on error
    pub output_path: String,
}

impl OptimizationResult {
    /// Successful optimization with computed reduction
    pub fn success(
        filename: String,
        original_bytes: u64,
        optimized_bytes: u64,
        output_path: String,
    ) -> Self {
        Self {
            filename,
            status: FileStatus::Ok,
            original_bytes,
            optimized_bytes,
            reduction_pct: reduction_percent(original_bytes, optimized_bytes),
            output_path,
        }
    }

    /// Failed optimization, accounted as a no-op on the original size
    pub fn failure(filename: String, original_bytes: u64, message: String) -> Self {
        Self {
            filename,
            status: FileStatus::Error(message),
            original_bytes,
            optimized_bytes: original_bytes,
            reduction_pct: 0.0,
            output_path: String::new(),
        }
    }
}

/// Percentage reduction from `original` to `optimized`, `0.0` for empty sources
pub fn reduction_percent(original: u64, optimized: u64) -> f64 {
    if original == 0 {
        0.0
    } else {
        (original as f64 - optimized as f64) / original as f64 * 100.0
    }
}

/// Aggregate totals over one batch
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchTotals {
    pub files: usize,
    pub errors: usize,
    pub total_original: u64,
    pub total_optimized: u64,
}

impl BatchTotals {
    pub fn from_results(results: &[OptimizationResult]) -> Self {
        let mut totals = Self {
            files: results.len(),
            ..Default::default()
        };
        for result in results {
            totals.total_original += result.original_bytes;
            totals.total_optimized += result.optimized_bytes;
            if !result.status.is_ok() {
                totals.errors += 1;
            }
        }
        totals
    }

    /// Bytes saved across the batch; zero when outputs grew overall
    pub fn saved_bytes(&self) -> u64 {
        self.total_original.saturating_sub(self.total_optimized)
    }

    pub fn saved_percent(&self) -> f64 {
        reduction_percent(self.total_original, self.total_optimized)
    }
}
