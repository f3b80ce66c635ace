//! # Worker Pool Orchestrator Module
//!
//! Questo modulo orchestra il batch: fan-out delle chiamate al worker di
//! ottimizzazione su un pool limitato di worker, raccolta di tutti i
//! risultati indipendentemente dai fallimenti individuali.
//!
//! ## Gestione concorrenza:
//! - Semaforo per limitare i worker concorrenti (`threads`, default: 4)
//! - Il lavoro CPU-bound del codec gira su `spawn_blocking`
//! - `ImageProcessor` indipendente per ogni task, nessuno stato condiviso
//!   mutabile oltre la `Config` read-only clonata per task
//!
//! ## Garanzie:
//! - **Completezza**: ogni file dispatchato produce esattamente un risultato,
//!   raccolto prima del ritorno (attende tutte le unità outstanding)
//! - **Isolamento**: l'errore di un file non cancella mai gli altri
//! - **Ordine**: i risultati sono in ordine di completamento, non di input
//! - Nessun retry, nessun abort parziale del batch
//!
//! ## Observer:
//! Un callback opzionale viene invocato per ogni unità completata (default:
//! nessuno); la progress bar è pilotata dallo stesso loop di raccolta.

use crate::config::Config;
use crate::image_processor::ImageProcessor;
use crate::progress::ProgressManager;
use crate::result::{BatchTotals, FileStatus, OptimizationResult};
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::info;

/// Callback invoked once per completed unit of work
pub type CompletionObserver<'a> = &'a dyn Fn(&OptimizationResult);

/// Orchestrates the batch across a bounded worker pool
pub struct BatchOptimizer {
    config: Config,
}

impl BatchOptimizer {
    /// Create a new batch optimizer; the configuration must already be
    /// validated against the probed capabilities
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Process every file in the list, returning one result per input file
    /// in completion order.
    pub async fn run(
        &self,
        files: Vec<PathBuf>,
        on_complete: Option<CompletionObserver<'_>>,
    ) -> Result<Vec<OptimizationResult>> {
        if files.is_empty() {
            info!("No image files found to process");
            return Ok(Vec::new());
        }

        let progress = ProgressManager::new(files.len() as u64);
        let semaphore = Arc::new(Semaphore::new(self.config.threads));
        let mut tasks = JoinSet::new();

        for file_path in files {
            let permit = semaphore.clone().acquire_owned().await?;
            let processor = ImageProcessor::new(self.config.clone());

            tasks.spawn(async move {
                let _permit = permit; // Keep permit alive across the blocking call
                tokio::task::spawn_blocking(move || processor.process(&file_path)).await
            });
        }

        let mut results = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            let result = joined??;

            let message = match &result.status {
                FileStatus::Ok => {
                    format!("✅ {}: {:.1}% saved", result.filename, result.reduction_pct)
                }
                FileStatus::Error(_) => format!("❌ {}: error", result.filename),
            };
            progress.update(&message);

            if let Some(observer) = on_complete {
                observer(&result);
            }
            results.push(result);
        }

        let totals = BatchTotals::from_results(&results);
        progress.finish(&format!(
            "Processed: {} files | Errors: {} | Saved: {} ({:.2}%)",
            totals.files,
            totals.errors,
            crate::file_manager::FileManager::format_size(totals.saved_bytes()),
            totals.saved_percent()
        ));

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use std::cell::Cell;
    use std::collections::HashSet;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn write_png(path: &Path, width: u32, height: u32) {
        RgbImage::from_fn(width, height, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 64]))
            .save(path)
            .unwrap();
    }

    fn setup_batch(valid: usize, corrupt: usize) -> (TempDir, Config, Vec<PathBuf>) {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("input");
        let output = temp_dir.path().join("output");
        fs::create_dir_all(&input).unwrap();
        fs::create_dir_all(&output).unwrap();

        let mut files = Vec::new();
        for i in 0..valid {
            let path = input.join(format!("good_{i}.png"));
            write_png(&path, 20, 20);
            files.push(path);
        }
        for i in 0..corrupt {
            let path = input.join(format!("bad_{i}.jpg"));
            fs::write(&path, b"garbage bytes").unwrap();
            files.push(path);
        }

        let config = Config {
            input_dir: input,
            output_dir: output,
            threads: 2,
            ..Default::default()
        };
        (temp_dir, config, files)
    }

    #[tokio::test]
    async fn test_every_file_yields_exactly_one_result() {
        let (_guard, config, files) = setup_batch(5, 0);
        let results = BatchOptimizer::new(config).run(files, None).await.unwrap();

        assert_eq!(results.len(), 5);
        let names: HashSet<_> = results.iter().map(|r| r.filename.clone()).collect();
        assert_eq!(names.len(), 5);
    }

    #[tokio::test]
    async fn test_one_corrupt_file_does_not_stop_the_batch() {
        let (_guard, config, files) = setup_batch(3, 1);
        let results = BatchOptimizer::new(config).run(files, None).await.unwrap();

        assert_eq!(results.len(), 4);
        let errors: Vec<_> = results.iter().filter(|r| !r.status.is_ok()).collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].optimized_bytes, errors[0].original_bytes);
    }

    #[tokio::test]
    async fn test_observer_invoked_once_per_unit() {
        let (_guard, config, files) = setup_batch(3, 0);
        let seen = Cell::new(0usize);
        let observer = |_result: &OptimizationResult| seen.set(seen.get() + 1);

        let results = BatchOptimizer::new(config)
            .run(files, Some(&observer))
            .await
            .unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(seen.get(), 3);
    }

    #[tokio::test]
    async fn test_end_to_end_jpeg_batch_with_reports() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("input");
        let output = temp_dir.path().join("output");
        fs::create_dir_all(&input).unwrap();
        fs::create_dir_all(&output).unwrap();

        for (name, side) in [("one.jpg", 120u32), ("two.jpg", 80), ("three.jpg", 40)] {
            RgbImage::from_fn(side, side, |x, y| Rgb([(x * 3 % 256) as u8, (y * 5 % 256) as u8, 99]))
                .save(input.join(name))
                .unwrap();
        }

        let config = Config {
            input_dir: input.clone(),
            output_dir: output.clone(),
            quality: 80,
            target_format: crate::config::TargetFormat::Jpg,
            threads: 2,
            ..Default::default()
        };

        let (files, _total) = crate::file_manager::FileManager::analyze_folder(&input).unwrap();
        assert_eq!(files.len(), 3);

        let results = BatchOptimizer::new(config.clone()).run(files, None).await.unwrap();
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| r.status.is_ok()));
        assert!(results.iter().all(|r| r.output_path.ends_with(".jpg")));

        let paths = crate::report::write_reports(&results, &config).unwrap();
        let csv = fs::read_to_string(&paths.csv).unwrap();
        assert_eq!(csv.lines().count(), 4);

        let html = fs::read_to_string(&paths.html).unwrap();
        assert!(html.contains("Files: 3"));
        assert!(paths.bar_chart.exists());
        assert!(paths.pie_chart.exists());
    }

    #[tokio::test]
    async fn test_empty_batch_returns_empty_list() {
        let (_guard, config, _files) = setup_batch(0, 0);
        let results = BatchOptimizer::new(config).run(Vec::new(), None).await.unwrap();
        assert!(results.is_empty());
    }
}
