//! # Image Batch Optimizer - Main Entry Point
//!
//! Questo è il punto di ingresso principale dell'applicazione.
//!
//! ## Responsabilità:
//! - Parsing degli argomenti della command line con `clap`
//! - Inizializzazione del sistema di logging con `tracing`
//! - Probe delle capability del codec e validazione della configurazione
//! - Avvio del batch e scrittura dei report
//!
//! ## Flusso di esecuzione:
//! 1. Parsa gli argomenti CLI (input, output, quality, resize, etc.)
//! 2. Configura il logging al livello richiesto
//! 3. Probe capability (AVIF) e validazione config: ogni errore qui è
//!    fatale e termina il processo prima di toccare qualsiasi file
//! 4. Analizza la input directory e dispatcha il batch sul worker pool
//! 5. Scrive CSV, chart e HTML, poi logga il summary finale
//!
//! ## Esempio di utilizzo:
//! ```bash
//! image-optimizer ./photos ./optimized --quality 80 --resize 1920x --target-format webp
//! ```

use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing::info;

use image_batch_optimizer::config::parse_resize;
use image_batch_optimizer::file_manager::FileManager;
use image_batch_optimizer::report;
use image_batch_optimizer::result::BatchTotals;
use image_batch_optimizer::{BatchOptimizer, Capabilities, Config, TargetFormat};

#[derive(Debug, Clone, Copy, ValueEnum)]
#[value(rename_all = "UPPER")]
enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    fn as_tracing(self) -> tracing::Level {
        match self {
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warning => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

#[derive(Parser)]
#[command(name = "image-optimizer")]
#[command(about = "Batch image optimization with CSV/HTML reports and charts")]
struct Args {
    /// Directory containing images to optimize
    input: PathBuf,

    /// Output directory (created if absent)
    output: PathBuf,

    /// Quality for lossy formats, 1-100 (default: 85)
    #[arg(long)]
    quality: Option<u8>,

    /// Resize bound as WxH, either side optional (e.g. 1920x or x1080)
    #[arg(long)]
    resize: Option<String>,

    /// Copy EXIF metadata into outputs (best-effort)
    #[arg(long)]
    preserve_metadata: bool,

    /// Number of parallel workers (default: 4)
    #[arg(long)]
    threads: Option<usize>,

    /// Output format for the whole batch (default: original)
    #[arg(long, value_enum)]
    target_format: Option<TargetFormat>,

    /// Prefix for the .csv / .html report files (default: report)
    #[arg(long)]
    report_prefix: Option<String>,

    /// Log verbosity
    #[arg(long, value_enum, default_value = "INFO", ignore_case = true)]
    log_level: LogLevel,

    /// Optional JSON config file supplying defaults; explicit flags win
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(args.log_level.as_tracing())
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Validate arguments
    if !args.input.is_dir() {
        return Err(anyhow::anyhow!(
            "Input directory does not exist: {}",
            args.input.display()
        ));
    }

    // Capability probe happens once, before any file is touched
    let capabilities = Capabilities::detect();

    let base = match args.config {
        Some(ref path) => Config::from_file(path).await?,
        None => Config::default(),
    };

    let (max_width, max_height) = match args.resize {
        Some(ref spec) => parse_resize(spec)?,
        None => (base.max_width, base.max_height),
    };

    let config = Config {
        quality: args.quality.unwrap_or(base.quality),
        max_width,
        max_height,
        preserve_metadata: args.preserve_metadata || base.preserve_metadata,
        threads: args.threads.unwrap_or(base.threads),
        target_format: args.target_format.unwrap_or(base.target_format),
        input_dir: args.input,
        output_dir: args.output,
        report_prefix: args.report_prefix.unwrap_or(base.report_prefix),
    };

    config.validate(&capabilities)?;
    std::fs::create_dir_all(&config.output_dir)?;

    info!(
        "🎯 Mode: target format {} (quality: {})",
        config.target_format, config.quality
    );
    if config.wants_resize() {
        info!(
            "📐 Resize bounds: width {} / height {}",
            config
                .max_width
                .map_or("unbounded".to_string(), |w| w.to_string()),
            config
                .max_height
                .map_or("unbounded".to_string(), |h| h.to_string()),
        );
    }

    let (files, total_size) = FileManager::analyze_folder(&config.input_dir)?;
    info!(
        "Analyzing: {} - {} files, total {}",
        config.input_dir.display(),
        files.len(),
        FileManager::format_size(total_size)
    );

    let optimizer = BatchOptimizer::new(config.clone());
    let results = optimizer.run(files, None).await?;

    let paths = report::write_reports(&results, &config)?;

    let totals = BatchTotals::from_results(&results);
    info!("=== Summary ===");
    info!(
        "Original total:  {}",
        FileManager::format_size(totals.total_original)
    );
    info!(
        "Optimized total: {}",
        FileManager::format_size(totals.total_optimized)
    );
    info!(
        "Saved:           {} ({:.2}%)",
        FileManager::format_size(totals.saved_bytes()),
        totals.saved_percent()
    );
    info!("CSV:  {}", paths.csv.display());
    info!("HTML: {}", paths.html.display());

    Ok(())
}
