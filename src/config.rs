//! # Configuration Management Module
//!
//! Questo modulo gestisce tutta la configurazione dell'applicazione.
//!
//! ## Responsabilità:
//! - Definisce la struct `Config` con tutti i parametri di ottimizzazione
//! - Definisce `TargetFormat` per la scelta del formato di output
//! - Parsing della stringa di resize `WxH` (entrambi i lati opzionali)
//! - Fornisce validazione robusta dei parametri di input
//! - Supporta caricamento configurazione da file JSON
//! - Fornisce valori di default sensati per tutti i parametri
//!
//! ## Parametri di configurazione:
//! - `quality`: Qualità per i formati lossy (1-100, default: 85)
//! - `max_width` / `max_height`: Limiti opzionali di resize (default: nessuno)
//! - `preserve_metadata`: Copia best-effort dei metadata EXIF (default: false)
//! - `threads`: Numero di worker paralleli (default: 4)
//! - `target_format`: Formato di output (default: original)
//! - `input_dir` / `output_dir`: Directory di input e output
//! - `report_prefix`: Prefisso dei file report (default: "report")
//!
//! ## Validazione:
//! - Controlla che quality sia 1-100
//! - Controlla che threads sia > 0
//! - Controlla che AVIF sia richiesto solo se la capability è presente
//!
//! La configurazione è immutabile dopo la costruzione: nessun modulo core la
//! modifica durante il run.

use crate::capabilities::Capabilities;
use crate::error::OptimizeError;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Output format selection for the whole batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TargetFormat {
    /// Keep each source file's own format
    #[default]
    Original,
    Jpg,
    Png,
    Webp,
    Avif,
}

impl TargetFormat {
    /// File extension for a forced format, `None` when the source format is kept
    pub fn extension(&self) -> Option<&'static str> {
        match self {
            TargetFormat::Original => None,
            TargetFormat::Jpg => Some("jpg"),
            TargetFormat::Png => Some("png"),
            TargetFormat::Webp => Some("webp"),
            TargetFormat::Avif => Some("avif"),
        }
    }
}

impl fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TargetFormat::Original => "original",
            TargetFormat::Jpg => "jpg",
            TargetFormat::Png => "png",
            TargetFormat::Webp => "webp",
            TargetFormat::Avif => "avif",
        };
        write!(f, "{name}")
    }
}

/// Parse a `WxH` resize string where either side may be omitted
/// (`1920x1080`, `1920x`, `x1080`). An empty string means no resize.
pub fn parse_resize(s: &str) -> Result<(Option<u32>, Option<u32>), OptimizeError> {
    if s.is_empty() {
        return Ok((None, None));
    }

    let lower = s.to_lowercase();
    let (w, h) = lower
        .split_once('x')
        .ok_or_else(|| OptimizeError::Config(format!("Resize must look like 1920x1080, got '{s}'")))?;

    let parse_side = |side: &str| -> Result<Option<u32>, OptimizeError> {
        if side.is_empty() {
            Ok(None)
        } else {
            side.parse::<u32>()
                .map(Some)
                .map_err(|_| OptimizeError::Config(format!("Invalid resize dimension '{side}'")))
        }
    };

    Ok((parse_side(w)?, parse_side(h)?))
}

/// Configuration for one batch optimization run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Quality for lossy formats (1-100)
    pub quality: u8,
    /// Maximum output width (None = no limit)
    pub max_width: Option<u32>,
    /// Maximum output height (None = no limit)
    pub max_height: Option<u32>,
    /// Copy EXIF metadata into outputs (best-effort)
    pub preserve_metadata: bool,
    /// Number of parallel workers
    pub threads: usize,
    /// Output format for the whole batch
    pub target_format: TargetFormat,
    /// Directory containing the source images
    pub input_dir: PathBuf,
    /// Directory receiving optimized images and reports
    pub output_dir: PathBuf,
    /// Prefix for the `.csv` / `.html` report files
    pub report_prefix: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            quality: 85,
            max_width: None,
            max_height: None,
            preserve_metadata: false,
            threads: 4,
            target_format: TargetFormat::Original,
            input_dir: PathBuf::from("."),
            output_dir: PathBuf::from("optimized"),
            report_prefix: "report".to_string(),
        }
    }
}

impl Config {
    /// Validate configuration parameters against the probed capabilities
    pub fn validate(&self, capabilities: &Capabilities) -> Result<(), OptimizeError> {
        if self.quality == 0 || self.quality > 100 {
            return Err(OptimizeError::Config(
                "Quality must be between 1 and 100".to_string(),
            ));
        }

        if self.threads == 0 {
            return Err(OptimizeError::Config(
                "Number of threads must be greater than 0".to_string(),
            ));
        }

        if self.target_format == TargetFormat::Avif && !capabilities.avif {
            return Err(OptimizeError::Config(
                "AVIF output requested, but this binary was built without the 'avif' feature"
                    .to_string(),
            ));
        }

        Ok(())
    }

    /// Whether either resize bound is set
    pub fn wants_resize(&self) -> bool {
        self.max_width.is_some() || self.max_height.is_some()
    }

    /// Load configuration defaults from a JSON file
    pub async fn from_file(path: &PathBuf) -> Result<Self, OptimizeError> {
        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|e| OptimizeError::Config(format!("Invalid config file: {e}")))?;
        Ok(config)
    }
}
