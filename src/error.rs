//! # Error Types Module
//!
//! Questo modulo definisce tutti i tipi di errore custom dell'applicazione.
//!
//! ## Categorie di errori:
//! - `Io`: Errori di I/O (file non trovati, permessi, etc.)
//! - `Image`: Errori di decodifica/encoding immagini (formati corrotti, etc.)
//! - `Config`: Errori di configurazione fatali pre-run (resize malformato,
//!   formato richiesto ma capability assente)
//! - `Report`: Errori di scrittura dei report CSV/HTML/chart
//! - `Encode`: Errori dei codec che non passano da `image::ImageError`
//! - `UnsupportedFormat`: Formato file non supportato
//!
//! ## Propagazione:
//! - Gli errori `Config` e `Report` risalgono fino al main e terminano il
//!   processo con exit status non-zero
//! - Tutti gli errori per-file vengono assorbiti in un `OptimizationResult`
//!   con status `Error` e non fermano mai il batch

/// Custom error types for batch image optimization
#[derive(thiserror::Error, Debug)]
pub enum OptimizeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Report write error: {0}")]
    Report(String),

    #[error("Encoding error: {0}")]
    Encode(String),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),
}
