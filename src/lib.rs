//! # Image Batch Optimizer Library
//!
//! Questo è il modulo principale della libreria che espone tutte le API pubbliche.
//!
//! ## Responsabilità:
//! - Definisce la struttura modulare dell'applicazione
//! - Espone i tipi e le funzioni principali tramite re-exports
//! - Fornisce un'interfaccia pulita per il main.rs e per altri consumatori
//!
//! ## Architettura dei moduli:
//! - `config`: Gestione configurazione e validazione parametri
//! - `capabilities`: Probe delle capability opzionali del codec (AVIF)
//! - `error`: Tipi di errore custom per diverse operazioni
//! - `file_manager`: Discovery dei file immagine e formattazione dimensioni
//! - `image_processor`: Worker di ottimizzazione per singola immagine
//! - `optimizer`: Orchestratore del worker pool
//! - `result`: Risultato per-file e totali aggregati del batch
//! - `report`: Report writer CSV e HTML
//! - `charts`: Rendering dei grafici PNG (bar + pie)
//! - `progress`: Progress tracking con `indicatif`
//!
//! ## Utilizzo:
//! ```ignore
//! use image_batch_optimizer::{BatchOptimizer, Capabilities, Config};
//!
//! let caps = Capabilities::detect();
//! let config = Config::default();
//! config.validate(&caps)?;
//! let optimizer = BatchOptimizer::new(config);
//! let results = optimizer.run(files, None).await?;
//! ```

pub mod capabilities;
pub mod charts;
pub mod config;
pub mod error;
pub mod file_manager;
pub mod image_processor;
pub mod optimizer;
pub mod progress;
pub mod report;
pub mod result;

pub use capabilities::Capabilities;
pub use config::{Config, TargetFormat};
pub use error::OptimizeError;
pub use optimizer::BatchOptimizer;
pub use result::{FileStatus, OptimizationResult};
