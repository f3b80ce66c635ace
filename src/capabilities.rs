//! # Codec Capabilities Module
//!
//! Probe delle capability opzionali del codec, eseguito una sola volta allo
//! startup. Il risultato tipizzato viene consumato dalla validazione della
//! configurazione invece di un branch silenzioso nel path di salvataggio.
//!
//! L'encoder AVIF (`ravif`) è una dipendenza opzionale dietro la feature
//! `avif`: il probe riflette com'è stato compilato il binario.

/// Optional codec features available to this process
#[derive(Debug, Clone, Copy)]
pub struct Capabilities {
    /// AVIF encoding support
    pub avif: bool,
}

impl Capabilities {
    /// Probe the capabilities compiled into this binary
    pub fn detect() -> Self {
        Self {
            avif: cfg!(feature = "avif"),
        }
    }
}
