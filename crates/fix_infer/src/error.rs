use std::path::PathBuf;

use fix_model::LoadError;
use miette::Diagnostic;
use smol_str::SmolStr;
use thiserror::Error;

/// Reasons a run is aborted. None of them is retried.
#[derive(Error, Diagnostic, Debug)]
pub enum InferError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Load(#[from] LoadError),

    #[error("build of module `{module}` failed: {message}")]
    #[diagnostic(help("the module must build before and between injections"))]
    Build { module: SmolStr, message: String },

    #[error("could not apply annotation changes: {0}")]
    Inject(String),

    #[error("could not read config {}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("could not write report to {}", path.display())]
    ReportWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not encode report")]
    ReportEncode(#[from] serde_json::Error),
}
