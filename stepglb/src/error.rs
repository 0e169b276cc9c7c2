// error.rs     Error definitions
//
// Copyright (c) 2025  Douglas Lau
//

/// Conversion errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error
    #[error("I/O {0}")]
    Io(#[from] std::io::Error),

    /// Invalid STEP exchange
    #[error("Invalid STEP file: {0}")]
    Parse(String),

    /// Missing data section
    #[error("STEP file has no data section")]
    NoData,

    /// No shells in the model
    #[error("No shells found in STEP file")]
    EmptyModel,

    /// Invalid shell topology
    #[error("Invalid shell topology: {0}")]
    Topology(String),
}

pub type Result<T> = std::result::Result<T, Error>;
