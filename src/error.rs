use thiserror::Error;

use crate::data::model::GlacierNumber;

// ---------------------------------------------------------------------------
// Error taxonomy
// ---------------------------------------------------------------------------

/// All failure modes surfaced to the user.
///
/// Three families: transport (network / archive / io), lookup-miss
/// (`NoData`, `NoAnimation`), and invalid user input (`InvalidCoordinate`).
/// None of them is retried; each ends the current action.
#[derive(Debug, Error)]
pub enum SnowlineError {
    #[error("network request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("archive is not readable: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no snowline data found for glacier {0}")]
    NoData(GlacierNumber),

    #[error("no animation available for {0}")]
    NoAnimation(String),

    #[error("glacier table is not loaded")]
    TableUnavailable,

    #[error("could not parse '{0}': expected 'lat,lon' as two decimal degrees")]
    InvalidCoordinate(String),

    #[error("elevation bins are not regularly spaced")]
    IrregularBins,

    #[error("no observations in the selected date range")]
    EmptyRange,

    #[error("malformed series data: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, SnowlineError>;

impl SnowlineError {
    /// Lookup-miss errors get a distinct "not found" message in the UI,
    /// never the generic transport wording.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NoData(_) | Self::NoAnimation(_))
    }
}
