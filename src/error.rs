use thiserror::Error;

/// Failures surfaced at the library boundary (argument parsing, input files).
/// The simulation and ranking cores never return these.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PvpError {
    #[error("unknown league '{0}' (use little, great, ultra, master or a CP number)")]
    UnknownLeague(String),

    #[error("invalid IV spread '{0}' (expected A/D/H with values 0-15)")]
    InvalidIvs(String),

    #[error("invalid level {0} (levels run 1.0-50.0 in 0.5 steps)")]
    InvalidLevel(f64),

    #[error("species '{0}' is missing base stats")]
    MissingStats(String),

    #[error("species '{species}' has no level under CP {cap}")]
    NoLevelUnderCap { species: String, cap: String },

    #[error("roster is empty")]
    EmptyRoster,
}
