use thiserror::Error;

/// Errors raised while replaying one round's action stream.
///
/// Every variant is fatal for the round being processed: partial state is
/// worse than no state for the statistics built downstream, so the analyzer
/// and the record builder stop at the first inconsistency and surface it to
/// the caller, which is expected to quarantine the offending record.
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("invalid tile: {0:?}")]
    InvalidTile(String),

    #[error("not in hand: {0}")]
    NotInHand(String),

    #[error("structural invariant violated: {0}")]
    StructuralInvariant(String),

    #[error("unknown record type: {0:?}")]
    UnknownEvent(String),

    #[error(transparent)]
    Decode(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ReplayError>;

/// Shorthand for the pervasive "this must hold or the stream is corrupt"
/// checks, in the spirit of `anyhow::ensure!` but producing our own
/// round-scoped error type.
macro_rules! ensure_state {
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            return Err($crate::errors::ReplayError::StructuralInvariant(
                format!($($arg)+),
            ));
        }
    };
}

pub(crate) use ensure_state;
