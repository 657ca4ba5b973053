use sheet_dice_roll::{ParseError, ParseErrorKind};
use thiserror::Error;

#[derive(Debug, PartialEq, Error)]
pub enum RollError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("dice #{index} is out of bounds: {kind}")]
    InvalidDice { index: usize, kind: ParseErrorKind },
    #[error("random number provider has stopped")]
    RngUnavailable,
    #[error("roll worker stopped before returning a result")]
    WorkerLost,
}
