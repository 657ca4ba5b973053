use crate::dice_types::*;
use crate::error::ParseErrorKind;

/// Largest number of dice in one term, and largest keep amount.
pub const MAX_DICE: u32 = 100;
/// Largest die, and largest re-roll threshold.
pub const MAX_FACES: u32 = 1000;
pub const MAX_CONSTANT: u32 = 1_000_000;
pub const MAX_TERMS: usize = 32;

pub trait DiceLimits {
    fn min(&self) -> i64;
    fn max(&self) -> i64;
}

impl DiceLimits for DiceToken {
    fn min(&self) -> i64 {
        let (low, high) = unsigned_limits(self);
        match self.sign {
            Sign::Plus => low,
            Sign::Minus => -high,
        }
    }

    fn max(&self) -> i64 {
        let (low, high) = unsigned_limits(self);
        match self.sign {
            Sign::Plus => high,
            Sign::Minus => -low,
        }
    }
}

impl DiceLimits for [DiceToken] {
    fn min(&self) -> i64 {
        self.iter().map(|t| t.min()).sum()
    }

    fn max(&self) -> i64 {
        self.iter().map(|t| t.max()).sum()
    }
}

impl DiceLimits for [ResolvedDice] {
    fn min(&self) -> i64 {
        self.iter().map(|d| d.token.min()).sum()
    }

    fn max(&self) -> i64 {
        self.iter().map(|d| d.token.max()).sum()
    }
}

fn unsigned_limits(token: &DiceToken) -> (i64, i64) {
    match token.dice {
        DiceType::Constant(value) => (value.into(), value.into()),
        DiceType::Number(faces) => {
            let kept = i64::from(kept_count(token));
            (kept, kept * i64::from(faces))
        }
    }
}

/// Number of dice that count towards the total once the keep filter ran.
pub fn kept_count(token: &DiceToken) -> u32 {
    match token.modifiers.keep {
        Some((_, amount)) => amount.min(token.count),
        None => token.count,
    }
}

impl DiceToken {
    /// Applies the ceilings the parser enforces to a token built elsewhere.
    pub fn check_bounds(&self) -> Result<(), ParseErrorKind> {
        match self.dice {
            DiceType::Constant(value) => {
                if self.count != 1 {
                    return Err(ParseErrorKind::InvalidCount);
                }
                if value > MAX_CONSTANT {
                    return Err(ParseErrorKind::InvalidConstant);
                }
                if !self.modifiers.is_empty() {
                    return Err(ParseErrorKind::UnknownModifier);
                }
            }
            DiceType::Number(faces) => {
                if !(1..=MAX_DICE).contains(&self.count) {
                    return Err(ParseErrorKind::InvalidCount);
                }
                if !(1..=MAX_FACES).contains(&faces) {
                    return Err(ParseErrorKind::InvalidFaces);
                }
                if let Some((_, amount)) = self.modifiers.keep {
                    if !(1..=MAX_DICE).contains(&amount) {
                        return Err(ParseErrorKind::InvalidModifier);
                    }
                }
                if let Some(threshold) = self.modifiers.reroll {
                    if !(1..=MAX_FACES).contains(&threshold) {
                        return Err(ParseErrorKind::InvalidModifier);
                    }
                }
            }
        }
        Ok(())
    }
}

/// Checks every token of a structured list and the term ceiling, returning
/// the index of the first offending entry.
pub fn check_resolved(dice: &[ResolvedDice]) -> Result<(), (usize, ParseErrorKind)> {
    if dice.len() > MAX_TERMS {
        return Err((MAX_TERMS, ParseErrorKind::TooManyTerms));
    }
    dice.iter()
        .enumerate()
        .try_for_each(|(index, d)| d.token.check_bounds().map_err(|kind| (index, kind)))
}
