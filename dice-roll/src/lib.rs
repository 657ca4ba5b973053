/*
Copyright 2021 Robin Marchart

   Licensed under the Apache License, Version 2.0 (the "License");
   you may not use this file except in compliance with the License.
   You may obtain a copy of the License at

       http://www.apache.org/licenses/LICENSE-2.0

   Unless required by applicable law or agreed to in writing, software
   distributed under the License is distributed on an "AS IS" BASIS,
   WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
   See the License for the specific language governing permissions and
   limitations under the License.
*/

//! Parse free-form dice notation from a character sheet and roll it.
//!
//! ```rust
//! # use sheet_dice_roll::{roll_expression_with, Placeholders};
//! # use rand::{rngs::StdRng, SeedableRng};
//! # fn main() -> Result<(), sheet_dice_roll::ParseError> {
//! let mut rng = StdRng::seed_from_u64(1);
//! // `DB` is replaced by the bonus damage of the sheet before parsing.
//! let placeholders = Placeholders::with_bonus_damage(Some("1d4"));
//! let result = roll_expression_with("2d6+DB+3", &placeholders, &mut rng)?;
//! assert!((6..=19).contains(&result.roll));
//! # Ok(())
//! # }
//! ```

pub mod dice_types;
pub mod error;
pub mod limits;
pub mod placeholder;

#[cfg(feature = "roll")]
pub mod dice_roll;
#[cfg(feature = "parser")]
pub mod parser;

pub use dice_types::{
    DiceInput, DiceToken, DiceType, Modifiers, ResolvedDice, Selector, Sign,
};
pub use error::{ParseError, ParseErrorKind};
pub use placeholder::{Placeholders, BONUS_DAMAGE};

#[cfg(feature = "roll")]
pub use dice_roll::{DiceEvaluate, DiceResult, DieRoll, TokenRoll};

#[cfg(feature = "roll")]
use rand::Rng;

/// Parses the expression after substituting the placeholders, without
/// rolling anything. Blank input gives an empty token list.
#[cfg(feature = "parser")]
pub fn parse(expression: &str, placeholders: &Placeholders) -> Result<Vec<DiceToken>, ParseError> {
    parser::parse_expression(expression, placeholders)
}

/// Rolls every token with the given rng.
#[cfg(feature = "roll")]
pub fn resolve_with<R: Rng>(tokens: &[DiceToken], rng: &mut R) -> DiceResult {
    DiceResult::from_rolls(tokens.iter().map(|t| t.evaluate(rng)).collect())
}

/// Same as `resolve_with()` using `rand::thread_rng()`.
#[cfg(feature = "roll")]
pub fn resolve(tokens: &[DiceToken]) -> DiceResult {
    resolve_with(tokens, &mut rand::thread_rng())
}

/// Rolls structured dice, keeping their labels on the per-token rolls.
#[cfg(feature = "roll")]
pub fn resolve_labeled_with<R: Rng>(dice: &[ResolvedDice], rng: &mut R) -> DiceResult {
    DiceResult::from_rolls(dice.iter().map(|d| d.evaluate(rng)).collect())
}

#[cfg(feature = "roll")]
pub fn resolve_labeled(dice: &[ResolvedDice]) -> DiceResult {
    resolve_labeled_with(dice, &mut rand::thread_rng())
}

/// Parses then rolls. A parse failure returns before any die is drawn.
#[cfg(all(feature = "parser", feature = "roll"))]
pub fn roll_expression_with<R: Rng>(
    expression: &str,
    placeholders: &Placeholders,
    rng: &mut R,
) -> Result<DiceResult, ParseError> {
    let tokens = parse(expression, placeholders)?;
    Ok(resolve_with(&tokens, rng))
}

#[cfg(all(feature = "parser", feature = "roll"))]
pub fn roll_expression(
    expression: &str,
    placeholders: &Placeholders,
) -> Result<DiceResult, ParseError> {
    roll_expression_with(expression, placeholders, &mut rand::thread_rng())
}

/// Rolls either kind of input. Structured dice skip the parser and are
/// trusted as given.
#[cfg(all(feature = "parser", feature = "roll"))]
pub fn roll_input_with<R: Rng>(
    input: &DiceInput,
    placeholders: &Placeholders,
    rng: &mut R,
) -> Result<DiceResult, ParseError> {
    match input {
        DiceInput::Text(expression) => roll_expression_with(expression, placeholders, rng),
        DiceInput::Resolved(dice) => Ok(resolve_labeled_with(dice, rng)),
    }
}

#[cfg(all(feature = "parser", feature = "roll"))]
pub fn roll_input(input: &DiceInput, placeholders: &Placeholders) -> Result<DiceResult, ParseError> {
    roll_input_with(input, placeholders, &mut rand::thread_rng())
}
