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

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DiceType {
    /// A die with the given number of faces, rolling `1..=faces`.
    Number(u32),
    /// A flat value that is never randomized.
    Constant(u32),
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Selector {
    Higher,
    Lower,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Modifiers {
    /// Keep only the `n` highest or lowest dice.
    #[cfg_attr(feature = "serde", serde(default))]
    pub keep: Option<(Selector, u32)>,
    /// Redraw, once, every die showing this value or less.
    #[cfg_attr(feature = "serde", serde(default))]
    pub reroll: Option<u32>,
}

impl Modifiers {
    pub fn none() -> Modifiers {
        Modifiers::default()
    }

    pub fn is_empty(&self) -> bool {
        self.keep.is_none() && self.reroll.is_none()
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Sign {
    Plus,
    Minus,
}

impl Sign {
    pub fn factor(self) -> i64 {
        match self {
            Sign::Plus => 1,
            Sign::Minus => -1,
        }
    }
}

impl Default for Sign {
    fn default() -> Self {
        Sign::Plus
    }
}

/// One term of a dice expression.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DiceToken {
    pub count: u32,
    pub dice: DiceType,
    #[cfg_attr(feature = "serde", serde(default))]
    pub modifiers: Modifiers,
    #[cfg_attr(feature = "serde", serde(default))]
    pub sign: Sign,
}

impl DiceToken {
    pub fn dice(count: u32, faces: u32) -> DiceToken {
        DiceToken {
            count,
            dice: DiceType::Number(faces),
            modifiers: Modifiers::none(),
            sign: Sign::Plus,
        }
    }

    pub fn constant(value: u32) -> DiceToken {
        DiceToken {
            count: 1,
            dice: DiceType::Constant(value),
            modifiers: Modifiers::none(),
            sign: Sign::Plus,
        }
    }

    pub fn keep(mut self, selector: Selector, amount: u32) -> DiceToken {
        self.modifiers.keep = Some((selector, amount));
        self
    }

    pub fn reroll(mut self, threshold: u32) -> DiceToken {
        self.modifiers.reroll = Some(threshold);
        self
    }

    pub fn negated(mut self) -> DiceToken {
        self.sign = Sign::Minus;
        self
    }

    pub fn is_constant(&self) -> bool {
        matches!(self.dice, DiceType::Constant(_))
    }
}

/// A token built from structured state instead of free text, optionally
/// tagged with the bonus source it came from.
#[derive(Debug, PartialEq, Eq, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ResolvedDice {
    pub token: DiceToken,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub label: Option<String>,
}

impl ResolvedDice {
    pub fn new(token: DiceToken) -> ResolvedDice {
        ResolvedDice { token, label: None }
    }

    pub fn labeled<S: ToString>(token: DiceToken, label: S) -> ResolvedDice {
        ResolvedDice {
            token,
            label: Some(label.to_string()),
        }
    }
}

impl From<DiceToken> for ResolvedDice {
    fn from(token: DiceToken) -> Self {
        ResolvedDice::new(token)
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(tag = "kind", content = "dices", rename_all = "camelCase")
)]
pub enum DiceInput {
    Text(String),
    Resolved(Vec<ResolvedDice>),
}

impl DiceInput {
    /// True when there is nothing to roll, before any placeholder is expanded.
    pub fn is_empty(&self) -> bool {
        match self {
            DiceInput::Text(text) => text.trim().is_empty(),
            DiceInput::Resolved(dice) => dice.is_empty(),
        }
    }
}

impl Display for Selector {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Higher => write!(f, "kh"),
            Selector::Lower => write!(f, "kl"),
        }
    }
}

impl Display for Modifiers {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if let Some(threshold) = self.reroll {
            write!(f, "r{}", threshold)?;
        }
        if let Some((selector, amount)) = self.keep {
            write!(f, "{}{}", selector, amount)?;
        }
        Ok(())
    }
}

impl Display for Sign {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Sign::Plus => write!(f, "+"),
            Sign::Minus => write!(f, "-"),
        }
    }
}

/// Renders the term without its sign.
impl Display for DiceToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.dice {
            DiceType::Constant(value) => write!(f, "{}", value),
            DiceType::Number(faces) => write!(f, "{}d{}{}", self.count, faces, self.modifiers),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_display() {
        assert_eq!(DiceToken::dice(2, 6).to_string(), "2d6");
        assert_eq!(DiceToken::constant(3).to_string(), "3");
        assert_eq!(
            DiceToken::dice(4, 6).keep(Selector::Higher, 3).to_string(),
            "4d6kh3"
        );
        assert_eq!(
            DiceToken::dice(2, 20).keep(Selector::Lower, 1).to_string(),
            "2d20kl1"
        );
        assert_eq!(
            DiceToken::dice(4, 6)
                .reroll(1)
                .keep(Selector::Higher, 3)
                .to_string(),
            "4d6r1kh3"
        );
        assert_eq!(DiceToken::dice(1, 6).negated().to_string(), "1d6");
    }

    #[test]
    fn test_sign_factor() {
        assert_eq!(Sign::Plus.factor(), 1);
        assert_eq!(Sign::Minus.factor(), -1);
        assert_eq!(Sign::default(), Sign::Plus);
    }

    #[test]
    fn test_input_is_empty() {
        assert!(DiceInput::Text("  \t".to_string()).is_empty());
        assert!(DiceInput::Resolved(vec![]).is_empty());
        assert!(!DiceInput::Text("d20".to_string()).is_empty());
        assert!(!DiceInput::Resolved(vec![DiceToken::dice(1, 4).into()]).is_empty());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_input_wire_format() {
        let input: DiceInput = serde_json::from_str(
            r#"{"kind":"resolved","dices":[{"token":{"count":1,"dice":{"Number":4}},"label":"Dano Bônus"}]}"#,
        )
        .unwrap();
        assert_eq!(
            input,
            DiceInput::Resolved(vec![ResolvedDice::labeled(
                DiceToken::dice(1, 4),
                "Dano Bônus"
            )])
        );
        let text: DiceInput = serde_json::from_str(r#"{"kind":"text","dices":"2d6+3"}"#).unwrap();
        assert_eq!(text, DiceInput::Text("2d6+3".to_string()));
    }
}
