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

use crate::dice_types::*;
use rand::{distributions::Uniform, Rng};
use std::fmt::{self, Display, Formatter};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[cfg(feature = "logging")]
use log::debug;

/// One evaluated die.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct DieRoll {
    pub value: u32,
    pub faces: u32,
    /// False when a keep modifier discarded this die.
    pub kept: bool,
    /// The first value drawn, if the die was re-rolled.
    pub rerolled_from: Option<u32>,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct TokenRoll {
    pub token: DiceToken,
    pub label: Option<String>,
    /// Dice in draw order. Empty for constants.
    pub dice: Vec<DieRoll>,
    /// Signed sum of the kept dice, or the signed constant.
    pub total: i64,
}

/// Outcome of one roll request. Only `roll` and `description` cross the
/// wire; `rolls` is the in-process breakdown.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DiceResult {
    pub roll: i64,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub description: Option<String>,
    #[cfg_attr(feature = "serde", serde(skip))]
    pub rolls: Vec<TokenRoll>,
}

impl DiceResult {
    /// The result for an expression without any term.
    pub fn nothing() -> DiceResult {
        DiceResult::default()
    }

    pub fn from_rolls(rolls: Vec<TokenRoll>) -> DiceResult {
        DiceResult {
            roll: rolls.iter().map(|r| r.total).sum(),
            description: describe(&rolls),
            rolls,
        }
    }

    /// True when nothing was rolled and the caller should show nothing.
    pub fn is_empty(&self) -> bool {
        self.rolls.is_empty()
    }
}

fn describe(rolls: &[TokenRoll]) -> Option<String> {
    match rolls {
        [] => None,
        [single] if single.token.is_constant() => None,
        [single] => {
            let faces = single
                .dice
                .iter()
                .map(|d| d.to_string())
                .collect::<Vec<_>>()
                .join(" + ");
            Some(match single.token.sign {
                Sign::Plus => faces,
                Sign::Minus => format!("-({})", faces),
            })
        }
        // one signed subtotal per token
        [first, rest @ ..] => {
            let mut description = first.total.to_string();
            for roll in rest {
                description.push_str(&format!(" {} {}", roll.token.sign, roll.total.abs()));
            }
            Some(description)
        }
    }
}

pub trait DiceEvaluate {
    fn evaluate<R: Rng>(&self, rng: &mut R) -> TokenRoll;
}

impl DiceEvaluate for DiceToken {
    fn evaluate<R: Rng>(&self, rng: &mut R) -> TokenRoll {
        evaluate_token(self, None, rng)
    }
}

impl DiceEvaluate for ResolvedDice {
    fn evaluate<R: Rng>(&self, rng: &mut R) -> TokenRoll {
        evaluate_token(&self.token, self.label.clone(), rng)
    }
}

fn evaluate_token<R: Rng>(token: &DiceToken, label: Option<String>, rng: &mut R) -> TokenRoll {
    let faces = match token.dice {
        DiceType::Number(faces) => faces.max(1),
        DiceType::Constant(_) => 1,
    };
    let dist = Uniform::new_inclusive(1, faces);
    let result = evaluate_with(token, label, || rng.sample(dist));
    #[cfg(feature = "logging")]
    {
        debug!("rolled {}", &result)
    }
    result
}

/// Evaluates `token` taking every die value from `draw`. Dice are drawn in
/// order, re-rolls happen in a single pass over them and the keep filter
/// runs last.
pub fn evaluate_with<D: FnMut() -> u32>(
    token: &DiceToken,
    label: Option<String>,
    mut draw: D,
) -> TokenRoll {
    match token.dice {
        DiceType::Constant(value) => TokenRoll {
            token: *token,
            label,
            dice: Vec::new(),
            total: i64::from(value) * token.sign.factor(),
        },
        DiceType::Number(faces) => {
            let mut dice: Vec<DieRoll> = (0..token.count)
                .map(|_| DieRoll {
                    value: draw(),
                    faces,
                    kept: true,
                    rerolled_from: None,
                })
                .collect();
            if let Some(threshold) = token.modifiers.reroll {
                for die in dice.iter_mut().filter(|d| d.value <= threshold) {
                    die.rerolled_from = Some(die.value);
                    die.value = draw();
                }
            }
            if let Some((selector, amount)) = token.modifiers.keep {
                apply_keep(&mut dice, selector, amount);
            }
            let sum: i64 = dice
                .iter()
                .filter(|d| d.kept)
                .map(|d| i64::from(d.value))
                .sum();
            TokenRoll {
                token: *token,
                label,
                dice,
                total: sum * token.sign.factor(),
            }
        }
    }
}

/// Marks the `amount` highest or lowest dice as kept and every other die as
/// discarded. Equal values rank by draw order.
pub fn apply_keep(dice: &mut [DieRoll], selector: Selector, amount: u32) {
    let mut order: Vec<usize> = (0..dice.len()).collect();
    match selector {
        Selector::Higher => order.sort_by(|a, b| dice[*b].value.cmp(&dice[*a].value)),
        Selector::Lower => order.sort_by(|a, b| dice[*a].value.cmp(&dice[*b].value)),
    }
    let amount = (amount as usize).min(dice.len());
    for (rank, index) in order.into_iter().enumerate() {
        dice[index].kept = rank < amount;
    }
}

impl Display for DieRoll {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let marker = if self.rerolled_from.is_some() { "r" } else { "" };
        if self.kept {
            write!(f, "{}{}", self.value, marker)
        } else {
            write!(f, "({}{})", self.value, marker)
        }
    }
}

/// Renders `2d6(4, 2)=6` for dice and the signed value for constants.
impl Display for TokenRoll {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.token.dice {
            DiceType::Constant(_) => write!(f, "{}", self.total),
            DiceType::Number(_) => write!(
                f,
                "{}{}({})={}",
                if self.token.sign == Sign::Minus { "-" } else { "" },
                self.token,
                self.dice
                    .iter()
                    .map(|d| d.to_string())
                    .collect::<Vec<_>>()
                    .join(", "),
                self.total
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn scripted(values: &[u32]) -> impl FnMut() -> u32 {
        let mut values = values.to_vec().into_iter();
        move || values.next().expect("script ran out of values")
    }

    fn kept_values(roll: &TokenRoll) -> Vec<u32> {
        roll.dice.iter().filter(|d| d.kept).map(|d| d.value).collect()
    }

    #[test]
    fn test_plain_sum() {
        let roll = evaluate_with(&DiceToken::dice(3, 6), None, scripted(&[1, 2, 3]));
        assert_eq!(roll.total, 6);
        assert_eq!(roll.dice.len(), 3);
        assert!(roll.dice.iter().all(|d| d.kept && d.faces == 6));
    }

    #[test]
    fn test_constant_does_not_draw() {
        let roll = evaluate_with(&DiceToken::constant(3), None, || {
            panic!("constants must not draw")
        });
        assert_eq!(roll.total, 3);
        assert!(roll.dice.is_empty());
        let negative = evaluate_with(&DiceToken::constant(3).negated(), None, || 0);
        assert_eq!(negative.total, -3);
    }

    #[test]
    fn test_keep_highest() {
        let token = DiceToken::dice(4, 6).keep(Selector::Higher, 3);
        let roll = evaluate_with(&token, None, scripted(&[3, 6, 1, 5]));
        assert_eq!(kept_values(&roll), vec![3, 6, 5]);
        assert!(!roll.dice[2].kept);
        assert_eq!(roll.total, 14);
    }

    #[test]
    fn test_keep_ties_follow_draw_order() {
        let token = DiceToken::dice(3, 6).keep(Selector::Higher, 1);
        let roll = evaluate_with(&token, None, scripted(&[5, 5, 2]));
        assert_eq!(
            roll.dice.iter().map(|d| d.kept).collect::<Vec<_>>(),
            vec![true, false, false]
        );
        assert_eq!(roll.total, 5);
    }

    #[test]
    fn test_keep_lowest() {
        let token = DiceToken::dice(2, 20).keep(Selector::Lower, 1);
        let roll = evaluate_with(&token, None, scripted(&[12, 4]));
        assert_eq!(kept_values(&roll), vec![4]);
        assert_eq!(roll.total, 4);
    }

    #[test]
    fn test_keep_is_clamped() {
        let token = DiceToken::dice(2, 6).keep(Selector::Higher, 5);
        let roll = evaluate_with(&token, None, scripted(&[2, 3]));
        assert_eq!(kept_values(&roll), vec![2, 3]);
        assert_eq!(roll.total, 5);
    }

    #[test]
    fn test_reroll_single_pass() {
        let token = DiceToken::dice(3, 6).reroll(1);
        let roll = evaluate_with(&token, None, scripted(&[1, 4, 1, 1, 6]));
        assert_eq!(
            roll.dice.iter().map(|d| d.value).collect::<Vec<_>>(),
            vec![1, 4, 6]
        );
        assert_eq!(roll.dice[0].rerolled_from, Some(1));
        assert_eq!(roll.dice[1].rerolled_from, None);
        assert_eq!(roll.dice[2].rerolled_from, Some(1));
        assert_eq!(roll.total, 11);
    }

    #[test]
    fn test_reroll_then_keep() {
        let token = DiceToken::dice(4, 6).reroll(2).keep(Selector::Higher, 3);
        let roll = evaluate_with(&token, None, scripted(&[2, 6, 3, 1, 5, 1]));
        assert_eq!(
            roll.dice.iter().map(|d| d.value).collect::<Vec<_>>(),
            vec![5, 6, 3, 1]
        );
        assert!(!roll.dice[3].kept);
        assert_eq!(roll.total, 14);
    }

    #[test]
    fn test_negative_dice() {
        let roll = evaluate_with(&DiceToken::dice(2, 4).negated(), None, scripted(&[3, 2]));
        assert_eq!(roll.total, -5);
    }

    #[test]
    fn test_single_token_description() {
        let token = DiceToken::dice(4, 6).keep(Selector::Higher, 3);
        let result =
            DiceResult::from_rolls(vec![evaluate_with(&token, None, scripted(&[6, 5, 1, 4]))]);
        assert_eq!(result.roll, 15);
        assert_eq!(result.description.as_deref(), Some("6 + 5 + (1) + 4"));

        let rerolled = DiceToken::dice(2, 6).reroll(1);
        let result =
            DiceResult::from_rolls(vec![evaluate_with(&rerolled, None, scripted(&[1, 3, 5]))]);
        assert_eq!(result.description.as_deref(), Some("5r + 3"));
    }

    #[test]
    fn test_multi_token_description() {
        let rolls = vec![
            evaluate_with(&DiceToken::dice(2, 6), None, scripted(&[4, 2])),
            evaluate_with(&DiceToken::dice(1, 4), None, scripted(&[3])),
            evaluate_with(&DiceToken::constant(3).negated(), None, scripted(&[])),
        ];
        let result = DiceResult::from_rolls(rolls);
        assert_eq!(result.roll, 6);
        assert_eq!(result.description.as_deref(), Some("6 + 3 - 3"));
    }

    #[test]
    fn test_leading_negative_description() {
        let rolls = vec![
            evaluate_with(&DiceToken::constant(1).negated(), None, scripted(&[])),
            evaluate_with(&DiceToken::dice(1, 8), None, scripted(&[7])),
        ];
        let result = DiceResult::from_rolls(rolls);
        assert_eq!(result.roll, 6);
        assert_eq!(result.description.as_deref(), Some("-1 + 7"));

        let rolls = vec![
            evaluate_with(&DiceToken::dice(2, 4).negated(), None, scripted(&[3, 1])),
            evaluate_with(&DiceToken::constant(2), None, scripted(&[])),
        ];
        let result = DiceResult::from_rolls(rolls);
        assert_eq!(result.roll, -2);
        assert_eq!(result.description.as_deref(), Some("-4 + 2"));
    }

    #[test]
    fn test_negative_single_token_description() {
        let token = DiceToken::dice(2, 6).negated();
        let result =
            DiceResult::from_rolls(vec![evaluate_with(&token, None, scripted(&[4, 1]))]);
        assert_eq!(result.roll, -5);
        assert_eq!(result.description.as_deref(), Some("-(4 + 1)"));
    }

    #[test]
    fn test_token_roll_display() {
        let keep = DiceToken::dice(3, 6).keep(Selector::Higher, 2);
        let roll = evaluate_with(&keep, None, scripted(&[4, 1, 6]));
        assert_eq!(roll.to_string(), "3d6kh2(4, (1), 6)=10");
        let negative = evaluate_with(&DiceToken::dice(1, 4).negated(), None, scripted(&[3]));
        assert_eq!(negative.to_string(), "-1d4(3)=-3");
        let constant = evaluate_with(&DiceToken::constant(2).negated(), None, scripted(&[]));
        assert_eq!(constant.to_string(), "-2");
    }

    #[test]
    fn test_nothing_and_constant_results() {
        let nothing = DiceResult::from_rolls(Vec::new());
        assert_eq!(nothing, DiceResult::nothing());
        assert_eq!(nothing.roll, 0);
        assert_eq!(nothing.description, None);
        assert!(nothing.is_empty());

        let constant =
            DiceResult::from_rolls(vec![evaluate_with(&DiceToken::constant(3), None, || 0)]);
        assert_eq!(constant.roll, 3);
        assert_eq!(constant.description, None);
        assert!(!constant.is_empty());
    }

    #[test]
    fn test_labeled_evaluation() {
        let mut rng = StdRng::seed_from_u64(7);
        let dice = ResolvedDice::labeled(DiceToken::dice(1, 4), "Dano Bônus");
        let roll = dice.evaluate(&mut rng);
        assert_eq!(roll.label.as_deref(), Some("Dano Bônus"));
        assert!((1..=4).contains(&roll.dice[0].value));
    }

    #[test]
    fn test_rng_values_in_range() {
        let mut rng = StdRng::seed_from_u64(1);
        let token = DiceToken::dice(100, 20);
        let roll = token.evaluate(&mut rng);
        assert_eq!(roll.dice.len(), 100);
        assert!(roll.dice.iter().all(|d| (1..=20).contains(&d.value)));
        assert_eq!(
            roll.total,
            roll.dice.iter().map(|d| i64::from(d.value)).sum::<i64>()
        );
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_wire_format() {
        let result = DiceResult::from_rolls(vec![evaluate_with(
            &DiceToken::dice(2, 6),
            None,
            scripted(&[4, 3]),
        )]);
        assert_eq!(
            serde_json::to_string(&result).unwrap(),
            r#"{"roll":7,"description":"4 + 3"}"#
        );
        assert_eq!(
            serde_json::to_string(&DiceResult::nothing()).unwrap(),
            r#"{"roll":0}"#
        );
    }
}
