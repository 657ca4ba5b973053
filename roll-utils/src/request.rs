use serde::{Deserialize, Serialize};
use sheet_dice_roll::{DiceInput, ResolvedDice};

/// One roll as submitted by a client: the dice, either as sheet text or as
/// structured tokens, plus the bonus damage of the rolling character.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollRequest {
    pub dices: DiceInput,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bonus_damage: Option<String>,
}

impl RollRequest {
    pub fn text<S: ToString>(expression: S) -> RollRequest {
        RollRequest {
            dices: DiceInput::Text(expression.to_string()),
            bonus_damage: None,
        }
    }

    pub fn resolved(dice: Vec<ResolvedDice>) -> RollRequest {
        RollRequest {
            dices: DiceInput::Resolved(dice),
            bonus_damage: None,
        }
    }

    pub fn with_bonus_damage<S: ToString>(mut self, bonus_damage: Option<S>) -> RollRequest {
        self.bonus_damage = bonus_damage.map(|b| b.to_string());
        self
    }
}
