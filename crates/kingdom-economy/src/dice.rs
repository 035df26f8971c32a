//! Dice formula parsing and evaluation.
//!
//! Grammar:
//!
//! ```text
//! formula  := "-"? body | "-(" body ")"
//! body     := count? "d" sides (("+" | "-") bonus)?
//! ```
//!
//! Evaluation sums `count` uniform draws in `[1, sides]`, applies the signed
//! bonus, then negates the whole result if the formula had a leading `-`.
//! Both negative forms negate the full evaluation: `-1d4+1` and `-(1d4+1)`
//! roll the same range.
//!
//! [`evaluate`] never fails. A formula that does not parse is logged and
//! read as a plain integer, or zero when it is not one.

use tracing::warn;

use kingdom_types::Amount;

use crate::error::EconomyError;

/// Upper bound on dice in one formula.
const MAX_DICE: u32 = 100;

/// Upper bound on faces per die.
const MAX_SIDES: u32 = 1000;

/// A parsed dice formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiceFormula {
    /// Whether the whole result is negated.
    pub negated: bool,
    /// Number of dice.
    pub count: u32,
    /// Faces per die.
    pub sides: u32,
    /// Signed flat bonus.
    pub bonus: i32,
}

impl DiceFormula {
    /// Parse a formula.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::InvalidFormula`] if the text does not match
    /// the grammar or exceeds the dice limits.
    pub fn parse(formula: &str) -> Result<Self, EconomyError> {
        let invalid = |reason| EconomyError::InvalidFormula {
            formula: formula.to_owned(),
            reason,
        };

        let text: String = formula.chars().filter(|c| !c.is_whitespace()).collect();
        let (negated, body) = match text.strip_prefix('-') {
            Some(rest) => match rest.strip_prefix('(') {
                Some(inner) => (
                    true,
                    inner
                        .strip_suffix(')')
                        .ok_or_else(|| invalid("unbalanced parenthesis"))?,
                ),
                None => (true, rest),
            },
            None => (false, text.as_str()),
        };

        let (count_text, rest) = body
            .split_once(['d', 'D'])
            .ok_or_else(|| invalid("missing 'd'"))?;
        let count = if count_text.is_empty() {
            1
        } else {
            count_text
                .parse::<u32>()
                .map_err(|_err| invalid("dice count is not a number"))?
        };

        let (sides_text, bonus) = match rest.find(['+', '-']) {
            Some(pos) => {
                let (sides_text, bonus_text) = rest.split_at(pos);
                let bonus = bonus_text
                    .parse::<i32>()
                    .map_err(|_err| invalid("bonus is not a number"))?;
                (sides_text, bonus)
            }
            None => (rest, 0),
        };
        let sides = sides_text
            .parse::<u32>()
            .map_err(|_err| invalid("die size is not a number"))?;

        if count == 0 || count > MAX_DICE {
            return Err(invalid("dice count out of range"));
        }
        if sides == 0 || sides > MAX_SIDES {
            return Err(invalid("die size out of range"));
        }

        Ok(Self {
            negated,
            count,
            sides,
            bonus,
        })
    }

    /// Roll the formula.
    pub fn roll(&self, rng: &mut impl rand::Rng) -> i32 {
        let mut total = i64::from(self.bonus);
        for _ in 0..self.count {
            total = total.saturating_add(i64::from(rng.random_range(1..=self.sides)));
        }
        self.finish(total)
    }

    /// Smallest and largest possible results, in ascending order.
    pub fn range(&self) -> (i32, i32) {
        let low = i64::from(self.count).saturating_add(i64::from(self.bonus));
        let high = i64::from(self.count)
            .saturating_mul(i64::from(self.sides))
            .saturating_add(i64::from(self.bonus));
        let (a, b) = (self.finish(low), self.finish(high));
        (a.min(b), a.max(b))
    }

    fn finish(&self, total: i64) -> i32 {
        let signed = if self.negated {
            total.saturating_neg()
        } else {
            total
        };
        i32::try_from(signed).unwrap_or(if signed < 0 { i32::MIN } else { i32::MAX })
    }
}

/// Evaluate a formula, falling back to a plain integer (or zero).
pub fn evaluate(formula: &str, rng: &mut impl rand::Rng) -> i32 {
    match DiceFormula::parse(formula) {
        Ok(dice) => dice.roll(rng),
        Err(err) => {
            let fallback = formula.trim().parse::<i32>().unwrap_or(0);
            warn!(formula, fallback, error = %err, "dice formula fallback");
            fallback
        }
    }
}

/// Resolve an [`Amount`] to a concrete value, rolling when needed.
pub fn resolve_amount(amount: &Amount, rng: &mut impl rand::Rng) -> i32 {
    match amount {
        Amount::Fixed(value) => *value,
        Amount::Formula(formula) => evaluate(formula, rng),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    #[test]
    fn parses_basic_formula() {
        let dice = DiceFormula::parse("2d6+3").unwrap();
        assert_eq!(
            dice,
            DiceFormula {
                negated: false,
                count: 2,
                sides: 6,
                bonus: 3
            }
        );
        assert_eq!(dice.range(), (5, 15));
    }

    #[test]
    fn leading_minus_negates_whole_result() {
        let plain = DiceFormula::parse("-1d4+1").unwrap();
        let paren = DiceFormula::parse("-(1d4+1)").unwrap();
        assert_eq!(plain.range(), (-5, -2));
        assert_eq!(paren.range(), (-5, -2));
    }

    #[test]
    fn negative_bonus_is_subtracted() {
        let dice = DiceFormula::parse("1d6-1").unwrap();
        assert_eq!(dice.range(), (0, 5));
    }

    #[test]
    fn count_defaults_to_one() {
        assert_eq!(DiceFormula::parse("d20").unwrap().count, 1);
    }

    #[test]
    fn rolls_stay_in_range() {
        let mut rng = SmallRng::seed_from_u64(42);
        let dice = DiceFormula::parse("-(2d4)").unwrap();
        for _ in 0..200 {
            let v = dice.roll(&mut rng);
            assert!((-8..=-2).contains(&v), "rolled {v}");
        }
    }

    #[test]
    fn malformed_formulas_are_rejected() {
        for bad in ["", "abc", "2x6", "0d6", "1d0", "-(1d4", "1d4+x"] {
            assert!(DiceFormula::parse(bad).is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn evaluate_falls_back_to_integer_then_zero() {
        let mut rng = SmallRng::seed_from_u64(1);
        assert_eq!(evaluate("7", &mut rng), 7);
        assert_eq!(evaluate(" -3 ", &mut rng), -3);
        assert_eq!(evaluate("lots", &mut rng), 0);
    }

    #[test]
    fn fixed_amounts_need_no_roll() {
        let mut rng = SmallRng::seed_from_u64(1);
        assert_eq!(resolve_amount(&Amount::Fixed(-2), &mut rng), -2);
        let rolled = resolve_amount(&Amount::from("1d1+1"), &mut rng);
        assert_eq!(rolled, 2);
    }
}
