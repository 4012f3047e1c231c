//! First-match categorisation

use crate::expression::evaluate_condition;
use crate::value::Columns;
use cohortspec_diagnostics::Result;
use cohortspec_model::{CategoryDefinitions, CategoryLabel};

/// Evaluation of `categorised_as` definitions
pub trait CategoriseExt {
    /// Label of the first entry whose expression is exactly true, else the `DEFAULT` label
    ///
    /// Entries are scanned in declaration order. An expression that is null
    /// for this patient does not match.
    fn evaluate(&self, row: &impl Columns) -> Result<&CategoryLabel>;
}

impl CategoriseExt for CategoryDefinitions {
    fn evaluate(&self, row: &impl Columns) -> Result<&CategoryLabel> {
        for (label, expression) in self.rules() {
            if evaluate_condition(expression, row)? == Some(true) {
                return Ok(label);
            }
        }
        Ok(self.default_label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{row, EvalValue};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_age_over_65() {
        let defs = CategoryDefinitions::parse([(1, "age > 65"), (0, "DEFAULT")]).unwrap();
        assert_eq!(defs.evaluate(&row([("age", 70)])).unwrap(), &CategoryLabel::Int(1));
        assert_eq!(defs.evaluate(&row([("age", 40)])).unwrap(), &CategoryLabel::Int(0));
    }

    #[test]
    fn test_first_match_wins() {
        let defs = CategoryDefinitions::parse([
            ("obese", "bmi >= 30"),
            ("overweight", "bmi >= 25"),
            ("unknown", "DEFAULT"),
        ])
        .unwrap();
        assert_eq!(defs.evaluate(&row([("bmi", 32.5)])).unwrap(), &CategoryLabel::from("obese"));
        assert_eq!(defs.evaluate(&row([("bmi", 27.0)])).unwrap(), &CategoryLabel::from("overweight"));
        assert_eq!(defs.evaluate(&row([("bmi", 20.0)])).unwrap(), &CategoryLabel::from("unknown"));
    }

    #[test]
    fn test_default_position_is_irrelevant() {
        let defs = CategoryDefinitions::parse([("U", "DEFAULT"), ("S", "smoker = 1"), ("N", "smoker = 0")]).unwrap();
        assert_eq!(defs.evaluate(&row([("smoker", 0)])).unwrap(), &CategoryLabel::from("N"));
        assert_eq!(defs.evaluate(&row([("smoker", EvalValue::Null)])).unwrap(), &CategoryLabel::from("U"));
    }
}
