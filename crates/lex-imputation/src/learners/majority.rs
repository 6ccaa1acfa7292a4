//! Baseline learner ignoring every input attribute.

use super::{Learner, Predictor, training_targets};
use crate::dataset::{AttributeKind, Row, Schema};
use crate::error::Result;
use crate::statistics;

/// Predicts the training mean (numeric) or mode (nominal) for every row.
#[derive(Debug, Clone, Copy, Default)]
pub struct MajorityLearner;

impl Learner for MajorityLearner {
    fn name(&self) -> &str {
        "majority"
    }

    fn supports(&self, _kind: &AttributeKind) -> bool {
        true
    }

    fn fit(&self, schema: &Schema, rows: &[&Row], dependent: usize) -> Result<Box<dyn Predictor>> {
        let (_, targets) = training_targets(schema, rows, dependent)?;
        let value = if schema.attribute(dependent).is_nominal() {
            statistics::mode(&targets)
        } else {
            statistics::mean(&targets)
        };
        Ok(Box::new(ConstantModel { value }))
    }
}

#[derive(Debug)]
struct ConstantModel {
    value: f64,
}

impl Predictor for ConstantModel {
    fn predict(&self, _row: &Row) -> Result<f64> {
        Ok(self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{Attribute, MISSING};

    #[test]
    fn test_numeric_mean_and_nominal_mode() {
        let schema = Schema::new(
            vec![Attribute::numeric("x"), Attribute::nominal("y", ["a", "b", "c"])],
            1,
        )
        .unwrap();
        let rows = vec![
            Row::new(vec![1.0, 2.0]),
            Row::new(vec![2.0, 2.0]),
            Row::new(vec![6.0, 0.0]),
            Row::new(vec![MISSING, MISSING]),
        ];
        let refs: Vec<&Row> = rows.iter().collect();

        let numeric = MajorityLearner.fit(&schema, &refs, 0).unwrap();
        assert_eq!(numeric.predict(&rows[3]).unwrap(), 3.0);

        let nominal = MajorityLearner.fit(&schema, &refs, 1).unwrap();
        assert_eq!(nominal.predict(&rows[0]).unwrap(), 2.0);
    }
}
