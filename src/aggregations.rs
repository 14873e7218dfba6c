//! Aggregation Routines - small ranked tables over claims.
//!
//! Grouping keeps first-seen key order and the final sort is stable, so keys
//! with equal values come out in input order. Rows whose group key is
//! missing are dropped.

use crate::error::{Result, TableKind};
use crate::schema::{self, BILLED_AMOUNT, CPT_CODE, ICD_CODE, STATUS, STATUS_DENIED};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Number of entries kept by the ranked aggregations.
pub const TOP_N: usize = 5;

/// Output column holding each group's aggregate.
pub(crate) const VALUE: &str = "value";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedEntry<V> {
    pub key: String,
    pub value: V,
}

/// Top diagnoses by total billed amount.
pub fn costly_diagnoses(claims: &DataFrame) -> Result<Vec<RankedEntry<f64>>> {
    schema::require_all(claims, TableKind::Claims, &[ICD_CODE, BILLED_AMOUNT])?;
    let ranked = rank_groups(
        claims.clone().lazy(),
        ICD_CODE,
        col(BILLED_AMOUNT).cast(DataType::Float64).sum(),
        TOP_N,
    )?;

    let keys = schema::string_values(&ranked, TableKind::Claims, ICD_CODE)?;
    let totals = schema::float_values(&ranked, TableKind::Claims, VALUE)?;
    Ok(entries(keys, totals))
}

/// CPT codes with the most denied claims.
pub fn denial_rate(claims: &DataFrame) -> Result<Vec<RankedEntry<u64>>> {
    schema::require_all(claims, TableKind::Claims, &[STATUS, CPT_CODE])?;
    let denied = claims
        .clone()
        .lazy()
        .filter(col(STATUS).cast(DataType::String).eq(lit(STATUS_DENIED)));
    let ranked = rank_groups(denied, CPT_CODE, len(), TOP_N)?;

    let keys = schema::string_values(&ranked, TableKind::Claims, CPT_CODE)?;
    let counts = schema::count_values(&ranked, TableKind::Claims, VALUE)?;
    Ok(entries(keys, counts))
}

/// Group `lf` by the text of `key` in first-seen order, aggregate each group
/// with `agg` into [`VALUE`], and keep the `n` largest. The descending sort
/// maintains order, so ties stay in first-seen order.
pub(crate) fn rank_groups(lf: LazyFrame, key: &str, agg: Expr, n: usize) -> Result<DataFrame> {
    let ranked = lf
        .filter(col(key).is_not_null())
        .group_by_stable([col(key).cast(DataType::String)])
        .agg([agg.alias(VALUE)])
        .sort_by_exprs(
            [col(VALUE)],
            SortMultipleOptions::default()
                .with_order_descending(true)
                .with_maintain_order(true),
        )
        .limit(n as IdxSize)
        .collect()?;
    Ok(ranked)
}

fn entries<V: Default>(keys: Vec<Option<String>>, values: Vec<Option<V>>) -> Vec<RankedEntry<V>> {
    keys.into_iter()
        .zip(values)
        .filter_map(|(key, value)| {
            key.map(|key| RankedEntry {
                key,
                value: value.unwrap_or_default(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_costly_diagnoses_sums_and_ranks() {
        let claims = df! [
            ICD_CODE => ["I10", "E11", "I10", "J45"],
            BILLED_AMOUNT => [500.0, 800.0, 400.0, 100.0],
        ]
        .unwrap();
        let ranked = costly_diagnoses(&claims).unwrap();
        assert_eq!(
            ranked,
            vec![
                RankedEntry { key: "I10".to_string(), value: 900.0 },
                RankedEntry { key: "E11".to_string(), value: 800.0 },
                RankedEntry { key: "J45".to_string(), value: 100.0 },
            ]
        );
    }

    #[test]
    fn test_top_five_bound_and_stable_ties() {
        let codes = ["A", "B", "C", "D", "E", "F", "G"];
        let claims = df! [
            ICD_CODE => codes,
            BILLED_AMOUNT => [10i64, 10, 30, 10, 10, 10, 10],
        ]
        .unwrap();
        let keys: Vec<String> = costly_diagnoses(&claims).unwrap().into_iter().map(|e| e.key).collect();
        assert_eq!(keys, vec!["C", "A", "B", "D", "E"]);
    }

    #[test]
    fn test_missing_keys_are_dropped() {
        let claims = df! [
            ICD_CODE => [None, Some("I10")],
            BILLED_AMOUNT => [Some(5000.0), None],
        ]
        .unwrap();
        let ranked = costly_diagnoses(&claims).unwrap();
        assert_eq!(ranked, vec![RankedEntry { key: "I10".to_string(), value: 0.0 }]);
    }

    #[test]
    fn test_denial_rate_counts_denied_only() {
        let claims = df! [
            STATUS => ["Denied", "Paid", "Denied", "Denied", "Pending"],
            CPT_CODE => [99213i64, 99213, 93000, 99213, 93000],
        ]
        .unwrap();
        let ranked = denial_rate(&claims).unwrap();
        assert_eq!(
            ranked,
            vec![
                RankedEntry { key: "99213".to_string(), value: 2 },
                RankedEntry { key: "93000".to_string(), value: 1 },
            ]
        );
    }

    #[test]
    fn test_empty_input_gives_empty_ranking() {
        let claims = df! [
            STATUS => Vec::<String>::new(),
            ICD_CODE => Vec::<String>::new(),
            CPT_CODE => Vec::<String>::new(),
            BILLED_AMOUNT => Vec::<f64>::new(),
        ]
        .unwrap();
        assert!(costly_diagnoses(&claims).unwrap().is_empty());
        assert!(denial_rate(&claims).unwrap().is_empty());
    }

    #[test]
    fn test_missing_column_is_unavailable() {
        let claims = df! [ ICD_CODE => ["I10"] ].unwrap();
        assert!(costly_diagnoses(&claims).unwrap_err().is_unavailable());
        assert!(denial_rate(&claims).unwrap_err().is_unavailable());
    }
}
