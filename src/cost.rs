//! Per-severity cost table: a fixed dispatch cost plus a per-kilometer cost, charged once
//! per emergency along its chosen route.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::scenario::Severity;

/// Fixed and distance-proportional cost for one severity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostRow {
    /// Flat cost incurred once, regardless of route length.
    pub fixed_cost: f64,
    /// Cost incurred per kilometer of the chosen route.
    pub per_km_cost: f64,
}

/// Maps each [`Severity`] to its [`CostRow`]. Defaults to the reference cost table;
/// overridable from a JSON document via [`CostTable::from_json`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostTable {
    rows: HashMap<Severity, CostRow>,
}

impl Default for CostTable {
    fn default() -> Self {
        let mut rows = HashMap::with_capacity(3);
        rows.insert(
            Severity::Leve,
            CostRow {
                fixed_cost: 35_000.0,
                per_km_cost: 5_585.0,
            },
        );
        rows.insert(
            Severity::Media,
            CostRow {
                fixed_cost: 60_000.0,
                per_km_cost: 10_534.0,
            },
        );
        rows.insert(
            Severity::Grave,
            CostRow {
                fixed_cost: 85_000.0,
                per_km_cost: 20_396.0,
            },
        );
        CostTable { rows }
    }
}

impl CostTable {
    /// Build a table from explicit rows, requiring one row per [`Severity`] variant, each
    /// with a non-negative `fixed_cost` and `per_km_cost`.
    pub fn new(rows: HashMap<Severity, CostRow>) -> Result<Self> {
        for s in Severity::ALL {
            let row = rows.get(&s).ok_or_else(|| {
                Error::MissingAttribute(format!("cost table is missing a row for severity {s}"))
            })?;
            if row.fixed_cost < 0.0 || row.per_km_cost < 0.0 {
                return Err(Error::InvalidRange(format!(
                    "cost table row for severity {s} must have fixed_cost >= 0 and per_km_cost >= 0, got {{{}, {}}}",
                    row.fixed_cost, row.per_km_cost
                )));
            }
        }
        Ok(CostTable { rows })
    }

    /// Parse a table override from a JSON document of the form
    /// `{"leve": {"fixed_cost": ..., "per_km_cost": ...}, "media": {...}, "grave": {...}}`.
    pub fn from_json(text: &str) -> Result<Self> {
        let rows: HashMap<Severity, CostRow> = serde_json::from_str(text)
            .map_err(|e| Error::InvalidInput(format!("malformed cost table: {e}")))?;
        CostTable::new(rows)
    }

    /// The cost row for a severity. Panics if the table was not built through
    /// [`CostTable::new`] or [`CostTable::default`], both of which guarantee full coverage.
    pub fn row(&self, severity: Severity) -> CostRow {
        self.rows[&severity]
    }

    /// Total cost of routing one emergency of the given severity over a route of
    /// `distance_km` kilometers.
    pub fn route_cost(&self, severity: Severity, distance_km: f64) -> f64 {
        let row = self.row(severity);
        row.fixed_cost + row.per_km_cost * distance_km
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_matches_reference_figures() {
        let table = CostTable::default();
        assert_eq!(table.row(Severity::Leve).fixed_cost, 35_000.0);
        assert_eq!(table.row(Severity::Media).per_km_cost, 10_534.0);
        assert_eq!(table.row(Severity::Grave).fixed_cost, 85_000.0);
    }

    #[test]
    fn route_cost_adds_fixed_and_distance_terms() {
        let table = CostTable::default();
        let cost = table.route_cost(Severity::Leve, 2.0);
        assert!((cost - (35_000.0 + 2.0 * 5_585.0)).abs() < 1e-9);
    }

    #[test]
    fn new_rejects_missing_severity() {
        let mut rows = HashMap::new();
        rows.insert(
            Severity::Leve,
            CostRow {
                fixed_cost: 1.0,
                per_km_cost: 1.0,
            },
        );
        assert!(CostTable::new(rows).is_err());
    }

    #[test]
    fn new_rejects_negative_costs() {
        let mut rows = HashMap::new();
        for s in Severity::ALL {
            rows.insert(
                s,
                CostRow {
                    fixed_cost: 1.0,
                    per_km_cost: 1.0,
                },
            );
        }
        rows.insert(
            Severity::Grave,
            CostRow {
                fixed_cost: 1.0,
                per_km_cost: -1.0,
            },
        );
        assert!(CostTable::new(rows).is_err());
    }

    #[test]
    fn from_json_round_trips_default() {
        let table = CostTable::default();
        let text = serde_json::to_string(&table.rows).unwrap();
        let parsed = CostTable::from_json(&text).unwrap();
        assert_eq!(parsed.row(Severity::Grave), table.row(Severity::Grave));
    }
}
