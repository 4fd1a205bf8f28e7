// Filter -> aggregate -> derive.
//
// Every stage borrows the loaded records and returns a fresh view; the
// dataset itself is never touched after loading.
use crate::types::{FieldRecord, Period};
use std::collections::BTreeSet;
use tracing::debug;

/// Per-record metrics for the current period selection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldMetrics<'a> {
    pub record: &'a FieldRecord,
    pub demand_sum: f64,
    pub supply_sum: f64,
    pub demand_per_ha: f64,
}

/// Keep records whose crop is selected. No selected crops means no filter.
pub fn filter_by_crop<'a>(records: &'a [FieldRecord], crops: &BTreeSet<String>) -> Vec<&'a FieldRecord> {
    let filtered: Vec<&FieldRecord> = if crops.is_empty() {
        records.iter().collect()
    } else {
        records.iter().filter(|r| crops.contains(&r.crop)).collect()
    };
    debug!(total = records.len(), kept = filtered.len(), "crop filter applied");
    filtered
}

/// Demand and supply summed over exactly the selected periods.
///
/// An empty selection sums nothing, so both totals are zero.
pub fn aggregate(record: &FieldRecord, periods: &BTreeSet<Period>) -> (f64, f64) {
    (record.demand.sum_over(periods), record.supply.sum_over(periods))
}

pub fn demand_per_ha(demand: f64, area_ha: f64) -> f64 {
    if area_ha > 0.0 {
        demand / area_ha
    } else {
        0.0
    }
}

pub fn derive_metrics<'a>(
    records: &[&'a FieldRecord],
    periods: &BTreeSet<Period>,
) -> Vec<FieldMetrics<'a>> {
    records
        .iter()
        .map(|&record| {
            let (demand_sum, supply_sum) = aggregate(record, periods);
            FieldMetrics {
                record,
                demand_sum,
                supply_sum,
                demand_per_ha: demand_per_ha(demand_sum, record.area_ha),
            }
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::types::PeriodValues;
    use geo::MultiPolygon;

    pub(crate) fn record(id: &str, crop: &str, area_ha: f64, demand: [f64; 8]) -> FieldRecord {
        FieldRecord {
            id: id.to_string(),
            crop: crop.to_string(),
            area_ha,
            seasonal_intensity: 0.0,
            demand: PeriodValues::new(demand),
            supply: PeriodValues::new(demand.map(|d| d / 2.0)),
            geometry: MultiPolygon::new(vec![]),
        }
    }

    fn only_march(v: f64) -> [f64; 8] {
        [v, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]
    }

    fn set<T: Ord + Clone>(items: &[T]) -> BTreeSet<T> {
        items.iter().cloned().collect()
    }

    #[test]
    fn empty_crop_selection_keeps_everything() {
        let records = vec![
            record("a", "Wheat", 1.0, only_march(1.0)),
            record("b", "Cotton", 1.0, only_march(1.0)),
        ];
        let kept = filter_by_crop(&records, &BTreeSet::new());
        assert_eq!(kept.len(), records.len());
        assert!(kept.iter().zip(&records).all(|(k, r)| std::ptr::eq(*k, r)));
    }

    #[test]
    fn crop_filter_keeps_members_in_order() {
        let records = vec![
            record("a", "Wheat", 10.0, only_march(100.0)),
            record("b", "Cotton", 20.0, only_march(200.0)),
            record("c", "Cotton", 0.0, only_march(300.0)),
        ];
        let kept = filter_by_crop(&records, &set(&["Cotton".to_string()]));
        let ids: Vec<&str> = kept.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["b", "c"]);

        let metrics = derive_metrics(&kept, &set(&[Period::Mar]));
        let demand: Vec<f64> = metrics.iter().map(|m| m.demand_sum).collect();
        let per_ha: Vec<f64> = metrics.iter().map(|m| m.demand_per_ha).collect();
        assert_eq!(demand, [200.0, 300.0]);
        assert_eq!(per_ha, [10.0, 0.0]);
    }

    #[test]
    fn empty_period_selection_sums_to_zero() {
        let r = record("a", "Wheat", 5.0, [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
        assert_eq!(aggregate(&r, &BTreeSet::new()), (0.0, 0.0));
    }

    #[test]
    fn period_sums_compose() {
        let r = record("a", "Wheat", 5.0, [1.5, 2.25, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
        let (first, _) = aggregate(&r, &set(&[Period::Mar, Period::Apr]));
        let (then, _) = aggregate(&r, &set(&[Period::May]));
        let (all, _) = aggregate(&r, &set(&[Period::Mar, Period::Apr, Period::May]));
        assert_eq!(first + then, all);
    }

    #[test]
    fn supply_only_counts_selected_periods() {
        let r = record("a", "Wheat", 5.0, [10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 80.0]);
        let (demand, supply) = aggregate(&r, &set(&[Period::Jun, Period::Oct]));
        assert_eq!(demand, 120.0);
        assert_eq!(supply, 60.0);
    }

    #[test]
    fn zero_area_never_divides() {
        assert_eq!(demand_per_ha(500.0, 0.0), 0.0);
        assert_eq!(demand_per_ha(500.0, -1.0), 0.0);
        assert_eq!(demand_per_ha(500.0, 4.0), 125.0);
    }
}
