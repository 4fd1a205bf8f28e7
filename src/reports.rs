use crate::classify::Severity;
use crate::pipeline::{derive_metrics, filter_by_crop, FieldMetrics};
use crate::types::{FieldRecord, Kpis, MapCenter, MonthlyRow, Period, Selection, Tooltip, TopFieldRow};
use crate::util::round_to;
use geo::Centroid;
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, JsonValue};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::debug;

/// Rows in the "thirstiest fields" table.
pub const TOP_N: usize = 8;

/// Everything one render of the dashboard needs.
#[derive(Debug, Serialize)]
pub struct Dashboard {
    pub selection_crops: Vec<String>,
    pub selection_months: Vec<Period>,
    pub kpis: Kpis,
    pub monthly: Vec<MonthlyRow>,
    pub top_fields: Vec<TopFieldRow>,
    pub map_center: Option<MapCenter>,
    pub severity_counts: BTreeMap<Severity, usize>,
    #[serde(skip)]
    pub map_layer: FeatureCollection,
}

pub fn build_dashboard(records: &[FieldRecord], selection: &Selection) -> Dashboard {
    let filtered = filter_by_crop(records, &selection.crops);
    let metrics = derive_metrics(&filtered, &selection.periods);

    let mut severity_counts: BTreeMap<Severity, usize> =
        Severity::ALL.into_iter().map(|s| (s, 0)).collect();
    for m in &metrics {
        *severity_counts
            .entry(Severity::classify(m.demand_per_ha))
            .or_default() += 1;
    }
    debug!(fields = metrics.len(), ?severity_counts, "dashboard derived");

    Dashboard {
        selection_crops: selection.crops.iter().cloned().collect(),
        selection_months: selection.periods.iter().copied().collect(),
        kpis: summarize(&metrics),
        monthly: monthly_series(&filtered),
        top_fields: rank_top(&metrics, TOP_N),
        map_center: map_center(&filtered),
        severity_counts,
        map_layer: map_layer(&metrics),
    }
}

/// Highest demand per hectare first. The sort is stable so ties keep input order.
pub fn rank_top(metrics: &[FieldMetrics<'_>], n: usize) -> Vec<TopFieldRow> {
    let mut ranked: Vec<&FieldMetrics<'_>> = metrics.iter().collect();
    ranked.sort_by(|a, b| {
        b.demand_per_ha
            .partial_cmp(&a.demand_per_ha)
            .unwrap_or(Ordering::Equal)
    });
    ranked
        .into_iter()
        .take(n)
        .enumerate()
        .map(|(idx, m)| TopFieldRow {
            rank: idx + 1,
            id: m.record.id.clone(),
            area_ha: m.record.area_ha,
            demand_per_ha: m.demand_per_ha,
        })
        .collect()
}

pub fn summarize(metrics: &[FieldMetrics<'_>]) -> Kpis {
    let total_area_ha: f64 = metrics.iter().map(|m| m.record.area_ha).sum();
    let total_demand_mln_m3 = metrics.iter().map(|m| m.demand_sum).sum::<f64>() / 1_000_000.0;
    let total_supply_mln_m3 = metrics.iter().map(|m| m.supply_sum).sum::<f64>() / 1_000_000.0;
    Kpis {
        selected_fields: metrics.len(),
        total_area_ha,
        total_demand_mln_m3,
        total_supply_mln_m3,
        delta_mln_m3: total_supply_mln_m3 - total_demand_mln_m3,
    }
}

/// Supply and demand for every month, whatever months are selected.
pub fn monthly_series(records: &[&FieldRecord]) -> Vec<MonthlyRow> {
    Period::ALL
        .into_iter()
        .map(|period| MonthlyRow {
            period,
            supply_m3: records.iter().map(|r| r.supply.get(period)).sum(),
            demand_m3: records.iter().map(|r| r.demand.get(period)).sum(),
        })
        .collect()
}

/// Mean of the field centroids. `None` when nothing has a centroid.
pub fn map_center(records: &[&FieldRecord]) -> Option<MapCenter> {
    let centroids: Vec<_> = records
        .iter()
        .filter_map(|r| r.geometry.centroid())
        .collect();
    if centroids.is_empty() {
        return None;
    }
    let n = centroids.len() as f64;
    Some(MapCenter {
        longitude: centroids.iter().map(|p| p.x()).sum::<f64>() / n,
        latitude: centroids.iter().map(|p| p.y()).sum::<f64>() / n,
    })
}

pub fn tooltip(m: &FieldMetrics<'_>) -> Tooltip {
    Tooltip {
        id: m.record.id.clone(),
        area_ha: round_to(m.record.area_ha, 2),
        demand_m3_per_ha: m.demand_per_ha.round(),
        demand_m3: m.demand_sum.round(),
    }
}

/// One GeoJSON feature per field, carrying its fill colour and tooltip.
pub fn map_layer(metrics: &[FieldMetrics<'_>]) -> FeatureCollection {
    let features = metrics
        .iter()
        .map(|m| {
            let severity = Severity::classify(m.demand_per_ha);
            let tip = tooltip(m);
            let mut props = JsonObject::new();
            props.insert("id".into(), JsonValue::from(tip.id));
            props.insert("crop".into(), JsonValue::from(m.record.crop.clone()));
            props.insert("area_ha".into(), JsonValue::from(m.record.area_ha));
            props.insert("SIJ_m3ga".into(), JsonValue::from(m.record.seasonal_intensity));
            props.insert("demand_m3".into(), JsonValue::from(m.demand_sum));
            props.insert("supply_m3".into(), JsonValue::from(m.supply_sum));
            props.insert("demand_m3_per_ha".into(), JsonValue::from(m.demand_per_ha));
            props.insert("severity".into(), JsonValue::from(severity.to_string()));
            props.insert("fill_color".into(), JsonValue::from(severity.color().to_vec()));
            props.insert("tooltip_area_ha".into(), JsonValue::from(tip.area_ha));
            props.insert("tooltip_demand_m3_per_ha".into(), JsonValue::from(tip.demand_m3_per_ha));
            props.insert("tooltip_demand_m3".into(), JsonValue::from(tip.demand_m3));
            Feature {
                bbox: None,
                geometry: Some(Geometry::new(geojson::Value::from(&m.record.geometry))),
                id: None,
                properties: Some(props),
                foreign_members: None,
            }
        })
        .collect();
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}
