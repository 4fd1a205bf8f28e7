use crate::types::Kpis;
use crate::util::{format_int, format_number};
use anyhow::{Context, Result};
use geojson::FeatureCollection;
use serde::Serialize;
use std::path::Path;
use tabled::{settings::Style, Table, Tabled};

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

/// Map layer for the web map; GeoJSON is what the map widget consumes.
pub fn write_geojson(path: &Path, layer: &FeatureCollection) -> Result<()> {
    std::fs::write(path, layer.to_string())
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

pub fn kpi_lines(kpis: &Kpis) -> Vec<String> {
    vec![
        format!("Selected Fields: {}", format_int(kpis.selected_fields)),
        format!("Total Area:      {} ha", format_number(kpis.total_area_ha, 0)),
        format!("Demand (ET):     {} mln m³", format_number(kpis.total_demand_mln_m3, 2)),
        format!(
            "Supply:          {} mln m³ (delta {:+.2})",
            format_number(kpis.total_supply_mln_m3, 2),
            kpis.delta_mln_m3
        ),
    ]
}

pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().cloned().take(max_rows).collect();
    if slice.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kpi_lines_format_thousands_and_delta_sign() {
        let kpis = Kpis {
            selected_fields: 1234,
            total_area_ha: 45678.4,
            total_demand_mln_m3: 12.345,
            total_supply_mln_m3: 10.0,
            delta_mln_m3: -2.345,
        };
        let lines = kpi_lines(&kpis);
        assert_eq!(lines[0], "Selected Fields: 1,234");
        assert!(lines[1].contains("45,678 ha"));
        assert!(lines[3].contains("10.00 mln m³"));
        assert!(lines[3].contains("delta -2.35") || lines[3].contains("delta -2.34"));
    }

    #[test]
    fn writes_csv_rows() {
        use crate::types::TopFieldRow;
        let path = std::env::temp_dir().join(format!("fwm_top_{}.csv", std::process::id()));
        let rows = vec![TopFieldRow {
            rank: 1,
            id: "42".to_string(),
            area_ha: 12.5,
            demand_per_ha: 3200.0,
        }];
        write_csv(&path, &rows).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(text, "Rank,ID,AreaHa,DemandM3PerHa\n1,42,12.5,3200.0\n");
    }
}
