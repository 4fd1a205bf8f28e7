use chrono::Month;
use geo::MultiPolygon;
use serde::{Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use tabled::Tabled;

/// One of the eight irrigation months the dataset carries columns for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Period {
    Mar,
    Apr,
    May,
    Jun,
    Jul,
    Aug,
    Sep,
    Oct,
}

impl Period {
    pub const ALL: [Period; 8] = [
        Period::Mar,
        Period::Apr,
        Period::May,
        Period::Jun,
        Period::Jul,
        Period::Aug,
        Period::Sep,
        Period::Oct,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn month(self) -> Month {
        match self {
            Period::Mar => Month::March,
            Period::Apr => Month::April,
            Period::May => Month::May,
            Period::Jun => Month::June,
            Period::Jul => Month::July,
            Period::Aug => Month::August,
            Period::Sep => Month::September,
            Period::Oct => Month::October,
        }
    }

    /// Two-digit code used in the column names, e.g. `"03"`.
    pub fn code(self) -> String {
        format!("{:02}", self.month().number_from_month())
    }

    /// Three-letter label used on the chart axis.
    pub fn short_name(self) -> &'static str {
        &self.month().name()[..3]
    }

    pub fn demand_column(self) -> String {
        format!("SI_{}_m3", self.code())
    }

    pub fn supply_column(self) -> String {
        format!("SS_{}_m3", self.code())
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

impl Serialize for Period {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.short_name())
    }
}

/// Accepts either the column code (`"03"`, `"3"`) or the month name (`"Mar"`, `"march"`).
impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(n) = s.parse::<u32>() {
            return Period::ALL
                .into_iter()
                .find(|p| p.month().number_from_month() == n)
                .ok_or_else(|| format!("month {} is outside March..October", n));
        }
        let month = s
            .parse::<Month>()
            .map_err(|_| format!("unrecognised month '{}'", s))?;
        Period::ALL
            .into_iter()
            .find(|p| p.month() == month)
            .ok_or_else(|| format!("month '{}' is outside March..October", s))
    }
}

/// Exactly one value per period; indexing never fails.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PeriodValues([f64; 8]);

impl PeriodValues {
    pub fn new(values: [f64; 8]) -> Self {
        PeriodValues(values)
    }

    pub fn get(&self, period: Period) -> f64 {
        self.0[period.index()]
    }

    pub fn set(&mut self, period: Period, value: f64) {
        self.0[period.index()] = value;
    }

    pub fn sum_over<'a, I>(&self, periods: I) -> f64
    where
        I: IntoIterator<Item = &'a Period>,
    {
        periods.into_iter().map(|p| self.get(*p)).sum()
    }
}

/// One field parcel after cleaning. Immutable once loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldRecord {
    pub id: String,
    pub crop: String,
    pub area_ha: f64,
    pub seasonal_intensity: f64,
    pub demand: PeriodValues,
    pub supply: PeriodValues,
    pub geometry: MultiPolygon<f64>,
}

/// The user's current filter choices.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    pub crops: BTreeSet<String>,
    pub periods: BTreeSet<Period>,
}

impl Selection {
    /// First crop label and every month, the way the dashboard opens.
    pub fn dashboard_default(crop_labels: &[String]) -> Self {
        Selection {
            crops: crop_labels.iter().take(1).cloned().collect(),
            periods: Period::ALL.into_iter().collect(),
        }
    }
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct TopFieldRow {
    #[serde(rename = "Rank")]
    #[tabled(rename = "Rank")]
    pub rank: usize,
    #[serde(rename = "ID")]
    #[tabled(rename = "ID")]
    pub id: String,
    #[serde(rename = "AreaHa")]
    #[tabled(rename = "Area (ha)", display_with = "display_whole")]
    pub area_ha: f64,
    #[serde(rename = "DemandM3PerHa")]
    #[tabled(rename = "Demand (m³/ha)", display_with = "display_whole")]
    pub demand_per_ha: f64,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct MonthlyRow {
    #[serde(rename = "Month")]
    #[tabled(rename = "Month")]
    pub period: Period,
    #[serde(rename = "SupplyM3")]
    #[tabled(rename = "Supply (m³)", display_with = "display_whole")]
    pub supply_m3: f64,
    #[serde(rename = "DemandM3")]
    #[tabled(rename = "Demand (m³)", display_with = "display_whole")]
    pub demand_m3: f64,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Kpis {
    pub selected_fields: usize,
    pub total_area_ha: f64,
    pub total_demand_mln_m3: f64,
    pub total_supply_mln_m3: f64,
    pub delta_mln_m3: f64,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq)]
pub struct MapCenter {
    pub longitude: f64,
    pub latitude: f64,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Tooltip {
    pub id: String,
    pub area_ha: f64,
    pub demand_m3_per_ha: f64,
    pub demand_m3: f64,
}

fn display_whole(v: &f64) -> String {
    crate::util::format_number(*v, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_codes_cover_march_to_october() {
        let codes: Vec<String> = Period::ALL.iter().map(|p| p.code()).collect();
        assert_eq!(codes, ["03", "04", "05", "06", "07", "08", "09", "10"]);
        assert_eq!(Period::Mar.demand_column(), "SI_03_m3");
        assert_eq!(Period::Oct.supply_column(), "SS_10_m3");
        assert_eq!(Period::Sep.short_name(), "Sep");
    }

    #[test]
    fn period_parses_codes_and_names() {
        assert_eq!("03".parse::<Period>(), Ok(Period::Mar));
        assert_eq!("7".parse::<Period>(), Ok(Period::Jul));
        assert_eq!("Aug".parse::<Period>(), Ok(Period::Aug));
        assert_eq!("october".parse::<Period>(), Ok(Period::Oct));
        assert!("02".parse::<Period>().is_err());
        assert!("Dec".parse::<Period>().is_err());
        assert!("soon".parse::<Period>().is_err());
    }

    #[test]
    fn default_selection_takes_first_crop_and_all_months() {
        let labels = vec!["Cotton".to_string(), "Wheat".to_string()];
        let sel = Selection::dashboard_default(&labels);
        assert_eq!(sel.crops.len(), 1);
        assert!(sel.crops.contains("Cotton"));
        assert_eq!(sel.periods.len(), 8);

        let empty = Selection::dashboard_default(&[]);
        assert!(empty.crops.is_empty());
    }
}
