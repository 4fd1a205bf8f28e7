use crate::loader::LoadOptions;
use crate::projection::{utm_epsg, DEFAULT_AREA_EPSG};
use crate::types::Period;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Field water monitoring dashboard (ET demand vs irrigation supply)", long_about = None)]
pub struct Cli {
    /// GeoJSON dataset of field polygons
    #[arg(long, default_value = "Test-area.geojson")]
    pub data: PathBuf,

    /// Directory the map layer, tables and dashboard JSON are written to
    #[arg(long, default_value = ".")]
    pub out_dir: PathBuf,

    /// UTM zone used to compute areas when the dataset has no area_ha column
    #[arg(long, default_value_t = 42, value_parser = clap::value_parser!(u8).range(1..=60))]
    pub utm_zone: u8,

    /// The area UTM zone is in the southern hemisphere
    #[arg(long)]
    pub southern: bool,

    /// Crop label to select (repeatable)
    #[arg(long = "crop")]
    pub crops: Vec<String>,

    /// Month to select, as `03`..`10` or `Mar`..`Oct` (repeatable)
    #[arg(long = "month")]
    pub months: Vec<Period>,

    /// Render once with the given selection and exit
    #[arg(long)]
    pub once: bool,

    /// Debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub data_path: PathBuf,
    pub out_dir: PathBuf,
    pub load: LoadOptions,
}

impl Settings {
    pub fn from_cli(cli: &Cli) -> Self {
        // The range check in the parser guarantees a valid zone number.
        let area_epsg = utm_epsg(cli.utm_zone, cli.southern).unwrap_or(DEFAULT_AREA_EPSG);
        Settings {
            data_path: cli.data.clone(),
            out_dir: cli.out_dir.clone(),
            load: LoadOptions { area_epsg },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_study_region() {
        let cli = Cli::parse_from(["fwm"]);
        let settings = Settings::from_cli(&cli);
        assert_eq!(settings.data_path, PathBuf::from("Test-area.geojson"));
        assert_eq!(settings.load.area_epsg, 32642);
        assert!(!cli.once);
    }

    #[test]
    fn parses_repeated_selections() {
        let cli = Cli::parse_from([
            "fwm", "--crop", "Cotton", "--crop", "Wheat", "--month", "03", "--month", "Jul",
            "--utm-zone", "43", "--once",
        ]);
        assert_eq!(cli.crops, ["Cotton", "Wheat"]);
        assert_eq!(cli.months, [Period::Mar, Period::Jul]);
        assert_eq!(Settings::from_cli(&cli).load.area_epsg, 32643);
        assert!(cli.once);
    }

    #[test]
    fn rejects_months_outside_the_season() {
        assert!(Cli::try_parse_from(["fwm", "--month", "12"]).is_err());
        assert!(Cli::try_parse_from(["fwm", "--utm-zone", "0"]).is_err());
    }
}
