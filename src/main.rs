// Entry point and high-level CLI flow.
//
// The dashboard runs as a small console menu:
// - Option [1] loads and cleans the field dataset, printing diagnostics.
// - Options [2] and [3] change the crop and month selection.
// - Option [4] renders the dashboard: KPI cards, monthly dynamics, the
//   thirstiest fields, and the coloured map layer written to disk.
// With `--once` the menu is skipped and a single render is produced.
mod classify;
mod config;
mod error;
mod loader;
mod output;
mod pipeline;
mod projection;
mod reports;
mod types;
mod util;

use anyhow::{Context, Result};
use clap::Parser;
use config::{Cli, Settings};
use error::LoadError;
use loader::Dataset;
use once_cell::sync::{Lazy, OnceCell};
use std::io::{self, Write};
use std::sync::Mutex;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use types::{Period, Selection};

// The dataset is read once per process; every render reuses it.
static DATASET: OnceCell<Dataset> = OnceCell::new();

// Filter choices survive between renders in a single run.
static APP_STATE: Lazy<Mutex<AppState>> = Lazy::new(|| Mutex::new(AppState { selection: None }));

struct AppState {
    selection: Option<Selection>,
}

/// Run `load` only while `cell` is empty. A failed load leaves the cell
/// empty so the next call retries.
fn cached<F>(cell: &'static OnceCell<Dataset>, load: F) -> Result<&'static Dataset, LoadError>
where
    F: FnOnce() -> Result<Dataset, LoadError>,
{
    cell.get_or_try_init(load)
}

fn dataset(settings: &Settings) -> Result<&'static Dataset, LoadError> {
    cached(&DATASET, || loader::load(&settings.data_path, &settings.load))
}

/// Current selection, falling back to the dashboard's opening selection.
fn current_selection(data: &Dataset) -> Selection {
    let state = APP_STATE.lock().unwrap_or_else(|e| e.into_inner());
    state
        .selection
        .clone()
        .unwrap_or_else(|| Selection::dashboard_default(&data.crop_labels()))
}

fn store_selection(selection: Selection) {
    let mut state = APP_STATE.lock().unwrap_or_else(|e| e.into_inner());
    state.selection = Some(selection);
}

fn prompt_line(prompt: &str) -> String {
    print!("{}", prompt);
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf.trim().to_string()
}

/// Ask the user whether to go back to the menu after rendering.
fn prompt_back_to_menu() -> bool {
    loop {
        match prompt_line("Back to Filter Selection (Y/N): ")
            .to_uppercase()
            .as_str()
        {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

/// Parse `"1, 3"` into zero-based indices below `len`. Anything else is rejected.
fn parse_indices(input: &str, len: usize) -> Option<Vec<usize>> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| match s.parse::<usize>() {
            Ok(n) if n >= 1 && n <= len => Some(n - 1),
            _ => None,
        })
        .collect()
}

/// Handle option [1]: load and clean the dataset.
fn handle_load(settings: &Settings) {
    if DATASET.get().is_some() {
        println!("Dataset already loaded.\n");
        return;
    }
    match dataset(settings) {
        Ok(data) => {
            let report = &data.report;
            println!(
                "Processing dataset... ({} fields loaded from {})",
                util::format_int(report.total_features),
                settings.data_path.display()
            );
            if report.source_epsg != projection::WGS84 {
                println!(
                    "Info: reprojected from EPSG:{} to EPSG:4326.",
                    report.source_epsg
                );
            }
            if report.area_computed {
                println!(
                    "Info: area_ha computed from geometry (EPSG:{}).",
                    settings.load.area_epsg
                );
            }
            if !report.synthesized_columns.is_empty() {
                println!(
                    "Info: {} missing columns filled with defaults.",
                    report.synthesized_columns.len()
                );
            }
            if report.coerced_cells > 0 {
                println!(
                    "Note: {} unreadable values treated as zero.",
                    util::format_int(report.coerced_cells)
                );
            }
            println!();
        }
        Err(e) => {
            eprintln!("Data Load Error: {}\n", e);
        }
    }
}

/// Handle option [2]: choose crop types. An empty answer clears the filter.
fn handle_select_crops(settings: &Settings) {
    let data = match dataset(settings) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("Data Load Error: {}\n", e);
            return;
        }
    };
    let labels = data.crop_labels();
    println!("Crop Types:");
    for (i, label) in labels.iter().enumerate() {
        println!("[{}] {}", i + 1, label);
    }
    let input = prompt_line("Select crops (e.g. 1,3; empty for all): ");
    let Some(indices) = parse_indices(&input, labels.len()) else {
        println!("Invalid selection. Crop filter unchanged.\n");
        return;
    };
    let mut selection = current_selection(data);
    selection.crops = indices.into_iter().map(|i| labels[i].clone()).collect();
    info!(crops = ?selection.crops, "crop selection changed");
    store_selection(selection);
    println!();
}

/// Handle option [3]: choose months. An empty answer selects none.
fn handle_select_months(settings: &Settings) {
    let data = match dataset(settings) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("Data Load Error: {}\n", e);
            return;
        }
    };
    println!("Months:");
    for (i, period) in Period::ALL.iter().enumerate() {
        println!("[{}] {}", i + 1, period.month().name());
    }
    let input = prompt_line("Select months (e.g. 1,2,3; 'all'; empty for none): ");
    let periods = if input.eq_ignore_ascii_case("all") {
        Period::ALL.into_iter().collect()
    } else {
        match parse_indices(&input, Period::ALL.len()) {
            Some(indices) => indices.into_iter().map(|i| Period::ALL[i]).collect(),
            None => {
                println!("Invalid selection. Months unchanged.\n");
                return;
            }
        }
    };
    let mut selection = current_selection(data);
    selection.periods = periods;
    info!(months = ?selection.periods, "month selection changed");
    store_selection(selection);
    println!();
}

/// Handle option [4]: render the dashboard for the current selection.
///
/// This function is intentionally side-effectful:
/// - writes the map layer, the top table, the monthly series and a JSON bundle,
/// - and prints previews of every panel to the console.
fn render(settings: &Settings, data: &Dataset, selection: &Selection) {
    let dash = reports::build_dashboard(&data.records, selection);
    info!(
        fields = dash.kpis.selected_fields,
        crops = selection.crops.len(),
        months = selection.periods.len(),
        "rendering dashboard"
    );

    println!("Field Water Monitoring (ET)\n");
    for line in output::kpi_lines(&dash.kpis) {
        println!("  {}", line);
    }
    println!();

    let out = &settings.out_dir;
    let map_file = out.join("fields_map.geojson");
    if let Err(e) = output::write_geojson(&map_file, &dash.map_layer) {
        eprintln!("Write error: {:#}", e);
    }
    match dash.map_center {
        Some(c) => println!(
            "Map: {} fields, centre ({:.5}, {:.5}) -> {}",
            dash.map_layer.features.len(),
            c.latitude,
            c.longitude,
            map_file.display()
        ),
        None => println!("Map: no fields in the current selection"),
    }
    let legend: Vec<String> = dash
        .severity_counts
        .iter()
        .map(|(s, n)| format!("{} {}", s, n))
        .collect();
    println!("Severity: {}\n", legend.join(" | "));

    let monthly_file = out.join("monthly_dynamics.csv");
    if let Err(e) = output::write_csv(&monthly_file, &dash.monthly) {
        eprintln!("Write error: {:#}", e);
    }
    println!("Monthly Dynamics\n");
    output::preview_table_rows(&dash.monthly, Period::ALL.len());

    let top_file = out.join("top_fields.csv");
    if let Err(e) = output::write_csv(&top_file, &dash.top_fields) {
        eprintln!("Write error: {:#}", e);
    }
    println!("Top 'Thirsty' Fields\n");
    output::preview_table_rows(&dash.top_fields, reports::TOP_N);

    let json_file = out.join("dashboard.json");
    if let Err(e) = output::write_json(&json_file, &dash) {
        eprintln!("Write error: {:#}", e);
    }
    println!("(Outputs saved to {})\n", out.display());
}

fn handle_render(settings: &Settings) {
    match dataset(settings) {
        Ok(data) => {
            let selection = current_selection(data);
            render(settings, data, &selection);
        }
        Err(e) => eprintln!("Data Load Error: {}\n", e),
    }
}

fn run_once(settings: &Settings, cli: &Cli) -> Result<()> {
    let data = dataset(settings).context("Data Load Error")?;
    let periods = if cli.months.is_empty() {
        Period::ALL.into_iter().collect()
    } else {
        cli.months.iter().copied().collect()
    };
    let selection = Selection {
        crops: cli.crops.iter().cloned().collect(),
        periods,
    };
    let unknown: Vec<&String> = selection
        .crops
        .iter()
        .filter(|c| !data.records.iter().any(|r| &r.crop == *c))
        .collect();
    if !unknown.is_empty() {
        warn!(?unknown, "selected crops do not occur in the dataset");
    }
    render(settings, data, &selection);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let settings = Settings::from_cli(&cli);
    std::fs::create_dir_all(&settings.out_dir)
        .with_context(|| format!("creating {}", settings.out_dir.display()))?;

    if cli.once {
        return run_once(&settings, &cli);
    }

    loop {
        println!("Field Water Monitoring:");
        println!("[1] Load the dataset");
        println!("[2] Select crop types");
        println!("[3] Select months");
        println!("[4] Render dashboard\n");
        match prompt_line("Enter choice: ").as_str() {
            "1" => handle_load(&settings),
            "2" => handle_select_crops(&settings),
            "3" => handle_select_months(&settings),
            "4" => {
                println!();
                handle_render(&settings);
                if !prompt_back_to_menu() {
                    println!("Exiting the program.");
                    break;
                }
            }
            _ => println!("Invalid choice. Please enter 1, 2, 3 or 4.\n"),
        }
    }
    Ok(())
}
