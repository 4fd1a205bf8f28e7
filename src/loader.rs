use crate::error::LoadError;
use crate::projection::{Crs, DEFAULT_AREA_EPSG, WGS84};
use crate::types::{FieldRecord, Period, PeriodValues};
use crate::util::{coerce_measure, value_as_label};
use geo::{Area, MultiPolygon, Polygon};
use geojson::feature::Id;
use geojson::{Feature, GeoJson, JsonObject, JsonValue};
use std::collections::{BTreeSet, HashSet};
use std::path::Path;
use tracing::{debug, info, warn};

pub const CROP_COLUMN: &str = "crop_en";
pub const AREA_COLUMN: &str = "area_ha";
pub const ID_COLUMN: &str = "id";
pub const INTENSITY_COLUMN: &str = "SIJ_m3ga";

/// Crop label when the dataset has no crop column at all.
pub const UNKNOWN_CROP: &str = "Unknown";
/// Crop label for individual fields with an empty crop cell.
pub const OTHER_CROP: &str = "Other";

#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// EPSG code of the metric grid used when areas have to be computed.
    pub area_epsg: u16,
}

impl Default for LoadOptions {
    fn default() -> Self {
        LoadOptions {
            area_epsg: DEFAULT_AREA_EPSG,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadReport {
    pub total_features: usize,
    /// EPSG code the source geometry was declared in.
    pub source_epsg: u16,
    pub synthesized_columns: Vec<String>,
    pub area_computed: bool,
    pub coerced_cells: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub records: Vec<FieldRecord>,
    pub report: LoadReport,
}

impl Dataset {
    /// Distinct crop labels in order of first appearance.
    pub fn crop_labels(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.records
            .iter()
            .filter(|r| seen.insert(r.crop.as_str()))
            .map(|r| r.crop.clone())
            .collect()
    }
}

/// Which attribute columns the source actually carries.
///
/// GeoJSON has no table header, so a column counts as present when any
/// feature has the key.
struct Schema {
    present: BTreeSet<String>,
}

impl Schema {
    fn reconcile(features: &[Feature]) -> Self {
        let present = features
            .iter()
            .filter_map(|f| f.properties.as_ref())
            .flat_map(|p| p.keys().cloned())
            .collect();
        Schema { present }
    }

    fn has(&self, column: &str) -> bool {
        self.present.contains(column)
    }

    /// Canonical numeric columns that will be filled with zeros.
    fn missing_numeric(&self) -> Vec<String> {
        std::iter::once(INTENSITY_COLUMN.to_string())
            .chain(
                Period::ALL
                    .iter()
                    .flat_map(|p| [p.demand_column(), p.supply_column()]),
            )
            .filter(|c| !self.has(c))
            .collect()
    }
}

pub fn load(path: &Path, opts: &LoadOptions) -> Result<Dataset, LoadError> {
    let text = std::fs::read_to_string(path).map_err(|source| LoadError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let dataset = load_from_str(&text, opts)?;
    info!(
        path = %path.display(),
        fields = dataset.records.len(),
        area_computed = dataset.report.area_computed,
        "dataset loaded"
    );
    Ok(dataset)
}

pub fn load_from_str(text: &str, opts: &LoadOptions) -> Result<Dataset, LoadError> {
    let (features, foreign) = match text.parse::<GeoJson>()? {
        GeoJson::FeatureCollection(fc) => (fc.features, fc.foreign_members),
        GeoJson::Feature(f) => (vec![f], None),
        GeoJson::Geometry(_) => return Err(LoadError::NotFeatureCollection),
    };
    let source_epsg = detect_crs(foreign.as_ref())?;
    let wgs84 = resolve_crs(WGS84, "EPSG:4326")?;
    let source = if source_epsg == WGS84 {
        None
    } else {
        Some(resolve_crs(source_epsg, &format!("EPSG:{}", source_epsg))?)
    };
    let schema = Schema::reconcile(&features);

    let mut synthesized_columns = schema.missing_numeric();
    if !schema.has(CROP_COLUMN) {
        synthesized_columns.push(CROP_COLUMN.to_string());
    }
    let area_computed = !schema.has(AREA_COLUMN);
    if area_computed {
        synthesized_columns.push(AREA_COLUMN.to_string());
    }
    let area_grid = if area_computed {
        Some(resolve_crs(opts.area_epsg, &format!("EPSG:{}", opts.area_epsg))?)
    } else {
        None
    };
    debug!(source_epsg, ?synthesized_columns, "schema reconciled");

    let total_features = features.len();
    let mut coerced_cells = 0usize;
    let mut records = Vec::with_capacity(total_features);

    for (index, feature) in features.into_iter().enumerate() {
        let mut geometry = feature_geometry(index, &feature)?;
        if let Some(source) = &source {
            geometry = source
                .reproject(&wgs84, &geometry)
                .map_err(|reason| LoadError::Reprojection { index, reason })?;
        }

        let props = feature.properties.as_ref();
        let mut measure = |column: &str| {
            let (v, coerced) = coerce_measure(props.and_then(|p| p.get(column)));
            coerced_cells += coerced as usize;
            v
        };

        let seasonal_intensity = measure(INTENSITY_COLUMN);
        let mut demand = PeriodValues::default();
        let mut supply = PeriodValues::default();
        for period in Period::ALL {
            demand.set(period, measure(period.demand_column().as_str()));
            supply.set(period, measure(period.supply_column().as_str()));
        }

        let area_ha = match &area_grid {
            Some(grid) => {
                let projected = wgs84
                    .reproject(grid, &geometry)
                    .map_err(|reason| LoadError::Reprojection { index, reason })?;
                let planar = projected.unsigned_area() / 10_000.0;
                if planar.is_finite() {
                    planar
                } else {
                    0.0
                }
            }
            None => measure(AREA_COLUMN),
        };

        let crop = if schema.has(CROP_COLUMN) {
            props
                .and_then(|p| p.get(CROP_COLUMN))
                .and_then(value_as_label)
                .unwrap_or_else(|| OTHER_CROP.to_string())
        } else {
            UNKNOWN_CROP.to_string()
        };

        records.push(FieldRecord {
            id: resolve_id(index, props, feature.id.as_ref()),
            crop,
            area_ha,
            seasonal_intensity,
            demand,
            supply,
            geometry,
        });
    }

    if coerced_cells > 0 {
        warn!(coerced_cells, "replaced unparseable values with zero");
    }

    Ok(Dataset {
        records,
        report: LoadReport {
            total_features,
            source_epsg,
            synthesized_columns,
            area_computed,
            coerced_cells,
        },
    })
}

/// Identifier policy: `id` property, then the feature id, then the position.
fn resolve_id(index: usize, props: Option<&JsonObject>, feature_id: Option<&Id>) -> String {
    if let Some(label) = props
        .and_then(|p| p.get(ID_COLUMN))
        .and_then(value_as_label)
    {
        return label;
    }
    match feature_id {
        Some(Id::String(s)) => s.clone(),
        Some(Id::Number(n)) => n.to_string(),
        None => index.to_string(),
    }
}

/// Polygon or multipolygon, flattened to 2D.
fn feature_geometry(index: usize, feature: &Feature) -> Result<MultiPolygon<f64>, LoadError> {
    let geometry = feature
        .geometry
        .as_ref()
        .ok_or(LoadError::MissingGeometry { index })?;
    // Conversion into geo types keeps only x and y of every position.
    match &geometry.value {
        v @ geojson::Value::Polygon(_) => {
            let polygon = Polygon::<f64>::try_from(v.clone())?;
            Ok(MultiPolygon::new(vec![polygon]))
        }
        v @ geojson::Value::MultiPolygon(_) => Ok(MultiPolygon::<f64>::try_from(v.clone())?),
        other => Err(LoadError::UnsupportedGeometry {
            index,
            kind: geometry_kind(other).to_string(),
        }),
    }
}

fn geometry_kind(value: &geojson::Value) -> &'static str {
    match value {
        geojson::Value::Point(_) => "Point",
        geojson::Value::MultiPoint(_) => "MultiPoint",
        geojson::Value::LineString(_) => "LineString",
        geojson::Value::MultiLineString(_) => "MultiLineString",
        geojson::Value::Polygon(_) => "Polygon",
        geojson::Value::MultiPolygon(_) => "MultiPolygon",
        geojson::Value::GeometryCollection(_) => "GeometryCollection",
    }
}

fn resolve_crs(epsg: u16, name: &str) -> Result<Crs, LoadError> {
    Crs::from_epsg(epsg).ok_or_else(|| LoadError::UnsupportedCrs(name.to_string()))
}

/// Reads the pre-RFC 7946 `crs` member, e.g.
/// `{"type": "name", "properties": {"name": "urn:ogc:def:crs:EPSG::32642"}}`.
/// No member means WGS84.
fn detect_crs(foreign: Option<&JsonObject>) -> Result<u16, LoadError> {
    let name = foreign
        .and_then(|m| m.get("crs"))
        .and_then(|crs| crs.get("properties"))
        .and_then(|p| p.get("name"))
        .and_then(JsonValue::as_str);
    let Some(name) = name else {
        return Ok(WGS84);
    };
    if name.ends_with("CRS84") {
        return Ok(WGS84);
    }
    name.rsplit(':')
        .next()
        .and_then(|c| c.trim().parse::<u16>().ok())
        .ok_or_else(|| LoadError::UnsupportedCrs(name.to_string()))
}
