use std::path::PathBuf;
use thiserror::Error;

/// Reasons the dataset cannot be turned into field records.
///
/// Everything else (bad cells, missing attribute columns, zero areas) is
/// repaired during loading and never surfaces here.
#[derive(Error, Debug)]
pub enum LoadError {
    /// The dataset file could not be opened or read
    #[error("cannot open dataset {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid GeoJSON
    #[error("failed to parse GeoJSON: {0}")]
    Parse(#[from] geojson::Error),

    #[error("expected a GeoJSON FeatureCollection")]
    NotFeatureCollection,

    #[error("feature {index} has no geometry")]
    MissingGeometry { index: usize },

    #[error("feature {index} has a {kind} geometry; only polygons are supported")]
    UnsupportedGeometry { index: usize, kind: String },

    /// No projection definition is known for the declared CRS
    #[error("unsupported coordinate reference system '{0}'")]
    UnsupportedCrs(String),

    #[error("feature {index} could not be reprojected: {reason}")]
    Reprojection { index: usize, reason: String },
}
