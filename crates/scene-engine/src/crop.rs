//! Reduce decoded scenes to the area of interest.

use netcdf_parser::{GoesProjection, ScanGeometry};
use scene_common::{BoundingBox, DecodedArray, PixelWindow, ResolutionTier, SceneError};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum CropError {
    #[error("Region '{0}' is not visible from the satellite")]
    RegionNotVisible(String),

    #[error("Region '{region}' lies outside this {rows}x{cols} scene")]
    OutsideScene {
        region: String,
        rows: usize,
        cols: usize,
    },

    #[error("Scene carries no scan geometry; cannot place region '{0}'")]
    MissingGeometry(String),
}

impl From<CropError> for SceneError {
    fn from(err: CropError) -> Self {
        SceneError::InvalidRequest(err.to_string())
    }
}

/// Pixel windows per resolution tier, for full-disk grids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierWindows {
    pub half_km: PixelWindow,
    pub one_km: PixelWindow,
    pub two_km: PixelWindow,
}

impl Default for TierWindows {
    /// Southern South America on each tier's full disk.
    fn default() -> Self {
        let two_km = PixelWindow::new(3500, 5250, 2250, 3950);
        let scaled = |f: usize| {
            PixelWindow::new(
                two_km.row_start * f,
                two_km.row_end * f,
                two_km.col_start * f,
                two_km.col_end * f,
            )
        };
        Self {
            half_km: scaled(4),
            one_km: scaled(2),
            two_km,
        }
    }
}

impl TierWindows {
    pub fn for_tier(&self, tier: ResolutionTier) -> &PixelWindow {
        match tier {
            ResolutionTier::HalfKm => &self.half_km,
            ResolutionTier::OneKm => &self.one_km,
            ResolutionTier::TwoKm => &self.two_km,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (ResolutionTier, &PixelWindow)> {
        [
            (ResolutionTier::HalfKm, &self.half_km),
            (ResolutionTier::OneKm, &self.one_km),
            (ResolutionTier::TwoKm, &self.two_km),
        ]
        .into_iter()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NamedRegion {
    pub name: String,
    pub bounds: BoundingBox,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CropStrategy {
    FixedOffset(TierWindows),
    Proportional { rows: [f64; 2], cols: [f64; 2] },
    Geographic {
        region: NamedRegion,
        samples_per_edge: usize,
    },
}

/// Result of a crop: the copied cells and where they came from.
#[derive(Debug, Clone)]
pub struct Cropped {
    pub array: DecodedArray,
    pub window: PixelWindow,
}

/// Computes a pixel window for a scene and copies it out.
///
/// Windows are always clamped to the scene; the output is never larger than
/// the input on either axis.
#[derive(Debug, Clone)]
pub struct RegionCropper {
    strategy: CropStrategy,
}

impl RegionCropper {
    pub fn new(strategy: CropStrategy) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> &CropStrategy {
        &self.strategy
    }

    pub fn crop(
        &self,
        array: &DecodedArray,
        tier: ResolutionTier,
        geometry: Option<&ScanGeometry>,
    ) -> Result<Cropped, CropError> {
        let window = self.window_for(array.width(), array.height(), tier, geometry)?;
        let cropped = array.window(&window);
        debug!(
            source_rows = array.height(),
            source_cols = array.width(),
            rows = cropped.height(),
            cols = cropped.width(),
            "Cropped scene"
        );
        Ok(Cropped {
            array: cropped,
            window,
        })
    }

    /// Window within a `width` x `height` grid.
    pub fn window_for(
        &self,
        width: usize,
        height: usize,
        tier: ResolutionTier,
        geometry: Option<&ScanGeometry>,
    ) -> Result<PixelWindow, CropError> {
        match &self.strategy {
            CropStrategy::FixedOffset(windows) => {
                let window = windows.for_tier(tier).clamp(width, height);
                if window.is_empty() {
                    // Grid is smaller than the tier's full disk
                    warn!(
                        ?tier,
                        width, height, "Fixed window misses the grid, keeping whole scene"
                    );
                    return Ok(PixelWindow::full(width, height));
                }
                Ok(window)
            }
            CropStrategy::Proportional { rows, cols } => {
                let span = |len: usize, [start, end]: [f64; 2]| {
                    let len_f = len as f64;
                    let a = (len_f * start.clamp(0.0, 1.0)).floor() as usize;
                    let b = (len_f * end.clamp(0.0, 1.0)).ceil() as usize;
                    (a, b.max(a + 1))
                };
                let (row_start, row_end) = span(height, *rows);
                let (col_start, col_end) = span(width, *cols);
                Ok(PixelWindow::new(row_start, row_end, col_start, col_end).clamp(width, height))
            }
            CropStrategy::Geographic {
                region,
                samples_per_edge,
            } => {
                let nominal;
                let geometry = match geometry {
                    Some(g) => g,
                    None => {
                        nominal = nominal_geometry(width, height)
                            .ok_or_else(|| CropError::MissingGeometry(region.name.clone()))?;
                        &nominal
                    }
                };
                geographic_window(region, *samples_per_edge, geometry, width, height)
            }
        }
    }
}

/// Full-disk geometry for square grids of a known tier size.
fn nominal_geometry(width: usize, height: usize) -> Option<ScanGeometry> {
    let is_full_disk = width == height
        && [
            ResolutionTier::HalfKm,
            ResolutionTier::OneKm,
            ResolutionTier::TwoKm,
        ]
        .iter()
        .any(|t| t.full_disk_size() == width);
    is_full_disk.then(|| ScanGeometry::full_disk(GoesProjection::goes_east(), width))
}

fn geographic_window(
    region: &NamedRegion,
    samples_per_edge: usize,
    geometry: &ScanGeometry,
    width: usize,
    height: usize,
) -> Result<PixelWindow, CropError> {
    let pixels: Vec<(f64, f64)> = region
        .bounds
        .perimeter_points(samples_per_edge)
        .into_iter()
        .filter_map(|(lon, lat)| geometry.pixel_for(lon, lat))
        .collect();

    if pixels.is_empty() {
        return Err(CropError::RegionNotVisible(region.name.clone()));
    }

    let (mut min_row, mut max_row) = (f64::INFINITY, f64::NEG_INFINITY);
    let (mut min_col, mut max_col) = (f64::INFINITY, f64::NEG_INFINITY);
    for (row, col) in pixels {
        min_row = min_row.min(row);
        max_row = max_row.max(row);
        min_col = min_col.min(col);
        max_col = max_col.max(col);
    }

    let lower = |v: f64| v.floor().max(0.0) as usize;
    let upper = |v: f64| (v.ceil() + 1.0).max(0.0) as usize;

    let window = PixelWindow::new(
        lower(min_row),
        upper(max_row),
        lower(min_col),
        upper(max_col),
    )
    .clamp(width, height);

    if window.is_empty() {
        return Err(CropError::OutsideScene {
            region: region.name.clone(),
            rows: height,
            cols: width,
        });
    }

    debug!(
        region = %region.name,
        ?window,
        north_west = ?geometry.lon_lat_for(window.row_start as f64, window.col_start as f64),
        south_east = ?geometry.lon_lat_for((window.row_end - 1) as f64, (window.col_end - 1) as f64),
        "Geographic crop window"
    );
    Ok(window)
}
