//! ABI fixed-grid geometry.
//!
//! ABI scenes are gridded in scan angles (radians) as seen from the satellite:
//! - x: East-West scan angle (positive = east of nadir)
//! - y: North-South elevation angle (positive = north of equator)
//!
//! Formulas follow the GOES-R Product Definition and Users' Guide (PUG)
//! Volume 4, Section 4.2.8.

/// Geostationary projection parameters from `goes_imager_projection`.
#[derive(Debug, Clone, PartialEq)]
pub struct GoesProjection {
    /// Satellite height above the ellipsoid (meters)
    pub perspective_point_height: f64,
    /// Semi-major axis of Earth ellipsoid (meters)
    pub semi_major_axis: f64,
    /// Semi-minor axis of Earth ellipsoid (meters)
    pub semi_minor_axis: f64,
    /// Longitude of satellite nadir point (degrees)
    pub longitude_origin: f64,
}

impl Default for GoesProjection {
    fn default() -> Self {
        Self {
            perspective_point_height: 35786023.0,
            semi_major_axis: 6378137.0,
            semi_minor_axis: 6356752.31414,
            longitude_origin: -75.0, // GOES-East
        }
    }
}

impl GoesProjection {
    /// GOES-East (75.2°W).
    pub fn goes_east() -> Self {
        Self {
            longitude_origin: -75.2,
            ..Default::default()
        }
    }

    /// Scan angles (radians) to `(lon, lat)` degrees; `None` when the
    /// line of sight misses the Earth.
    pub fn to_geographic(&self, x_rad: f64, y_rad: f64) -> Option<(f64, f64)> {
        let req = self.semi_major_axis;
        let rpol = self.semi_minor_axis;
        let lambda_0 = self.longitude_origin.to_radians();
        let h_total = self.perspective_point_height + req;

        let (sin_x, cos_x) = x_rad.sin_cos();
        let (sin_y, cos_y) = y_rad.sin_cos();

        // Distance along the line of sight to the ellipsoid
        let a =
            sin_x.powi(2) + cos_x.powi(2) * (cos_y.powi(2) + (req / rpol).powi(2) * sin_y.powi(2));
        let b = -2.0 * h_total * cos_x * cos_y;
        let c = h_total.powi(2) - req.powi(2);

        let discriminant = b * b - 4.0 * a * c;
        if discriminant < 0.0 {
            return None;
        }

        let rs = (-b - discriminant.sqrt()) / (2.0 * a);

        let sx = rs * cos_x * cos_y;
        let sy = -rs * sin_x;
        let sz = rs * cos_x * sin_y;

        let lat = ((req / rpol).powi(2) * sz / (h_total - sx).hypot(sy)).atan();
        let lon = lambda_0 - sy.atan2(h_total - sx);

        Some((lon.to_degrees(), lat.to_degrees()))
    }

    /// `(lon, lat)` degrees to scan angles (radians); `None` when the point
    /// is on the far side of the Earth.
    pub fn from_geographic(&self, lon: f64, lat: f64) -> Option<(f64, f64)> {
        let req = self.semi_major_axis;
        let rpol = self.semi_minor_axis;
        let lambda_0 = self.longitude_origin.to_radians();
        let h_total = self.perspective_point_height + req;

        let lat_rad = lat.to_radians();
        let lon_rad = lon.to_radians();

        // Geocentric latitude
        let phi_c = ((rpol / req).powi(2) * lat_rad.tan()).atan();

        let e2 = 1.0 - (rpol / req).powi(2);
        let rc = rpol / (1.0 - e2 * phi_c.cos().powi(2)).sqrt();

        let sx = h_total - rc * phi_c.cos() * (lon_rad - lambda_0).cos();
        let sy = -rc * phi_c.cos() * (lon_rad - lambda_0).sin();
        let sz = rc * phi_c.sin();

        // Visible only if the satellite is above the local horizon
        let visible = h_total * (h_total - sx) >= sy.powi(2) + (req / rpol).powi(2) * sz.powi(2);
        if sx <= 0.0 || !visible {
            return None;
        }

        // Sweep-x geometry: x is the outer gimbal angle
        let r = (sx * sx + sy * sy + sz * sz).sqrt();
        let x_rad = (-sy / r).asin();
        let y_rad = (sz / sx).atan();

        Some((x_rad, y_rad))
    }
}

/// Mapping between pixel indices and scan angles for one scene.
///
/// `x = x_offset + col * x_scale`, `y = y_offset + row * y_scale`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanGeometry {
    pub projection: GoesProjection,
    pub x_scale: f64,
    pub x_offset: f64,
    pub y_scale: f64,
    pub y_offset: f64,
}

impl ScanGeometry {
    /// Scan angles at the centre of pixel `(row, col)`.
    pub fn scan_angles(&self, row: f64, col: f64) -> (f64, f64) {
        (
            self.x_offset + col * self.x_scale,
            self.y_offset + row * self.y_scale,
        )
    }

    /// Fractional `(row, col)` of a geographic point, or `None` if the point
    /// is not visible. The result may lie outside the grid.
    pub fn pixel_for(&self, lon: f64, lat: f64) -> Option<(f64, f64)> {
        if self.x_scale == 0.0 || self.y_scale == 0.0 {
            return None;
        }
        let (x, y) = self.projection.from_geographic(lon, lat)?;
        let col = (x - self.x_offset) / self.x_scale;
        let row = (y - self.y_offset) / self.y_scale;
        Some((row, col))
    }

    /// Geographic location of pixel `(row, col)`.
    pub fn lon_lat_for(&self, row: f64, col: f64) -> Option<(f64, f64)> {
        let (x, y) = self.scan_angles(row, col);
        self.projection.to_geographic(x, y)
    }

    /// Nominal full-disk geometry for a `size` x `size` grid.
    pub fn full_disk(projection: GoesProjection, size: usize) -> Self {
        // Full disk spans +-0.151872 rad in both axes
        const HALF_EXTENT: f64 = 0.151872;
        let step = 2.0 * HALF_EXTENT / size as f64;
        Self {
            projection,
            x_scale: step,
            x_offset: -HALF_EXTENT + step / 2.0,
            y_scale: -step,
            y_offset: HALF_EXTENT - step / 2.0,
        }
    }
}
