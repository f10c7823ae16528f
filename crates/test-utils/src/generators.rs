//! Synthetic NetCDF scenes.
//!
//! Scenes carry predictable packed values so tests can verify which cells a
//! decode or crop produced.

use std::path::Path;

/// Packed ABI-style scene to write with [`write_scene_netcdf`].
#[derive(Debug, Clone)]
pub struct FixtureScene {
    pub width: usize,
    pub height: usize,
    /// Variable name, normally `CMI`
    pub field: String,
    /// Packed values, row-major
    pub raw: Vec<i16>,
    pub scale_factor: f32,
    pub add_offset: f32,
    pub fill_value: i16,
    /// Write `x`/`y` scan angles and `goes_imager_projection`
    pub with_geometry: bool,
}

impl FixtureScene {
    /// A `width` x `height` scene where packed cell `i` holds `i`, unpacked
    /// with scale 0.01 and offset 190 (so values start at 190 K).
    pub fn ramp(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            field: "CMI".to_string(),
            raw: (0..width * height).map(|i| (i % 30000) as i16).collect(),
            scale_factor: 0.01,
            add_offset: 190.0,
            fill_value: -1,
            with_geometry: false,
        }
    }

    /// Mark cell `(row, col)` as fill.
    pub fn with_fill_at(mut self, row: usize, col: usize) -> Self {
        let idx = row * self.width + col;
        if idx < self.raw.len() {
            self.raw[idx] = self.fill_value;
        }
        self
    }

    pub fn with_geometry(mut self) -> Self {
        self.with_geometry = true;
        self
    }

    /// Unpacked value of cell `(row, col)`, `None` for fill.
    pub fn expected(&self, row: usize, col: usize) -> Option<f32> {
        let raw = self.raw[row * self.width + col];
        (raw != self.fill_value).then(|| raw as f32 * self.scale_factor + self.add_offset)
    }
}

/// Write `scene` as a NetCDF-4 file laid out like an ABI L2 granule.
pub fn write_scene_netcdf(path: &Path, scene: &FixtureScene) -> netcdf::Result<()> {
    let mut file = netcdf::create(path)?;
    file.add_dimension("y", scene.height)?;
    file.add_dimension("x", scene.width)?;

    {
        let mut var = file.add_variable::<i16>(&scene.field, &["y", "x"])?;
        var.set_fill_value(scene.fill_value)?;
        var.put_attribute("scale_factor", scene.scale_factor)?;
        var.put_attribute("add_offset", scene.add_offset)?;
        var.put_attribute("units", "K")?;
        var.put_values(&scene.raw, ..)?;
    }

    if scene.with_geometry {
        // Nominal 2 km full-disk spacing, centred on the sub-satellite point
        let step = 56e-6f64;
        let half_x = step * (scene.width as f64 - 1.0) / 2.0;
        let half_y = step * (scene.height as f64 - 1.0) / 2.0;

        {
            let mut x = file.add_variable::<i16>("x", &["x"])?;
            x.put_attribute("scale_factor", step)?;
            x.put_attribute("add_offset", -half_x)?;
            let idx: Vec<i16> = (0..scene.width as i16).collect();
            x.put_values(&idx, ..)?;
        }
        {
            let mut y = file.add_variable::<i16>("y", &["y"])?;
            y.put_attribute("scale_factor", -step)?;
            y.put_attribute("add_offset", half_y)?;
            let idx: Vec<i16> = (0..scene.height as i16).collect();
            y.put_values(&idx, ..)?;
        }
        {
            let mut proj = file.add_variable::<i32>("goes_imager_projection", &[])?;
            proj.put_attribute("perspective_point_height", 35786023.0f64)?;
            proj.put_attribute("semi_major_axis", 6378137.0f64)?;
            proj.put_attribute("semi_minor_axis", 6356752.31414f64)?;
            proj.put_attribute("longitude_of_projection_origin", -75.0f64)?;
        }
    }

    Ok(())
}

/// Bytes of a NetCDF file holding `scene`, as an object store would serve it.
pub fn scene_netcdf_bytes(scene: &FixtureScene) -> Vec<u8> {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("scene.nc");
    write_scene_netcdf(&path, scene).expect("write NetCDF fixture");
    std::fs::read(&path).expect("read NetCDF fixture")
}
