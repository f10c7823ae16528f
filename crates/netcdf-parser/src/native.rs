//! Native NetCDF decoding using the netcdf library.
//!
//! The netcdf library requires a file path (it wraps libnetcdf/HDF5 which need
//! file handles). When decoding from bytes, we write to a temp file first.
//!
//! On Linux, we use `/dev/shm` (memory-backed tmpfs) to minimize I/O latency.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Once;

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{NetCdfError, NetCdfResult};
use crate::projection::{GoesProjection, ScanGeometry};

/// Name of the Cloud and Moisture Imagery field in ABI L2 products.
pub const DEFAULT_FIELD: &str = "CMI";

/// Silence HDF5's automatic error printing to stderr.
///
/// The HDF5 C library prints verbose diagnostics to stderr even when errors
/// are handled (e.g. looking up optional attributes). Call early in `main()`;
/// safe to call more than once.
pub fn silence_hdf5_errors() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        // SAFETY: H5Eset_auto2 is thread-safe and null handlers are a
        // documented way to disable error output.
        unsafe {
            hdf5_metno_sys::h5e::H5Eset_auto2(
                hdf5_metno_sys::h5e::H5E_DEFAULT,
                None,
                std::ptr::null_mut(),
            );
        }
    });
}

/// One decoded 2-D field.
#[derive(Debug, Clone)]
pub struct DecodedField {
    /// Field name that was read
    pub name: String,
    /// Number of columns
    pub width: usize,
    /// Number of rows
    pub height: usize,
    /// Physical values, row-major; fill cells are NaN
    pub values: Vec<f32>,
    /// Fixed-grid geometry, when the file carries it
    pub geometry: Option<ScanGeometry>,
}

/// Decode the named 2-D field from in-memory NetCDF bytes.
///
/// Packed values are unpacked with the field's `scale_factor`/`add_offset`;
/// cells equal to `_FillValue` become NaN.
pub fn decode_field_from_bytes(data: &[u8], field: &str) -> NetCdfResult<DecodedField> {
    silence_hdf5_errors();

    if data.is_empty() {
        return Err(NetCdfError::InvalidFormat("empty payload".to_string()));
    }

    // Removed on drop, including when the write fails
    let staged = stage_payload(&get_optimal_temp_dir(), data)?;
    decode_field_from_path(staged.path(), field)
}

/// Decode the named 2-D field from a NetCDF file on disk.
pub fn decode_field_from_path(path: &Path, field: &str) -> NetCdfResult<DecodedField> {
    silence_hdf5_errors();

    let nc_file = netcdf::open(path)
        .map_err(|e| NetCdfError::InvalidFormat(format!("Failed to open NetCDF: {}", e)))?;

    let var = nc_file
        .variable(field)
        .ok_or_else(|| NetCdfError::MissingData(format!("{} variable", field)))?;

    let dims = var.dimensions();
    if dims.len() != 2 {
        return Err(NetCdfError::InvalidFormat(format!(
            "{} has {} dimensions, expected 2",
            field,
            dims.len()
        )));
    }
    let height = dims[0].len();
    let width = dims[1].len();

    // Read as f32 so packed integer and float fields share one path
    let raw: Vec<f32> = var
        .get_values(..)
        .map_err(|e| NetCdfError::InvalidFormat(format!("Failed to read {}: {}", field, e)))?;

    if raw.len() != width * height {
        return Err(NetCdfError::InvalidFormat(format!(
            "{} holds {} values, expected {}",
            field,
            raw.len(),
            width * height
        )));
    }

    let scale_factor = get_f32_attr(&var, "scale_factor").unwrap_or(1.0);
    let add_offset = get_f32_attr(&var, "add_offset").unwrap_or(0.0);
    let fill_value = get_f32_attr(&var, "_FillValue");

    let values = raw
        .into_iter()
        .map(|v| match fill_value {
            Some(fill) if v == fill => f32::NAN,
            _ if v.is_nan() => f32::NAN,
            _ => v * scale_factor + add_offset,
        })
        .collect();

    let geometry = read_geometry(&nc_file);
    if geometry.is_none() {
        debug!(field = field, "No fixed-grid geometry in file");
    }

    Ok(DecodedField {
        name: field.to_string(),
        width,
        height,
        values,
        geometry,
    })
}

/// Scan-angle coordinates and projection, if all are present.
fn read_geometry(nc_file: &netcdf::File) -> Option<ScanGeometry> {
    let x_var = nc_file.variable("x")?;
    let y_var = nc_file.variable("y")?;
    let proj_var = nc_file.variable("goes_imager_projection")?;

    let defaults = GoesProjection::default();
    let projection = GoesProjection {
        perspective_point_height: get_f64_attr(&proj_var, "perspective_point_height")
            .unwrap_or(defaults.perspective_point_height),
        semi_major_axis: get_f64_attr(&proj_var, "semi_major_axis")
            .unwrap_or(defaults.semi_major_axis),
        semi_minor_axis: get_f64_attr(&proj_var, "semi_minor_axis")
            .unwrap_or(defaults.semi_minor_axis),
        longitude_origin: get_f64_attr(&proj_var, "longitude_of_projection_origin")
            .unwrap_or(defaults.longitude_origin),
    };

    Some(ScanGeometry {
        projection,
        x_scale: get_f64_attr(&x_var, "scale_factor")?,
        x_offset: get_f64_attr(&x_var, "add_offset")?,
        y_scale: get_f64_attr(&y_var, "scale_factor")?,
        y_offset: get_f64_attr(&y_var, "add_offset")?,
    })
}

// =============================================================================
// Internal helpers
// =============================================================================

/// Get the optimal temp directory for NetCDF file operations.
///
/// On Linux, uses /dev/shm (memory-backed tmpfs) if available for faster I/O.
/// Falls back to the system temp directory otherwise.
fn get_optimal_temp_dir() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        let shm_path = Path::new("/dev/shm");
        if shm_path.is_dir() {
            let test_path = shm_path.join(format!(".scene_nc_writable_{}", std::process::id()));
            if std::fs::write(&test_path, b"ok").is_ok() {
                let _ = std::fs::remove_file(&test_path);
                return shm_path.to_path_buf();
            }
        }
    }

    std::env::temp_dir()
}

/// Write `data` to a uniquely named `.nc` file in `dir`.
fn stage_payload(dir: &Path, data: &[u8]) -> std::io::Result<NamedTempFile> {
    let mut file = tempfile::Builder::new()
        .prefix("scene_")
        .suffix(".nc")
        .tempfile_in(dir)?;
    file.write_all(data)?;
    file.flush()?;
    Ok(file)
}

/// Check if a variable has an attribute with the given name.
/// This avoids HDF5 error spam when checking for optional attributes.
fn has_attr(var: &netcdf::Variable, name: &str) -> bool {
    var.attributes().any(|attr| attr.name() == name)
}

/// Attribute as f32, accepting any numeric storage type.
fn get_f32_attr(var: &netcdf::Variable, name: &str) -> Option<f32> {
    if !has_attr(var, name) {
        return None;
    }
    let attr_value = var.attribute_value(name)?.ok()?;
    match f32::try_from(attr_value.clone()) {
        Ok(v) => Some(v),
        Err(_) => f64::try_from(attr_value).ok().map(|v| v as f32),
    }
}

/// Attribute as f64, accepting any numeric storage type.
fn get_f64_attr(var: &netcdf::Variable, name: &str) -> Option<f64> {
    if !has_attr(var, name) {
        return None;
    }
    let attr_value = var.attribute_value(name)?.ok()?;
    match f64::try_from(attr_value.clone()) {
        Ok(v) => Some(v),
        Err(_) => f32::try_from(attr_value).ok().map(f64::from),
    }
}
