//! NetCDF decoding for GOES-R ABI scenes.
//!
//! Reads one named 2-D field (normally `CMI`, Cloud and Moisture Imagery)
//! from a NetCDF-4 container, unpacks it to physical units, and returns the
//! fixed-grid geometry needed to locate pixels on the Earth.
//!
//! `CMI` holds reflectance factors for bands 1-6 and brightness
//! temperatures (K) for bands 7-16.

pub mod error;
pub mod native;
pub mod projection;

pub use error::{NetCdfError, NetCdfResult};
pub use native::{
    decode_field_from_bytes, decode_field_from_path, silence_hdf5_errors, DecodedField,
    DEFAULT_FIELD,
};
pub use projection::{GoesProjection, ScanGeometry};
