//! Common types shared by every stage of the scene pipeline.

pub mod bbox;
pub mod channel;
pub mod error;
pub mod grid;
pub mod time;

pub use bbox::{BboxParseError, BoundingBox};
pub use channel::{ChannelSpec, ResolutionTier, ScanMode};
pub use error::{SceneError, SceneResult};
pub use grid::{DecodedArray, PixelWindow, ValueStats};
pub use time::{TimeKey, TimeRequest};
