//! Error types shared across module boundaries.
//!
//! None of these reach the user directly: the controller logs and degrades,
//! and only the window layer decides what to surface.

use std::path::PathBuf;

/// Failures of the raster surface
#[derive(thiserror::Error, Debug)]
pub enum CanvasError {
    #[error("could not capture {width}x{height} pixel buffer")]
    Capture { width: u32, height: u32 },
    #[error("image data could not be decoded: {0}")]
    Decode(#[source] image::ImageError),
    #[error("image could not be encoded: {0}")]
    Encode(#[source] image::ImageError),
}

/// Failures of the durable key-value store
#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    #[error("storage backend is unavailable: {0}")]
    Unavailable(String),
    #[error("stored value under {key:?} is malformed")]
    InvalidData { key: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Failures while handing a finished image to the user
#[derive(thiserror::Error, Debug)]
pub enum ExportError {
    #[error(transparent)]
    Encode(#[from] CanvasError),
    #[error("could not deliver {name}: {reason}")]
    Delivery { name: String, reason: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Rejected control-surface values
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ControlError {
    #[error("{0:?} is not a #rrggbb color")]
    InvalidColor(String),
    #[error("stroke width must be positive and finite, got {0}")]
    InvalidStrokeWidth(f32),
    #[error("opacity must be between 0.0 and 1.0, got {0}")]
    InvalidOpacity(f32),
    #[error("unknown tool {0:?}")]
    UnknownTool(String),
    #[error("unknown export format {0:?}")]
    UnknownFormat(String),
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("could not read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),
    #[error(transparent)]
    Control(#[from] ControlError),
    #[error("canvas size must be non-zero, got {width}x{height}")]
    EmptyCanvas { width: u32, height: u32 },
}

/// Failures loading a font for the text tool
#[derive(thiserror::Error, Debug)]
pub enum FontError {
    #[error("could not read font {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("font data is not a usable font face")]
    InvalidFace,
    #[error("no system sans-serif font found")]
    NoSystemFont,
}

/// Failures bringing up the GPU presenter
#[derive(thiserror::Error, Debug)]
pub enum RenderError {
    #[error("failed to create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),
    #[error("no suitable adapter: {0}")]
    Adapter(#[from] wgpu::RequestAdapterError),
    #[error("failed to create device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
    #[error("surface reports no supported formats")]
    NoSurfaceFormat,
}
