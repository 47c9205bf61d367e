//! Image Export
//!
//! Encoded canvas bytes are handed to a [`FileSink`]: a directory on desktop,
//! an anchor-click download in the browser.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{ControlError, ExportError};

/// Base name of every exported file
pub const EXPORT_STEM: &str = "drawing";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Png,
    Jpeg,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Jpeg => "jpeg",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Png => "image/png",
            ExportFormat::Jpeg => "image/jpeg",
        }
    }

    /// `drawing.png` or `drawing.jpeg`
    pub fn file_name(self) -> String {
        format!("{EXPORT_STEM}.{}", self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "png" | "image/png" => Ok(ExportFormat::Png),
            "jpeg" | "jpg" | "image/jpeg" => Ok(ExportFormat::Jpeg),
            _ => Err(ControlError::UnknownFormat(s.to_owned())),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Destination for finished files
pub trait FileSink {
    fn deliver(&mut self, name: &str, mime_type: &str, bytes: &[u8]) -> Result<(), ExportError>;
}

/// Writes exports into a directory, overwriting files of the same name
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl FileSink for DirectorySink {
    fn deliver(&mut self, name: &str, _mime_type: &str, bytes: &[u8]) -> Result<(), ExportError> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(name);
        std::fs::write(&path, bytes)?;
        log::info!("Exported {} ({} bytes)", path.display(), bytes.len());
        Ok(())
    }
}

/// Triggers a browser download through a temporary object URL
#[cfg(target_arch = "wasm32")]
#[derive(Debug, Default)]
pub struct DownloadSink;

#[cfg(target_arch = "wasm32")]
impl FileSink for DownloadSink {
    fn deliver(&mut self, name: &str, mime_type: &str, bytes: &[u8]) -> Result<(), ExportError> {
        use wasm_bindgen::JsCast;

        let failed = |reason: String| ExportError::Delivery {
            name: name.to_owned(),
            reason,
        };
        let document = web_sys::window()
            .and_then(|win| win.document())
            .ok_or_else(|| failed("no document".into()))?;

        let parts = js_sys::Array::of1(&js_sys::Uint8Array::from(bytes));
        let options = web_sys::BlobPropertyBag::new();
        options.set_type(mime_type);
        let blob = web_sys::Blob::new_with_u8_array_sequence_and_options(&parts, &options)
            .map_err(|e| failed(format!("{e:?}")))?;
        let url = web_sys::Url::create_object_url_with_blob(&blob).map_err(|e| failed(format!("{e:?}")))?;

        let link = document
            .create_element("a")
            .map_err(|e| failed(format!("{e:?}")))?
            .dyn_into::<web_sys::HtmlAnchorElement>()
            .map_err(|_| failed("element is not an anchor".into()))?;
        link.set_href(&url);
        link.set_download(name);
        if let Some(body) = document.body() {
            let _ = body.append_child(&link);
            link.click();
            let _ = body.remove_child(&link);
        } else {
            link.click();
        }
        let _ = web_sys::Url::revoke_object_url(&url);

        log::info!("Download of {name} triggered ({} bytes)", bytes.len());
        Ok(())
    }
}
