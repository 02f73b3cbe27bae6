//! Acquisition parameters derived from a loaded series
//!
//! Voltage and pixel geometry are read from the reference (first) image
//! only; members of a focal series are assumed to share them. Defocus is
//! extracted per image, in series order.

use crate::series::ImageSeries;

#[derive(thiserror::Error, Debug)]
pub enum InfoError {
    #[error("Cannot extract acquisition info from an empty series")]
    EmptySeries,
}

/// Scalar and list parameters the config builder needs
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesInfo {
    /// accelerating voltage [kV], truncated
    pub voltage_kv: i64,
    /// number of images
    pub n: usize,
    /// image width [px]
    pub x: usize,
    /// image height [px]
    pub y: usize,
    /// physical width [nm]
    pub lenx: f64,
    /// physical height [nm]
    pub leny: f64,
    /// per-image defocus [nm]
    pub focus_nm: Vec<f64>,
}
impl SeriesInfo {
    pub fn extract(series: &ImageSeries) -> Result<Self, InfoError> {
        let reference = series.first().ok_or(InfoError::EmptySeries)?;
        let x = reference.width();
        let y = reference.height();
        Ok(Self {
            voltage_kv: (reference.voltage / 1e3) as i64,
            n: series.len(),
            x,
            y,
            lenx: reference.pixel_size * x as f64,
            leny: reference.pixel_size * y as f64,
            focus_nm: series.iter().map(|image| image.defocus_um * 1e3).collect(),
        })
    }
}
