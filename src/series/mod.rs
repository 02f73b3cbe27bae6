//! Focal-series loading
//!
//! A series lives in one folder as `.emi`/`.ser` acquisition pairs: the
//! `.emi` container carries the microscope metadata, its `_1.ser` companion
//! the pixel data. Images are ordered by the lexicographic order of the
//! `.emi` filenames; the first image is the reference image of the series.

use glob::glob;
use nalgebra::DMatrix;
use std::{
    ops::Deref,
    path::{Path, PathBuf},
    time::Instant,
};

mod emi;
mod ser;

#[derive(thiserror::Error, Debug)]
pub enum SeriesError {
    #[error("Failed to read the series file")]
    Io(#[from] std::io::Error),
    #[error("Failed to compile the metadata pattern")]
    Regex(#[from] regex::Error),
    #[error("Failed to glob the data folder")]
    Glob(#[from] glob::GlobError),
    #[error("Not a TIA series file: {0:?}")]
    Signature(PathBuf),
    #[error("Only 2D data elements are supported in {0:?} (data type id {1:#x})")]
    DataTypeId(PathBuf, i32),
    #[error("Unsupported pixel type {1} in {0:?}")]
    PixelType(PathBuf, i16),
    #[error("No data elements in {0:?}")]
    Empty(PathBuf),
    #[error("Missing {1} metadata in {0:?}")]
    Metadata(PathBuf, &'static str),
    #[error("No .ser companion found for {0:?}")]
    Companion(PathBuf),
}

/// One member of a focal series
pub struct FocalImage {
    /// pixel values, row-major
    pub data: DMatrix<f64>,
    /// pixel size [nm/px]
    pub pixel_size: f64,
    pub pixel_unit: String,
    /// accelerating voltage [V]
    pub voltage: f64,
    /// defocus [µm]
    pub defocus_um: f64,
    /// the .ser file the pixels came from
    pub path: PathBuf,
}
impl FocalImage {
    pub fn width(&self) -> usize {
        self.data.ncols()
    }
    pub fn height(&self) -> usize {
        self.data.nrows()
    }
}

/// An ordered focal series
pub struct ImageSeries(Vec<FocalImage>);
impl Deref for ImageSeries {
    type Target = Vec<FocalImage>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
impl ImageSeries {
    pub fn new(images: Vec<FocalImage>) -> Self {
        Self(images)
    }
}

/// Loads every .emi/.ser acquisition pair in a folder
pub struct SeriesLoader {
    path: PathBuf,
}
impl Default for SeriesLoader {
    fn default() -> Self {
        Self {
            path: PathBuf::from("."),
        }
    }
}
impl SeriesLoader {
    pub fn data_path<P: AsRef<Path>>(self, data_path: P) -> Self {
        Self {
            path: data_path.as_ref().to_path_buf(),
        }
    }
    pub fn load(self) -> Result<ImageSeries, SeriesError> {
        let pattern = self.path.join("*.emi");
        let mut acquisitions: Vec<PathBuf> = glob(pattern.to_str().unwrap())
            .expect("Failed to read glob pattern")
            .collect::<Result<_, _>>()?;
        acquisitions.sort();
        log::info!(
            "Loading {} acquisitions from {:?}...",
            acquisitions.len(),
            self.path
        );
        let now = Instant::now();
        let mut images = Vec::with_capacity(acquisitions.len());
        for emi_path in acquisitions {
            let metadata = emi::read(&emi_path)?;
            let ser_path = companion(&emi_path)?;
            let image = ser::read(&ser_path)?;
            images.push(FocalImage {
                data: image.data,
                pixel_size: image.pixel_size,
                pixel_unit: String::from("nm"),
                voltage: metadata.voltage,
                defocus_um: metadata.defocus_um,
                path: ser_path,
            });
        }
        log::info!("... loaded in {}ms", now.elapsed().as_millis());
        Ok(ImageSeries(images))
    }
}

/// TIA names the pixel data `<stem>_1.ser` next to `<stem>.emi`
fn companion(emi_path: &Path) -> Result<PathBuf, SeriesError> {
    let stem = emi_path.file_stem().unwrap().to_string_lossy();
    let sibling = emi_path.with_file_name(format!("{}_1.ser", stem));
    if sibling.is_file() {
        return Ok(sibling);
    }
    let fallback = emi_path.with_extension("ser");
    if fallback.is_file() {
        return Ok(fallback);
    }
    Err(SeriesError::Companion(emi_path.to_path_buf()))
}

/// Synthetic acquisition pairs shared by the module tests
#[cfg(test)]
pub(crate) mod test_support {
    use std::path::Path;

    pub(crate) fn write_pair(dir: &Path, stem: &str, voltage: f64, defocus_um: f64) {
        super::emi::tests::write_emi(&dir.join(format!("{}.emi", stem)), voltage, defocus_um);
        let pixels: Vec<u16> = (0..16).collect();
        super::ser::tests::write_ser(&dir.join(format!("{}_1.ser", stem)), &pixels, 4, 4, 5e-11);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("ewr-prep-series-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }
    fn write_pair(dir: &Path, stem: &str, defocus_um: f64) {
        test_support::write_pair(dir, stem, 300000.0, defocus_um);
    }

    #[test]
    fn series_follows_lexicographic_emi_order() {
        let dir = scratch("order");
        // deliberately created out of order
        write_pair(&dir, "acq_02", -0.9);
        write_pair(&dir, "acq_00", -1.1);
        write_pair(&dir, "acq_01", -1.0);
        let series = SeriesLoader::default().data_path(&dir).load().unwrap();
        assert_eq!(series.len(), 3);
        let defoci: Vec<f64> = series.iter().map(|img| img.defocus_um).collect();
        assert_eq!(defoci, vec![-1.1, -1.0, -0.9]);
        assert_eq!(series[0].voltage, 300000.0);
        assert_eq!(series[0].width(), 4);
        assert!((series[0].pixel_size - 0.05).abs() < 1e-12);
    }
    #[test]
    fn missing_companion_is_an_error() {
        let dir = scratch("companion");
        emi::tests::write_emi(&dir.join("lonely.emi"), 300000.0, -1.0);
        assert!(matches!(
            SeriesLoader::default().data_path(&dir).load(),
            Err(SeriesError::Companion(_))
        ));
    }
    #[test]
    fn empty_folder_loads_an_empty_series() {
        let dir = scratch("empty");
        let series = SeriesLoader::default().data_path(&dir).load().unwrap();
        assert!(series.is_empty());
    }
}
