//! End-to-end preparation of one EWR run
//!
//! Sequential pipeline: load the series, extract the acquisition info,
//! optionally estimate the drift, copy the .ser files into the `renamed/`
//! convention, then write the config file. Either the full config is
//! written or nothing is.

use std::path::{Path, PathBuf};

use crate::{
    config::{ConfigBuilder, Value},
    error::Error,
    info::SeriesInfo,
    rename::renamed_copy,
    series::SeriesLoader,
    shift::ShiftEstimator,
};

pub struct Setup {
    data_path: PathBuf,
    estimate_shifts: bool,
    search_radius: usize,
    alpha: Option<f64>,
    focal_spread: Option<f64>,
    spherical_aberration: Option<f64>,
    subsection: Option<(i64, i64, i64, i64)>,
    template: Option<PathBuf>,
    filename: Option<PathBuf>,
    extras: Vec<(String, Value)>,
    #[cfg(feature = "plot")]
    shift_plot: Option<PathBuf>,
}
impl Setup {
    pub fn new<P: AsRef<Path>>(data_path: P) -> Self {
        Self {
            data_path: data_path.as_ref().to_path_buf(),
            estimate_shifts: true,
            search_radius: 64,
            alpha: None,
            focal_spread: None,
            spherical_aberration: None,
            subsection: None,
            template: None,
            filename: None,
            extras: Vec::new(),
            #[cfg(feature = "plot")]
            shift_plot: None,
        }
    }
    /// Cross-correlate the series for a translation first guess (default on)
    pub fn estimate_shifts(self, estimate_shifts: bool) -> Self {
        Self {
            estimate_shifts,
            ..self
        }
    }
    pub fn search_radius(self, search_radius: usize) -> Self {
        Self {
            search_radius,
            ..self
        }
    }
    pub fn alpha(self, alpha: f64) -> Self {
        Self {
            alpha: Some(alpha),
            ..self
        }
    }
    pub fn focal_spread(self, focal_spread: f64) -> Self {
        Self {
            focal_spread: Some(focal_spread),
            ..self
        }
    }
    pub fn spherical_aberration(self, spherical_aberration: f64) -> Self {
        Self {
            spherical_aberration: Some(spherical_aberration),
            ..self
        }
    }
    pub fn subsection(self, x: i64, y: i64, width: i64, height: i64) -> Self {
        Self {
            subsection: Some((x, y, width, height)),
            ..self
        }
    }
    pub fn template<P: AsRef<Path>>(self, template: P) -> Self {
        Self {
            template: Some(template.as_ref().to_path_buf()),
            ..self
        }
    }
    pub fn filename<P: AsRef<Path>>(self, filename: P) -> Self {
        Self {
            filename: Some(filename.as_ref().to_path_buf()),
            ..self
        }
    }
    /// Any other EWR config entry, passed through verbatim
    pub fn set<K: Into<String>, V: Into<Value>>(mut self, key: K, value: V) -> Self {
        self.extras.push((key.into(), value.into()));
        self
    }
    /// Chart of the estimated drift trajectory
    #[cfg(feature = "plot")]
    pub fn shift_plot<P: AsRef<Path>>(self, path: P) -> Self {
        Self {
            shift_plot: Some(path.as_ref().to_path_buf()),
            ..self
        }
    }
    /// Runs the pipeline, returning the absolute path of the written config
    pub fn run(self) -> Result<PathBuf, Error> {
        let series = SeriesLoader::default().data_path(&self.data_path).load()?;
        let info = SeriesInfo::extract(&series)?;
        let (hint_images, shifts) = if self.estimate_shifts {
            let shifts = ShiftEstimator::default()
                .search_radius(self.search_radius)
                .estimate(&series)?;
            ((1..info.n).collect(), shifts)
        } else {
            (Vec::new(), Vec::new())
        };
        #[cfg(feature = "plot")]
        if let Some(path) = &self.shift_plot {
            crate::plot::plot_shifts(&shifts, path);
        }
        renamed_copy(&self.data_path)?;
        let mut builder = ConfigBuilder::new(
            self.data_path.join("renamed"),
            info.voltage_kv,
            info.n,
            info.x,
            info.y,
            info.lenx,
            info.leny,
            info.focus_nm,
        )
        .translation_hints(
            hint_images,
            shifts.iter().map(|shift| shift.dx).collect(),
            shifts.iter().map(|shift| shift.dy).collect(),
        );
        if let Some(alpha) = self.alpha {
            builder = builder.alpha(alpha);
        }
        if let Some(focal_spread) = self.focal_spread {
            builder = builder.focal_spread(focal_spread);
        }
        if let Some(spherical_aberration) = self.spherical_aberration {
            builder = builder.spherical_aberration(spherical_aberration);
        }
        if let Some((x, y, width, height)) = self.subsection {
            builder = builder.subsection(x, y, width, height);
        }
        if let Some(template) = self.template {
            builder = builder.template(template);
        }
        if let Some(filename) = self.filename {
            builder = builder.filename(filename);
        }
        for (key, value) in self.extras {
            builder = builder.set(key, value);
        }
        Ok(builder.create()?)
    }
}
