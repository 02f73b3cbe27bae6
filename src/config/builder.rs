use std::path::{self, Path, PathBuf};

use super::{Config, ConfigError, Value};

/// Assembles the config file for one reconstruction run
///
/// Default template values are loaded first, then the acquisition
/// parameters, then any caller extras, so later settings override earlier
/// ones. The subsection defaults to `(0, 0, -1, -1)`: a negative width or
/// height is the "full image" sentinel the reconstruction program expects,
/// not a literal dimension.
pub struct ConfigBuilder {
    folder: PathBuf,
    voltage: i64,
    n: usize,
    x: usize,
    y: usize,
    lenx: f64,
    leny: f64,
    focus: Vec<f64>,
    alpha: f64,
    focal_spread: f64,
    spherical_aberration: f64,
    subsection: (i64, i64, i64, i64),
    hint_images: Vec<usize>,
    hint_shift_x: Vec<f64>,
    hint_shift_y: Vec<f64>,
    extras: Vec<(String, Value)>,
    template: PathBuf,
    filename: PathBuf,
}
impl ConfigBuilder {
    #[allow(clippy::too_many_arguments)]
    pub fn new<P: AsRef<Path>>(
        folder: P,
        voltage: i64,
        n: usize,
        x: usize,
        y: usize,
        lenx: f64,
        leny: f64,
        focus: Vec<f64>,
    ) -> Self {
        Self {
            folder: folder.as_ref().to_path_buf(),
            voltage,
            n,
            x,
            y,
            lenx,
            leny,
            focus,
            alpha: 4e-4,
            focal_spread: 4f64,
            spherical_aberration: -40f64,
            subsection: (0, 0, -1, -1),
            hint_images: Vec::new(),
            hint_shift_x: Vec::new(),
            hint_shift_y: Vec::new(),
            extras: Vec::new(),
            template: PathBuf::from("default_parameters.param"),
            filename: PathBuf::from("config.param"),
        }
    }
    /// Beam spread (spatial coherence) [mrad]
    pub fn alpha(self, alpha: f64) -> Self {
        Self { alpha, ..self }
    }
    /// Defocus spread (temporal coherence) [nm]
    pub fn focal_spread(self, focal_spread: f64) -> Self {
        Self {
            focal_spread,
            ..self
        }
    }
    /// Spherical aberration constant C_s [nm]
    pub fn spherical_aberration(self, spherical_aberration: f64) -> Self {
        Self {
            spherical_aberration,
            ..self
        }
    }
    /// Rectangular subset of the data to reconstruct
    pub fn subsection(self, x: i64, y: i64, width: i64, height: i64) -> Self {
        Self {
            subsection: (x, y, width, height),
            ..self
        }
    }
    /// First-guess translations from the shift estimation
    pub fn translation_hints(
        self,
        images: Vec<usize>,
        shift_x: Vec<f64>,
        shift_y: Vec<f64>,
    ) -> Self {
        Self {
            hint_images: images,
            hint_shift_x: shift_x,
            hint_shift_y: shift_y,
            ..self
        }
    }
    /// Path to the default template config file
    pub fn template<P: AsRef<Path>>(self, template: P) -> Self {
        Self {
            template: template.as_ref().to_path_buf(),
            ..self
        }
    }
    /// Path the config file is written to
    pub fn filename<P: AsRef<Path>>(self, filename: P) -> Self {
        Self {
            filename: filename.as_ref().to_path_buf(),
            ..self
        }
    }
    /// Any other entry of the EWR config file, set verbatim
    pub fn set<K: Into<String>, V: Into<Value>>(mut self, key: K, value: V) -> Self {
        self.extras.push((key.into(), value.into()));
        self
    }
    /// Merges the template with the acquisition parameters
    ///
    /// Fails if the template cannot be read; no partial config is produced.
    pub fn build(self) -> Result<Config, ConfigError> {
        let mut config = match Config::load(&self.template) {
            Ok(config) => config,
            Err(ConfigError::Io(source)) => {
                return Err(ConfigError::Template(source, self.template))
            }
            Err(e) => return Err(e),
        };
        let folder = path::absolute(&self.folder)?;
        config.set("inputDataFile", format!("\"{}\"", folder.display()));
        config.set("AcceleratingVoltage", self.voltage);
        config.set("alpha", self.alpha);
        config.set("FocalSpread", self.focal_spread);
        config.set("SphericalAberration", self.spherical_aberration);
        config.set("N", self.n);
        config.set("X", self.x);
        config.set("Y", self.y);
        config.set("lenX", self.lenx);
        config.set("lenY", self.leny);
        config.set("Focus", self.focus);
        config.set("subsection_x", self.subsection.0);
        config.set("subsection_y", self.subsection.1);
        config.set("subsection_width", self.subsection.2);
        config.set("subsection_height", self.subsection.3);
        config.set("initialGuess_TranslationHint_Img", self.hint_images);
        config.set("initialGuess_TranslationHint_ShiftX", self.hint_shift_x);
        config.set("initialGuess_TranslationHint_ShiftY", self.hint_shift_y);
        for (key, value) in self.extras {
            config.set(key, value);
        }
        Ok(config)
    }
    /// Builds the config and writes it, returning the absolute path written
    pub fn create(self) -> Result<PathBuf, ConfigError> {
        let filename = self.filename.clone();
        let config = self.build()?;
        config.save(&filename)?;
        let written = path::absolute(&filename)?;
        log::info!("Created config file in {:?}", written);
        Ok(written)
    }
}
