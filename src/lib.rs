//! Focal-series preparation for electron wave reconstruction (EWR)
//!
//! The EWR program reconstructs the electron exit wave from a focal series
//! of TEM images. This crate turns a folder of FEI/TIA `.emi`/`.ser`
//! acquisitions into the input EWR expects:
//!  - the series is loaded in lexicographic filename order,
//!  - drift between the images is estimated by cascade cross-correlation,
//!  - the `.ser` files are copied into `renamed/Image000.ser`, ...,
//!  - the acquisition parameters and shift first guesses are written to a
//!    flat key-value `config.param`, merged over a template file.
//!
//! ```no_run
//! use ewr_prep::Setup;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Setup::new("/data/series1")
//!     .spherical_aberration(-35.0)
//!     .template("default_parameters.param")
//!     .run()?;
//! println!("Created config file in {:?}", config);
//! # Ok(())
//! # }
//! ```

pub mod config;
mod error;
pub mod info;
#[cfg(feature = "plot")]
pub mod plot;
pub mod rename;
pub mod series;
mod setup;
pub mod shift;

pub use config::{Config, ConfigBuilder, ConfigError, Value};
pub use error::Error;
pub use info::{InfoError, SeriesInfo};
pub use rename::renamed_copy;
pub use series::{FocalImage, ImageSeries, SeriesError, SeriesLoader};
pub use setup::Setup;
pub use shift::{Shift, ShiftError, ShiftEstimator};
