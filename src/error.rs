use crate::{config::ConfigError, info::InfoError, series::SeriesError, shift::ShiftError};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Error in the `config` module")]
    Config(#[from] ConfigError),
    #[error("Error in the `series` module")]
    Series(#[from] SeriesError),
    #[error("Error in the `info` module")]
    Info(#[from] InfoError),
    #[error("Error in the `shift` module")]
    Shift(#[from] ShiftError),
    #[error("Failed to copy the series files")]
    Io(#[from] std::io::Error),
}
