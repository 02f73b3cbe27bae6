//! Renamed copies for the reconstruction program
//!
//! EWR expects its input as `renamed/Image000.ser`, `Image001.ser`, ...
//! The indices follow the lexicographic order of the original filenames.
//! Reruns overwrite prior copies silently.

use glob::glob;
use std::{
    fs, io,
    path::{Path, PathBuf},
};

/// Copies every .ser file of `data_path` into `<data_path>/renamed/`,
/// creating the folder if needed, and returns the destination paths
pub fn renamed_copy<P: AsRef<Path>>(data_path: P) -> Result<Vec<PathBuf>, io::Error> {
    let data_path = data_path.as_ref();
    let pattern = data_path.join("*.ser");
    let mut sources: Vec<PathBuf> = glob(pattern.to_str().unwrap())
        .expect("Failed to read glob pattern")
        .collect::<Result<_, _>>()
        .map_err(|e| e.into_error())?;
    sources.sort();
    let folder = data_path.join("renamed");
    fs::create_dir_all(&folder)?;
    let mut copies = Vec::with_capacity(sources.len());
    for (index, source) in sources.iter().enumerate() {
        let destination = folder.join(format!("Image{:03}.ser", index));
        fs::copy(source, &destination)?;
        copies.push(destination);
    }
    log::info!("Copied {} series files into {:?}", copies.len(), folder);
    Ok(copies)
}
