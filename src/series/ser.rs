//! Minimal reader for the TIA/ES Vision series format (.ser)
//!
//! Little-endian container written by the FEI acquisition software. Only
//! what the pipeline needs is decoded: the header, the dimension-array
//! calibrations, and the first 2D data element.

use byteorder::{LittleEndian, ReadBytesExt};
use std::{
    fs::File,
    io::{BufReader, Read, Seek, SeekFrom},
    path::Path,
};

use super::SeriesError;

const BYTE_ORDER_MARK: i16 = 0x4949;
const SERIES_ID: i16 = 0x0197;
const DATA_TYPE_2D: i32 = 0x4122;
// offsets widen from i32 to i64 with this header version
const VERSION_LONG_OFFSETS: i16 = 0x0220;

/// One decoded 2D data element
pub(crate) struct SerImage {
    /// pixel values, row-major
    pub data: nalgebra::DMatrix<f64>,
    /// pixel size along x [nm]
    pub pixel_size: f64,
}

pub(crate) fn read<P: AsRef<Path>>(path: P) -> Result<SerImage, SeriesError> {
    let path = path.as_ref();
    let mut rdr = BufReader::new(File::open(path)?);

    let byte_order = rdr.read_i16::<LittleEndian>()?;
    let series_id = rdr.read_i16::<LittleEndian>()?;
    if byte_order != BYTE_ORDER_MARK || series_id != SERIES_ID {
        return Err(SeriesError::Signature(path.to_path_buf()));
    }
    let version = rdr.read_i16::<LittleEndian>()?;
    let data_type_id = rdr.read_i32::<LittleEndian>()?;
    if data_type_id != DATA_TYPE_2D {
        return Err(SeriesError::DataTypeId(path.to_path_buf(), data_type_id));
    }
    let _tag_type_id = rdr.read_i32::<LittleEndian>()?;
    let total_elements = rdr.read_i32::<LittleEndian>()?;
    let _valid_elements = rdr.read_i32::<LittleEndian>()?;
    let offset_array = read_offset(&mut rdr, version)?;
    let n_dimensions = rdr.read_i32::<LittleEndian>()?;
    for _ in 0..n_dimensions {
        skip_dimension_array(&mut rdr)?;
    }
    if total_elements < 1 {
        return Err(SeriesError::Empty(path.to_path_buf()));
    }

    // first element only: one .ser file per focal-series member
    rdr.seek(SeekFrom::Start(offset_array as u64))?;
    let element_offset = read_offset(&mut rdr, version)?;
    rdr.seek(SeekFrom::Start(element_offset as u64))?;

    let _calibration_offset_x = rdr.read_f64::<LittleEndian>()?;
    let calibration_delta_x = rdr.read_f64::<LittleEndian>()?;
    let _calibration_element_x = rdr.read_i32::<LittleEndian>()?;
    let _calibration_offset_y = rdr.read_f64::<LittleEndian>()?;
    let _calibration_delta_y = rdr.read_f64::<LittleEndian>()?;
    let _calibration_element_y = rdr.read_i32::<LittleEndian>()?;
    let pixel_type = rdr.read_i16::<LittleEndian>()?;
    let size_x = rdr.read_i32::<LittleEndian>()? as usize;
    let size_y = rdr.read_i32::<LittleEndian>()? as usize;
    let pixels = read_pixels(&mut rdr, path, pixel_type, size_x * size_y)?;

    Ok(SerImage {
        data: nalgebra::DMatrix::from_row_iterator(size_y, size_x, pixels.into_iter()),
        // TIA calibrations are in meters
        pixel_size: calibration_delta_x * 1e9,
    })
}

fn read_offset<R: Read>(rdr: &mut R, version: i16) -> Result<i64, SeriesError> {
    if version >= VERSION_LONG_OFFSETS {
        Ok(rdr.read_i64::<LittleEndian>()?)
    } else {
        Ok(rdr.read_i32::<LittleEndian>()? as i64)
    }
}

fn skip_dimension_array<R: Read>(rdr: &mut R) -> Result<(), SeriesError> {
    let _dimension_size = rdr.read_i32::<LittleEndian>()?;
    let _calibration_offset = rdr.read_f64::<LittleEndian>()?;
    let _calibration_delta = rdr.read_f64::<LittleEndian>()?;
    let _calibration_element = rdr.read_i32::<LittleEndian>()?;
    let description_length = rdr.read_i32::<LittleEndian>()?;
    skip_bytes(rdr, description_length as usize)?;
    let units_length = rdr.read_i32::<LittleEndian>()?;
    skip_bytes(rdr, units_length as usize)?;
    Ok(())
}

fn skip_bytes<R: Read>(rdr: &mut R, count: usize) -> Result<(), SeriesError> {
    let mut buffer = vec![0u8; count];
    rdr.read_exact(&mut buffer)?;
    Ok(())
}

fn read_pixels<R: Read>(
    rdr: &mut R,
    path: &Path,
    pixel_type: i16,
    count: usize,
) -> Result<Vec<f64>, SeriesError> {
    let mut pixels = Vec::with_capacity(count);
    match pixel_type {
        1 => {
            for _ in 0..count {
                pixels.push(rdr.read_u8()? as f64);
            }
        }
        2 => {
            for _ in 0..count {
                pixels.push(rdr.read_u16::<LittleEndian>()? as f64);
            }
        }
        3 => {
            for _ in 0..count {
                pixels.push(rdr.read_u32::<LittleEndian>()? as f64);
            }
        }
        4 => {
            for _ in 0..count {
                pixels.push(rdr.read_i8()? as f64);
            }
        }
        5 => {
            for _ in 0..count {
                pixels.push(rdr.read_i16::<LittleEndian>()? as f64);
            }
        }
        6 => {
            for _ in 0..count {
                pixels.push(rdr.read_i32::<LittleEndian>()? as f64);
            }
        }
        7 => {
            for _ in 0..count {
                pixels.push(rdr.read_f32::<LittleEndian>()? as f64);
            }
        }
        8 => {
            for _ in 0..count {
                pixels.push(rdr.read_f64::<LittleEndian>()?);
            }
        }
        dtype => return Err(SeriesError::PixelType(path.to_path_buf(), dtype)),
    }
    Ok(pixels)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use byteorder::WriteBytesExt;
    use std::io::Write;
    use std::path::PathBuf;

    /// Writes a version 0x0210 single-element 2D series with u16 pixels
    pub(crate) fn write_ser(path: &Path, pixels: &[u16], size_x: usize, size_y: usize, delta_m: f64) {
        assert_eq!(pixels.len(), size_x * size_y);
        let mut header = Vec::new();
        header.write_i16::<LittleEndian>(BYTE_ORDER_MARK).unwrap();
        header.write_i16::<LittleEndian>(SERIES_ID).unwrap();
        header.write_i16::<LittleEndian>(0x0210).unwrap();
        header.write_i32::<LittleEndian>(DATA_TYPE_2D).unwrap();
        header.write_i32::<LittleEndian>(0x4152).unwrap(); // time tags
        header.write_i32::<LittleEndian>(1).unwrap(); // total
        header.write_i32::<LittleEndian>(1).unwrap(); // valid
        // offset array location: header (30) + one dimension array (32)
        let offset_array = 30 + 32;
        header.write_i32::<LittleEndian>(offset_array).unwrap();
        header.write_i32::<LittleEndian>(1).unwrap(); // dimensions
        // dimension array: size, offset, delta, element, empty strings
        header.write_i32::<LittleEndian>(1).unwrap();
        header.write_f64::<LittleEndian>(0.0).unwrap();
        header.write_f64::<LittleEndian>(1.0).unwrap();
        header.write_i32::<LittleEndian>(0).unwrap();
        header.write_i32::<LittleEndian>(0).unwrap();
        header.write_i32::<LittleEndian>(0).unwrap();
        assert_eq!(header.len(), offset_array as usize);
        // data offset array: one i32 element offset, one i32 tag offset
        let element_offset = offset_array + 8;
        header.write_i32::<LittleEndian>(element_offset).unwrap();
        header.write_i32::<LittleEndian>(0).unwrap();
        // 2D element
        header.write_f64::<LittleEndian>(0.0).unwrap();
        header.write_f64::<LittleEndian>(delta_m).unwrap();
        header.write_i32::<LittleEndian>(0).unwrap();
        header.write_f64::<LittleEndian>(0.0).unwrap();
        header.write_f64::<LittleEndian>(delta_m).unwrap();
        header.write_i32::<LittleEndian>(0).unwrap();
        header.write_i16::<LittleEndian>(2).unwrap(); // u16 pixels
        header.write_i32::<LittleEndian>(size_x as i32).unwrap();
        header.write_i32::<LittleEndian>(size_y as i32).unwrap();
        for &pixel in pixels {
            header.write_u16::<LittleEndian>(pixel).unwrap();
        }
        let mut file = File::create(path).unwrap();
        file.write_all(&header).unwrap();
    }

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("ewr-prep-ser-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn read_synthetic_series_file() {
        let dir = scratch("read");
        let path = dir.join("acq_1.ser");
        let pixels: Vec<u16> = (0..12).collect();
        write_ser(&path, &pixels, 4, 3, 5.12e-11);
        let image = read(&path).unwrap();
        assert_eq!(image.data.ncols(), 4);
        assert_eq!(image.data.nrows(), 3);
        // row-major order: element (row 1, col 2) is pixel index 6
        assert_eq!(image.data[(1, 2)], 6.0);
        assert!((image.pixel_size - 0.0512).abs() < 1e-12);
    }
    #[test]
    fn rejects_foreign_files() {
        let dir = scratch("foreign");
        let path = dir.join("not_a_series.ser");
        std::fs::write(&path, b"PNG somethingsomething").unwrap();
        assert!(matches!(read(&path), Err(SeriesError::Signature(_))));
    }
}
