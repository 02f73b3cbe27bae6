//! Acquisition metadata from .emi containers
//!
//! The .emi file is a binary container with an XML `ObjectInfo` blob
//! embedded in it. The blob carries the microscope conditions; the binary
//! payload around it is ignored (lossy UTF-8 plus pattern matching, no XML
//! parser needed for two fields).

use regex::Regex;
use std::{fs, path::Path};

use super::SeriesError;

pub(crate) struct EmiMetadata {
    /// accelerating voltage [V]
    pub voltage: f64,
    /// defocus [µm]
    pub defocus_um: f64,
}

pub(crate) fn read<P: AsRef<Path>>(path: P) -> Result<EmiMetadata, SeriesError> {
    let path = path.as_ref();
    let bytes = fs::read(path)?;
    let text = String::from_utf8_lossy(&bytes);

    let re_voltage = Regex::new(r"<AcceleratingVoltage>([^<]+)</AcceleratingVoltage>")?;
    let re_defocus = Regex::new(r"(?s)<Label>Defocus \(um\)</Label>.{0,200}?<Value>([^<]+)</Value>")?;

    let voltage = capture_number(&re_voltage, &text)
        .ok_or_else(|| SeriesError::Metadata(path.to_path_buf(), "AcceleratingVoltage"))?;
    let defocus_um = capture_number(&re_defocus, &text)
        .ok_or_else(|| SeriesError::Metadata(path.to_path_buf(), "Defocus (um)"))?;
    Ok(EmiMetadata {
        voltage,
        defocus_um,
    })
}

fn capture_number(re: &Regex, text: &str) -> Option<f64> {
    re.captures(text)
        .and_then(|capts| capts[1].trim().parse().ok())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::path::PathBuf;

    /// Binary-ish .emi payload with the XML blob in the middle
    pub(crate) fn write_emi(path: &Path, voltage: f64, defocus_um: f64) {
        let xml = format!(
            "<ObjectInfo><ExperimentalConditions><MicroscopeConditions>\
             <AcceleratingVoltage>{}</AcceleratingVoltage>\
             </MicroscopeConditions></ExperimentalConditions>\
             <ExperimentalDescription>\
             <Data><Label>Mode</Label><Value>TEM</Value><Unit></Unit></Data>\
             <Data><Label>Defocus (um)</Label><Value>{}</Value><Unit>um</Unit></Data>\
             </ExperimentalDescription></ObjectInfo>",
            voltage, defocus_um
        );
        let mut bytes = vec![0x49u8, 0x49, 0x00, 0xff, 0xfe];
        bytes.extend_from_slice(xml.as_bytes());
        bytes.extend_from_slice(&[0x00, 0x00, 0x01]);
        fs::write(path, bytes).unwrap();
    }

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("ewr-prep-emi-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn voltage_and_defocus() {
        let dir = scratch("fields");
        let path = dir.join("acq.emi");
        write_emi(&path, 300000.0, -1.25);
        let metadata = read(&path).unwrap();
        assert_eq!(metadata.voltage, 300000.0);
        assert_eq!(metadata.defocus_um, -1.25);
    }
    #[test]
    fn missing_defocus() {
        let dir = scratch("missing");
        let path = dir.join("acq.emi");
        fs::write(
            &path,
            "<AcceleratingVoltage>200000</AcceleratingVoltage>",
        )
        .unwrap();
        assert!(matches!(
            read(&path),
            Err(SeriesError::Metadata(_, "Defocus (um)"))
        ));
    }
}
