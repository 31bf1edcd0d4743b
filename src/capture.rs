//! Compute statistics over capture files
//!
//! [`process_file`] reads every record of a pcap file through libpcap's offline reader and feeds it to a fresh
//! [`Statistics`] tree. Records are handed over with both their captured bytes and their original length, so size
//! statistics reflect the wire even for captures taken with a short snapshot length.
//!
//! All of the decoders expect Ethernet framing, so captures of any other link type are rejected up front.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use pcap::{Capture, Linktype};
use thiserror::Error;

use crate::metric::Metric;
use crate::tree::Statistics;

/// Extension of the files picked up by [`capture_files`]
pub const CAPTURE_EXTENSION: &str = "pcap";

/// Errors that can occur while reading captures
#[derive(Debug, Error)]
pub enum CaptureError {
    /// libpcap failed to open or read the file
    #[error("Failed to read capture: {0}")]
    Pcap(#[from] pcap::Error),
    /// The capture doesn't hold Ethernet frames. Contains the link type found.
    #[error("Unsupported link type {0}, expected Ethernet")]
    LinkType(i32),
    /// Failed to list a directory of captures
    #[error("Failed to list captures: {0}")]
    IOError(#[from] std::io::Error),
}

/// Compute the metric catalog of a capture file
///
/// # Errors
/// Returns an error if the file can't be opened as a capture, isn't an Ethernet capture, or a record can't be read.
pub fn process_file<P: AsRef<Path>>(path: P) -> Result<Vec<Metric>, CaptureError> {
    let path = path.as_ref();
    info!("processing {}", path.display());
    let mut capture = Capture::from_file(path)?;
    let link_type = capture.get_datalink();
    debug!("{} has link type {:?}", path.display(), link_type);
    if link_type != Linktype::ETHERNET {
        return Err(CaptureError::LinkType(link_type.0));
    }

    let mut stats = Statistics::new();
    let mut records: u64 = 0;
    loop {
        match capture.next_packet() {
            Ok(packet) => {
                stats.process_captured(packet.data, packet.header.len as usize);
                records += 1;
            }
            Err(pcap::Error::NoMorePackets) => break,
            Err(e) => return Err(e.into()),
        }
    }
    debug!("read {records} records from {}", path.display());
    Ok(stats.metrics())
}

/// Capture files directly inside `dir`, sorted by name
///
/// Only regular files with a `.pcap` extension are returned. Subdirectories are not searched.
///
/// # Errors
/// Returns an error if the directory can't be read.
pub fn capture_files<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>, CaptureError> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let is_capture = path
            .extension()
            .map_or(false, |ext| ext == CAPTURE_EXTENSION);
        if is_capture && entry.file_type()?.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod capture_testing {
    use super::*;
    use crate::testing::*;
    use crate::tree::catalog;

    /// Classic little-endian pcap file with microsecond timestamps
    fn pcap_file(link_type: u32, records: &[(&[u8], u32)]) -> Vec<u8> {
        let mut file = Vec::new();
        file.extend_from_slice(&0xa1b2_c3d4_u32.to_le_bytes());
        file.extend_from_slice(&2_u16.to_le_bytes());
        file.extend_from_slice(&4_u16.to_le_bytes());
        file.extend_from_slice(&0_u32.to_le_bytes());
        file.extend_from_slice(&0_u32.to_le_bytes());
        file.extend_from_slice(&0xFFFF_u32.to_le_bytes());
        file.extend_from_slice(&link_type.to_le_bytes());
        for (i, (data, wire_len)) in records.iter().enumerate() {
            file.extend_from_slice(&(1_700_000_000_u32 + i as u32).to_le_bytes());
            file.extend_from_slice(&0_u32.to_le_bytes());
            file.extend_from_slice(&(data.len() as u32).to_le_bytes());
            file.extend_from_slice(&wire_len.to_le_bytes());
            file.extend_from_slice(data);
        }
        file
    }

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("pcap-stats-{name}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn value(metrics: &[Metric], (order, _): catalog::Entry) -> u64 {
        metrics.iter().find(|m| m.order == order).unwrap().value
    }

    #[test]
    fn reads_ethernet_capture() {
        let dir = scratch_dir("read");
        let syn = tcp_frame([10, 0, 0, 1], [10, 0, 0, 2], SYN);
        let ack = tcp_frame([10, 0, 0, 2], [10, 0, 0, 1], ACK);
        let path = dir.join("two.pcap");
        let runt = [0_u8; 8];
        let records = [(syn.as_slice(), 60), (&ack[..54], 1400), (&runt[..], 8)];
        fs::write(&path, pcap_file(1, &records)).unwrap();

        let metrics = process_file(&path).unwrap();
        assert_eq!(value(&metrics, catalog::TOTAL), 2);
        assert_eq!(value(&metrics, catalog::SUMMARY_LENGTH), 1460);
        assert_eq!(value(&metrics, catalog::SYN), 1);
        assert_eq!(value(&metrics, catalog::ACK), 1);
        assert_eq!(value(&metrics, catalog::UNIQUE_SOURCE_IP), 2);
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn rejects_other_link_types() {
        let dir = scratch_dir("linktype");
        let path = dir.join("raw.pcap");
        fs::write(&path, pcap_file(101, &[])).unwrap();
        // libpcap reports LINKTYPE_RAW as its own DLT value, which differs between platforms
        assert!(matches!(process_file(&path), Err(CaptureError::LinkType(_))));
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn missing_file() {
        let path = std::env::temp_dir().join("pcap-stats-does-not-exist.pcap");
        assert!(matches!(process_file(path), Err(CaptureError::Pcap(_))));
    }

    #[test]
    fn missing_directory() {
        let dir = std::env::temp_dir().join("pcap-stats-no-such-directory");
        let err = capture_files(dir).unwrap_err();
        assert!(matches!(err, CaptureError::IOError(_)));
        assert!(err.to_string().starts_with("Failed to list captures: "));
    }

    #[test]
    fn lists_captures() {
        let dir = scratch_dir("list");
        fs::write(dir.join("b.pcap"), pcap_file(1, &[])).unwrap();
        fs::write(dir.join("a.pcap"), pcap_file(1, &[])).unwrap();
        fs::write(dir.join("notes.txt"), b"not a capture").unwrap();
        fs::create_dir(dir.join("nested.pcap")).unwrap();

        let files = capture_files(&dir).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_owned())
            .collect();
        assert_eq!(names, vec!["a.pcap", "b.pcap"]);
        fs::remove_dir_all(dir).unwrap();
    }
}
