//! Aggregate statistics over captured Ethernet traffic
//!
//! Build a [`Statistics`] tree, feed it every packet of a capture in order, then collect its [`Metric`]s. The tree
//! counts packets and bytes, sorts packet sizes into buckets, tracks distinct MAC, IPv4 and port values, counts
//! network and transport protocols and TCP flag combinations, and checks IPv4, TCP and UDP checksums.
//!
//! The [`capture`] module runs that loop over pcap files, and [`report`] prints the result.
//!
//! IPv6, VLAN tags and IP fragments are not decoded. Such packets are still counted at the layers that were understood.

pub mod capture;
pub mod checksum;
pub mod metric;
pub mod packet;
pub mod parser;
pub mod report;
pub mod tree;

#[cfg(test)]
mod testing;

pub use capture::{capture_files, process_file, CaptureError};
pub use metric::Metric;
pub use tree::Statistics;
