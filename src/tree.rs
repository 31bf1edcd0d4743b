//! The statistics tree
//!
//! [`Statistics`] owns the full parser tree for one capture. It's built once, fed every packet in order, and asked for
//! its metrics at the end.
//!
//! The tree looks like this:
//!
//! ```text
//! root (needs 14 bytes)
//! ├── total count
//! ├── summary length
//! ├── size buckets
//! ├── unique MACs
//! └── Ethernet ── 0x0800 ── IPv4 count
//!              │            └── (needs 20 bytes)
//!              │                ├── unique IPs
//!              │                ├── L3 checksum
//!              │                └── Transport ── TCP ── TCP count
//!              │                             │         └── (needs 20 bytes) ports, checksum, flags
//!              │                             ├── UDP ── UDP count
//!              │                             │         └── (needs 8 bytes) ports, checksum
//!              │                             ├── ICMP count
//!              │                             └── other L4 count
//!              └── other ── non-IPv4 count
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use crate::metric::Metric;
use crate::packet::{
    Packet, TcpFlags, ETHERNET_HEADER_LEN, ETHERTYPE_IPV4, IPPROTO_ICMP, IPPROTO_TCP,
    IPPROTO_UDP, IPV4_HEADER_LEN, TCP_HEADER_LEN, UDP_HEADER_LEN,
};
use crate::parser::{
    Counter, Ethernet, Group, Ipv4Addresses, Ipv4Checksum, LengthSummary, MacAddresses, Parser,
    PortRecorder, PortSets, Routes, SegmentChecksum, SizeBuckets, TcpFlagDispatch, Transport,
};

/// Order and description of every metric in the catalog
pub mod catalog {
    pub type Entry = (usize, &'static str);

    pub const TOTAL: Entry = (0, "Total count");
    pub const SUMMARY_LENGTH: Entry = (1, "Summary length");
    /// First of six consecutive size bucket orders
    pub const SIZE_BUCKETS: usize = 10;
    pub const UNIQUE_SOURCE_MAC: Entry = (20, "Unique source MAC");
    pub const UNIQUE_DEST_MAC: Entry = (21, "Unique destination MAC");

    pub const IPV4: Entry = (30, "IPv4 packets");
    pub const NON_IPV4: Entry = (31, "Non-IPv4 packets");
    pub const UNIQUE_SOURCE_IP: Entry = (32, "Unique source IP");
    pub const UNIQUE_DEST_IP: Entry = (33, "Unique destination IP");
    pub const L3_CHECKSUM: Entry = (34, "L3 checksum correct");

    pub const TCP: Entry = (40, "TCP packets");
    pub const UDP: Entry = (41, "UDP packets");
    pub const ICMP: Entry = (42, "ICMP packets");
    pub const OTHER_L4: Entry = (43, "Other L4 packets");
    pub const UNIQUE_SOURCE_PORT: Entry = (44, "Unique source port");
    pub const UNIQUE_DEST_PORT: Entry = (45, "Unique destination port");
    pub const TCP_CHECKSUM: Entry = (46, "TCP checksum correct");
    pub const UDP_CHECKSUM: Entry = (47, "UDP checksum correct");

    pub const SYN: Entry = (50, "SYN");
    pub const SYN_ACK: Entry = (51, "SYN+ACK");
    pub const ACK: Entry = (52, "ACK");
    pub const FIN_ACK: Entry = (53, "FIN+ACK");
    pub const RST: Entry = (54, "RST");
    pub const RST_ACK: Entry = (55, "RST+ACK");
    pub const OTHER_FLAGS: Entry = (56, "Other TCP flags");
}

fn counter((order, description): catalog::Entry) -> Box<dyn Parser> {
    Box::new(Counter::new(order, description))
}

fn tcp_flags() -> TcpFlagDispatch {
    TcpFlagDispatch::new(Routes::new(
        vec![
            (TcpFlags::SYN, counter(catalog::SYN)),
            (TcpFlags::SYN | TcpFlags::ACK, counter(catalog::SYN_ACK)),
            (TcpFlags::ACK, counter(catalog::ACK)),
            (TcpFlags::FIN | TcpFlags::ACK, counter(catalog::FIN_ACK)),
            (TcpFlags::RST, counter(catalog::RST)),
            (TcpFlags::RST | TcpFlags::ACK, counter(catalog::RST_ACK)),
        ],
        counter(catalog::OTHER_FLAGS),
    ))
}

fn tcp(ports: &Rc<RefCell<PortSets>>) -> Group {
    let (order, description) = catalog::TCP_CHECKSUM;
    let header: Vec<Box<dyn Parser>> = vec![
        Box::new(PortRecorder::new(ports)),
        Box::new(SegmentChecksum::new(order, description)),
        Box::new(tcp_flags()),
    ];
    Group::new(vec![
        counter(catalog::TCP),
        Box::new(Group::guarded(TCP_HEADER_LEN, header)),
    ])
}

fn udp(ports: &Rc<RefCell<PortSets>>) -> Group {
    let (order, description) = catalog::UDP_CHECKSUM;
    let header: Vec<Box<dyn Parser>> = vec![
        Box::new(PortRecorder::new(ports)),
        Box::new(SegmentChecksum::new(order, description)),
    ];
    Group::new(vec![
        counter(catalog::UDP),
        Box::new(Group::guarded(UDP_HEADER_LEN, header)),
    ])
}

fn transport() -> Transport {
    let ports = Rc::new(RefCell::new(PortSets::default()));
    let routes = Routes::new(
        vec![
            (IPPROTO_TCP, Box::new(tcp(&ports)) as Box<dyn Parser>),
            (IPPROTO_UDP, Box::new(udp(&ports)) as Box<dyn Parser>),
            (IPPROTO_ICMP, counter(catalog::ICMP)),
        ],
        counter(catalog::OTHER_L4),
    );
    Transport::new(
        routes,
        ports,
        catalog::UNIQUE_SOURCE_PORT,
        catalog::UNIQUE_DEST_PORT,
    )
}

fn ipv4() -> Group {
    let (order, description) = catalog::L3_CHECKSUM;
    let header: Vec<Box<dyn Parser>> = vec![
        Box::new(Ipv4Addresses::new(
            catalog::UNIQUE_SOURCE_IP,
            catalog::UNIQUE_DEST_IP,
        )),
        Box::new(Ipv4Checksum::new(order, description)),
        Box::new(transport()),
    ];
    Group::new(vec![
        counter(catalog::IPV4),
        Box::new(Group::guarded(IPV4_HEADER_LEN, header)),
    ])
}

fn ethernet() -> Ethernet {
    Ethernet::new(Routes::new(
        vec![(ETHERTYPE_IPV4, Box::new(ipv4()) as Box<dyn Parser>)],
        counter(catalog::NON_IPV4),
    ))
}

/// Composition root of the parser tree
pub struct Statistics {
    root: Group,
}

impl Statistics {
    #[must_use]
    pub fn new() -> Self {
        let (order, description) = catalog::SUMMARY_LENGTH;
        let root = Group::guarded(
            ETHERNET_HEADER_LEN,
            vec![
                counter(catalog::TOTAL),
                Box::new(LengthSummary::new(order, description)),
                Box::new(SizeBuckets::new(catalog::SIZE_BUCKETS)),
                Box::new(MacAddresses::new(
                    catalog::UNIQUE_SOURCE_MAC,
                    catalog::UNIQUE_DEST_MAC,
                )),
                Box::new(ethernet()),
            ],
        );
        Self { root }
    }

    /// Account for a complete packet
    pub fn process(&mut self, data: &[u8]) {
        self.process_captured(data, data.len());
    }

    /// Account for a packet of which only `data` was captured out of `wire_len` bytes
    ///
    /// Packets shorter than an Ethernet header are ignored entirely.
    pub fn process_captured(&mut self, data: &[u8], wire_len: usize) {
        self.root.process(&Packet::new(data, wire_len));
    }

    /// Every metric of the tree, in construction order
    #[must_use]
    pub fn metrics(&self) -> Vec<Metric> {
        let mut metrics = Vec::new();
        self.root.metrics(&mut metrics);
        metrics
    }
}

impl Default for Statistics {
    fn default() -> Self {
        Self::new()
    }
}
