//! Leaves of the parser tree
//!
//! Leaves hold all of the running state: plain counters, sums, and sets of addresses seen. None of them look past the
//! header of the layer they are attached to.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::{Rc, Weak};

use crate::checksum::Checksum;
use crate::metric::Metric;
use crate::packet::{self, EthernetHeader, Ipv4Header, Packet};
use crate::parser::Parser;

/// Counts every packet it sees
#[derive(Debug, Clone)]
pub struct Counter {
    metric: Metric,
}

impl Counter {
    #[must_use]
    pub fn new(order: usize, description: &'static str) -> Self {
        Self {
            metric: Metric::new(order, description, 0),
        }
    }

    pub fn increment(&mut self) {
        self.metric.value += 1;
    }

    #[must_use]
    pub fn metric(&self) -> Metric {
        self.metric.clone()
    }
}

impl Parser for Counter {
    fn process(&mut self, _packet: &Packet<'_>) {
        self.increment();
    }

    fn metrics(&self, metrics: &mut Vec<Metric>) {
        metrics.push(self.metric());
    }
}

/// Sum of the on-wire length of every packet
#[derive(Debug, Clone)]
pub struct LengthSummary {
    metric: Metric,
}

impl LengthSummary {
    #[must_use]
    pub fn new(order: usize, description: &'static str) -> Self {
        Self {
            metric: Metric::new(order, description, 0),
        }
    }
}

impl Parser for LengthSummary {
    fn process(&mut self, packet: &Packet<'_>) {
        self.metric.value += packet.wire_len() as u64;
    }

    fn metrics(&self, metrics: &mut Vec<Metric>) {
        metrics.push(self.metric.clone());
    }
}

/// Upper bounds (inclusive) of every bucket but the last, which is open ended
const BUCKET_BOUNDS: [usize; 5] = [64, 255, 511, 1023, 1518];

const BUCKET_NAMES: [&str; 6] = [
    "Size 0-64",
    "Size 65-255",
    "Size 256-511",
    "Size 512-1023",
    "Size 1024-1518",
    "Size 1519+",
];

/// Index of the size bucket a packet of `len` bytes falls into
///
/// The buckets are `[0,64]`, `[65,255]`, `[256,511]`, `[512,1023]`, `[1024,1518]` and `[1519,∞)`.
#[must_use]
pub fn classify(len: usize) -> usize {
    BUCKET_BOUNDS
        .iter()
        .position(|&bound| len <= bound)
        .unwrap_or(BUCKET_BOUNDS.len())
}

/// Packet count per size range, keyed by on-wire length
#[derive(Debug, Clone)]
pub struct SizeBuckets {
    buckets: Vec<Counter>,
}

impl SizeBuckets {
    /// The six buckets get consecutive orders starting at `first_order`
    #[must_use]
    pub fn new(first_order: usize) -> Self {
        let buckets = BUCKET_NAMES
            .iter()
            .enumerate()
            .map(|(i, &name)| Counter::new(first_order + i, name))
            .collect();
        Self { buckets }
    }
}

impl Parser for SizeBuckets {
    fn process(&mut self, packet: &Packet<'_>) {
        let index = classify(packet.wire_len());
        if let Some(bucket) = self.buckets.get_mut(index) {
            bucket.increment();
        }
    }

    fn metrics(&self, metrics: &mut Vec<Metric>) {
        metrics.extend(self.buckets.iter().map(Counter::metric));
    }
}

/// Distinct source and destination values of some header field
#[derive(Debug, Clone)]
struct Uniques<T> {
    source: HashSet<T>,
    dest: HashSet<T>,
    source_order: usize,
    source_description: &'static str,
    dest_order: usize,
    dest_description: &'static str,
}

impl<T: std::hash::Hash + Eq> Uniques<T> {
    fn new(
        (source_order, source_description): (usize, &'static str),
        (dest_order, dest_description): (usize, &'static str),
    ) -> Self {
        Self {
            source: HashSet::new(),
            dest: HashSet::new(),
            source_order,
            source_description,
            dest_order,
            dest_description,
        }
    }

    fn insert(&mut self, source: T, dest: T) {
        self.source.insert(source);
        self.dest.insert(dest);
    }

    fn metrics(&self, metrics: &mut Vec<Metric>) {
        metrics.push(Metric::new(
            self.source_order,
            self.source_description,
            self.source.len() as u64,
        ));
        metrics.push(Metric::new(
            self.dest_order,
            self.dest_description,
            self.dest.len() as u64,
        ));
    }
}

/// Distinct hardware addresses, read from the Ethernet header
#[derive(Debug, Clone)]
pub struct MacAddresses {
    seen: Uniques<u64>,
}

impl MacAddresses {
    #[must_use]
    pub fn new(source: (usize, &'static str), dest: (usize, &'static str)) -> Self {
        Self {
            seen: Uniques::new(source, dest),
        }
    }
}

impl Parser for MacAddresses {
    fn process(&mut self, packet: &Packet<'_>) {
        if let Some(eth) = EthernetHeader::parse(packet.data()) {
            self.seen.insert(eth.source(), eth.dest());
        }
    }

    fn metrics(&self, metrics: &mut Vec<Metric>) {
        self.seen.metrics(metrics);
    }
}

/// Distinct IPv4 addresses, read from the network header
#[derive(Debug, Clone)]
pub struct Ipv4Addresses {
    seen: Uniques<u32>,
}

impl Ipv4Addresses {
    #[must_use]
    pub fn new(source: (usize, &'static str), dest: (usize, &'static str)) -> Self {
        Self {
            seen: Uniques::new(source, dest),
        }
    }
}

impl Parser for Ipv4Addresses {
    fn process(&mut self, packet: &Packet<'_>) {
        if let Some(ip) = Ipv4Header::parse(packet.data()) {
            self.seen.insert(ip.source(), ip.dest());
        }
    }

    fn metrics(&self, metrics: &mut Vec<Metric>) {
        self.seen.metrics(metrics);
    }
}

/// Counts IPv4 headers whose header checksum is correct
///
/// Only the fixed 20 bytes are verified. Headers carrying options are checked as if the options weren't there, so
/// they will generally not be counted.
#[derive(Debug, Clone)]
pub struct Ipv4Checksum {
    correct: Counter,
}

impl Ipv4Checksum {
    #[must_use]
    pub fn new(order: usize, description: &'static str) -> Self {
        Self {
            correct: Counter::new(order, description),
        }
    }
}

impl Parser for Ipv4Checksum {
    fn process(&mut self, packet: &Packet<'_>) {
        let Some(ip) = Ipv4Header::parse(packet.data()) else {
            return;
        };
        let mut sum = Checksum::<u8, u16>::new();
        sum.append_bytes(ip.fixed());
        if sum.verify() {
            self.correct.increment();
        }
    }

    fn metrics(&self, metrics: &mut Vec<Metric>) {
        self.correct.metrics(metrics);
    }
}

/// Counts TCP segments or UDP datagrams whose checksum is correct
///
/// The sum covers the whole segment followed by the pseudo-header: segment length, protocol, and both halves of the
/// source and destination addresses. Segments cut short by the capture can't be verified and aren't counted.
/// A UDP datagram with a zero checksum field carries no checksum and isn't counted either.
#[derive(Debug, Clone)]
pub struct SegmentChecksum {
    correct: Counter,
}

impl SegmentChecksum {
    #[must_use]
    pub fn new(order: usize, description: &'static str) -> Self {
        Self {
            correct: Counter::new(order, description),
        }
    }

    fn verify(packet: &Packet<'_>) -> bool {
        let Some(network) = packet.network() else {
            return false;
        };
        if packet.len() != network.segment_len {
            return false;
        }
        // A zero UDP checksum means the sender didn't compute one
        if network.protocol == packet::IPPROTO_UDP && packet::be_u16(packet.data(), 6) == Some(0) {
            return false;
        }
        let Ok(segment_len) = u16::try_from(network.segment_len) else {
            return false;
        };
        let mut sum = Checksum::<u16, u32>::new();
        sum.append_be_words(packet.data());
        sum.append(segment_len);
        sum.append(u16::from(network.protocol));
        sum.append_u32(network.source);
        sum.append_u32(network.dest);
        sum.verify()
    }
}

impl Parser for SegmentChecksum {
    fn process(&mut self, packet: &Packet<'_>) {
        if Self::verify(packet) {
            self.correct.increment();
        }
    }

    fn metrics(&self, metrics: &mut Vec<Metric>) {
        self.correct.metrics(metrics);
    }
}

/// Distinct transport ports
///
/// Owned by [`crate::parser::Transport`], which reports them. Only the [`PortRecorder`]s of its TCP and UDP branches
/// write to it.
#[derive(Debug, Default)]
pub struct PortSets {
    pub source: HashSet<u16>,
    pub dest: HashSet<u16>,
}

/// Records the ports of a TCP or UDP header into the [`PortSets`] of the enclosing transport dispatch
#[derive(Debug, Clone)]
pub struct PortRecorder {
    ports: Weak<RefCell<PortSets>>,
}

impl PortRecorder {
    #[must_use]
    pub fn new(ports: &Rc<RefCell<PortSets>>) -> Self {
        Self {
            ports: Rc::downgrade(ports),
        }
    }
}

impl Parser for PortRecorder {
    fn process(&mut self, packet: &Packet<'_>) {
        let (Some((source, dest)), Some(ports)) = (packet::ports(packet.data()), self.ports.upgrade())
        else {
            return;
        };
        let mut ports = ports.borrow_mut();
        ports.source.insert(source);
        ports.dest.insert(dest);
    }

    fn metrics(&self, _metrics: &mut Vec<Metric>) {}
}
