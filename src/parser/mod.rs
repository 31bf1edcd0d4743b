//! The parser tree
//!
//! Every node of the tree implements [`Parser`]. A packet enters at the root and flows down: composite nodes hand the
//! same layer to each of their children, dispatch nodes strip the current header and hand what's left to exactly one
//! child, and leaves update their statistics. Once the stream is exhausted, [`Parser::metrics`] walks the same tree
//! and collects every leaf's numbers.
//!
//! Nodes own their children outright. The tree is assembled bottom-up by [`crate::tree`] and never changes shape
//! afterwards.

use log::trace;

use crate::metric::Metric;
use crate::packet::Packet;

pub mod dispatch;
pub mod leaf;

pub use dispatch::{Ethernet, TcpFlagDispatch, Transport};
pub use leaf::{
    Counter, Ipv4Addresses, Ipv4Checksum, LengthSummary, MacAddresses, PortRecorder, PortSets,
    SegmentChecksum, SizeBuckets,
};

/// A node of the parser tree
pub trait Parser {
    /// Account for one packet
    ///
    /// `packet` starts at the layer this node is responsible for. Implementations must check the length of the layer
    /// before reading a field out of it, and must not fail: anything malformed is simply not counted.
    fn process(&mut self, packet: &Packet<'_>);

    /// Append this node's metrics, and those of its subtree, to `metrics`
    fn metrics(&self, metrics: &mut Vec<Metric>);
}

/// Composite node handing every packet to all of its children
///
/// A group can require a minimum layer length. Shorter packets stop here without any child seeing them.
pub struct Group {
    min_len: usize,
    children: Vec<Box<dyn Parser>>,
}

impl Group {
    #[must_use]
    pub fn new(children: Vec<Box<dyn Parser>>) -> Self {
        Self::guarded(0, children)
    }

    #[must_use]
    pub fn guarded(min_len: usize, children: Vec<Box<dyn Parser>>) -> Self {
        Self { min_len, children }
    }
}

impl Parser for Group {
    fn process(&mut self, packet: &Packet<'_>) {
        if packet.len() < self.min_len {
            trace!(
                "layer of {} bytes is shorter than {}, not descending",
                packet.len(),
                self.min_len
            );
            return;
        }
        for child in &mut self.children {
            child.process(packet);
        }
    }

    fn metrics(&self, metrics: &mut Vec<Metric>) {
        for child in &self.children {
            child.metrics(metrics);
        }
    }
}

/// Child selection shared by the dispatch nodes
///
/// Each route is keyed by an exact value of some header field. Packets whose key matches no route go to the fallback.
pub struct Routes<K> {
    routes: Vec<(K, Box<dyn Parser>)>,
    fallback: Box<dyn Parser>,
}

impl<K: PartialEq> Routes<K> {
    #[must_use]
    pub fn new(routes: Vec<(K, Box<dyn Parser>)>, fallback: Box<dyn Parser>) -> Self {
        Self { routes, fallback }
    }

    /// Hand `packet` to the child registered for `key`
    pub fn dispatch(&mut self, key: &K, packet: &Packet<'_>) {
        match self.routes.iter_mut().find(|(k, _)| k == key) {
            Some((_, child)) => child.process(packet),
            None => self.fallback.process(packet),
        }
    }

    /// Metrics of every route in registration order, then the fallback
    pub fn metrics(&self, metrics: &mut Vec<Metric>) {
        for (_, child) in &self.routes {
            child.metrics(metrics);
        }
        self.fallback.metrics(metrics);
    }
}
