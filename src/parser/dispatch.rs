//! Dispatch nodes
//!
//! Each of these reads a key out of the header of its layer, strips that header, and hands the rest of the packet to
//! the one child registered for the key. See [`Routes`] for how the child is picked.

use std::cell::RefCell;
use std::rc::Rc;

use log::trace;

use crate::metric::Metric;
use crate::packet::{
    EthernetHeader, Ipv4Header, Network, Packet, TcpFlags, ETHERNET_HEADER_LEN, IPV4_HEADER_LEN,
    TCP_HEADER_LEN,
};
use crate::parser::{Parser, PortSets, Routes};

/// Link layer dispatch, keyed by EtherType
pub struct Ethernet {
    routes: Routes<u16>,
}

impl Ethernet {
    #[must_use]
    pub fn new(routes: Routes<u16>) -> Self {
        Self { routes }
    }
}

impl Parser for Ethernet {
    fn process(&mut self, packet: &Packet<'_>) {
        let (Some(eth), Some(payload)) = (
            EthernetHeader::parse(packet.data()),
            packet.strip(ETHERNET_HEADER_LEN),
        ) else {
            return;
        };
        self.routes.dispatch(&eth.ether_type(), &payload);
    }

    fn metrics(&self, metrics: &mut Vec<Metric>) {
        self.routes.metrics(metrics);
    }
}

/// Network to transport layer dispatch, keyed by IPv4 protocol number
///
/// Also owns the set of transport ports seen. The TCP and UDP branches record into it through their
/// [`crate::parser::PortRecorder`]s, and this node reports the totals.
pub struct Transport {
    routes: Routes<u8>,
    ports: Rc<RefCell<PortSets>>,
    source_ports: (usize, &'static str),
    dest_ports: (usize, &'static str),
}

impl Transport {
    /// `ports` must be the same sets the port recorders below `routes` were built with
    #[must_use]
    pub fn new(
        routes: Routes<u8>,
        ports: Rc<RefCell<PortSets>>,
        source_ports: (usize, &'static str),
        dest_ports: (usize, &'static str),
    ) -> Self {
        Self {
            routes,
            ports,
            source_ports,
            dest_ports,
        }
    }
}

impl Parser for Transport {
    fn process(&mut self, packet: &Packet<'_>) {
        let Some(ip) = Ipv4Header::parse(packet.data()) else {
            return;
        };
        let header_len = ip.header_len();
        if header_len < IPV4_HEADER_LEN || header_len > packet.len() {
            trace!("bad IPv4 header length {header_len} in {} bytes", packet.len());
            return;
        }
        let total_len = ip.total_len();
        // Segmentation offload leaves the total length at zero in captures taken on the sender, so fall back to
        // whatever was captured. Otherwise anything past the total length is link layer padding.
        let (segment, segment_len) = if total_len < header_len {
            trace!("IPv4 total length {total_len} shorter than header {header_len}, using captured length");
            (packet.strip(header_len), packet.len() - header_len)
        } else {
            (packet.truncate(total_len).strip(header_len), total_len - header_len)
        };
        let Some(segment) = segment else {
            return;
        };
        let network = Network {
            source: ip.source(),
            dest: ip.dest(),
            protocol: ip.protocol(),
            segment_len,
        };
        self.routes
            .dispatch(&network.protocol, &segment.with_network(network));
    }

    fn metrics(&self, metrics: &mut Vec<Metric>) {
        self.routes.metrics(metrics);
        let ports = self.ports.borrow();
        metrics.push(Metric::new(
            self.source_ports.0,
            self.source_ports.1,
            ports.source.len() as u64,
        ));
        metrics.push(Metric::new(
            self.dest_ports.0,
            self.dest_ports.1,
            ports.dest.len() as u64,
        ));
    }
}

/// TCP dispatch, keyed by the exact value of the flag byte
///
/// A segment with `PSH` and `ACK` set won't match an `ACK` route.
pub struct TcpFlagDispatch {
    routes: Routes<TcpFlags>,
}

impl TcpFlagDispatch {
    #[must_use]
    pub fn new(routes: Routes<TcpFlags>) -> Self {
        Self { routes }
    }
}

impl Parser for TcpFlagDispatch {
    fn process(&mut self, packet: &Packet<'_>) {
        if packet.len() < TCP_HEADER_LEN {
            return;
        }
        let Some(flags) = TcpFlags::parse(packet.data()) else {
            return;
        };
        let data_offset = usize::from(packet.data()[12] >> 4) * 4;
        let header_len = data_offset.clamp(TCP_HEADER_LEN, packet.len());
        if let Some(payload) = packet.strip(header_len) {
            self.routes.dispatch(&flags, &payload);
        }
    }

    fn metrics(&self, metrics: &mut Vec<Metric>) {
        self.routes.metrics(metrics);
    }
}
