//! Borrowed views over the headers of a raw Ethernet frame
//!
//! Nothing in this module copies packet data. A [`Packet`] is the part of a captured frame that belongs to the layer
//! currently being decoded, plus the facts earlier layers learned that later ones need. Header views like
//! [`Ipv4Header`] are only constructed after checking the slice is long enough, so their accessors never index out of
//! bounds.

use bitflags::bitflags;

/// Ethernet II header: destination MAC, source MAC, EtherType
pub const ETHERNET_HEADER_LEN: usize = 14;
pub const ETHERTYPE_IPV4: u16 = 0x0800;

/// Minimum IPv4 header, without options
pub const IPV4_HEADER_LEN: usize = 20;
pub const IPPROTO_ICMP: u8 = 1;
pub const IPPROTO_TCP: u8 = 6;
pub const IPPROTO_UDP: u8 = 17;

/// Minimum TCP header, without options
pub const TCP_HEADER_LEN: usize = 20;
pub const UDP_HEADER_LEN: usize = 8;

/// Offset of the flag byte in a TCP header
const TCP_FLAGS_OFFSET: usize = 13;

#[inline]
pub(crate) fn be_u16(data: &[u8], offset: usize) -> Option<u16> {
    let bytes = data.get(offset..offset + 2)?;
    Some(u16::from_be_bytes([bytes[0], bytes[1]]))
}

#[inline]
pub(crate) fn be_u32(data: &[u8], offset: usize) -> Option<u32> {
    let bytes = data.get(offset..offset + 4)?;
    Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

#[inline]
pub(crate) fn be_u48(data: &[u8], offset: usize) -> Option<u64> {
    let bytes = data.get(offset..offset + 6)?;
    Some(
        bytes
            .iter()
            .fold(0_u64, |acc, &byte| (acc << 8) | u64::from(byte)),
    )
}

/// Network layer facts carried down to the transport layer
///
/// These are the pseudo-header inputs for the transport checksum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Network {
    pub source: u32,
    pub dest: u32,
    pub protocol: u8,
    /// Transport segment length declared by the IPv4 total length field
    pub segment_len: usize,
}

/// The bytes of one layer of a captured packet
#[derive(Debug, Clone, Copy)]
pub struct Packet<'a> {
    data: &'a [u8],
    wire_len: usize,
    network: Option<Network>,
}

impl<'a> Packet<'a> {
    /// A whole captured frame
    ///
    /// `wire_len` is the length of the packet on the wire, which may be larger than `data` when the capture was
    /// truncated by a snapshot length.
    #[must_use]
    pub fn new(data: &'a [u8], wire_len: usize) -> Self {
        Self {
            data,
            wire_len,
            network: None,
        }
    }

    /// Bytes owned by the current layer and everything it encapsulates
    #[must_use]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[must_use]
    pub fn wire_len(&self) -> usize {
        self.wire_len
    }

    #[must_use]
    pub fn network(&self) -> Option<&Network> {
        self.network.as_ref()
    }

    /// Strip `header_len` bytes off the front
    ///
    /// Returns `None` if the current layer doesn't hold that many bytes.
    #[must_use]
    pub fn strip(&self, header_len: usize) -> Option<Packet<'a>> {
        let data = self.data.get(header_len..)?;
        Some(Self { data, ..*self })
    }

    /// Restrict the current layer to its first `len` bytes. Longer limits leave the packet untouched.
    #[must_use]
    pub fn truncate(&self, len: usize) -> Packet<'a> {
        let end = len.min(self.data.len());
        Self {
            data: &self.data[..end],
            ..*self
        }
    }

    #[must_use]
    pub fn with_network(&self, network: Network) -> Packet<'a> {
        Self {
            network: Some(network),
            ..*self
        }
    }
}

/// View of an Ethernet II header
#[derive(Debug, Clone, Copy)]
pub struct EthernetHeader<'a> {
    data: &'a [u8],
}

impl<'a> EthernetHeader<'a> {
    #[must_use]
    pub fn parse(data: &'a [u8]) -> Option<Self> {
        (data.len() >= ETHERNET_HEADER_LEN).then_some(Self { data })
    }

    /// Destination hardware address as a 48 bit integer
    #[must_use]
    pub fn dest(&self) -> u64 {
        be_u48(self.data, 0).unwrap_or_default()
    }

    /// Source hardware address as a 48 bit integer
    #[must_use]
    pub fn source(&self) -> u64 {
        be_u48(self.data, 6).unwrap_or_default()
    }

    #[must_use]
    pub fn ether_type(&self) -> u16 {
        be_u16(self.data, 12).unwrap_or_default()
    }
}

/// View of the fixed part of an IPv4 header
#[derive(Debug, Clone, Copy)]
pub struct Ipv4Header<'a> {
    data: &'a [u8],
}

impl<'a> Ipv4Header<'a> {
    /// Returns `None` if there aren't 20 bytes to look at. Options aren't validated.
    #[must_use]
    pub fn parse(data: &'a [u8]) -> Option<Self> {
        (data.len() >= IPV4_HEADER_LEN).then_some(Self { data })
    }

    /// The 20 byte fixed header
    #[must_use]
    pub fn fixed(&self) -> &'a [u8] {
        &self.data[..IPV4_HEADER_LEN]
    }

    /// Header length in bytes, from the IHL field
    #[must_use]
    pub fn header_len(&self) -> usize {
        usize::from(self.data[0] & 0xf) * 4
    }

    /// Total length of header and payload
    #[must_use]
    pub fn total_len(&self) -> usize {
        usize::from(be_u16(self.data, 2).unwrap_or_default())
    }

    #[must_use]
    pub fn protocol(&self) -> u8 {
        self.data[9]
    }

    #[must_use]
    pub fn source(&self) -> u32 {
        be_u32(self.data, 12).unwrap_or_default()
    }

    #[must_use]
    pub fn dest(&self) -> u32 {
        be_u32(self.data, 16).unwrap_or_default()
    }
}

bitflags! {
    /// TCP flag bits
    ///
    /// The control bits of the flag byte in a TCP header. The NS bit lives in the data offset byte and isn't part of
    /// this set.
    #[repr(transparent)]
    pub struct TcpFlags: u8 {
        /// Congestion window reduced
        const CWR = 0b1000_0000;
        /// ECN-Echo
        const ECE = 0b100_0000;
        /// Indicates that the urgent pointer field is set
        const URG = 0b10_0000;
        /// Indicates that the acknowledgement field of the header is significant
        const ACK = 0b10000;
        /// Indicates that there is data that needs to be forwarded to the application
        const PSH = 0b1000;
        /// Reset the connection
        const RST = 0b100;
        /// Synchronize sequence numbers
        const SYN = 0b10;
        /// Indicates that the packet is the last one from the sender
        const FIN = 0b1;
    }
}

impl TcpFlags {
    /// Read the flag byte of a TCP header
    #[must_use]
    pub fn parse(tcp: &[u8]) -> Option<Self> {
        tcp.get(TCP_FLAGS_OFFSET)
            .map(|&bits| Self::from_bits_truncate(bits))
    }
}

/// Source and destination ports at the start of a TCP or UDP header
#[must_use]
pub fn ports(transport: &[u8]) -> Option<(u16, u16)> {
    Some((be_u16(transport, 0)?, be_u16(transport, 2)?))
}
