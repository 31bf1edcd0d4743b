//! Packet builders shared by the unit tests

pub use crate::packet::{ETHERTYPE_IPV4, IPPROTO_ICMP, IPPROTO_TCP, IPPROTO_UDP};

pub const MAC_A: [u8; 6] = [0x02, 0x00, 0x00, 0x00, 0x00, 0xaa];
pub const MAC_B: [u8; 6] = [0x02, 0x00, 0x00, 0x00, 0x00, 0xbb];
pub const MAC_C: [u8; 6] = [0x02, 0x00, 0x00, 0x00, 0x00, 0xcc];

pub const SYN: u8 = 0x02;
pub const SYN_ACK: u8 = 0x12;
pub const ACK: u8 = 0x10;
pub const PSH_ACK: u8 = 0x18;

/// Internet checksum of `data`, folding carries until none are left
pub fn internet_checksum(data: &[u8]) -> u16 {
    let mut sum: u32 = data
        .chunks(2)
        .map(|c| u32::from(u16::from_be_bytes([c[0], *c.get(1).unwrap_or(&0)])))
        .sum();
    while sum > 0xFFFF {
        sum = (sum >> 16) + (sum & 0xFFFF);
    }
    !(sum as u16)
}

pub fn ethernet_header(source: [u8; 6], dest: [u8; 6], ether_type: u16) -> Vec<u8> {
    let mut header = Vec::with_capacity(14);
    header.extend_from_slice(&dest);
    header.extend_from_slice(&source);
    header.extend_from_slice(&ether_type.to_be_bytes());
    header
}

/// 20 byte IPv4 header with a correct header checksum
pub fn ipv4_header(total_len: u16, protocol: u8, source: [u8; 4], dest: [u8; 4]) -> [u8; 20] {
    let mut header = [0_u8; 20];
    header[0] = 0x45;
    header[2..4].copy_from_slice(&total_len.to_be_bytes());
    header[4..6].copy_from_slice(&0xbeef_u16.to_be_bytes());
    header[6] = 0x40;
    header[8] = 64;
    header[9] = protocol;
    header[12..16].copy_from_slice(&source);
    header[16..20].copy_from_slice(&dest);
    let checksum = internet_checksum(&header);
    header[10..12].copy_from_slice(&checksum.to_be_bytes());
    header
}

/// 20 byte TCP header with a zero checksum
pub fn tcp_header(source: u16, dest: u16, flags: u8) -> Vec<u8> {
    let mut header = vec![0_u8; 20];
    header[0..2].copy_from_slice(&source.to_be_bytes());
    header[2..4].copy_from_slice(&dest.to_be_bytes());
    header[4..8].copy_from_slice(&0x0102_0304_u32.to_be_bytes());
    header[12] = 0x50;
    header[13] = flags;
    header[14..16].copy_from_slice(&0xffff_u16.to_be_bytes());
    header
}

/// UDP header followed by `payload`, with a zero checksum
pub fn udp_datagram(source: u16, dest: u16, payload: &[u8]) -> Vec<u8> {
    let len = (8 + payload.len()) as u16;
    let mut datagram = Vec::with_capacity(usize::from(len));
    datagram.extend_from_slice(&source.to_be_bytes());
    datagram.extend_from_slice(&dest.to_be_bytes());
    datagram.extend_from_slice(&len.to_be_bytes());
    datagram.extend_from_slice(&[0, 0]);
    datagram.extend_from_slice(payload);
    datagram
}

/// Fill in the transport checksum of `segment` over the IPv4 pseudo-header
pub fn seal_transport(segment: &mut [u8], protocol: u8, source: [u8; 4], dest: [u8; 4]) {
    let offset = if protocol == IPPROTO_TCP { 16 } else { 6 };
    segment[offset..offset + 2].copy_from_slice(&[0, 0]);
    let mut pseudo = Vec::new();
    pseudo.extend_from_slice(&source);
    pseudo.extend_from_slice(&dest);
    pseudo.push(0);
    pseudo.push(protocol);
    pseudo.extend_from_slice(&(segment.len() as u16).to_be_bytes());
    pseudo.extend_from_slice(segment);
    let checksum = internet_checksum(&pseudo);
    segment[offset..offset + 2].copy_from_slice(&checksum.to_be_bytes());
}

/// Ethernet + IPv4 + `segment`, zero padded up to `min_len`
pub fn ipv4_frame(
    source: [u8; 4],
    dest: [u8; 4],
    protocol: u8,
    segment: &[u8],
    min_len: usize,
) -> Vec<u8> {
    let total_len = (20 + segment.len()) as u16;
    let mut frame = ethernet_header(MAC_A, MAC_B, ETHERTYPE_IPV4);
    frame.extend_from_slice(&ipv4_header(total_len, protocol, source, dest));
    frame.extend_from_slice(segment);
    if frame.len() < min_len {
        frame.resize(min_len, 0);
    }
    frame
}

/// A TCP frame with only `flags` set, padded to the Ethernet minimum of 60 bytes
pub fn tcp_frame(source: [u8; 4], dest: [u8; 4], flags: u8) -> Vec<u8> {
    ipv4_frame(source, dest, IPPROTO_TCP, &tcp_header(40000, 80, flags), 60)
}
