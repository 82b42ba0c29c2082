//! Ethernet / IPv4 / TCP header decoders
//!
//! Each decoder consumes its header from a [`Cursor`] and returns a typed
//! header, or a [`DecodeError`] without consuming anything. Multi-byte fields
//! are decoded big-endian at the point of extraction.

use std::fmt;
use std::net::Ipv4Addr;

use crate::cursor::Cursor;
use crate::error::{DecodeError, DecodeResult, MalformedReason};

// Ethernet
pub const ETH_HLEN: usize = 14;
pub const ETHERTYPE_IPV4: u16 = 0x0800;

// IPv4
pub const IPV4_MIN_HLEN: usize = 20;
pub const IPV4_MIN_IHL: u8 = 5;
const IPV4_TOTAL_LEN_OFFSET: usize = 2;
const IPV4_PROTO_OFFSET: usize = 9;
const IPV4_SRC_OFFSET: usize = 12;
const IPV4_DST_OFFSET: usize = 16;

// L4
pub const IPPROTO_TCP: u8 = 6;
/// Source port + destination port
pub const TCP_PORTS_LEN: usize = 4;

/// 48-bit hardware address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MacAddr(pub [u8; 6]);

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            m[0], m[1], m[2], m[3], m[4], m[5]
        )
    }
}

/// Ethernet II header (14 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EthernetHeader {
    pub dst: MacAddr,
    pub src: MacAddr,
    pub ethertype: u16,
}

impl EthernetHeader {
    /// Check if the payload is IPv4
    #[inline(always)]
    pub fn is_ipv4(&self) -> bool {
        self.ethertype == ETHERTYPE_IPV4
    }
}

/// IPv4 header fields (options are skipped, not parsed)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4Header {
    /// Version nibble, as read
    pub version: u8,
    /// Header length in 32-bit words, always >= 5
    pub ihl: u8,
    pub total_len: u16,
    pub protocol: u8,
    pub src: Ipv4Addr,
    pub dst: Ipv4Addr,
}

impl Ipv4Header {
    /// Header length in bytes
    #[inline(always)]
    pub fn header_len(&self) -> usize {
        self.ihl as usize * 4
    }

    /// Check if the payload is TCP
    #[inline(always)]
    pub fn is_tcp(&self) -> bool {
        self.protocol == IPPROTO_TCP
    }
}

/// Leading TCP port pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TcpHeader {
    pub src_port: u16,
    pub dst_port: u16,
}

/// Decode the Ethernet header.
///
/// Unknown ethertypes decode fine; whether they matter is the classifier's
/// call.
#[inline]
pub fn decode_ethernet(cur: &mut Cursor<'_>) -> DecodeResult<EthernetHeader> {
    let hdr = cur.read_array::<ETH_HLEN>()?;

    let mut dst = [0u8; 6];
    let mut src = [0u8; 6];
    dst.copy_from_slice(&hdr[0..6]);
    src.copy_from_slice(&hdr[6..12]);

    Ok(EthernetHeader {
        dst: MacAddr(dst),
        src: MacAddr(src),
        ethertype: u16::from_be_bytes([hdr[12], hdr[13]]),
    })
}

/// Decode the IPv4 header, consuming `IHL * 4` bytes.
///
/// The fixed 20 bytes are checked first so IHL can be read; IHL below 5 is
/// `Malformed`. The full header length is then re-checked before any field is
/// extracted.
#[inline]
pub fn decode_ipv4(cur: &mut Cursor<'_>) -> DecodeResult<Ipv4Header> {
    let fixed = cur.peek_at(0, IPV4_MIN_HLEN)?;
    let version = fixed[0] >> 4;
    let ihl = fixed[0] & 0x0F;
    if ihl < IPV4_MIN_IHL {
        return Err(DecodeError::Malformed(MalformedReason::IhlTooSmall(ihl)));
    }

    let hdr = cur.read_fixed(ihl as usize * 4)?;

    let total_len = u16::from_be_bytes([
        hdr[IPV4_TOTAL_LEN_OFFSET],
        hdr[IPV4_TOTAL_LEN_OFFSET + 1],
    ]);
    let src = Ipv4Addr::new(
        hdr[IPV4_SRC_OFFSET],
        hdr[IPV4_SRC_OFFSET + 1],
        hdr[IPV4_SRC_OFFSET + 2],
        hdr[IPV4_SRC_OFFSET + 3],
    );
    let dst = Ipv4Addr::new(
        hdr[IPV4_DST_OFFSET],
        hdr[IPV4_DST_OFFSET + 1],
        hdr[IPV4_DST_OFFSET + 2],
        hdr[IPV4_DST_OFFSET + 3],
    );

    Ok(Ipv4Header {
        version,
        ihl,
        total_len,
        protocol: hdr[IPV4_PROTO_OFFSET],
        src,
        dst,
    })
}

/// Decode the TCP source and destination ports.
///
/// Only the first four bytes of the TCP header are required.
#[inline]
pub fn decode_tcp(cur: &mut Cursor<'_>) -> DecodeResult<TcpHeader> {
    let ports = cur.read_array::<TCP_PORTS_LEN>()?;
    Ok(TcpHeader {
        src_port: u16::from_be_bytes([ports[0], ports[1]]),
        dst_port: u16::from_be_bytes([ports[2], ports[3]]),
    })
}

/// Headers decoded from one frame, as far as the frame allowed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSummary {
    pub ethernet: EthernetHeader,
    pub ipv4: Option<Ipv4Header>,
    pub tcp: Option<TcpHeader>,
    /// Offset of the first byte after the last decoded header
    pub header_len: usize,
}

/// Decode every header the classifier would look at.
///
/// Stops early (with `Ok`) at a non-IPv4 ethertype or a non-TCP protocol;
/// returns the first decode error otherwise.
pub fn inspect(frame: &[u8]) -> DecodeResult<FrameSummary> {
    let mut cur = Cursor::new(frame);

    let ethernet = decode_ethernet(&mut cur)?;
    let mut summary = FrameSummary {
        ethernet,
        ipv4: None,
        tcp: None,
        header_len: cur.position(),
    };
    if !ethernet.is_ipv4() {
        return Ok(summary);
    }

    let ipv4 = decode_ipv4(&mut cur)?;
    summary.ipv4 = Some(ipv4);
    summary.header_len = cur.position();
    if !ipv4.is_tcp() {
        return Ok(summary);
    }

    summary.tcp = Some(decode_tcp(&mut cur)?);
    summary.header_len = cur.position();
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{tcp_frame, FrameSpec};

    #[test]
    fn test_decode_ethernet() {
        let frame = tcp_frame(FrameSpec::default());
        let mut cur = Cursor::new(&frame);

        let eth = decode_ethernet(&mut cur).unwrap();
        assert_eq!(eth.ethertype, ETHERTYPE_IPV4);
        assert_eq!(eth.dst, MacAddr([0x02, 0, 0, 0, 0, 0x01]));
        assert_eq!(eth.src.to_string(), "02:00:00:00:00:02");
        assert_eq!(cur.position(), ETH_HLEN);
    }

    #[test]
    fn test_decode_ethernet_truncated() {
        let frame = [0u8; 10];
        let mut cur = Cursor::new(&frame);

        let err = decode_ethernet(&mut cur).unwrap_err();
        assert_eq!(err, DecodeError::Truncated { needed: 14, remaining: 10 });
    }

    #[test]
    fn test_unknown_ethertype_decodes() {
        let frame = tcp_frame(FrameSpec { ethertype: 0x86DD, ..Default::default() });
        let mut cur = Cursor::new(&frame);
        let eth = decode_ethernet(&mut cur).unwrap();
        assert!(!eth.is_ipv4());
    }

    #[test]
    fn test_decode_ipv4() {
        let frame = tcp_frame(FrameSpec::default());
        let mut cur = Cursor::new(&frame);
        decode_ethernet(&mut cur).unwrap();

        let ip = decode_ipv4(&mut cur).unwrap();
        assert_eq!(ip.version, 4);
        assert_eq!(ip.ihl, 5);
        assert_eq!(ip.header_len(), 20);
        assert!(ip.is_tcp());
        assert_eq!(ip.src, Ipv4Addr::new(192, 168, 1, 1));
        assert_eq!(ip.dst, Ipv4Addr::new(10, 0, 0, 1));
        assert_eq!(cur.position(), ETH_HLEN + 20);
    }

    #[test]
    fn test_decode_ipv4_with_options() {
        let frame = tcp_frame(FrameSpec { ihl: 7, ..Default::default() });
        let mut cur = Cursor::new(&frame);
        decode_ethernet(&mut cur).unwrap();

        let ip = decode_ipv4(&mut cur).unwrap();
        assert_eq!(ip.header_len(), 28);
        // TCP starts after the options
        let tcp = decode_tcp(&mut cur).unwrap();
        assert_eq!(tcp.dst_port, 4040);
    }

    #[test]
    fn test_ihl_below_minimum_is_malformed() {
        for ihl in 0..5 {
            let frame = tcp_frame(FrameSpec { ihl, ..Default::default() });
            let mut cur = Cursor::new(&frame);
            decode_ethernet(&mut cur).unwrap();

            let err = decode_ipv4(&mut cur).unwrap_err();
            assert_eq!(err, DecodeError::Malformed(MalformedReason::IhlTooSmall(ihl)));
            assert_eq!(cur.position(), ETH_HLEN);
        }
    }

    #[test]
    fn test_ipv4_options_past_end_truncated() {
        // IHL=15 claims 60 bytes but only the fixed header and ports exist
        let mut frame = tcp_frame(FrameSpec::default());
        frame[ETH_HLEN] = 0x4F;
        frame.truncate(ETH_HLEN + 24);
        let mut cur = Cursor::new(&frame);
        decode_ethernet(&mut cur).unwrap();

        let err = decode_ipv4(&mut cur).unwrap_err();
        assert_eq!(err, DecodeError::Truncated { needed: 60, remaining: 24 });
    }

    #[test]
    fn test_ipv4_fixed_header_truncated() {
        let frame = tcp_frame(FrameSpec::default());
        let mut cur = Cursor::new(&frame[..ETH_HLEN + 19]);
        decode_ethernet(&mut cur).unwrap();
        assert!(matches!(decode_ipv4(&mut cur), Err(DecodeError::Truncated { needed: 20, .. })));
    }

    #[test]
    fn test_decode_tcp_needs_four_bytes() {
        let frame = tcp_frame(FrameSpec::default());
        let cut = ETH_HLEN + 20 + 3;
        let mut cur = Cursor::new(&frame[..cut]);
        decode_ethernet(&mut cur).unwrap();
        decode_ipv4(&mut cur).unwrap();
        assert!(decode_tcp(&mut cur).is_err());

        let mut cur = Cursor::new(&frame[..cut + 1]);
        decode_ethernet(&mut cur).unwrap();
        decode_ipv4(&mut cur).unwrap();
        let tcp = decode_tcp(&mut cur).unwrap();
        assert_eq!(tcp.src_port, 12345);
        assert_eq!(tcp.dst_port, 4040);
    }

    #[test]
    fn test_inspect_stops_at_non_tcp() {
        let frame = tcp_frame(FrameSpec { protocol: 17, ..Default::default() });
        let summary = inspect(&frame).unwrap();
        assert!(summary.ipv4.is_some());
        assert!(summary.tcp.is_none());
        assert_eq!(summary.header_len, ETH_HLEN + 20);
    }

    #[test]
    fn test_inspect_full() {
        let frame = tcp_frame(FrameSpec::default());
        let summary = inspect(&frame).unwrap();
        assert_eq!(summary.tcp.map(|t| t.dst_port), Some(4040));
        assert_eq!(summary.header_len, ETH_HLEN + 20 + TCP_PORTS_LEN);
    }
}
