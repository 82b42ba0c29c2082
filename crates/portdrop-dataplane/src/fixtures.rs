//! Test frame builders

/// Knobs for [`tcp_frame`]
#[derive(Debug, Clone, Copy)]
pub struct FrameSpec {
    pub ethertype: u16,
    pub ihl: u8,
    pub protocol: u8,
    pub src_port: u16,
    pub dst_port: u16,
}

impl Default for FrameSpec {
    fn default() -> Self {
        Self {
            ethertype: 0x0800,
            ihl: 5,
            protocol: 6,
            src_port: 12345,
            dst_port: 4040,
        }
    }
}

/// Ethernet + IPv4 + 20-byte TCP header.
///
/// The IHL nibble is written as given; option bytes are only emitted for
/// IHL > 5, so a small IHL still leaves a full 20-byte IPv4 header in place.
pub fn tcp_frame(spec: FrameSpec) -> Vec<u8> {
    let mut f = Vec::with_capacity(128);

    // Ethernet
    f.extend_from_slice(&[0x02, 0, 0, 0, 0, 0x01]);
    f.extend_from_slice(&[0x02, 0, 0, 0, 0, 0x02]);
    f.extend_from_slice(&spec.ethertype.to_be_bytes());

    // IPv4
    let opt_len = (spec.ihl.max(5) as usize - 5) * 4;
    let total_len = (20 + opt_len + 20) as u16;
    f.push(0x40 | (spec.ihl & 0x0F));
    f.push(0x00);
    f.extend_from_slice(&total_len.to_be_bytes());
    f.extend_from_slice(&[0x00, 0x00, 0x40, 0x00]); // id, flags, frag
    f.push(64); // ttl
    f.push(spec.protocol);
    f.extend_from_slice(&[0x00, 0x00]); // checksum
    f.extend_from_slice(&[192, 168, 1, 1]);
    f.extend_from_slice(&[10, 0, 0, 1]);
    f.extend(std::iter::repeat(0x01).take(opt_len)); // NOP options

    // TCP
    f.extend_from_slice(&spec.src_port.to_be_bytes());
    f.extend_from_slice(&spec.dst_port.to_be_bytes());
    f.extend_from_slice(&[0u8; 8]); // seq, ack
    f.extend_from_slice(&[0x50, 0x02, 0xFF, 0xFF]); // offset, SYN, window
    f.extend_from_slice(&[0u8; 4]); // checksum, urgent
    f
}
