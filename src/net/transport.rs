//! Transport-layer tags carried by packets.

/// Packet transport metadata.
///
/// `Packet` is a network-layer carrier; transport tags enable protocol simulation
/// without coupling the network to protocol implementations.
#[derive(Debug, Clone, Default)]
pub enum Transport {
    /// No transport metadata (default).
    #[default]
    None,
    /// TCP segment (simplified).
    Tcp(TcpHeader),
}

/// TCP header: ports plus the simplified segment kind.
#[derive(Debug, Clone)]
pub struct TcpHeader {
    pub src_port: u16,
    pub dst_port: u16,
    pub seg: TcpSegment,
}

/// TCP segment (minimal fields for simulation).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TcpSegment {
    /// SYN
    Syn,
    /// SYN-ACK
    SynAck,
    /// Reset, sent in reply to a SYN for a port nobody listens on.
    Rst,
    /// Data segment: `seq` is byte sequence number, `len` is payload bytes.
    Data { seq: u64, len: u32 },
    /// ACK segment: `ack` is next expected byte (cumulative).
    Ack { ack: u64 },
}
