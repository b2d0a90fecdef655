use crate::net::{NodeId, Packet, TcpHeader, TcpSegment, Transport};
use crate::queue::{DEFAULT_PKT_BYTES, DropTailQueue, PacketQueue, mem_from_pkt};

fn pkt(id: u64, size_bytes: u32) -> Packet {
    Packet {
        id,
        flow_id: 1,
        size_bytes,
        src: NodeId(0),
        dst: NodeId(2),
        hops_taken: 0,
        transport: Transport::Tcp(TcpHeader {
            src_port: 49153,
            dst_port: 9,
            seg: TcpSegment::Data {
                seq: id * 1000,
                len: size_bytes.saturating_sub(40),
            },
        }),
    }
}

#[test]
fn droptail_queue_enforces_capacity_and_preserves_order() {
    let mut q = DropTailQueue::new(2_100);
    assert_eq!(q.capacity_bytes(), 2_100);
    assert!(q.is_empty());

    assert!(q.enqueue(pkt(1, 1_040)).is_ok());
    assert!(q.enqueue(pkt(2, 1_040)).is_ok());
    assert_eq!(q.len(), 2);
    assert_eq!(q.bytes(), 2_080);

    let dropped = q.enqueue(pkt(3, 1_040)).expect_err("should drop");
    assert_eq!(dropped.id, 3);
    assert_eq!(q.drops(), 1);
    assert_eq!(q.len(), 2);

    // 小包仍能放进剩余空间
    assert!(q.enqueue(pkt(4, 20)).is_ok());

    assert_eq!(q.dequeue().expect("pkt").id, 1);
    assert_eq!(q.dequeue().expect("pkt").id, 2);
    assert_eq!(q.dequeue().expect("pkt").id, 4);
    assert_eq!(q.bytes(), 0);
    assert!(q.dequeue().is_none());
}

#[test]
fn droptail_queue_sized_in_packets_holds_that_many_full_frames() {
    let mut q = DropTailQueue::with_packets(3);
    assert_eq!(q.capacity_bytes(), 3 * DEFAULT_PKT_BYTES);
    for id in 0..3 {
        assert!(q.enqueue(pkt(id, DEFAULT_PKT_BYTES as u32)).is_ok());
    }
    assert!(q.enqueue(pkt(3, DEFAULT_PKT_BYTES as u32)).is_err());
    assert_eq!(q.drops(), 1);
}

#[test]
fn mem_from_pkt_multiplies_default_packet_bytes_and_saturates() {
    assert_eq!(mem_from_pkt(0), 0);
    assert_eq!(mem_from_pkt(2), DEFAULT_PKT_BYTES.saturating_mul(2));
    assert_eq!(mem_from_pkt(u64::MAX), u64::MAX);
}
