use std::sync::{Arc, Mutex};

use crate::app::{OnOffParams, SinkId, SourceId};
use crate::experiment::{Topology, TopologyBuilder, TopologyVariant, WiredParams};
use crate::net::{DataRate, NetWorld};
use crate::proto::tcp::{CongestionControl, SocketRef, TcpConfig, TcpStack, TcpState};
use crate::sim::{SimTime, Simulator};

struct Bench {
    world: NetWorld,
    sim: Simulator,
    topo: Topology,
}

fn bench(params: WiredParams) -> Bench {
    let mut world = NetWorld::default();
    let topo = TopologyBuilder::build(&mut world.net, &TopologyVariant::Wired(params))
        .expect("build wired");
    world.net.tcp.set_config(TcpConfig {
        segment_size: 1000,
        ..TcpConfig::default()
    });
    Bench {
        world,
        sim: Simulator::default(),
        topo,
    }
}

impl Bench {
    fn sink(&mut self) -> SinkId {
        self.world.net.apps.install_sink(
            self.topo.server,
            9,
            SimTime::ZERO,
            SimTime::from_secs(60),
            &mut self.sim,
        )
    }

    fn source(&mut self) -> SourceId {
        let params = OnOffParams {
            remote: self.topo.server_addr,
            port: 9,
            packet_size: 1000,
            data_rate: DataRate::from_mbps(10),
            on_time: SimTime::from_secs(1),
            off_time: SimTime::ZERO,
        };
        self.world.net.apps.install_source(
            self.topo.client,
            params,
            SimTime::from_millis(1),
            SimTime::from_secs(60),
            &mut self.sim,
        )
    }

    fn run_until(&mut self, t: SimTime) {
        self.sim.run_until(t, &mut self.world);
        assert!(self.world.net.fault().is_none(), "{:?}", self.world.net.fault());
    }

    fn conn_of(&self, source: SourceId) -> u64 {
        self.world
            .net
            .apps
            .source(source)
            .and_then(|s| s.conn())
            .expect("source created a socket")
    }
}

#[test]
fn congestion_control_names() {
    assert_eq!(CongestionControl::from_name("reno"), Some(CongestionControl::NewReno));
    assert_eq!(CongestionControl::from_name("NewReno"), Some(CongestionControl::NewReno));
    assert_eq!(CongestionControl::from_name("cubic"), None);
}

#[test]
fn handshake_establishes_and_initializes_congestion_state() {
    let mut b = bench(WiredParams::default());
    let sink = b.sink();
    let src = b.source();
    b.run_until(SimTime::from_millis(500));

    let id = b.conn_of(src);
    let c = b.world.net.tcp.get(id).expect("conn");
    assert_eq!(c.state(), TcpState::Established);
    let at = c.established_at().expect("established");
    assert!(at > SimTime::from_millis(8) && at < SimTime::from_millis(12), "{at:?}");
    assert!(c.cwnd() >= 10_000);
    assert_eq!(c.ssthresh(), u32::MAX);
    assert!(c.srtt().is_some());

    let total = b.world.net.apps.total_rx(sink);
    assert!(total > 0);
    assert_eq!(c.bytes_received(), total);
    assert_eq!(b.world.net.tcp.sockets_on(b.topo.client), &[id]);
    assert_eq!(b.world.net.tcp.sockets_on(b.topo.server), &[id]);
}

#[test]
fn established_hook_runs_before_congestion_state_is_initialized() {
    let mut b = bench(WiredParams::default());
    b.sink();
    let src = b.source();

    let seen: Arc<Mutex<Option<(usize, u32)>>> = Arc::new(Mutex::new(None));
    let seen_hook = Arc::clone(&seen);
    b.world.net.tcp.on_established(
        b.topo.client,
        Box::new(move |tcp: &mut TcpStack, sref: SocketRef| {
            let cwnd = tcp.socket(sref.node, sref.index).map(|c| c.cwnd());
            *seen_hook.lock().expect("lock") = cwnd.map(|w| (sref.index, w));
        }),
    );
    b.run_until(SimTime::from_millis(100));

    assert_eq!(*seen.lock().expect("lock"), Some((0, 0)));
    let c = b.world.net.tcp.get(b.conn_of(src)).expect("conn");
    assert!(c.cwnd() >= 10_000);
}

#[test]
fn syn_to_closed_port_is_refused() {
    let mut b = bench(WiredParams::default());
    let src = b.source();
    b.run_until(SimTime::from_millis(200));

    let c = b.world.net.tcp.get(b.conn_of(src)).expect("conn");
    assert_eq!(c.state(), TcpState::Refused);
    assert_eq!(c.cwnd(), 0);
    assert!(b.world.net.tcp.sockets_on(b.topo.server).is_empty());
}

#[test]
fn losses_on_a_shallow_bottleneck_are_recovered() {
    let mut b = bench(WiredParams {
        link_rate_2: DataRate::from_mbps(1),
        queue_packets: 2,
        ..WiredParams::default()
    });
    let sink = b.sink();
    let src = b.source();
    b.run_until(SimTime::from_secs(5));

    let c = b.world.net.tcp.get(b.conn_of(src)).expect("conn");
    assert!(c.retransmits() > 0);
    assert!(c.ssthresh() < u32::MAX);
    assert!(b.world.net.stats.dropped_pkts > 0);

    let total = b.world.net.apps.total_rx(sink);
    // 1 Mbps 瓶颈上 5 秒最多约 625 KB
    assert!(total > 50_000, "{total}");
    assert!(total <= 625_000, "{total}");
    assert_eq!(c.bytes_received(), total);
}

#[test]
fn send_buffer_bounds_outstanding_data() {
    let mut b = bench(WiredParams::default());
    b.sink();
    let src = b.source();
    b.run_until(SimTime::from_secs(3));

    let c = b.world.net.tcp.get(b.conn_of(src)).expect("conn");
    let buffered = c.bytes_written() - c.bytes_acked();
    assert!(buffered <= TcpConfig::default().send_buffer_bytes);
    let s = b.world.net.apps.source(src).expect("source");
    // 10 Mbps 的源快于 5 Mbps 的瓶颈，缓冲区满时写入被丢弃
    assert!(s.bytes_written() < s.bytes_offered());
}
