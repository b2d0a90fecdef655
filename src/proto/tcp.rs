//! TCP（简化版）协议实现
//!
//! 支持一个单流批量传输实验所需的功能：
//! - 三次握手：socket 在应用启动时创建，拥塞状态在连接建立时才初始化
//! - NewReno 风格的拥塞控制（慢启动 + 拥塞避免 + 3 dupACK 快速重传/快速恢复，含 partial ACK）
//! - RFC 6298 风格的 RTO 估计，指数退避，Karn 规则
//! - 接收端乱序缓存与延迟 ACK（每 N 个段或超时）
//! - 对无人监听的端口回 RST（连接被拒绝）
//! - cwnd / ssthresh 为可订阅状态，连接建立时可触发一次性钩子
//!
//! 注意：这是仿真用途的“极简 TCP”，不实现窗口通告/选择确认/挥手等。
//! 一个 `TcpConn` 同时保存发送端与接收端的状态（复用 `flow_id` 作为连接标识）。

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use tracing::{debug, info, trace, warn};

use crate::app::SinkId;
use crate::net::{Network, NodeId, TcpHeader, TcpSegment, Transport, with_tcp_stack};
use crate::proto::trace::{TraceCallback, TracePath, TraceSource, Traced};
use crate::sim::{Event, SimTime, Simulator, World};

/// 一个 TCP 连接的唯一标识（复用 `flow_id` 的语义）。
pub type TcpConnId = u64;

/// 引擎支持的拥塞控制算法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CongestionControl {
    /// Reno + NewReno 快速恢复
    #[default]
    NewReno,
}

impl CongestionControl {
    /// 按名字查找；`reno` 与 `newreno` 都映射到同一个实现
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "reno" | "newreno" | "tcpnewreno" => Some(CongestionControl::NewReno),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CongestionControl::NewReno => "newreno",
        }
    }
}

#[derive(Debug, Clone)]
pub struct TcpConfig {
    /// MSS（数据段载荷大小，字节）
    pub segment_size: u32,
    /// IP + TCP 头（字节）
    pub header_bytes: u32,
    /// 初始 cwnd（单位：段）
    pub init_cwnd_segments: u32,
    /// 初始 ssthresh（字节）
    pub init_ssthresh_bytes: u32,
    /// 每收到多少个数据段回一个 ACK
    pub delayed_ack_count: u32,
    /// 延迟 ACK 超时
    pub delayed_ack_timeout: SimTime,
    pub init_rto: SimTime,
    pub min_rto: SimTime,
    pub max_rto: SimTime,
    /// SYN 最大重传次数
    pub syn_retries: u32,
    /// 发送缓冲区（字节）
    pub send_buffer_bytes: u64,
    pub congestion_control: CongestionControl,
}

impl Default for TcpConfig {
    fn default() -> Self {
        Self {
            segment_size: 536,
            header_bytes: 40,
            init_cwnd_segments: 10,
            init_ssthresh_bytes: u32::MAX,
            delayed_ack_count: 2,
            delayed_ack_timeout: SimTime::from_millis(200),
            init_rto: SimTime::from_secs(1),
            min_rto: SimTime::from_millis(200),
            max_rto: SimTime::from_secs(60),
            syn_retries: 6,
            send_buffer_bytes: 131_072,
            congestion_control: CongestionControl::NewReno,
        }
    }
}

/// 连接状态（发送端视角）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TcpState {
    SynSent,
    Established,
    /// 对端回了 RST
    Refused,
    /// SYN 重传次数耗尽
    Closed,
}

/// 某节点 socket 列表中的一个位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SocketRef {
    pub node: NodeId,
    pub index: usize,
    pub conn: TcpConnId,
}

/// 连接建立钩子：在节点上第一个连接建立、拥塞状态初始化之前调用
pub type EstablishedHook = Box<dyn FnOnce(&mut TcpStack, SocketRef) + Send>;

#[derive(Debug)]
pub struct TcpConn {
    pub id: TcpConnId,
    pub src: NodeId,
    pub dst: NodeId,
    pub src_port: u16,
    pub dst_port: u16,
    cfg: TcpConfig,
    state: TcpState,

    // sender
    app_bytes: u64,
    next_seq: u64,
    high_tx: u64,
    last_acked: u64,
    cwnd: Traced<u32>,
    ssthresh: Traced<u32>,
    dup_acks: u32,
    in_recovery: bool,
    recover: Option<u64>,
    rto: SimTime,
    rto_gen: u64,
    rto_armed: bool,
    srtt_ns: Option<u64>,
    rttvar_ns: u64,
    rtt_probe: Option<(u64, SimTime)>,
    syn_attempts: u32,
    retransmits: u64,
    established_at: Option<SimTime>,

    // receiver
    sink: Option<SinkId>,
    rcv_nxt: u64,
    ooo: BTreeMap<u64, u32>,
    unacked_segs: u32,
    delack_gen: u64,
}

impl TcpConn {
    fn new(
        id: TcpConnId,
        src: NodeId,
        dst: NodeId,
        src_port: u16,
        dst_port: u16,
        cfg: TcpConfig,
    ) -> Self {
        let rto = cfg.init_rto;
        Self {
            id,
            src,
            dst,
            src_port,
            dst_port,
            cfg,
            state: TcpState::SynSent,
            app_bytes: 0,
            next_seq: 0,
            high_tx: 0,
            last_acked: 0,
            cwnd: Traced::new(0),
            ssthresh: Traced::new(0),
            dup_acks: 0,
            in_recovery: false,
            recover: None,
            rto,
            rto_gen: 0,
            rto_armed: false,
            srtt_ns: None,
            rttvar_ns: 0,
            rtt_probe: None,
            syn_attempts: 0,
            retransmits: 0,
            established_at: None,
            sink: None,
            rcv_nxt: 0,
            ooo: BTreeMap::new(),
            unacked_segs: 0,
            delack_gen: 0,
        }
    }

    pub fn state(&self) -> TcpState {
        self.state
    }

    pub fn cwnd(&self) -> u32 {
        self.cwnd.get()
    }

    pub fn ssthresh(&self) -> u32 {
        self.ssthresh.get()
    }

    pub fn bytes_acked(&self) -> u64 {
        self.last_acked
    }

    /// 接收端按序收到的字节数
    pub fn bytes_received(&self) -> u64 {
        self.rcv_nxt
    }

    /// 应用已写入发送缓冲区的总字节数
    pub fn bytes_written(&self) -> u64 {
        self.app_bytes
    }

    pub fn retransmits(&self) -> u64 {
        self.retransmits
    }

    pub fn rto(&self) -> SimTime {
        self.rto
    }

    pub fn srtt(&self) -> Option<SimTime> {
        self.srtt_ns.map(SimTime)
    }

    pub fn established_at(&self) -> Option<SimTime> {
        self.established_at
    }

    fn traced_mut(&mut self, source: TraceSource) -> &mut Traced<u32> {
        match source {
            TraceSource::CongestionWindow => &mut self.cwnd,
            TraceSource::SlowStartThreshold => &mut self.ssthresh,
        }
    }

    fn mss(&self) -> u64 {
        self.cfg.segment_size as u64
    }

    fn set_cwnd(&mut self, now: SimTime, bytes: u64) {
        self.cwnd.set(now, bytes.min(u32::MAX as u64) as u32);
    }

    fn set_ssthresh(&mut self, now: SimTime, bytes: u64) {
        self.ssthresh.set(now, bytes.min(u32::MAX as u64) as u32);
    }

    /// RFC 6298：用一个 RTT 样本更新 SRTT/RTTVAR/RTO
    fn on_rtt_sample(&mut self, sample: SimTime) {
        let r = sample.0;
        match self.srtt_ns {
            None => {
                self.srtt_ns = Some(r);
                self.rttvar_ns = r / 2;
            }
            Some(srtt) => {
                let err = srtt.abs_diff(r);
                self.rttvar_ns = (3 * self.rttvar_ns + err) / 4;
                self.srtt_ns = Some((7 * srtt + r) / 8);
            }
        }
        let srtt = self.srtt_ns.unwrap_or(r);
        let rto = srtt.saturating_add(self.rttvar_ns.saturating_mul(4));
        self.rto = SimTime(rto.clamp(self.cfg.min_rto.0, self.cfg.max_rto.0));
    }

    fn arm_rto(&mut self, sim: &mut Simulator) {
        self.rto_gen = self.rto_gen.wrapping_add(1);
        self.rto_armed = true;
        sim.schedule_in(
            self.rto,
            TcpRto {
                conn_id: self.id,
                generation: self.rto_gen,
            },
        );
    }

    fn disarm_rto(&mut self) {
        self.rto_gen = self.rto_gen.wrapping_add(1);
        self.rto_armed = false;
    }
}

fn send_segment(
    conn: &TcpConn,
    from: NodeId,
    to: NodeId,
    seg: TcpSegment,
    payload: u32,
    sim: &mut Simulator,
    net: &mut Network,
) {
    let (src_port, dst_port) = if from == conn.src {
        (conn.src_port, conn.dst_port)
    } else {
        (conn.dst_port, conn.src_port)
    };
    let size = conn.cfg.header_bytes.saturating_add(payload);
    let pkt = net.make_packet(
        conn.id,
        size,
        from,
        to,
        Transport::Tcp(TcpHeader {
            src_port,
            dst_port,
            seg,
        }),
    );
    net.forward_from(from, pkt, sim);
}

fn send_data(conn: &TcpConn, seq: u64, len: u32, sim: &mut Simulator, net: &mut Network) {
    trace!(conn_id = conn.id, seq, len, "发送数据段");
    send_segment(
        conn,
        conn.src,
        conn.dst,
        TcpSegment::Data { seq, len },
        len,
        sim,
        net,
    );
}

fn send_ack(conn: &mut TcpConn, sim: &mut Simulator, net: &mut Network) {
    conn.unacked_segs = 0;
    conn.delack_gen = conn.delack_gen.wrapping_add(1);
    let ack = conn.rcv_nxt;
    send_segment(conn, conn.dst, conn.src, TcpSegment::Ack { ack }, 0, sim, net);
}

/// 重传最早未确认段
fn retransmit_head(conn: &mut TcpConn, sim: &mut Simulator, net: &mut Network) {
    let outstanding = conn.high_tx.saturating_sub(conn.last_acked);
    let len = conn.mss().min(outstanding) as u32;
    if len == 0 {
        return;
    }
    conn.rtt_probe = None;
    conn.retransmits += 1;
    debug!(conn_id = conn.id, seq = conn.last_acked, len, "🔁 重传");
    send_data(conn, conn.last_acked, len, sim, net);
}

#[derive(Default)]
pub struct TcpStack {
    cfg: TcpConfig,
    conns: HashMap<TcpConnId, TcpConn>,
    next_conn_id: TcpConnId,
    next_port: u16,
    /// 每个节点的 socket 列表（`SocketList/<i>`）
    sockets: HashMap<NodeId, Vec<TcpConnId>>,
    listeners: HashMap<(NodeId, u16), SinkId>,
    established_hooks: Vec<(NodeId, EstablishedHook)>,
}

impl fmt::Debug for TcpStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TcpStack")
            .field("cfg", &self.cfg)
            .field("conns", &self.conns.len())
            .field("listeners", &self.listeners.len())
            .field("pending_hooks", &self.established_hooks.len())
            .finish()
    }
}

impl TcpStack {
    /// 之后创建的连接都使用该配置
    pub fn set_config(&mut self, cfg: TcpConfig) {
        self.cfg = cfg;
    }

    pub fn config(&self) -> &TcpConfig {
        &self.cfg
    }

    pub fn get(&self, id: TcpConnId) -> Option<&TcpConn> {
        self.conns.get(&id)
    }

    /// 节点上的 socket 列表
    pub fn sockets_on(&self, node: NodeId) -> &[TcpConnId] {
        self.sockets.get(&node).map(Vec::as_slice).unwrap_or(&[])
    }

    /// 按 (节点, 下标) 查找 socket
    pub fn socket(&self, node: NodeId, index: usize) -> Option<&TcpConn> {
        let id = self.sockets_on(node).get(index)?;
        self.conns.get(id)
    }

    /// 在 (node, port) 上监听；收到的按序字节计入 `sink`
    pub fn listen(&mut self, node: NodeId, port: u16, sink: SinkId) {
        debug!(?node, port, ?sink, "开始监听");
        self.listeners.insert((node, port), sink);
    }

    pub fn unlisten(&mut self, node: NodeId, port: u16) {
        self.listeners.remove(&(node, port));
    }

    /// 注册一次性钩子：`node` 上下一个建立的连接触发
    pub fn on_established(&mut self, node: NodeId, hook: EstablishedHook) {
        self.established_hooks.push((node, hook));
    }

    /// 按路径订阅状态变化；返回匹配的对象个数（0 或 1）
    pub fn connect_trace(&mut self, path: &TracePath, cb: TraceCallback<u32>) -> usize {
        let Some(&id) = self
            .sockets
            .get(&NodeId(path.node))
            .and_then(|s| s.get(path.socket))
        else {
            debug!(%path, "订阅路径没有匹配的 socket");
            return 0;
        };
        let Some(conn) = self.conns.get_mut(&id) else {
            return 0;
        };
        conn.traced_mut(path.source).connect(cb);
        debug!(%path, conn_id = id, "订阅已挂接");
        1
    }

    /// 主动打开：创建 socket 并发送 SYN
    pub fn connect(
        &mut self,
        src: NodeId,
        dst: NodeId,
        dst_port: u16,
        sim: &mut Simulator,
        net: &mut Network,
    ) -> TcpConnId {
        self.next_conn_id += 1;
        let id = self.next_conn_id;
        let src_port = 49_153u16.wrapping_add(self.next_port);
        self.next_port = self.next_port.wrapping_add(1);

        let mut conn = TcpConn::new(id, src, dst, src_port, dst_port, self.cfg.clone());
        self.sockets.entry(src).or_default().push(id);
        info!(conn_id = id, ?src, ?dst, dst_port, "🤝 发起连接");

        conn.syn_attempts = 1;
        send_segment(&conn, src, dst, TcpSegment::Syn, 0, sim, net);
        conn.arm_rto(sim);
        self.conns.insert(id, conn);
        id
    }

    /// 应用写入数据；返回实际写入的字节数（受发送缓冲区限制）
    pub fn write(
        &mut self,
        id: TcpConnId,
        bytes: u64,
        sim: &mut Simulator,
        net: &mut Network,
    ) -> u64 {
        let Some(conn) = self.conns.get_mut(&id) else {
            return 0;
        };
        if matches!(conn.state, TcpState::Refused | TcpState::Closed) {
            return 0;
        }
        let buffered = conn.app_bytes.saturating_sub(conn.last_acked);
        let room = conn.cfg.send_buffer_bytes.saturating_sub(buffered);
        let n = bytes.min(room);
        conn.app_bytes = conn.app_bytes.saturating_add(n);
        if n > 0 {
            self.send_data_if_possible(id, sim, net);
        }
        n
    }

    pub(crate) fn send_data_if_possible(
        &mut self,
        id: TcpConnId,
        sim: &mut Simulator,
        net: &mut Network,
    ) {
        let Some(conn) = self.conns.get_mut(&id) else {
            return;
        };
        if conn.state != TcpState::Established {
            return;
        }
        let mss = conn.mss();
        let now = sim.now();

        // 发送窗口：inflight bytes < cwnd
        while conn.next_seq < conn.app_bytes {
            let flight = conn.next_seq.saturating_sub(conn.last_acked);
            let len = mss.min(conn.app_bytes - conn.next_seq);
            if flight.saturating_add(len) > conn.cwnd.get() as u64 {
                break;
            }
            let seq = conn.next_seq;
            conn.next_seq += len;
            if seq >= conn.high_tx && conn.rtt_probe.is_none() {
                conn.rtt_probe = Some((seq + len, now));
            }
            conn.high_tx = conn.high_tx.max(conn.next_seq);
            send_data(conn, seq, len as u32, sim, net);
            if !conn.rto_armed {
                conn.arm_rto(sim);
            }
        }
    }

    fn fire_established(&mut self, node: NodeId, conn_id: TcpConnId) {
        let (ready, keep): (Vec<_>, Vec<_>) = std::mem::take(&mut self.established_hooks)
            .into_iter()
            .partition(|(n, _)| *n == node);
        self.established_hooks = keep;
        if ready.is_empty() {
            return;
        }
        let index = self
            .sockets_on(node)
            .iter()
            .position(|&c| c == conn_id)
            .unwrap_or(0);
        let sref = SocketRef {
            node,
            index,
            conn: conn_id,
        };
        for (_, hook) in ready {
            hook(self, sref);
        }
    }

    pub fn on_tcp_segment(
        &mut self,
        conn_id: TcpConnId,
        at: NodeId,
        hdr: TcpHeader,
        sim: &mut Simulator,
        net: &mut Network,
    ) {
        let Some(conn) = self.conns.get(&conn_id) else {
            return;
        };
        let (src, dst) = (conn.src, conn.dst);
        match hdr.seg {
            TcpSegment::Syn if at == dst => self.on_syn(conn_id, hdr.dst_port, sim, net),
            TcpSegment::SynAck if at == src => self.on_syn_ack(conn_id, sim, net),
            TcpSegment::Rst if at == src => self.on_rst(conn_id),
            TcpSegment::Data { seq, len } if at == dst => {
                self.on_data(conn_id, seq, len, sim, net)
            }
            TcpSegment::Ack { ack } if at == src => self.on_ack(conn_id, ack, sim, net),
            // 服务端收到的握手 ACK 无需处理
            _ => {}
        }
    }

    fn on_syn(&mut self, conn_id: TcpConnId, port: u16, sim: &mut Simulator, net: &mut Network) {
        let Some(conn) = self.conns.get_mut(&conn_id) else {
            return;
        };
        if conn.sink.is_none() {
            let Some(&sink) = self.listeners.get(&(conn.dst, port)) else {
                warn!(conn_id, node = ?conn.dst, port, "端口无人监听，回 RST（连接被拒绝）");
                send_segment(conn, conn.dst, conn.src, TcpSegment::Rst, 0, sim, net);
                return;
            };
            conn.sink = Some(sink);
            self.sockets.entry(conn.dst).or_default().push(conn_id);
            debug!(conn_id, node = ?conn.dst, port, "接受连接");
        }
        // 重复 SYN 也回 SYN-ACK（SYN-ACK 可能丢失）
        send_segment(conn, conn.dst, conn.src, TcpSegment::SynAck, 0, sim, net);
    }

    fn on_syn_ack(&mut self, conn_id: TcpConnId, sim: &mut Simulator, net: &mut Network) {
        let Some(conn) = self.conns.get_mut(&conn_id) else {
            return;
        };
        if conn.state != TcpState::SynSent {
            if conn.state == TcpState::Established {
                send_segment(conn, conn.src, conn.dst, TcpSegment::Ack { ack: 0 }, 0, sim, net);
            }
            return;
        }
        let now = sim.now();
        conn.state = TcpState::Established;
        conn.established_at = Some(now);
        conn.disarm_rto();
        conn.rto = conn.cfg.init_rto;
        send_segment(conn, conn.src, conn.dst, TcpSegment::Ack { ack: 0 }, 0, sim, net);
        let src = conn.src;
        info!(conn_id, ?now, "✅ 连接建立");

        // 先通知钩子，再初始化拥塞状态：订阅者能看到初始值
        self.fire_established(src, conn_id);

        let Some(conn) = self.conns.get_mut(&conn_id) else {
            return;
        };
        let init_cwnd = conn.mss().saturating_mul(conn.cfg.init_cwnd_segments as u64);
        let init_ssthresh = conn.cfg.init_ssthresh_bytes as u64;
        conn.set_cwnd(now, init_cwnd);
        conn.set_ssthresh(now, init_ssthresh);
        self.send_data_if_possible(conn_id, sim, net);
    }

    fn on_rst(&mut self, conn_id: TcpConnId) {
        let Some(conn) = self.conns.get_mut(&conn_id) else {
            return;
        };
        if conn.state == TcpState::SynSent {
            warn!(conn_id, "连接被拒绝");
            conn.state = TcpState::Refused;
            conn.disarm_rto();
        }
    }

    fn on_data(
        &mut self,
        conn_id: TcpConnId,
        seq: u64,
        len: u32,
        sim: &mut Simulator,
        net: &mut Network,
    ) {
        let Some(conn) = self.conns.get_mut(&conn_id) else {
            return;
        };
        let Some(sink) = conn.sink else {
            return;
        };

        let before = conn.rcv_nxt;
        let end = seq.saturating_add(len as u64);
        let mut immediate = false;
        if seq > conn.rcv_nxt {
            // 乱序：缓存并立即回 dupACK
            conn.ooo.entry(seq).or_insert(len);
            immediate = true;
        } else {
            if seq < conn.rcv_nxt || !conn.ooo.is_empty() {
                immediate = true;
            }
            conn.rcv_nxt = conn.rcv_nxt.max(end);
            while let Some((&s, &l)) = conn.ooo.first_key_value() {
                if s > conn.rcv_nxt {
                    break;
                }
                conn.ooo.pop_first();
                conn.rcv_nxt = conn.rcv_nxt.max(s.saturating_add(l as u64));
            }
        }
        let delivered = conn.rcv_nxt - before;
        if delivered > 0 {
            net.apps.sink_rx(sink, delivered);
        }

        conn.unacked_segs += 1;
        if immediate || conn.unacked_segs >= conn.cfg.delayed_ack_count {
            send_ack(conn, sim, net);
        } else if conn.unacked_segs == 1 {
            sim.schedule_in(
                conn.cfg.delayed_ack_timeout,
                TcpDelAck {
                    conn_id,
                    generation: conn.delack_gen,
                },
            );
        }
    }

    fn on_ack(&mut self, conn_id: TcpConnId, ack: u64, sim: &mut Simulator, net: &mut Network) {
        let Some(conn) = self.conns.get_mut(&conn_id) else {
            return;
        };
        if conn.state != TcpState::Established {
            return;
        }
        let now = sim.now();
        let mss = conn.mss();

        if ack > conn.last_acked {
            let newly_acked = ack - conn.last_acked;
            conn.last_acked = ack;
            conn.next_seq = conn.next_seq.max(ack);
            conn.dup_acks = 0;

            if let Some((end, sent_at)) = conn.rtt_probe {
                if ack >= end {
                    conn.on_rtt_sample(now.saturating_sub(sent_at));
                    conn.rtt_probe = None;
                }
            }

            let cwnd = conn.cwnd.get() as u64;
            if conn.in_recovery {
                if conn.recover.is_some_and(|r| ack >= r) {
                    // 完全确认：退出快速恢复
                    conn.in_recovery = false;
                    let ssthresh = conn.ssthresh.get() as u64;
                    conn.set_cwnd(now, ssthresh);
                } else {
                    // partial ACK：重传下一个洞，收缩膨胀的窗口
                    retransmit_head(conn, sim, net);
                    conn.set_cwnd(now, cwnd.saturating_sub(newly_acked).saturating_add(mss).max(mss));
                }
            } else if cwnd < conn.ssthresh.get() as u64 {
                // 慢启动（每个 ACK 最多增长 2 个 MSS）
                conn.set_cwnd(now, cwnd.saturating_add(newly_acked.min(2 * mss)));
            } else {
                // 拥塞避免：每个 ACK 让 cwnd 以 mss^2/cwnd 增长（至少 +1）
                let inc = (mss.saturating_mul(mss) / cwnd.max(1)).max(1);
                conn.set_cwnd(now, cwnd.saturating_add(inc));
            }

            if conn.last_acked >= conn.high_tx {
                conn.disarm_rto();
            } else {
                conn.arm_rto(sim);
            }
            self.send_data_if_possible(conn_id, sim, net);
        } else if ack == conn.last_acked && conn.high_tx > conn.last_acked {
            conn.dup_acks = conn.dup_acks.saturating_add(1);
            let may_recover = conn.recover.is_none_or(|r| conn.last_acked > r);
            if !conn.in_recovery && conn.dup_acks == 3 && may_recover {
                let flight = conn.high_tx - conn.last_acked;
                let ssthresh = (flight / 2).max(2 * mss);
                conn.set_ssthresh(now, ssthresh);
                conn.recover = Some(conn.high_tx);
                conn.in_recovery = true;
                debug!(conn_id, seq = conn.last_acked, ssthresh, "⚡ 快速重传");
                retransmit_head(conn, sim, net);
                conn.set_cwnd(now, ssthresh.saturating_add(3 * mss));
            } else if conn.in_recovery {
                // 快速恢复：每个额外 dupACK 增加 cwnd 一个 MSS
                let cwnd = conn.cwnd.get() as u64;
                conn.set_cwnd(now, cwnd.saturating_add(mss));
                self.send_data_if_possible(conn_id, sim, net);
            }
        }
    }

    pub(crate) fn on_rto(
        &mut self,
        conn_id: TcpConnId,
        generation: u64,
        sim: &mut Simulator,
        net: &mut Network,
    ) {
        let Some(conn) = self.conns.get_mut(&conn_id) else {
            return;
        };
        if !conn.rto_armed || conn.rto_gen != generation {
            return;
        }
        conn.rto_armed = false;
        conn.rto = SimTime(conn.rto.0.saturating_mul(2).min(conn.cfg.max_rto.0));

        match conn.state {
            TcpState::SynSent => {
                if conn.syn_attempts > conn.cfg.syn_retries {
                    warn!(conn_id, attempts = conn.syn_attempts, "SYN 重传次数耗尽，放弃连接");
                    conn.state = TcpState::Closed;
                    return;
                }
                conn.syn_attempts += 1;
                debug!(conn_id, attempts = conn.syn_attempts, "重传 SYN");
                send_segment(conn, conn.src, conn.dst, TcpSegment::Syn, 0, sim, net);
                conn.arm_rto(sim);
            }
            TcpState::Established => {
                if conn.last_acked >= conn.high_tx {
                    return;
                }
                let now = sim.now();
                let mss = conn.mss();
                let flight = conn.high_tx - conn.last_acked;
                debug!(conn_id, seq = conn.last_acked, rto = ?conn.rto, "⏰ RTO 超时");
                // 超时：回到慢启动，从最早未确认段开始重发
                conn.set_ssthresh(now, (flight / 2).max(2 * mss));
                conn.set_cwnd(now, mss);
                conn.next_seq = conn.last_acked;
                conn.dup_acks = 0;
                conn.in_recovery = false;
                conn.recover = Some(conn.high_tx);
                conn.rtt_probe = None;
                conn.retransmits += 1;
                self.send_data_if_possible(conn_id, sim, net);
            }
            TcpState::Refused | TcpState::Closed => {}
        }
    }

    pub(crate) fn on_delayed_ack(
        &mut self,
        conn_id: TcpConnId,
        generation: u64,
        sim: &mut Simulator,
        net: &mut Network,
    ) {
        let Some(conn) = self.conns.get_mut(&conn_id) else {
            return;
        };
        if conn.delack_gen == generation && conn.unacked_segs > 0 {
            send_ack(conn, sim, net);
        }
    }
}

/// TCP RTO 事件：仅当 `generation` 仍是当前计时器时生效
#[derive(Debug)]
pub struct TcpRto {
    pub conn_id: TcpConnId,
    pub generation: u64,
}

impl Event for TcpRto {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let TcpRto {
            conn_id,
            generation,
        } = *self;
        with_tcp_stack(world, |net, tcp| tcp.on_rto(conn_id, generation, sim, net));
    }
}

/// 延迟 ACK 超时
#[derive(Debug)]
pub struct TcpDelAck {
    pub conn_id: TcpConnId,
    pub generation: u64,
}

impl Event for TcpDelAck {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let TcpDelAck {
            conn_id,
            generation,
        } = *self;
        with_tcp_stack(world, |net, tcp| {
            tcp.on_delayed_ack(conn_id, generation, sim, net)
        });
    }
}
