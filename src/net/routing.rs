//! 全局路由计算
//!
//! 按最短跳数为每个 (from, dst) 预计算下一跳候选集合。
//! 拓扑构建完成后调用一次 `Network::populate_routing_tables()`；
//! 之后拓扑不再变化，转发时直接查表。

use std::collections::{HashMap, VecDeque};

use super::id::NodeId;

#[derive(Debug, Default, Clone)]
pub struct RoutingTable {
    built: bool,
    /// (from, dst) -> 等价最短路径下一跳（按邻接顺序）
    next_hops: HashMap<(NodeId, NodeId), Vec<NodeId>>,
}

impl RoutingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_built(&self) -> bool {
        self.built
    }

    /// 基于邻接表重建路由表。
    ///
    /// `adj[from]` 为从 `from` 出发的所有出边邻居；
    /// `rev_adj[to]` 为所有能到达 `to` 的前驱节点集合。
    pub fn build(&mut self, adj: &[Vec<NodeId>], rev_adj: &[Vec<NodeId>]) {
        let n = adj.len();
        self.next_hops.clear();

        // 对每个 dst 在反向图上做 BFS，得到到 dst 的最短跳数 dist[*]；
        // 对每个 from，满足 dist[next] = dist[from] - 1 的 next 即为候选下一跳。
        let mut dist: Vec<u32> = vec![u32::MAX; n];
        let mut q: VecDeque<NodeId> = VecDeque::new();

        for dst_idx in 0..n {
            dist.fill(u32::MAX);
            q.clear();

            let dst = NodeId(dst_idx);
            dist[dst_idx] = 0;
            q.push_back(dst);

            while let Some(v) = q.pop_front() {
                let dv = dist[v.0];
                for &pred in &rev_adj[v.0] {
                    if dist[pred.0] == u32::MAX {
                        dist[pred.0] = dv + 1;
                        q.push_back(pred);
                    }
                }
            }

            for from_idx in 0..n {
                let from = NodeId(from_idx);
                let df = dist[from_idx];
                if from == dst || df == u32::MAX {
                    continue;
                }
                let cands: Vec<NodeId> = adj[from_idx]
                    .iter()
                    .copied()
                    .filter(|nh| dist[nh.0].saturating_add(1) == df)
                    .collect();
                if !cands.is_empty() {
                    self.next_hops.insert((from, dst), cands);
                }
            }
        }

        self.built = true;
    }

    /// 获取 (from, dst) 的下一跳候选集合。
    pub fn next_hops(&self, from: NodeId, dst: NodeId) -> Option<&[NodeId]> {
        self.next_hops.get(&(from, dst)).map(|v| v.as_slice())
    }

    /// 确定性地选择第一个候选下一跳。
    pub fn next_hop(&self, from: NodeId, dst: NodeId) -> Option<NodeId> {
        self.next_hops(from, dst).and_then(|c| c.first().copied())
    }
}
