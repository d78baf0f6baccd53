//! Where graph generations come from.

use chrono::{DateTime, TimeDelta, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::error::SourceError;
use super::model::{Edge, Graph, Node, NodeId, SelfLoopPolicy};

/// Produces a whole graph generation on demand, or fails explicitly.
pub trait GraphSource {
	fn fetch(&mut self) -> Result<Graph, SourceError>;
}

impl<F> GraphSource for F
where
	F: FnMut() -> Result<Graph, SourceError>,
{
	fn fetch(&mut self) -> Result<Graph, SourceError> {
		self()
	}
}

/// Spread of generated timestamps before "now", roughly 115 days.
const TIME_SPREAD_MS: i64 = 10_000_000_000;
const GROUPS: u8 = 5;
const NODE_RADIUS: f64 = 8.0;
/// Edge count used when none is configured, capped at this value.
const DEFAULT_EDGE_CAP: usize = 100;

/// Random networks for demos: `node{i}` ids, `Node {i}` names and uniformly
/// random edges with random payloads. Seeded, so reproducible.
#[derive(Clone, Debug)]
pub struct MockGraphSource {
	rng: StdRng,
	node_count: usize,
	edge_count: usize,
	now: DateTime<Utc>,
	self_loops: SelfLoopPolicy,
}

impl MockGraphSource {
	/// `min(2 * node_count, 100)` edges unless overridden.
	pub fn new(seed: u64, node_count: usize, now: DateTime<Utc>) -> Self {
		Self {
			rng: StdRng::seed_from_u64(seed),
			node_count,
			edge_count: (node_count * 2).min(DEFAULT_EDGE_CAP),
			now,
			self_loops: SelfLoopPolicy::Keep,
		}
	}

	pub fn with_edge_count(mut self, edge_count: usize) -> Self {
		self.edge_count = edge_count;
		self
	}

	pub fn with_self_loops(mut self, policy: SelfLoopPolicy) -> Self {
		self.self_loops = policy;
		self
	}

	/// Moves the reference time used for timestamps.
	pub fn set_now(&mut self, now: DateTime<Utc>) {
		self.now = now;
	}
}

impl GraphSource for MockGraphSource {
	fn fetch(&mut self) -> Result<Graph, SourceError> {
		let nodes: Vec<Node> = (0..self.node_count)
			.map(|i| Node {
				id: NodeId::new(format!("node{}", i)),
				name: format!("Node {}", i),
				group: self.rng.gen_range(0..GROUPS),
				radius: NODE_RADIUS,
			})
			.collect();

		let edges = if nodes.is_empty() {
			Vec::new()
		} else {
			(0..self.edge_count)
				.map(|_| {
					let source = nodes[self.rng.gen_range(0..nodes.len())].id.clone();
					let target = nodes[self.rng.gen_range(0..nodes.len())].id.clone();
					Edge {
						source,
						target,
						weight: self.rng.gen_range(0.0..10.0),
						metric1: self.rng.gen_range(0.0..100.0),
						metric2: self.rng.gen_range(0.0..1000.0),
						timestamp: random_time(&mut self.rng, self.now),
					}
				})
				.collect()
		};

		Ok(Graph::with_policy(nodes, edges, self.self_loops)?)
	}
}

/// A bulk set of `count` edges between one pair of nodes, with wider payload
/// ranges than [`MockGraphSource`], for exercising the bounded preview.
pub fn high_volume_edges(
	rng: &mut StdRng,
	count: usize,
	source: &NodeId,
	target: &NodeId,
	now: DateTime<Utc>,
) -> Vec<Edge> {
	(0..count)
		.map(|_| Edge {
			source: source.clone(),
			target: target.clone(),
			weight: rng.gen_range(0.0..100.0),
			metric1: rng.gen_range(0.0..1000.0),
			metric2: rng.gen_range(0.0..10000.0),
			timestamp: random_time(rng, now),
		})
		.collect()
}

fn random_time(rng: &mut StdRng, now: DateTime<Utc>) -> DateTime<Utc> {
	now - TimeDelta::milliseconds(rng.gen_range(0..TIME_SPREAD_MS))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::network::model::fixtures::at;

	#[test]
	fn mock_graph_shape() {
		let now = at(2_000_000_000);
		let g = MockGraphSource::new(1, 50, now).fetch().unwrap();
		assert_eq!(g.node_count(), 50);
		assert_eq!(g.edge_count(), 100);
		assert_eq!(g.nodes()[7].id, NodeId::new("node7"));
		assert_eq!(g.nodes()[7].name, "Node 7");
		for e in g.edges() {
			assert!((0.0..10.0).contains(&e.weight));
			assert!(e.timestamp <= now);
			assert!(e.timestamp > now - TimeDelta::milliseconds(TIME_SPREAD_MS));
		}
		assert!(g.nodes().iter().all(|n| n.group < GROUPS));
	}

	#[test]
	fn same_seed_same_graph() {
		let now = at(0);
		let a = MockGraphSource::new(9, 20, now).fetch().unwrap();
		let b = MockGraphSource::new(9, 20, now).fetch().unwrap();
		assert_eq!(a.edges(), b.edges());
	}

	#[test]
	fn small_graphs_get_fewer_edges() {
		let g = MockGraphSource::new(1, 10, at(0)).fetch().unwrap();
		assert_eq!(g.edge_count(), 20);
		let none = MockGraphSource::new(1, 0, at(0)).fetch().unwrap();
		assert!(none.is_empty());
		assert_eq!(none.edge_count(), 0);
	}

	#[test]
	fn dropping_self_loops_at_the_source() {
		let g = MockGraphSource::new(3, 2, at(0))
			.with_edge_count(200)
			.with_self_loops(SelfLoopPolicy::Drop)
			.fetch()
			.unwrap();
		assert!(g.edges().iter().all(|e| !e.is_self_loop()));
		assert!(g.edge_count() < 200);
	}

	#[test]
	fn closures_are_sources() {
		let mut failing = || -> Result<Graph, SourceError> {
			Err(SourceError::Unavailable("offline".into()))
		};
		assert!(failing.fetch().is_err());
	}

	#[test]
	fn high_volume_payloads() {
		let mut rng = StdRng::seed_from_u64(4);
		let edges = high_volume_edges(&mut rng, 1_000, &"a".into(), &"b".into(), at(0));
		assert_eq!(edges.len(), 1_000);
		assert!(edges.iter().all(|e| e.metric2 < 10000.0 && e.source.as_str() == "a"));
	}
}
