//! Degree-based network statistics and edge payload summaries.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::model::{Edge, Graph};

/// Aggregate metrics over a whole generation.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct NetworkStats {
	pub total_nodes: usize,
	pub total_edges: usize,
	/// Mean degree, one decimal.
	pub avg_connections: f64,
	pub max_connections: usize,
	pub isolated_nodes: usize,
	pub avg_weight: f64,
	/// Sum of degrees over ordered node pairs, as a percentage with two decimals.
	pub density_score: f64,
}

/// Degree of every node, aligned with [`Graph::nodes`]. A self-loop counts
/// its node once as source and once as target.
pub fn degrees(graph: &Graph) -> Vec<usize> {
	let mut degree = vec![0; graph.node_count()];
	for edge in graph.edges() {
		if let Some(i) = graph.node_index(&edge.source) {
			degree[i] += 1;
		}
		if let Some(i) = graph.node_index(&edge.target) {
			degree[i] += 1;
		}
	}
	degree
}

pub fn aggregate(graph: &Graph) -> NetworkStats {
	let degree = degrees(graph);
	let n = degree.len();
	let sum: usize = degree.iter().sum();

	let avg_connections = if n == 0 {
		0.0
	} else {
		round_to(sum as f64 / n as f64, 1)
	};
	let density_score = if n < 2 {
		0.0
	} else {
		round_to(sum as f64 / (n * (n - 1)) as f64 * 100.0, 2)
	};
	let avg_weight = mean(graph.edges().iter().map(|e| e.weight));

	NetworkStats {
		total_nodes: n,
		total_edges: graph.edge_count(),
		avg_connections,
		max_connections: degree.iter().copied().max().unwrap_or(0),
		isolated_nodes: degree.iter().filter(|&&d| d == 0).count(),
		avg_weight,
		density_score,
	}
}

/// Payload averages and time span of an edge set.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct EdgeSummary {
	pub total: usize,
	pub avg_metric1: f64,
	pub avg_metric2: f64,
	pub avg_weight: f64,
	pub earliest: Option<DateTime<Utc>>,
	pub latest: Option<DateTime<Utc>>,
}

/// Averages are rounded to two decimals.
pub fn summarize_edges(edges: &[Edge]) -> EdgeSummary {
	EdgeSummary {
		total: edges.len(),
		avg_metric1: round_to(mean(edges.iter().map(|e| e.metric1)), 2),
		avg_metric2: round_to(mean(edges.iter().map(|e| e.metric2)), 2),
		avg_weight: round_to(mean(edges.iter().map(|e| e.weight)), 2),
		earliest: edges.iter().map(|e| e.timestamp).min(),
		latest: edges.iter().map(|e| e.timestamp).max(),
	}
}

/// Zero for an empty sequence.
fn mean(values: impl Iterator<Item = f64>) -> f64 {
	let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
	if count == 0 { 0.0 } else { sum / count as f64 }
}

fn round_to(value: f64, decimals: i32) -> f64 {
	let scale = 10f64.powi(decimals);
	(value * scale).round() / scale
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::network::model::fixtures::{at, edge, graph};

	#[test]
	fn ring_of_four() {
		let g = graph(
			&["a", "b", "c", "d"],
			&[("a", "b"), ("b", "c"), ("c", "d"), ("d", "a")],
		);
		assert_eq!(degrees(&g), vec![2, 2, 2, 2]);
		let stats = aggregate(&g);
		assert_eq!(stats.avg_connections, 2.0);
		assert_eq!(stats.max_connections, 2);
		assert_eq!(stats.isolated_nodes, 0);
		assert_eq!(stats.total_edges, 4);
		assert_eq!(stats.avg_weight, 1.0);
		assert_eq!(stats.density_score, 66.67);
	}

	#[test]
	fn single_isolated_node() {
		let stats = aggregate(&graph(&["a"], &[]));
		assert_eq!(stats.avg_connections, 0.0);
		assert_eq!(stats.isolated_nodes, 1);
		assert_eq!(stats.density_score, 0.0);
		assert_eq!(stats.avg_weight, 0.0);
	}

	#[test]
	fn empty_graph_has_no_nan() {
		let stats = aggregate(&Graph::empty());
		assert_eq!(stats, NetworkStats::default());
	}

	#[test]
	fn averages_round_to_one_decimal() {
		// degrees 2, 1, 1 -> 4/3
		let g = graph(&["a", "b", "c"], &[("a", "b"), ("a", "c")]);
		let stats = aggregate(&g);
		assert_eq!(stats.avg_connections, 1.3);
		assert_eq!(stats.max_connections, 2);
		assert_eq!(stats.density_score, 66.67);
	}

	#[test]
	fn self_loop_counts_both_endpoints() {
		let g = graph(&["a", "b"], &[("a", "a")]);
		assert_eq!(degrees(&g), vec![2, 0]);
		assert_eq!(aggregate(&g).isolated_nodes, 1);
	}

	#[test]
	fn edge_summary() {
		let edges = vec![
			Edge {
				metric1: 1.0,
				metric2: 10.0,
				weight: 0.5,
				timestamp: at(100),
				..edge("a", "b")
			},
			Edge {
				metric1: 2.0,
				metric2: 20.0,
				weight: 0.25,
				timestamp: at(50),
				..edge("a", "b")
			},
		];
		let s = summarize_edges(&edges);
		assert_eq!(s.total, 2);
		assert_eq!(s.avg_metric1, 1.5);
		assert_eq!(s.avg_metric2, 15.0);
		assert_eq!(s.avg_weight, 0.38);
		assert_eq!(s.earliest, Some(at(50)));
		assert_eq!(s.latest, Some(at(100)));
		assert_eq!(summarize_edges(&[]), EdgeSummary::default());
	}
}
