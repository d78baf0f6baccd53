//! Nodes, edges and the per-generation graph they form.
//!
//! A [`Graph`] is built whole from whatever the data source produced and never
//! mutated afterwards. Layout coordinates are deliberately absent here: they
//! live in the layout engine's position store, which is the only writer.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

use super::error::ModelError;

/// Stable, opaque node key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
	/// Wraps any string-like key.
	pub fn new(id: impl Into<String>) -> Self {
		Self(id.into())
	}

	/// The raw key.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for NodeId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for NodeId {
	fn from(id: &str) -> Self {
		Self::new(id)
	}
}

impl From<String> for NodeId {
	fn from(id: String) -> Self {
		Self(id)
	}
}

/// A network entity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
	pub id: NodeId,
	/// Display label, also the target of search matching.
	pub name: String,
	/// Small cosmetic category.
	pub group: u8,
	/// Rendering size hint, also used by the collision force.
	pub radius: f64,
}

impl Node {
	/// Case-insensitive substring match; `needle` must already be lowercase.
	/// An empty needle matches nothing.
	pub fn name_matches(&self, needle: &str) -> bool {
		!needle.is_empty() && self.name.to_lowercase().contains(needle)
	}
}

/// A directed relation between two nodes carrying a numeric payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Edge {
	pub source: NodeId,
	pub target: NodeId,
	pub weight: f64,
	pub metric1: f64,
	pub metric2: f64,
	pub timestamp: DateTime<Utc>,
}

impl Edge {
	/// The `(source, target)` pair identifying this edge for highlighting.
	pub fn key(&self) -> EdgeKey {
		EdgeKey {
			source: self.source.clone(),
			target: self.target.clone(),
		}
	}

	/// True when `id` is either endpoint.
	pub fn touches(&self, id: &NodeId) -> bool {
		&self.source == id || &self.target == id
	}

	pub fn is_self_loop(&self) -> bool {
		self.source == self.target
	}

	/// The endpoint that is not `id`, or `None` if the edge does not touch it.
	/// A self-loop's other endpoint is the node itself.
	pub fn other_endpoint(&self, id: &NodeId) -> Option<&NodeId> {
		if &self.source == id {
			Some(&self.target)
		} else if &self.target == id {
			Some(&self.source)
		} else {
			None
		}
	}
}

/// Which side of an edge a node sits on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
	/// The node is the target.
	#[default]
	Incoming,
	/// The node is the source.
	Outgoing,
}

impl Direction {
	/// Whether `edge` belongs to `id`'s partition in this direction.
	pub fn matches(self, edge: &Edge, id: &NodeId) -> bool {
		match self {
			Direction::Incoming => &edge.target == id,
			Direction::Outgoing => &edge.source == id,
		}
	}
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeKey {
	pub source: NodeId,
	pub target: NodeId,
}

/// How edges whose source equals their target are treated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelfLoopPolicy {
	/// Kept; the node counts as both endpoints wherever degree is computed.
	#[default]
	Keep,
	/// Removed at graph construction, like dangling edges.
	Drop,
}

/// One generation of the network: nodes keyed by id, edges in source order.
#[derive(Clone, Debug, Default)]
pub struct Graph {
	nodes: Vec<Node>,
	index: HashMap<NodeId, usize>,
	edges: Vec<Edge>,
}

impl Graph {
	pub fn empty() -> Self {
		Self::default()
	}

	/// Builds a graph keeping self-loops. See [`Graph::with_policy`].
	pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Result<Self, ModelError> {
		Self::with_policy(nodes, edges, SelfLoopPolicy::Keep)
	}

	/// Builds a graph, failing on duplicate node ids and silently dropping
	/// edges whose endpoints are not present (and self-loops under
	/// [`SelfLoopPolicy::Drop`]).
	pub fn with_policy(
		nodes: Vec<Node>,
		edges: Vec<Edge>,
		self_loops: SelfLoopPolicy,
	) -> Result<Self, ModelError> {
		let mut index = HashMap::with_capacity(nodes.len());
		for (i, node) in nodes.iter().enumerate() {
			if index.insert(node.id.clone(), i).is_some() {
				return Err(ModelError::DuplicateNode(node.id.clone()));
			}
		}

		let offered = edges.len();
		let edges: Vec<Edge> = edges
			.into_iter()
			.filter(|e| index.contains_key(&e.source) && index.contains_key(&e.target))
			.filter(|e| self_loops == SelfLoopPolicy::Keep || !e.is_self_loop())
			.collect();
		if edges.len() < offered {
			debug!("dropped {} dangling or excluded edges", offered - edges.len());
		}

		Ok(Self {
			nodes,
			index,
			edges,
		})
	}

	pub fn nodes(&self) -> &[Node] {
		&self.nodes
	}

	pub fn edges(&self) -> &[Edge] {
		&self.edges
	}

	pub fn node(&self, id: &NodeId) -> Option<&Node> {
		self.index.get(id).map(|&i| &self.nodes[i])
	}

	pub fn contains(&self, id: &NodeId) -> bool {
		self.index.contains_key(id)
	}

	/// Position of the node in [`Graph::nodes`].
	pub fn node_index(&self, id: &NodeId) -> Option<usize> {
		self.index.get(id).copied()
	}

	pub fn node_count(&self) -> usize {
		self.nodes.len()
	}

	pub fn edge_count(&self) -> usize {
		self.edges.len()
	}

	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	/// Edges touching `id`, with their position in [`Graph::edges`].
	pub fn incident_edges<'a>(
		&'a self,
		id: &'a NodeId,
	) -> impl Iterator<Item = (usize, &'a Edge)> + 'a {
		self.edges.iter().enumerate().filter(move |(_, e)| e.touches(id))
	}

	/// Nodes whose name contains `term`, ignoring case. Empty terms match nothing.
	pub fn search(&self, term: &str) -> Vec<&Node> {
		let needle = term.trim().to_lowercase();
		self.nodes.iter().filter(|n| n.name_matches(&needle)).collect()
	}
}
