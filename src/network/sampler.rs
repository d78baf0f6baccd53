//! Deterministic stride sampling, so the renderer never draws more edges than
//! it can afford regardless of how many the graph holds.

use super::config::SamplingConfig;
use super::model::{Edge, NodeId};

/// Interval between kept elements when thinning `len` items down to `target`.
/// Rounds up, which keeps the result at or below `target`. The count is only
/// approximately `target`: 2,001 edges thinned to 2,000 keep every second one,
/// leaving 1,001.
pub fn stride(len: usize, target: usize) -> usize {
	len.div_ceil(target.max(1)).max(1)
}

/// Every `stride`-th element of `items`, starting with the first. Returns all
/// of `items` when there are no more than `target`.
pub fn sample<T: Clone>(items: &[T], target: usize) -> Vec<T> {
	let step = stride(items.len(), target);
	items.iter().step_by(step).cloned().collect()
}

/// Chooses which edges the renderer draws.
#[derive(Clone, Debug)]
pub struct EdgeSampler {
	target_size: usize,
	bulk_threshold: usize,
}

impl EdgeSampler {
	pub fn new(config: &SamplingConfig) -> Self {
		Self {
			target_size: config.target_size,
			bulk_threshold: config.bulk_threshold,
		}
	}

	/// Indices into `edges`, in order. Below the bulk threshold everything is
	/// kept; above it the set is thinned by stride, except that edges touching
	/// `active` are always included.
	pub fn render_set(&self, edges: &[Edge], active: Option<&NodeId>) -> Vec<usize> {
		if edges.len() <= self.bulk_threshold {
			return (0..edges.len()).collect();
		}
		let step = stride(edges.len(), self.target_size);
		edges
			.iter()
			.enumerate()
			.filter(|(i, e)| i % step == 0 || active.is_some_and(|id| e.touches(id)))
			.map(|(i, _)| i)
			.collect()
	}
}
