//! Range filtering and paging of a node's incident edges, plus a capped
//! preview for result sets too large to page through.

use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

use super::config::BrowserConfig;
use super::model::{Direction, Edge, Graph, NodeId};
use super::stats::{EdgeSummary, summarize_edges};

/// Inclusive range; a missing side is unbounded.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds<T> {
	pub min: Option<T>,
	pub max: Option<T>,
}

impl<T> Default for Bounds<T> {
	fn default() -> Self {
		Self {
			min: None,
			max: None,
		}
	}
}

impl<T: PartialOrd> Bounds<T> {
	pub fn between(min: T, max: T) -> Self {
		Self {
			min: Some(min),
			max: Some(max),
		}
	}

	pub fn at_least(min: T) -> Self {
		Self {
			min: Some(min),
			max: None,
		}
	}

	pub fn at_most(max: T) -> Self {
		Self {
			min: None,
			max: Some(max),
		}
	}

	pub fn contains(&self, value: &T) -> bool {
		self.min.as_ref().is_none_or(|min| value >= min)
			&& self.max.as_ref().is_none_or(|max| value <= max)
	}

	pub fn is_unbounded(&self) -> bool {
		self.min.is_none() && self.max.is_none()
	}
}

/// Conjunction of per-field ranges.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeFilter {
	pub timestamp: Bounds<DateTime<Utc>>,
	pub metric1: Bounds<f64>,
	pub metric2: Bounds<f64>,
	pub weight: Bounds<f64>,
}

impl EdgeFilter {
	pub fn matches(&self, edge: &Edge) -> bool {
		self.timestamp.contains(&edge.timestamp)
			&& self.metric1.contains(&edge.metric1)
			&& self.metric2.contains(&edge.metric2)
			&& self.weight.contains(&edge.weight)
	}

	pub fn is_unbounded(&self) -> bool {
		self.timestamp.is_unbounded()
			&& self.metric1.is_unbounded()
			&& self.metric2.is_unbounded()
			&& self.weight.is_unbounded()
	}
}

/// The 1-based `page` of `items`. Pages past the end, page 0 and a zero page
/// size all give an empty slice.
pub fn paginate<T>(items: &[T], page: usize, page_size: usize) -> &[T] {
	if page == 0 || page_size == 0 {
		return &[];
	}
	let start = (page - 1).saturating_mul(page_size).min(items.len());
	let end = start.saturating_add(page_size).min(items.len());
	&items[start..end]
}

pub fn page_count(total: usize, page_size: usize) -> usize {
	if page_size == 0 {
		0
	} else {
		total.div_ceil(page_size)
	}
}

/// Incident edges of `node` on the `direction` side that pass `filter`, in graph order.
pub fn matching_edges<'a>(
	graph: &'a Graph,
	node: &NodeId,
	direction: Direction,
	filter: &EdgeFilter,
) -> Vec<&'a Edge> {
	graph
		.edges()
		.iter()
		.filter(|e| direction.matches(e, node) && filter.matches(e))
		.collect()
}

/// One page of a filtered incident-edge listing.
#[derive(Clone, Debug, PartialEq)]
pub struct Page<'a> {
	pub items: Vec<&'a Edge>,
	/// Matching edges across all pages.
	pub total: usize,
	pub page: usize,
	pub page_size: usize,
}

impl Page<'_> {
	pub fn page_count(&self) -> usize {
		page_count(self.total, self.page_size)
	}

	pub fn has_next(&self) -> bool {
		self.page < self.page_count()
	}
}

pub fn query<'a>(
	graph: &'a Graph,
	node: &NodeId,
	direction: Direction,
	filter: &EdgeFilter,
	page: usize,
	page_size: usize,
) -> Page<'a> {
	let matching = matching_edges(graph, node, direction, filter);
	Page {
		items: paginate(&matching, page, page_size).to_vec(),
		total: matching.len(),
		page,
		page_size,
	}
}

/// A growing first page: each "load more" widens it by a fixed increment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadMore {
	shown: usize,
	initial: usize,
	increment: usize,
}

impl LoadMore {
	pub fn new(initial: usize, increment: usize) -> Self {
		Self {
			shown: initial,
			initial,
			increment,
		}
	}

	/// Rows on display out of `total`.
	pub fn shown(&self, total: usize) -> usize {
		self.shown.min(total)
	}

	pub fn page_size(&self) -> usize {
		self.shown
	}

	pub fn has_more(&self, total: usize) -> bool {
		self.shown < total
	}

	pub fn remaining(&self, total: usize) -> usize {
		total.saturating_sub(self.shown)
	}

	/// Widens the page, never past `total`. Returns the new row count.
	pub fn load_more(&mut self, total: usize) -> usize {
		if self.shown < total {
			self.shown = (self.shown + self.increment).min(total);
		}
		self.shown(total)
	}

	pub fn reset(&mut self) {
		self.shown = self.initial;
	}
}

/// Fixed-order prefix of an oversized result set, revealed in steps up to a hard cap.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BoundedPreview {
	revealed: usize,
	increment: usize,
	cap: usize,
}

impl BoundedPreview {
	pub fn new(initial: usize, increment: usize, cap: usize) -> Self {
		Self {
			revealed: initial.min(cap),
			increment,
			cap,
		}
	}

	pub fn cap(&self) -> usize {
		self.cap
	}

	pub fn visible(&self, total: usize) -> usize {
		self.revealed.min(total)
	}

	pub fn has_more(&self, total: usize) -> bool {
		self.revealed < self.cap.min(total)
	}

	/// Reveals another increment, stopping at the cap.
	pub fn reveal_more(&mut self) -> usize {
		self.revealed = (self.revealed + self.increment).min(self.cap);
		self.revealed
	}

	pub fn prefix<'a, T>(&self, items: &'a [T]) -> &'a [T] {
		&items[..self.visible(items.len())]
	}
}

/// A large result set held for preview, with its summary computed up front.
#[derive(Clone, Debug)]
pub struct HighVolume {
	pub edges: Vec<Edge>,
	pub summary: EdgeSummary,
	pub window: BoundedPreview,
}

/// What the data browser shows for the focused node: one direction at a time,
/// each with its own load-more counter, plus an optional high-volume preview.
#[derive(Clone, Debug)]
pub struct EdgeBrowser {
	config: BrowserConfig,
	node: Option<NodeId>,
	direction: Direction,
	incoming: LoadMore,
	outgoing: LoadMore,
	filter: EdgeFilter,
	high_volume: Option<HighVolume>,
}

impl EdgeBrowser {
	pub fn new(config: &BrowserConfig) -> Self {
		let counter = || LoadMore::new(config.initial_display, config.load_more_increment);
		Self {
			config: config.clone(),
			node: None,
			direction: Direction::Incoming,
			incoming: counter(),
			outgoing: counter(),
			filter: EdgeFilter::default(),
			high_volume: None,
		}
	}

	pub fn node(&self) -> Option<&NodeId> {
		self.node.as_ref()
	}

	pub fn direction(&self) -> Direction {
		self.direction
	}

	pub fn filter(&self) -> &EdgeFilter {
		&self.filter
	}

	pub fn high_volume(&self) -> Option<&HighVolume> {
		self.high_volume.as_ref()
	}

	/// Points the browser at another node, resetting counters and preview.
	pub fn focus(&mut self, node: Option<&NodeId>) {
		if self.node.as_ref() == node {
			return;
		}
		self.node = node.cloned();
		self.incoming.reset();
		self.outgoing.reset();
		self.high_volume = None;
	}

	/// Switches tabs; the newly shown direction starts from its initial count.
	pub fn set_direction(&mut self, direction: Direction) {
		self.direction = direction;
		self.counter_mut().reset();
		self.high_volume = None;
	}

	pub fn set_filter(&mut self, filter: EdgeFilter) {
		self.filter = filter;
		self.incoming.reset();
		self.outgoing.reset();
	}

	/// Matching totals for the focused node as `(incoming, outgoing)`.
	pub fn counts(&self, graph: &Graph) -> (usize, usize) {
		let Some(node) = &self.node else {
			return (0, 0);
		};
		graph
			.edges()
			.iter()
			.filter(|e| self.filter.matches(e))
			.fold((0, 0), |(i, o), e| {
				(
					i + usize::from(Direction::Incoming.matches(e, node)),
					o + usize::from(Direction::Outgoing.matches(e, node)),
				)
			})
	}

	/// The load-more window for the current direction.
	pub fn visible<'a>(&self, graph: &'a Graph) -> Option<Page<'a>> {
		let node = self.node.as_ref()?;
		let size = self.counter().page_size();
		Some(query(graph, node, self.direction, &self.filter, 1, size))
	}

	/// Numbered paging over the current direction with the configured page size.
	pub fn page<'a>(&self, graph: &'a Graph, page: usize) -> Option<Page<'a>> {
		let node = self.node.as_ref()?;
		Some(query(graph, node, self.direction, &self.filter, page, self.config.page_size))
	}

	pub fn load_more(&mut self, graph: &Graph) -> usize {
		let Some(node) = self.node.clone() else {
			return 0;
		};
		let total = matching_edges(graph, &node, self.direction, &self.filter).len();
		self.counter_mut().load_more(total)
	}

	/// Replaces the listing with a capped preview of `edges`.
	pub fn open_high_volume(&mut self, edges: Vec<Edge>) {
		debug!("opening preview over {} edges", edges.len());
		let c = &self.config;
		self.high_volume = Some(HighVolume {
			summary: summarize_edges(&edges),
			window: BoundedPreview::new(c.preview_initial, c.preview_increment, c.preview_cap),
			edges,
		});
	}

	pub fn close_high_volume(&mut self) {
		self.high_volume = None;
	}

	pub fn reveal_more(&mut self) -> usize {
		self.high_volume
			.as_mut()
			.map_or(0, |hv| hv.window.reveal_more())
	}

	fn counter(&self) -> &LoadMore {
		match self.direction {
			Direction::Incoming => &self.incoming,
			Direction::Outgoing => &self.outgoing,
		}
	}

	fn counter_mut(&mut self) -> &mut LoadMore {
		match self.direction {
			Direction::Incoming => &mut self.incoming,
			Direction::Outgoing => &mut self.outgoing,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::network::model::fixtures::{at, edge, graph, node};

	#[test]
	fn fifty_five_items_in_pages_of_twenty() {
		let items: Vec<usize> = (0..55).collect();
		assert_eq!(paginate(&items, 1, 20).len(), 20);
		assert_eq!(paginate(&items, 2, 20)[0], 20);
		assert_eq!(paginate(&items, 3, 20), &items[40..55]);
		assert!(paginate(&items, 4, 20).is_empty());
		assert!(paginate(&items, 0, 20).is_empty());
		assert_eq!(page_count(55, 20), 3);
	}

	#[test]
	fn bounds_are_inclusive_and_open_when_unset() {
		assert!(Bounds::between(1.0, 2.0).contains(&1.0));
		assert!(Bounds::between(1.0, 2.0).contains(&2.0));
		assert!(!Bounds::between(1.0, 2.0).contains(&2.5));
		assert!(Bounds::at_least(5.0).contains(&1e9));
		assert!(!Bounds::at_most(5.0).contains(&5.1));
		assert!(Bounds::<f64>::default().contains(&f64::MIN));
	}

	fn weighted(source: &str, target: &str, weight: f64, secs: i64) -> Edge {
		Edge {
			weight,
			timestamp: at(secs),
			..edge(source, target)
		}
	}

	fn hub() -> Graph {
		let mut edges = Vec::new();
		for i in 0..55 {
			edges.push(weighted("hub", "x", i as f64, i));
		}
		edges.push(weighted("x", "hub", 1.0, 0));
		edges.push(weighted("y", "hub", 2.0, 0));
		Graph::new(vec![node("hub"), node("x"), node("y")], edges).unwrap()
	}

	#[test]
	fn query_filters_before_slicing() {
		let g = hub();
		let hub = NodeId::new("hub");
		let all = EdgeFilter::default();

		let p1 = query(&g, &hub, Direction::Outgoing, &all, 1, 20);
		assert_eq!((p1.items.len(), p1.total, p1.page_count()), (20, 55, 3));
		assert!(p1.has_next());
		let p3 = query(&g, &hub, Direction::Outgoing, &all, 3, 20);
		assert_eq!(p3.items.len(), 15);
		assert!(!p3.has_next());
		assert!(query(&g, &hub, Direction::Outgoing, &all, 4, 20).items.is_empty());

		let heavy = EdgeFilter {
			weight: Bounds::at_least(50.0),
			..EdgeFilter::default()
		};
		let p = query(&g, &hub, Direction::Outgoing, &heavy, 1, 20);
		assert_eq!(p.total, 5);
		assert_eq!(p.items[0].weight, 50.0);

		let recent = EdgeFilter {
			timestamp: Bounds::between(at(10), at(19)),
			weight: Bounds::at_most(14.0),
			..EdgeFilter::default()
		};
		assert_eq!(query(&g, &hub, Direction::Outgoing, &recent, 1, 20).total, 5);

		assert_eq!(query(&g, &hub, Direction::Incoming, &all, 1, 20).total, 2);
	}

	#[test]
	fn directions_are_disjoint() {
		let g = graph(&["a", "b"], &[("a", "b"), ("b", "a"), ("a", "b")]);
		let a = NodeId::new("a");
		let all = EdgeFilter::default();
		assert_eq!(matching_edges(&g, &a, Direction::Outgoing, &all).len(), 2);
		assert_eq!(matching_edges(&g, &a, Direction::Incoming, &all).len(), 1);
	}

	#[test]
	fn load_more_grows_page_size_up_to_total() {
		let mut more = LoadMore::new(5, 20);
		assert_eq!(more.shown(57), 5);
		assert_eq!(more.load_more(57), 25);
		assert_eq!(more.load_more(57), 45);
		assert_eq!(more.remaining(57), 12);
		assert_eq!(more.load_more(57), 57);
		assert!(!more.has_more(57));
		assert_eq!(more.load_more(57), 57);
		more.reset();
		assert_eq!(more.shown(57), 5);
		assert_eq!(more.shown(3), 3);
	}

	#[test]
	fn preview_is_capped() {
		let items: Vec<u32> = (0..100_000).collect();
		let mut preview = BoundedPreview::new(20, 50, 1_000);
		assert_eq!(preview.prefix(&items), &items[..20]);
		while preview.has_more(items.len()) {
			preview.reveal_more();
		}
		assert_eq!(preview.visible(items.len()), 1_000);
		assert_eq!(preview.reveal_more(), 1_000);
		assert_eq!(preview.prefix(&items[..30]).len(), 30);
	}

	#[test]
	fn browser_tracks_directions_independently() {
		let g = hub();
		let mut browser = EdgeBrowser::new(&BrowserConfig::default());
		assert!(browser.visible(&g).is_none());

		browser.focus(Some(&"hub".into()));
		assert_eq!(browser.counts(&g), (2, 55));

		browser.set_direction(Direction::Outgoing);
		assert_eq!(browser.visible(&g).unwrap().items.len(), 5);
		assert_eq!(browser.load_more(&g), 25);
		assert_eq!(browser.page(&g, 3).unwrap().items.len(), 15);

		browser.set_direction(Direction::Incoming);
		assert_eq!(browser.visible(&g).unwrap().items.len(), 2);
		assert_eq!(browser.load_more(&g), 2);

		// switching back starts the tab over
		browser.set_direction(Direction::Outgoing);
		assert_eq!(browser.visible(&g).unwrap().items.len(), 5);
	}

	#[test]
	fn focusing_another_node_resets_state() {
		let g = hub();
		let mut browser = EdgeBrowser::new(&BrowserConfig::default());
		browser.focus(Some(&"hub".into()));
		browser.set_direction(Direction::Outgoing);
		browser.load_more(&g);
		browser.open_high_volume(vec![edge("hub", "x"); 3]);
		assert!(browser.high_volume().is_some());

		browser.focus(Some(&"x".into()));
		assert!(browser.high_volume().is_none());
		assert_eq!(browser.direction(), Direction::Outgoing);
		assert_eq!(browser.visible(&g).unwrap().items.len(), 1);
		assert_eq!(browser.counts(&g), (55, 1));
	}

	#[test]
	fn high_volume_preview_reveals_in_steps() {
		let mut browser = EdgeBrowser::new(&BrowserConfig::default());
		browser.focus(Some(&"a".into()));
		browser.open_high_volume(vec![edge("a", "b"); 2_000]);
		let hv = browser.high_volume().unwrap();
		assert_eq!(hv.summary.total, 2_000);
		assert_eq!(hv.window.prefix(&hv.edges).len(), 20);
		assert_eq!(browser.reveal_more(), 70);
	}
}
