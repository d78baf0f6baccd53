//! One explorable network view: the current generation plus every component
//! derived from it, kept consistent as data, input and time arrive.

use log::{debug, info, warn};

use super::config::NetworkConfig;
use super::error::SourceError;
use super::interaction::{
	EdgeEmphasis, Focus, InteractionState, NodeEmphasis, edge_emphasis, node_emphasis,
};
use super::layout::{LayoutEngine, Point, PositionStore};
use super::model::{Direction, Edge, Graph, Node, NodeId};
use super::paginator::{EdgeBrowser, EdgeFilter, Page};
use super::sampler::EdgeSampler;
use super::source::GraphSource;
use super::stats::{NetworkStats, aggregate};

/// Whether the renderer is looking at fresh data.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum LoadStatus {
	#[default]
	Loading,
	Ready,
	/// The last refresh failed; the previous generation is still shown.
	Failed(String),
}

/// Claim on a refresh. Only the most recently issued ticket may complete.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[must_use]
pub struct Ticket(u64);

pub struct NetworkSession {
	config: NetworkConfig,
	graph: Graph,
	generation: u64,
	issued: u64,
	status: LoadStatus,
	layout: LayoutEngine,
	interaction: InteractionState,
	focus: Focus,
	sampler: EdgeSampler,
	browser: EdgeBrowser,
	stats: NetworkStats,
	torn_down: bool,
}

impl NetworkSession {
	pub fn new(config: NetworkConfig, seed: u64) -> Self {
		Self {
			layout: LayoutEngine::new(config.layout.clone(), seed),
			interaction: InteractionState::new(&config.interaction),
			sampler: EdgeSampler::new(&config.sampling),
			browser: EdgeBrowser::new(&config.browser),
			config,
			graph: Graph::empty(),
			generation: 0,
			issued: 0,
			status: LoadStatus::Loading,
			focus: Focus::default(),
			stats: NetworkStats::default(),
			torn_down: false,
		}
	}

	pub fn config(&self) -> &NetworkConfig {
		&self.config
	}

	pub fn graph(&self) -> &Graph {
		&self.graph
	}

	/// Number of generations applied so far.
	pub fn generation(&self) -> u64 {
		self.generation
	}

	pub fn status(&self) -> &LoadStatus {
		&self.status
	}

	pub fn is_loading(&self) -> bool {
		self.status == LoadStatus::Loading
	}

	pub fn layout(&self) -> &LayoutEngine {
		&self.layout
	}

	pub fn positions(&self) -> &PositionStore {
		self.layout.positions()
	}

	pub fn interaction(&self) -> &InteractionState {
		&self.interaction
	}

	pub fn focus(&self) -> &Focus {
		&self.focus
	}

	pub fn stats(&self) -> &NetworkStats {
		&self.stats
	}

	pub fn browser(&self) -> &EdgeBrowser {
		&self.browser
	}

	pub fn selected_node(&self) -> Option<&Node> {
		self.interaction.selected().and_then(|id| self.graph.node(id))
	}

	// -- generations --

	/// Marks a refresh as in flight. Any earlier ticket is superseded.
	pub fn begin_refresh(&mut self) -> Ticket {
		self.issued += 1;
		self.status = LoadStatus::Loading;
		Ticket(self.issued)
	}

	/// Applies the outcome of the refresh `ticket` was issued for. Superseded
	/// tickets are discarded; failures keep the current generation on screen.
	/// Returns whether a new generation was applied.
	pub fn complete_refresh(&mut self, ticket: Ticket, result: Result<Graph, SourceError>) -> bool {
		if self.torn_down || ticket.0 != self.issued {
			debug!("discarding superseded refresh #{}", ticket.0);
			return false;
		}
		match result {
			Ok(graph) => {
				self.apply(graph);
				true
			}
			Err(err) => {
				warn!("graph refresh failed, keeping generation {}: {}", self.generation, err);
				self.status = LoadStatus::Failed(err.to_string());
				false
			}
		}
	}

	/// Like [`NetworkSession::complete_refresh`] but discards every cached
	/// position first, for datasets unrelated to the previous one.
	pub fn complete_replacement(
		&mut self,
		ticket: Ticket,
		result: Result<Graph, SourceError>,
	) -> bool {
		if ticket.0 == self.issued && result.is_ok() {
			self.layout.reset();
		}
		self.complete_refresh(ticket, result)
	}

	/// Fetches and applies a generation synchronously.
	pub fn refresh(&mut self, source: &mut impl GraphSource) -> bool {
		let ticket = self.begin_refresh();
		let result = source.fetch();
		self.complete_refresh(ticket, result)
	}

	fn apply(&mut self, graph: Graph) {
		self.graph = graph;
		self.generation += 1;
		let placed = self.layout.reconcile(&self.graph);
		self.interaction.retain(&self.graph);
		self.stats = aggregate(&self.graph);
		self.status = LoadStatus::Ready;
		self.refocus();
		info!(
			"generation {} applied: {} nodes ({} new), {} edges",
			self.generation,
			self.graph.node_count(),
			placed,
			self.graph.edge_count()
		);
	}

	fn refocus(&mut self) {
		self.focus = Focus::derive(&self.graph, self.interaction.active());
		self.browser.focus(self.interaction.selected());
	}

	fn refocus_if(&mut self, changed: bool) -> bool {
		if changed {
			self.refocus();
		}
		changed
	}

	// -- time --

	/// Advances timers and the simulation by one frame of `dt` seconds.
	/// Returns the largest node displacement.
	pub fn tick(&mut self, dt: f64) -> f64 {
		if self.torn_down {
			return 0.0;
		}
		let changed = self.interaction.advance(dt);
		self.refocus_if(changed);
		self.layout.tick()
	}

	/// Cancels all scheduled work: simulation steps, hover timers, drags and
	/// any refresh still in flight.
	pub fn teardown(&mut self) {
		self.layout.drag_end();
		self.layout.stop();
		self.interaction.cancel_timers();
		self.issued += 1;
		self.torn_down = true;
		info!("network session torn down at generation {}", self.generation);
	}

	pub fn is_torn_down(&self) -> bool {
		self.torn_down
	}

	// -- input --

	pub fn click_node(&mut self, id: &NodeId) -> bool {
		if !self.graph.contains(id) {
			return false;
		}
		let changed = self.interaction.click_node(id);
		self.refocus_if(changed)
	}

	pub fn click_canvas(&mut self) -> bool {
		let changed = self.interaction.clear_selection();
		self.refocus_if(changed)
	}

	/// Back to idle with no search highlighting.
	pub fn reset_selection(&mut self) -> bool {
		self.interaction.clear_search();
		self.click_canvas()
	}

	/// Selects a search suggestion and clears the search term.
	pub fn choose_suggestion(&mut self, id: &NodeId) -> bool {
		if !self.graph.contains(id) {
			return false;
		}
		self.interaction.clear_search();
		let changed = self.interaction.select(id);
		self.refocus_if(changed)
	}

	pub fn hover_enter(&mut self, id: &NodeId) -> bool {
		let changed = self.interaction.hover_enter(id);
		self.refocus_if(changed)
	}

	pub fn hover_leave(&mut self) -> bool {
		let changed = self.interaction.hover_leave();
		self.refocus_if(changed)
	}

	pub fn set_search(&mut self, term: impl Into<String>) {
		self.interaction.set_search(term);
	}

	pub fn search_suggestions(&self) -> Vec<&Node> {
		self.graph.search(self.interaction.search())
	}

	pub fn drag_start(&mut self, id: &NodeId, at: Point) -> bool {
		!self.torn_down && self.layout.drag_start(id, at)
	}

	pub fn drag_move(&mut self, at: Point) {
		self.layout.drag_move(at);
	}

	pub fn drag_end(&mut self) {
		self.layout.drag_end();
	}

	// -- render outputs --

	/// Indices of the edges to draw this frame.
	pub fn render_edges(&self) -> Vec<usize> {
		self.sampler.render_set(self.graph.edges(), self.focus.active())
	}

	pub fn edge_style(&self, edge: &Edge) -> EdgeEmphasis {
		edge_emphasis(edge, self.focus.active())
	}

	/// Style of every node, aligned with [`Graph::nodes`].
	pub fn node_styles(&self) -> Vec<NodeEmphasis> {
		let needle = self.interaction.search().trim().to_lowercase();
		let selected = self.interaction.selected();
		self.graph
			.nodes()
			.iter()
			.map(|n| node_emphasis(n, &self.focus, selected, &needle))
			.collect()
	}

	/// Closest node whose disc, widened by `slop`, contains `at`.
	pub fn node_at(&self, at: Point, slop: f64) -> Option<&Node> {
		self.graph
			.nodes()
			.iter()
			.filter_map(|n| Some((n, self.layout.position(&n.id)?)))
			.filter(|(n, p)| p.distance(at) <= n.radius + slop)
			.min_by(|(_, a), (_, b)| a.distance(at).total_cmp(&b.distance(at)))
			.map(|(n, _)| n)
	}

	pub fn selected_connection_count(&self) -> Option<usize> {
		let id = self.interaction.selected()?;
		Some(self.graph.incident_edges(id).count())
	}

	// -- data browser --

	pub fn set_browser_direction(&mut self, direction: Direction) {
		self.browser.set_direction(direction);
	}

	pub fn set_browser_filter(&mut self, filter: EdgeFilter) {
		self.browser.set_filter(filter);
	}

	pub fn browser_counts(&self) -> (usize, usize) {
		self.browser.counts(&self.graph)
	}

	pub fn browser_page(&self) -> Option<Page<'_>> {
		self.browser.visible(&self.graph)
	}

	pub fn browser_load_more(&mut self) -> usize {
		self.browser.load_more(&self.graph)
	}

	pub fn open_high_volume(&mut self, edges: Vec<Edge>) {
		self.browser.open_high_volume(edges);
	}

	pub fn close_high_volume(&mut self) {
		self.browser.close_high_volume();
	}

	pub fn reveal_more(&mut self) -> usize {
		self.browser.reveal_more()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::network::interaction::Selection;
	use crate::network::model::fixtures::graph;

	fn session() -> NetworkSession {
		NetworkSession::new(NetworkConfig::default(), 42)
	}

	fn loaded(g: Graph) -> NetworkSession {
		let mut s = session();
		let t = s.begin_refresh();
		assert!(s.complete_refresh(t, Ok(g)));
		s
	}

	fn offline() -> Result<Graph, SourceError> {
		Err(SourceError::Unavailable("timeout".into()))
	}

	#[test]
	fn starts_loading_and_empty() {
		let s = session();
		assert!(s.is_loading());
		assert!(s.graph().is_empty());
		assert_eq!(s.stats(), &NetworkStats::default());
	}

	#[test]
	fn newest_refresh_wins() {
		let mut s = session();
		let first = s.begin_refresh();
		let second = s.begin_refresh();
		assert!(s.complete_refresh(second, Ok(graph(&["b"], &[]))));
		assert!(!s.complete_refresh(first, Ok(graph(&["a"], &[]))));
		assert!(s.graph().contains(&"b".into()));
		assert!(!s.graph().contains(&"a".into()));
		assert_eq!(s.generation(), 1);
	}

	#[test]
	fn failure_keeps_last_good_generation() {
		let mut s = loaded(graph(&["a", "b"], &[("a", "b")]));
		let t = s.begin_refresh();
		assert!(!s.complete_refresh(t, offline()));
		assert!(matches!(s.status(), LoadStatus::Failed(msg) if msg.contains("timeout")));
		assert_eq!(s.graph().node_count(), 2);
		assert_eq!(s.stats().total_edges, 1);
	}

	#[test]
	fn failure_before_any_data_leaves_empty_graph() {
		let mut s = session();
		let mut source = offline;
		assert!(!s.refresh(&mut source));
		assert!(s.graph().is_empty());
		assert!(matches!(s.status(), LoadStatus::Failed(_)));
	}

	#[test]
	fn refresh_recomputes_derived_state() {
		let mut s = loaded(graph(&["a", "b", "c"], &[("a", "b")]));
		s.click_node(&"c".into());
		assert_eq!(s.stats().isolated_nodes, 1);

		let t = s.begin_refresh();
		s.complete_refresh(t, Ok(graph(&["a", "b"], &[("a", "b"), ("b", "a")])));
		assert_eq!(s.interaction().selection(), &Selection::Idle);
		assert_eq!(s.focus(), &Focus::default());
		assert_eq!(s.stats().isolated_nodes, 0);
		assert_eq!(s.stats().total_edges, 2);
		assert_eq!(s.status(), &LoadStatus::Ready);
	}

	#[test]
	fn selection_survives_refresh_when_node_remains() {
		let mut s = loaded(graph(&["a", "b"], &[("a", "b")]));
		s.click_node(&"a".into());
		let t = s.begin_refresh();
		s.complete_refresh(t, Ok(graph(&["a", "b", "c"], &[("a", "b"), ("a", "c")])));
		assert_eq!(s.selected_node().map(|n| n.id.as_str()), Some("a"));
		assert_eq!(s.focus().connected_nodes().len(), 2);
		assert_eq!(s.selected_connection_count(), Some(2));
	}

	#[test]
	fn selection_does_not_touch_statistics() {
		let mut s = loaded(graph(&["a", "b"], &[("a", "b")]));
		let before = s.stats().clone();
		s.click_node(&"a".into());
		s.hover_enter(&"b".into());
		s.tick(1.0);
		assert_eq!(s.stats(), &before);
	}

	#[test]
	fn hover_lands_after_debounce_ticks() {
		let mut s = loaded(graph(&["a", "b"], &[("a", "b")]));
		s.hover_enter(&"a".into());
		assert_eq!(s.focus().active(), None);
		s.tick(0.05);
		s.tick(0.05);
		assert_eq!(s.focus().active(), Some(&NodeId::new("a")));
		s.hover_leave();
		assert_eq!(s.focus().active(), None);
	}

	#[test]
	fn refresh_cancels_pending_hover() {
		let mut s = loaded(graph(&["a", "b"], &[("a", "b")]));
		s.hover_enter(&"a".into());
		assert!(s.interaction().hover_pending());
		let t = s.begin_refresh();
		assert!(s.complete_refresh(t, Ok(graph(&["a", "b", "c"], &[("a", "b")]))));
		assert!(!s.interaction().hover_pending());
		s.tick(1.0);
		assert_eq!(s.interaction().hovered(), None);
		assert_eq!(s.focus().active(), None);
	}

	#[test]
	fn styles_follow_the_selection() {
		let mut s = loaded(graph(&["a", "b", "c"], &[("a", "b"), ("b", "c")]));
		s.set_search("node c");
		assert_eq!(s.node_styles()[2], NodeEmphasis::SearchMatch);
		s.click_node(&"a".into());
		assert_eq!(
			s.node_styles(),
			vec![
				NodeEmphasis::Selected,
				NodeEmphasis::Connected(Direction::Outgoing),
				NodeEmphasis::SearchMatch,
			]
		);
		let edges = s.graph().edges();
		assert_eq!(s.edge_style(&edges[0]), EdgeEmphasis::Outgoing);
		assert_eq!(s.edge_style(&edges[1]), EdgeEmphasis::Hidden);
		s.click_canvas();
		assert_eq!(s.edge_style(&s.graph().edges()[1]), EdgeEmphasis::Default);
	}

	#[test]
	fn suggestions_select_and_clear_search() {
		let mut s = loaded(graph(&["a", "b"], &[]));
		s.set_search("NODE B");
		let hits: Vec<NodeId> = s.search_suggestions().iter().map(|n| n.id.clone()).collect();
		assert_eq!(hits, vec![NodeId::new("b")]);
		assert!(s.choose_suggestion(&hits[0]));
		assert_eq!(s.interaction().search(), "");
		assert_eq!(s.selected_node().map(|n| n.id.clone()), Some(NodeId::new("b")));
	}

	#[test]
	fn reset_returns_to_idle_and_clears_search() {
		let mut s = loaded(graph(&["a", "b"], &[("a", "b")]));
		s.click_node(&"a".into());
		s.set_search("node");
		assert!(s.reset_selection());
		assert_eq!(s.interaction().selection(), &Selection::Idle);
		assert!(s.search_suggestions().is_empty());
		assert!(s.browser_page().is_none());
	}

	#[test]
	fn clicks_on_unknown_nodes_are_ignored() {
		let mut s = loaded(graph(&["a"], &[]));
		assert!(!s.click_node(&"ghost".into()));
		assert_eq!(s.interaction().selection(), &Selection::Idle);
	}

	#[test]
	fn browser_follows_selection() {
		let mut s = loaded(graph(&["a", "b", "c"], &[("a", "b"), ("c", "a"), ("a", "c")]));
		assert!(s.browser_page().is_none());
		s.click_node(&"a".into());
		assert_eq!(s.browser_counts(), (1, 2));
		s.set_browser_direction(Direction::Outgoing);
		assert_eq!(s.browser_page().unwrap().total, 2);
	}

	#[test]
	fn teardown_cancels_everything() {
		let mut s = loaded(graph(&["a", "b"], &[("a", "b")]));
		s.hover_enter(&"a".into());
		let pending = s.begin_refresh();
		s.teardown();

		assert_eq!(s.tick(1.0), 0.0);
		assert!(!s.interaction().hover_pending());
		assert_eq!(s.interaction().hovered(), None);
		assert!(!s.complete_refresh(pending, Ok(graph(&["z"], &[]))));
		assert!(!s.drag_start(&"a".into(), Point::default()));
		assert!(!s.layout().is_running());
	}

	#[test]
	fn replacement_forgets_old_positions() {
		let mut s = loaded(graph(&["a", "b"], &[("a", "b")]));
		let t = s.begin_refresh();
		assert!(s.complete_replacement(t, Ok(graph(&["c"], &[]))));
		assert!(!s.positions().contains(&"a".into()));
		assert!(s.positions().contains(&"c".into()));
	}

	#[test]
	fn node_at_picks_the_closest_hit() {
		let s = loaded(graph(&["a", "b"], &[]));
		let a = s.layout().position(&"a".into()).unwrap();
		assert_eq!(s.node_at(a, 0.0).map(|n| n.id.as_str()), Some("a"));
		assert!(s.node_at(Point::new(1e6, 1e6), 4.0).is_none());
	}
}
