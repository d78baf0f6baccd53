//! Selection, hover and search state, and what they imply for styling.

use std::collections::HashSet;

use super::config::InteractionConfig;
use super::model::{Direction, Edge, EdgeKey, Graph, Node, NodeId};

/// A one-shot delayed value, advanced by the frame clock and cancelable at any time.
#[derive(Clone, Debug)]
pub struct DebounceTimer<T> {
	pending: Option<(T, f64)>,
}

impl<T> Default for DebounceTimer<T> {
	fn default() -> Self {
		Self { pending: None }
	}
}

impl<T> DebounceTimer<T> {
	/// Arms the timer with `value`, replacing anything pending.
	pub fn schedule(&mut self, value: T, delay: f64) {
		self.pending = Some((value, delay));
	}

	/// Disarms the timer. Returns whether something was pending.
	pub fn cancel(&mut self) -> bool {
		self.pending.take().is_some()
	}

	pub fn is_pending(&self) -> bool {
		self.pending.is_some()
	}

	/// Counts `dt` seconds down and yields the value once the delay has elapsed.
	pub fn advance(&mut self, dt: f64) -> Option<T> {
		let (_, remaining) = self.pending.as_mut()?;
		*remaining -= dt;
		if *remaining <= 0.0 {
			self.pending.take().map(|(v, _)| v)
		} else {
			None
		}
	}
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Selection {
	#[default]
	Idle,
	NodeSelected(NodeId),
}

/// Owns selection, hover and search term. Every mutator reports whether the
/// active node changed so callers know when to re-derive [`Focus`].
#[derive(Clone, Debug)]
pub struct InteractionState {
	selection: Selection,
	hovered: Option<NodeId>,
	hover_timer: DebounceTimer<NodeId>,
	hover_delay: f64,
	search: String,
}

impl InteractionState {
	pub fn new(config: &InteractionConfig) -> Self {
		Self {
			selection: Selection::Idle,
			hovered: None,
			hover_timer: DebounceTimer::default(),
			hover_delay: config.hover_debounce,
			search: String::new(),
		}
	}

	pub fn selection(&self) -> &Selection {
		&self.selection
	}

	pub fn selected(&self) -> Option<&NodeId> {
		match &self.selection {
			Selection::NodeSelected(id) => Some(id),
			Selection::Idle => None,
		}
	}

	pub fn hovered(&self) -> Option<&NodeId> {
		self.hovered.as_ref()
	}

	/// The node driving highlights: the selection, else the hover.
	pub fn active(&self) -> Option<&NodeId> {
		self.selected().or(self.hovered.as_ref())
	}

	pub fn search(&self) -> &str {
		&self.search
	}

	pub fn hover_pending(&self) -> bool {
		self.hover_timer.is_pending()
	}

	/// Toggles: the selected node deselects, any other node becomes selected.
	pub fn click_node(&mut self, id: &NodeId) -> bool {
		let before = self.active().cloned();
		self.selection = match &self.selection {
			Selection::NodeSelected(current) if current == id => Selection::Idle,
			_ => Selection::NodeSelected(id.clone()),
		};
		before.as_ref() != self.active()
	}

	/// Selects without toggling, e.g. from a search suggestion.
	pub fn select(&mut self, id: &NodeId) -> bool {
		let before = self.active().cloned();
		self.selection = Selection::NodeSelected(id.clone());
		before.as_ref() != self.active()
	}

	/// Empty-canvas click or explicit reset.
	pub fn clear_selection(&mut self) -> bool {
		let before = self.active().cloned();
		self.selection = Selection::Idle;
		before.as_ref() != self.active()
	}

	/// Starts the hover debounce for `id`. A zero delay applies at once.
	pub fn hover_enter(&mut self, id: &NodeId) -> bool {
		if self.hovered.as_ref() == Some(id) {
			self.hover_timer.cancel();
			return false;
		}
		if self.hover_delay <= 0.0 {
			self.hover_timer.cancel();
			return self.set_hovered(Some(id.clone()));
		}
		self.hover_timer.schedule(id.clone(), self.hover_delay);
		false
	}

	/// Cancels any pending hover and clears the current one immediately.
	pub fn hover_leave(&mut self) -> bool {
		self.hover_timer.cancel();
		self.set_hovered(None)
	}

	/// Feeds elapsed time to the hover debounce.
	pub fn advance(&mut self, dt: f64) -> bool {
		match self.hover_timer.advance(dt) {
			Some(id) => self.set_hovered(Some(id)),
			None => false,
		}
	}

	pub fn set_search(&mut self, term: impl Into<String>) {
		self.search = term.into();
	}

	pub fn clear_search(&mut self) {
		self.search.clear();
	}

	/// Drops timers and references to nodes absent from `graph`.
	pub fn retain(&mut self, graph: &Graph) -> bool {
		let before = self.active().cloned();
		self.hover_timer.cancel();
		if self.selected().is_some_and(|id| !graph.contains(id)) {
			self.selection = Selection::Idle;
		}
		if self.hovered.as_ref().is_some_and(|id| !graph.contains(id)) {
			self.hovered = None;
		}
		before.as_ref() != self.active()
	}

	pub fn cancel_timers(&mut self) {
		self.hover_timer.cancel();
	}

	fn set_hovered(&mut self, id: Option<NodeId>) -> bool {
		let before = self.active().cloned();
		self.hovered = id;
		before.as_ref() != self.active()
	}
}

/// Nodes and edges around the active node, derived afresh on every change.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Focus {
	active: Option<NodeId>,
	connected_nodes: HashSet<NodeId>,
	/// Neighbours the active node points at.
	outgoing_nodes: HashSet<NodeId>,
	connected_edges: HashSet<EdgeKey>,
}

impl Focus {
	pub fn derive(graph: &Graph, active: Option<&NodeId>) -> Self {
		let Some(active) = active.filter(|id| graph.contains(id)) else {
			return Self::default();
		};
		let mut focus = Self {
			active: Some(active.clone()),
			..Self::default()
		};
		for (_, edge) in graph.incident_edges(active) {
			focus.connected_edges.insert(edge.key());
			if edge.is_self_loop() {
				continue;
			}
			if &edge.source == active {
				focus.outgoing_nodes.insert(edge.target.clone());
				focus.connected_nodes.insert(edge.target.clone());
			} else {
				focus.connected_nodes.insert(edge.source.clone());
			}
		}
		focus
	}

	pub fn active(&self) -> Option<&NodeId> {
		self.active.as_ref()
	}

	pub fn connected_nodes(&self) -> &HashSet<NodeId> {
		&self.connected_nodes
	}

	pub fn connected_edges(&self) -> &HashSet<EdgeKey> {
		&self.connected_edges
	}

	/// How `id` relates to the active node, outgoing taking precedence.
	pub fn neighbour_direction(&self, id: &NodeId) -> Option<Direction> {
		if self.outgoing_nodes.contains(id) {
			Some(Direction::Outgoing)
		} else if self.connected_nodes.contains(id) {
			Some(Direction::Incoming)
		} else {
			None
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EdgeEmphasis {
	/// Nothing is active; every edge shows dimmed.
	Default,
	Outgoing,
	Incoming,
	Hidden,
}

impl EdgeEmphasis {
	pub fn is_visible(self) -> bool {
		self != EdgeEmphasis::Hidden
	}
}

pub fn edge_emphasis(edge: &Edge, active: Option<&NodeId>) -> EdgeEmphasis {
	match active {
		None => EdgeEmphasis::Default,
		Some(id) if &edge.source == id => EdgeEmphasis::Outgoing,
		Some(id) if &edge.target == id => EdgeEmphasis::Incoming,
		Some(_) => EdgeEmphasis::Hidden,
	}
}

/// Node styles, highest priority first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeEmphasis {
	Selected,
	/// Hovered while nothing is selected.
	Hovered,
	Connected(Direction),
	SearchMatch,
	Default,
	/// Something is active and this node is unrelated to it.
	Dimmed,
}

/// `needle` is the lowercased search term.
pub fn node_emphasis(
	node: &Node,
	focus: &Focus,
	selected: Option<&NodeId>,
	needle: &str,
) -> NodeEmphasis {
	if selected == Some(&node.id) {
		return NodeEmphasis::Selected;
	}
	if focus.active() == Some(&node.id) {
		return NodeEmphasis::Hovered;
	}
	if let Some(direction) = focus.neighbour_direction(&node.id) {
		return NodeEmphasis::Connected(direction);
	}
	if node.name_matches(needle) {
		return NodeEmphasis::SearchMatch;
	}
	if focus.active().is_some() {
		NodeEmphasis::Dimmed
	} else {
		NodeEmphasis::Default
	}
}
