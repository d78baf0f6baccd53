//! Force-directed layout.
//!
//! The engine owns every node position. Each [`LayoutEngine::tick`] applies a
//! spring force along edges, pairwise repulsion, optional collision and a
//! centering pull, then integrates velocities. An energy value (`alpha`) scales
//! all forces and decays every step; once it drops below `alpha_min` ticks do
//! nothing until something reheats the simulation.

use std::collections::HashMap;

use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::config::LayoutConfig;
use super::model::{Graph, NodeId};

/// Floor for any length used as a divisor.
const EPSILON: f64 = 1e-6;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
	pub x: f64,
	pub y: f64,
}

impl Point {
	pub fn new(x: f64, y: f64) -> Self {
		Self { x, y }
	}

	pub fn distance(self, other: Point) -> f64 {
		((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
	}
}

/// Last known position of every node the engine has ever placed.
///
/// Entries survive a node's absence from a generation, so a node that comes
/// back resumes where it was. Only [`LayoutEngine`] writes to it.
#[derive(Clone, Debug, Default)]
pub struct PositionStore {
	positions: HashMap<NodeId, Point>,
}

impl PositionStore {
	pub fn get(&self, id: &NodeId) -> Option<Point> {
		self.positions.get(id).copied()
	}

	pub fn contains(&self, id: &NodeId) -> bool {
		self.positions.contains_key(id)
	}

	pub fn len(&self) -> usize {
		self.positions.len()
	}

	pub fn is_empty(&self) -> bool {
		self.positions.is_empty()
	}
}

#[derive(Clone, Debug)]
struct Body {
	id: NodeId,
	x: f64,
	y: f64,
	vx: f64,
	vy: f64,
	radius: f64,
	pin: Option<Point>,
}

#[derive(Clone, Copy, Debug)]
struct Link {
	source: usize,
	target: usize,
	strength: f64,
	/// Share of the correction applied to the target; the rest goes to the source.
	bias: f64,
}

/// Iterative force simulation over the current generation.
pub struct LayoutEngine {
	config: LayoutConfig,
	store: PositionStore,
	bodies: Vec<Body>,
	links: Vec<Link>,
	alpha: f64,
	alpha_target: f64,
	running: bool,
	dragging: Option<usize>,
	rng: StdRng,
}

impl LayoutEngine {
	/// An engine at full energy with nothing to lay out yet.
	pub fn new(config: LayoutConfig, seed: u64) -> Self {
		Self {
			config,
			store: PositionStore::default(),
			bodies: Vec::new(),
			links: Vec::new(),
			alpha: 1.0,
			alpha_target: 0.0,
			running: true,
			dragging: None,
			rng: StdRng::seed_from_u64(seed),
		}
	}

	pub fn config(&self) -> &LayoutConfig {
		&self.config
	}

	pub fn positions(&self) -> &PositionStore {
		&self.store
	}

	pub fn position(&self, id: &NodeId) -> Option<Point> {
		self.store.get(id)
	}

	pub fn alpha(&self) -> f64 {
		self.alpha
	}

	pub fn is_running(&self) -> bool {
		self.running
	}

	/// True once the energy has decayed and nothing holds it up.
	pub fn is_settled(&self) -> bool {
		self.alpha < self.config.alpha_min && self.alpha_target < self.config.alpha_min
	}

	pub fn dragging(&self) -> Option<&NodeId> {
		self.dragging.map(|i| &self.bodies[i].id)
	}

	/// Adopts a new generation. Known ids keep their cached position and
	/// velocity, unknown ids are scattered near the centre. Returns how many
	/// nodes were newly placed.
	pub fn reconcile(&mut self, graph: &Graph) -> usize {
		let previous: HashMap<NodeId, Body> = self
			.bodies
			.drain(..)
			.map(|b| (b.id.clone(), b))
			.collect();
		let dragged = self.dragging.take().and_then(|_| {
			previous
				.values()
				.find(|b| b.pin.is_some())
				.map(|b| b.id.clone())
		});

		let (cx, cy) = self.config.center;
		let half = self.config.initial_spread / 2.0;
		let mut placed = 0;
		for node in graph.nodes() {
			let body = match previous.get(&node.id) {
				Some(old) => Body {
					radius: node.radius,
					..old.clone()
				},
				None => {
					let (x, y) = match self.store.get(&node.id) {
						Some(p) => (p.x, p.y),
						None => {
							placed += 1;
							(
								cx + self.rng.gen_range(-half..=half),
								cy + self.rng.gen_range(-half..=half),
							)
						}
					};
					Body {
						id: node.id.clone(),
						x,
						y,
						vx: 0.0,
						vy: 0.0,
						radius: node.radius,
						pin: None,
					}
				}
			};
			self.store.positions.insert(body.id.clone(), Point::new(body.x, body.y));
			self.bodies.push(body);
		}

		self.dragging = dragged.and_then(|id| graph.node_index(&id));
		if self.dragging.is_none() {
			for body in &mut self.bodies {
				body.pin = None;
			}
			self.alpha_target = 0.0;
		}

		self.links = build_links(graph, self.config.spring_strength);
		self.reheat();
		placed
	}

	/// Forgets every cached position, e.g. when the dataset is replaced wholesale.
	pub fn reset(&mut self) {
		self.store.positions.clear();
		self.bodies.clear();
		self.links.clear();
		self.dragging = None;
		self.alpha = 1.0;
		self.alpha_target = 0.0;
	}

	/// Raises the energy so the layout re-settles after a change.
	pub fn reheat(&mut self) {
		self.alpha = self.alpha.max(self.config.reheat_alpha);
		debug!("layout reheated to alpha {:.3}", self.alpha);
	}

	/// Cancels all further stepping until [`LayoutEngine::restart`].
	pub fn stop(&mut self) {
		self.running = false;
	}

	pub fn restart(&mut self) {
		self.running = true;
	}

	/// Pins `id` to `at` and holds the simulation warm so neighbours follow.
	pub fn drag_start(&mut self, id: &NodeId, at: Point) -> bool {
		let Some(idx) = self.bodies.iter().position(|b| &b.id == id) else {
			return false;
		};
		if let Some(prev) = self.dragging.replace(idx) {
			self.bodies[prev].pin = None;
		}
		self.pin(idx, at);
		self.alpha_target = self.config.drag_alpha_target;
		self.reheat();
		debug!("pinned {} at ({:.1}, {:.1})", id, at.x, at.y);
		true
	}

	pub fn drag_move(&mut self, at: Point) {
		if let Some(idx) = self.dragging {
			self.pin(idx, at);
		}
	}

	/// Releases the dragged node and lets the energy decay again.
	pub fn drag_end(&mut self) {
		if let Some(idx) = self.dragging.take() {
			self.bodies[idx].pin = None;
			debug!("unpinned {}", self.bodies[idx].id);
		}
		self.alpha_target = 0.0;
	}

	fn pin(&mut self, idx: usize, at: Point) {
		let body = &mut self.bodies[idx];
		body.pin = Some(at);
		body.x = at.x;
		body.y = at.y;
		body.vx = 0.0;
		body.vy = 0.0;
		if let Some(p) = self.store.positions.get_mut(&body.id) {
			*p = at;
		}
	}

	/// Advances one step. Returns the largest distance any node moved.
	pub fn tick(&mut self) -> f64 {
		if !self.running || self.is_settled() || self.bodies.is_empty() {
			return 0.0;
		}
		self.alpha += (self.alpha_target - self.alpha) * self.config.alpha_decay;

		let before: Vec<(f64, f64)> = self.bodies.iter().map(|b| (b.x, b.y)).collect();
		self.apply_links();
		self.apply_repulsion();
		if self.config.collision {
			self.apply_collision();
		}
		self.apply_centering();

		let keep = 1.0 - self.config.velocity_decay;
		let mut max_delta: f64 = 0.0;
		for (body, (bx, by)) in self.bodies.iter_mut().zip(before) {
			match body.pin {
				Some(p) => {
					body.x = p.x;
					body.y = p.y;
					body.vx = 0.0;
					body.vy = 0.0;
				}
				None => {
					body.vx *= keep;
					body.vy *= keep;
					body.x += body.vx;
					body.y += body.vy;
				}
			}
			max_delta = max_delta.max(((body.x - bx).powi(2) + (body.y - by).powi(2)).sqrt());
			if let Some(p) = self.store.positions.get_mut(&body.id) {
				*p = Point::new(body.x, body.y);
			}
		}
		max_delta
	}

	fn apply_links(&mut self) {
		let distance = self.config.spring_distance;
		for link in &self.links {
			let (s, t) = (&self.bodies[link.source], &self.bodies[link.target]);
			let mut dx = t.x + t.vx - s.x - s.vx;
			let mut dy = t.y + t.vy - s.y - s.vy;
			if dx == 0.0 && dy == 0.0 {
				dx = jiggle(&mut self.rng);
				dy = jiggle(&mut self.rng);
			}
			let len = (dx * dx + dy * dy).sqrt().max(EPSILON);
			let k = (len - distance) / len * self.alpha * link.strength;
			dx *= k;
			dy *= k;

			let t = &mut self.bodies[link.target];
			t.vx -= dx * link.bias;
			t.vy -= dy * link.bias;
			let s = &mut self.bodies[link.source];
			s.vx += dx * (1.0 - link.bias);
			s.vy += dy * (1.0 - link.bias);
		}
	}

	fn apply_repulsion(&mut self) {
		let strength = self.config.repulsion_strength * self.alpha;
		let floor = self.config.min_distance.max(EPSILON);
		let n = self.bodies.len();
		for i in 0..n {
			for j in (i + 1)..n {
				let mut dx = self.bodies[j].x - self.bodies[i].x;
				let mut dy = self.bodies[j].y - self.bodies[i].y;
				if dx == 0.0 && dy == 0.0 {
					dx = jiggle(&mut self.rng);
					dy = jiggle(&mut self.rng);
				}
				// push falls off as 1/d but never exceeds strength / floor
				let len = (dx * dx + dy * dy).sqrt().max(EPSILON);
				let w = strength / len.max(floor) / len;
				self.bodies[i].vx -= dx * w;
				self.bodies[i].vy -= dy * w;
				self.bodies[j].vx += dx * w;
				self.bodies[j].vy += dy * w;
			}
		}
	}

	fn apply_collision(&mut self) {
		let padding = self.config.collision_padding;
		let strength = self.config.collision_strength;
		let n = self.bodies.len();
		for i in 0..n {
			for j in (i + 1)..n {
				let (a, b) = (&self.bodies[i], &self.bodies[j]);
				let reach = a.radius + b.radius + padding;
				let mut dx = a.x + a.vx - b.x - b.vx;
				let mut dy = a.y + a.vy - b.y - b.vy;
				let d2 = dx * dx + dy * dy;
				if d2 >= reach * reach {
					continue;
				}
				if d2 == 0.0 {
					dx = jiggle(&mut self.rng);
					dy = jiggle(&mut self.rng);
				}
				let len = (dx * dx + dy * dy).sqrt().max(EPSILON);
				let k = (reach - len) / len * strength;
				let (ra, rb) = (a.radius * a.radius, b.radius * b.radius);
				let share = if ra + rb > 0.0 { rb / (ra + rb) } else { 0.5 };
				dx *= k;
				dy *= k;
				self.bodies[i].vx += dx * share;
				self.bodies[i].vy += dy * share;
				self.bodies[j].vx -= dx * (1.0 - share);
				self.bodies[j].vy -= dy * (1.0 - share);
			}
		}
	}

	fn apply_centering(&mut self) {
		let n = self.bodies.len() as f64;
		let (mx, my) = self
			.bodies
			.iter()
			.fold((0.0, 0.0), |(sx, sy), b| (sx + b.x, sy + b.y));
		let (cx, cy) = self.config.center;
		let shift_x = (mx / n - cx) * self.config.centering_strength;
		let shift_y = (my / n - cy) * self.config.centering_strength;
		for body in &mut self.bodies {
			body.x -= shift_x;
			body.y -= shift_y;
		}
	}
}

/// Spring per non-loop edge, weakened for high-degree endpoints and biased
/// so the lighter endpoint moves more.
fn build_links(graph: &Graph, spring_strength: f64) -> Vec<Link> {
	let pairs: Vec<(usize, usize)> = graph
		.edges()
		.iter()
		.filter(|e| !e.is_self_loop())
		.filter_map(|e| Some((graph.node_index(&e.source)?, graph.node_index(&e.target)?)))
		.collect();

	let mut degree = vec![0usize; graph.node_count()];
	for &(s, t) in &pairs {
		degree[s] += 1;
		degree[t] += 1;
	}

	pairs
		.into_iter()
		.map(|(source, target)| {
			let (ds, dt) = (degree[source] as f64, degree[target] as f64);
			Link {
				source,
				target,
				strength: spring_strength / ds.min(dt),
				bias: ds / (ds + dt),
			}
		})
		.collect()
}

fn jiggle(rng: &mut StdRng) -> f64 {
	rng.gen_range(-0.5..0.5) * EPSILON
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::network::model::fixtures::graph;

	fn engine() -> LayoutEngine {
		LayoutEngine::new(LayoutConfig::default(), 7)
	}

	fn settle(engine: &mut LayoutEngine) -> usize {
		let mut steps = 0;
		while !engine.is_settled() {
			engine.tick();
			steps += 1;
			assert!(steps < 2_000, "layout failed to settle");
		}
		steps
	}

	fn snapshot(engine: &LayoutEngine, g: &Graph) -> Vec<Point> {
		g.nodes()
			.iter()
			.map(|n| engine.position(&n.id).unwrap())
			.collect()
	}

	#[test]
	fn new_nodes_start_near_the_centre() {
		let g = graph(&["a", "b", "c"], &[]);
		let mut e = engine();
		assert_eq!(e.reconcile(&g), 3);
		let half = e.config().initial_spread / 2.0;
		for p in snapshot(&e, &g) {
			assert!(p.x.abs() <= half && p.y.abs() <= half);
		}
	}

	#[test]
	fn reconcile_keeps_known_positions() {
		let g1 = graph(&["a", "b"], &[("a", "b")]);
		let mut e = engine();
		e.reconcile(&g1);
		for _ in 0..20 {
			e.tick();
		}
		let a = e.position(&"a".into()).unwrap();

		let g2 = graph(&["a", "b", "c"], &[("a", "b"), ("b", "c")]);
		assert_eq!(e.reconcile(&g2), 1);
		assert_eq!(e.position(&"a".into()), Some(a));
		assert!(e.alpha() >= e.config().reheat_alpha);
	}

	#[test]
	fn removed_nodes_return_to_their_cached_place() {
		let mut e = engine();
		e.reconcile(&graph(&["a", "b"], &[]));
		let b = e.position(&"b".into()).unwrap();
		e.reconcile(&graph(&["a"], &[]));
		assert_eq!(e.reconcile(&graph(&["a", "b"], &[])), 0);
		assert_eq!(e.position(&"b".into()), Some(b));
	}

	#[test]
	fn converges_while_energy_remains() {
		let g = graph(
			&["a", "b", "c", "d"],
			&[("a", "b"), ("b", "c"), ("c", "d"), ("d", "a")],
		);
		let config = LayoutConfig {
			alpha_decay: 1e-9,
			..LayoutConfig::default()
		};
		let mut e = LayoutEngine::new(config, 7);
		e.reconcile(&g);

		let mut steps = 0;
		while e.tick() >= 1e-3 {
			steps += 1;
			assert!(steps < 3000, "never converged");
		}
		assert!(e.alpha() > e.config().alpha_min);
		assert!(!e.is_settled());
		assert!(e.tick() < 1e-3);
		assert!(e.tick() < 1e-3);
	}

	#[test]
	fn same_seed_same_layout() {
		let g = graph(&["a", "b", "c"], &[("a", "b"), ("a", "c")]);
		let run = || {
			let mut e = engine();
			e.reconcile(&g);
			for _ in 0..50 {
				e.tick();
			}
			snapshot(&e, &g)
		};
		assert_eq!(run(), run());
	}

	#[test]
	fn springs_pull_towards_rest_distance() {
		let g = graph(&["a", "b"], &[("a", "b")]);
		let config = LayoutConfig {
			repulsion_strength: 0.0,
			collision: false,
			..LayoutConfig::default()
		};
		let mut e = LayoutEngine::new(config, 1);
		e.reconcile(&g);
		settle(&mut e);
		let d = e.position(&"a".into()).unwrap().distance(e.position(&"b".into()).unwrap());
		assert!((d - 100.0).abs() < 5.0, "rest distance was {}", d);
	}

	#[test]
	fn coincident_nodes_separate_without_nan() {
		let g = graph(&["a", "b", "c"], &[("a", "b")]);
		let config = LayoutConfig {
			initial_spread: 0.0,
			..LayoutConfig::default()
		};
		let mut e = LayoutEngine::new(config, 3);
		e.reconcile(&g);
		for _ in 0..100 {
			e.tick();
		}
		let ps = snapshot(&e, &g);
		assert!(ps.iter().all(|p| p.x.is_finite() && p.y.is_finite()));
		assert!(ps[0].distance(ps[2]) > 1.0);
	}

	#[test]
	fn centering_keeps_the_mean_at_the_centre() {
		let g = graph(&["a", "b", "c"], &[("a", "b")]);
		let config = LayoutConfig {
			center: (400.0, 300.0),
			..LayoutConfig::default()
		};
		let mut e = LayoutEngine::new(config, 5);
		e.reconcile(&g);
		settle(&mut e);
		let ps = snapshot(&e, &g);
		let mx = ps.iter().map(|p| p.x).sum::<f64>() / 3.0;
		let my = ps.iter().map(|p| p.y).sum::<f64>() / 3.0;
		assert!((mx - 400.0).abs() < 1.0 && (my - 300.0).abs() < 1.0);
	}

	#[test]
	fn collision_keeps_circles_apart() {
		let g = graph(&["a", "b"], &[]);
		let config = LayoutConfig {
			repulsion_strength: 0.0,
			initial_spread: 1.0,
			..LayoutConfig::default()
		};
		let mut e = LayoutEngine::new(config, 11);
		e.reconcile(&g);
		settle(&mut e);
		let d = e.position(&"a".into()).unwrap().distance(e.position(&"b".into()).unwrap());
		assert!(d > 8.0 + 8.0, "circles overlap at distance {}", d);
	}

	#[test]
	fn dragged_node_stays_pinned_until_release() {
		let g = graph(&["a", "b"], &[("a", "b")]);
		let mut e = engine();
		e.reconcile(&g);
		settle(&mut e);

		let at = Point::new(250.0, -40.0);
		assert!(e.drag_start(&"a".into(), at));
		let b_before = e.position(&"b".into()).unwrap();
		for _ in 0..30 {
			e.tick();
		}
		assert_eq!(e.position(&"a".into()), Some(at));
		assert!(b_before.distance(e.position(&"b".into()).unwrap()) > 1.0);
		assert!(!e.is_settled());

		let moved = Point::new(260.0, -40.0);
		e.drag_move(moved);
		e.tick();
		assert_eq!(e.position(&"a".into()), Some(moved));

		e.drag_end();
		assert_eq!(e.dragging(), None);
		settle(&mut e);
	}

	#[test]
	fn drag_of_unknown_node_is_ignored() {
		let mut e = engine();
		e.reconcile(&graph(&["a"], &[]));
		assert!(!e.drag_start(&"zzz".into(), Point::default()));
		assert_eq!(e.dragging(), None);
	}

	#[test]
	fn stopped_engine_does_no_work_until_restarted() {
		let g = graph(&["a", "b"], &[("a", "b")]);
		let mut e = engine();
		e.reconcile(&g);
		e.stop();
		let before = snapshot(&e, &g);
		assert_eq!(e.tick(), 0.0);
		assert_eq!(before, snapshot(&e, &g));

		e.restart();
		assert!(e.tick() > 0.0);
	}

	#[test]
	fn settled_engine_is_re_excited_by_reheat() {
		let g = graph(&["a", "b"], &[("a", "b")]);
		let mut e = engine();
		e.reconcile(&g);
		settle(&mut e);
		assert_eq!(e.tick(), 0.0);
		e.reheat();
		assert!(!e.is_settled());
	}
}
