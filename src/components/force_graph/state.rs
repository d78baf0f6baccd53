use crate::network::{NodeId, Point};

/// Extra pick distance around a node, in screen pixels.
pub const HIT_SLOP: f64 = 4.0;
/// Pointer travel below which a press counts as a click.
pub const CLICK_TOLERANCE: f64 = 3.0;
/// Longest frame step fed to the simulation, so a backgrounded tab does not jump.
const MAX_FRAME_STEP: f64 = 0.1;
const MIN_ZOOM: f64 = 0.1;
const MAX_ZOOM: f64 = 10.0;

#[derive(Clone, Debug, PartialEq)]
pub struct ViewTransform {
	pub x: f64,
	pub y: f64,
	pub k: f64,
}

impl ViewTransform {
	/// Graph origin at the middle of a `width` x `height` viewport.
	pub fn centered(width: f64, height: f64) -> Self {
		Self {
			x: width / 2.0,
			y: height / 2.0,
			k: 1.0,
		}
	}

	pub fn to_graph(&self, sx: f64, sy: f64) -> Point {
		Point::new((sx - self.x) / self.k, (sy - self.y) / self.k)
	}

	/// Scales by `factor` keeping the graph point under (`sx`, `sy`) fixed.
	pub fn zoom_at(&mut self, sx: f64, sy: f64, factor: f64) {
		let k = (self.k * factor).clamp(MIN_ZOOM, MAX_ZOOM);
		let ratio = k / self.k;
		self.x = sx - (sx - self.x) * ratio;
		self.y = sy - (sy - self.y) * ratio;
		self.k = k;
	}
}

#[derive(Clone, Debug)]
pub struct PanState {
	pub start_x: f64,
	pub start_y: f64,
	pub transform_start_x: f64,
	pub transform_start_y: f64,
	pub moved: bool,
}

#[derive(Clone, Debug)]
pub struct DragState {
	pub node: NodeId,
	pub start_x: f64,
	pub start_y: f64,
	pub moved: bool,
}

/// What the pressed pointer is doing.
#[derive(Clone, Debug, Default)]
pub enum Gesture {
	#[default]
	Idle,
	Pan(PanState),
	Drag(DragState),
}

/// Per-canvas view state. Graph data and positions live in the session.
pub struct CanvasState {
	pub transform: ViewTransform,
	pub gesture: Gesture,
	/// Node under the pointer as last reported to the session.
	pub pointer_over: Option<NodeId>,
	pub width: f64,
	pub height: f64,
	pub flow_time: f64,
	/// Eased 0..1 emphasis of the active node's neighbourhood.
	pub highlight_t: f64,
	last_frame: Option<f64>,
}

impl CanvasState {
	pub fn new(width: f64, height: f64) -> Self {
		Self {
			transform: ViewTransform::centered(width, height),
			gesture: Gesture::Idle,
			pointer_over: None,
			width,
			height,
			flow_time: 0.0,
			highlight_t: 0.0,
			last_frame: None,
		}
	}

	pub fn screen_to_graph(&self, sx: f64, sy: f64) -> Point {
		self.transform.to_graph(sx, sy)
	}

	/// Pick slop converted to graph units at the current zoom.
	pub fn hit_slop(&self) -> f64 {
		HIT_SLOP / self.transform.k
	}

	/// Seconds since the previous frame timestamp (milliseconds), capped.
	pub fn frame_delta(&mut self, now_ms: f64) -> f64 {
		let dt = match self.last_frame.replace(now_ms) {
			Some(prev) => ((now_ms - prev) / 1000.0).clamp(0.0, MAX_FRAME_STEP),
			None => 0.0,
		};
		self.flow_time += dt;
		dt
	}

	/// Eases the highlight toward full while something is active and back
	/// toward zero otherwise.
	pub fn ease_highlight(&mut self, dt: f64, focused: bool) {
		let (target, speed) = if focused { (1.0, 1.8) } else { (0.0, 1.26) };
		self.highlight_t += (target - self.highlight_t) * (speed * dt * 6.0).min(1.0);
		if !focused && self.highlight_t < 0.01 {
			self.highlight_t = 0.0;
		}
	}

	pub fn resize(&mut self, width: f64, height: f64) {
		self.width = width;
		self.height = height;
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn centered_transform_maps_viewport_middle_to_origin() {
		let t = ViewTransform::centered(800.0, 600.0);
		assert_eq!(t.to_graph(400.0, 300.0), Point::new(0.0, 0.0));
		assert_eq!(t.to_graph(410.0, 300.0), Point::new(10.0, 0.0));
	}

	#[test]
	fn zoom_keeps_the_anchor_point_fixed() {
		let mut t = ViewTransform::centered(800.0, 600.0);
		let before = t.to_graph(500.0, 200.0);
		t.zoom_at(500.0, 200.0, 2.0);
		let after = t.to_graph(500.0, 200.0);
		assert!(before.distance(after) < 1e-9);
		assert_eq!(t.k, 2.0);

		t.zoom_at(0.0, 0.0, 1e6);
		assert_eq!(t.k, MAX_ZOOM);
	}

	#[test]
	fn frame_delta_is_capped() {
		let mut s = CanvasState::new(100.0, 100.0);
		assert_eq!(s.frame_delta(1000.0), 0.0);
		assert!((s.frame_delta(1016.0) - 0.016).abs() < 1e-12);
		assert_eq!(s.frame_delta(60_000.0), MAX_FRAME_STEP);
	}

	#[test]
	fn highlight_fades_in_and_out() {
		let mut s = CanvasState::new(100.0, 100.0);
		for _ in 0..120 {
			s.ease_highlight(0.016, true);
		}
		assert!(s.highlight_t > 0.99);
		for _ in 0..240 {
			s.ease_highlight(0.016, false);
		}
		assert_eq!(s.highlight_t, 0.0);
	}
}
