use std::cell::{Cell, RefCell};
use std::rc::Rc;

use leptos::prelude::*;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, Event, HtmlCanvasElement, MouseEvent, WheelEvent, Window};

use super::render;
use super::state::{CLICK_TOLERANCE, CanvasState, DragState, Gesture, HIT_SLOP, PanState};
use crate::network::NetworkSession;

type FrameCallback = Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>>;

/// A `requestAnimationFrame` loop. Dropping it cancels the pending frame.
struct FrameLoop {
	handle: Rc<Cell<Option<i32>>>,
	callback: FrameCallback,
}

impl FrameLoop {
	fn start(mut step: impl FnMut(f64) + 'static) -> Self {
		let handle = Rc::new(Cell::new(None));
		let callback: FrameCallback = Rc::new(RefCell::new(None));
		let (next_handle, next_callback) = (handle.clone(), callback.clone());
		*callback.borrow_mut() = Some(Closure::new(move |now: f64| {
			step(now);
			next_handle.set(next_callback.borrow().as_ref().and_then(request_frame));
		}));
		handle.set(callback.borrow().as_ref().and_then(request_frame));
		Self { handle, callback }
	}
}

fn request_frame(cb: &Closure<dyn FnMut(f64)>) -> Option<i32> {
	web_sys::window()?
		.request_animation_frame(cb.as_ref().unchecked_ref())
		.ok()
}

impl Drop for FrameLoop {
	fn drop(&mut self) {
		if let (Some(id), Some(window)) = (self.handle.take(), web_sys::window()) {
			let _ = window.cancel_animation_frame(id);
		}
		// the closure holds a clone of `callback`
		self.callback.borrow_mut().take();
	}
}

/// A listener on `window`, removed again on drop.
struct WindowListener {
	event: &'static str,
	callback: Closure<dyn FnMut(Event)>,
}

impl WindowListener {
	fn new(event: &'static str, f: impl FnMut(Event) + 'static) -> Option<Self> {
		let callback = Closure::new(f);
		web_sys::window()?
			.add_event_listener_with_callback(event, callback.as_ref().unchecked_ref())
			.ok()?;
		Some(Self { event, callback })
	}
}

impl Drop for WindowListener {
	fn drop(&mut self) {
		if let Some(window) = web_sys::window() {
			let _ = window
				.remove_event_listener_with_callback(self.event, self.callback.as_ref().unchecked_ref());
		}
	}
}

#[derive(Default)]
struct Guards {
	frame: Option<FrameLoop>,
	listeners: Vec<WindowListener>,
}

fn viewport_size(window: &Window) -> Option<(f64, f64)> {
	Some((
		window.inner_width().ok()?.as_f64()?,
		window.inner_height().ok()?.as_f64()?,
	))
}

fn pointer_position(canvas_ref: NodeRef<leptos::html::Canvas>, ev: &MouseEvent) -> Option<(f64, f64)> {
	let canvas: HtmlCanvasElement = canvas_ref.get_untracked()?;
	let rect = canvas.get_bounding_client_rect();
	Some((
		ev.client_x() as f64 - rect.left(),
		ev.client_y() as f64 - rect.top(),
	))
}

fn travelled(start_x: f64, start_y: f64, x: f64, y: f64) -> bool {
	(x - start_x).hypot(y - start_y) > CLICK_TOLERANCE
}

/// Canvas view of a [`NetworkSession`]. Steps the session once per animation
/// frame and forwards pointer input to it; `revision` is bumped whenever the
/// selection or active node changes.
#[component]
pub fn ForceGraphCanvas(
	session: StoredValue<NetworkSession>,
	revision: RwSignal<u64>,
	#[prop(default = false)] fullscreen: bool,
	#[prop(default = None)] width: Option<f64>,
	#[prop(default = None)] height: Option<f64>,
) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let view: Rc<RefCell<Option<CanvasState>>> = Rc::new(RefCell::new(None));
	let guards = StoredValue::new_local(Guards::default());
	let bump = move || revision.update(|r| *r += 1);

	on_cleanup(move || {
		guards.try_update_value(std::mem::take);
	});

	let view_init = view.clone();
	Effect::new(move |_| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		if view_init.borrow().is_some() {
			return;
		}
		let Some(window) = web_sys::window() else {
			return;
		};

		let (w, h) = if fullscreen {
			viewport_size(&window).unwrap_or((800.0, 600.0))
		} else {
			let parent = canvas.parent_element();
			(
				width.unwrap_or_else(|| parent.as_ref().map_or(800.0, |p| p.client_width() as f64)),
				height.unwrap_or_else(|| parent.as_ref().map_or(600.0, |p| p.client_height() as f64)),
			)
		};
		canvas.set_width(w as u32);
		canvas.set_height(h as u32);

		let Some(ctx) = canvas
			.get_context("2d")
			.ok()
			.flatten()
			.and_then(|c| c.dyn_into::<CanvasRenderingContext2d>().ok())
		else {
			log::error!("canvas has no 2d context");
			return;
		};
		*view_init.borrow_mut() = Some(CanvasState::new(w, h));

		let mut listeners = Vec::new();
		if fullscreen {
			let (view_resize, canvas_resize) = (view_init.clone(), canvas.clone());
			listeners.extend(WindowListener::new("resize", move |_| {
				let Some((nw, nh)) = web_sys::window().as_ref().and_then(viewport_size) else {
					return;
				};
				canvas_resize.set_width(nw as u32);
				canvas_resize.set_height(nh as u32);
				if let Some(ref mut v) = *view_resize.borrow_mut() {
					v.resize(nw, nh);
				}
			}));
		}

		// releases outside the canvas still end the gesture
		let view_release = view_init.clone();
		listeners.extend(WindowListener::new("mouseup", move |_| {
			let gesture = match *view_release.borrow_mut() {
				Some(ref mut v) => std::mem::take(&mut v.gesture),
				None => return,
			};
			let clicked = session
				.try_update_value(|s| match gesture {
					Gesture::Drag(drag) => {
						s.drag_end();
						if !drag.moved {
							s.click_node(&drag.node);
						}
						!drag.moved
					}
					Gesture::Pan(pan) => {
						if !pan.moved {
							s.click_canvas();
						}
						!pan.moved
					}
					Gesture::Idle => false,
				})
				.unwrap_or(false);
			if clicked {
				bump();
			}
		}));

		let view_frame = view_init.clone();
		let frame = FrameLoop::start(move |now| {
			let mut guard = view_frame.borrow_mut();
			let Some(v) = guard.as_mut() else {
				return;
			};
			let dt = v.frame_delta(now);
			let Some((changed, focused)) = session.try_update_value(|s| {
				let before = s.focus().active().cloned();
				s.tick(dt);
				let after = s.focus().active();
				(before.as_ref() != after, after.is_some())
			}) else {
				return;
			};
			if changed {
				bump();
			}
			v.ease_highlight(dt, focused);
			session.try_with_value(|s| render::render(s, v, &ctx));
		});

		guards.update_value(|g| {
			g.frame = Some(frame);
			g.listeners = listeners;
		});
	});

	let view_md = view.clone();
	let on_mousedown = move |ev: MouseEvent| {
		let Some((x, y)) = pointer_position(canvas_ref, &ev) else {
			return;
		};
		let mut guard = view_md.borrow_mut();
		let Some(v) = guard.as_mut() else {
			return;
		};
		let p = v.screen_to_graph(x, y);
		let slop = v.hit_slop();
		let hit = session
			.try_with_value(|s| s.node_at(p, slop).map(|n| n.id.clone()))
			.flatten();

		v.gesture = match hit {
			Some(node) => {
				session.try_update_value(|s| s.drag_start(&node, p));
				Gesture::Drag(DragState {
					node,
					start_x: x,
					start_y: y,
					moved: false,
				})
			}
			None => Gesture::Pan(PanState {
				start_x: x,
				start_y: y,
				transform_start_x: v.transform.x,
				transform_start_y: v.transform.y,
				moved: false,
			}),
		};
	};

	let view_mm = view.clone();
	let on_mousemove = move |ev: MouseEvent| {
		let Some((x, y)) = pointer_position(canvas_ref, &ev) else {
			return;
		};
		let mut guard = view_mm.borrow_mut();
		let Some(v) = guard.as_mut() else {
			return;
		};

		match &mut v.gesture {
			Gesture::Drag(drag) => {
				drag.moved |= travelled(drag.start_x, drag.start_y, x, y);
				let p = v.transform.to_graph(x, y);
				session.try_update_value(|s| s.drag_move(p));
			}
			Gesture::Pan(pan) => {
				pan.moved |= travelled(pan.start_x, pan.start_y, x, y);
				v.transform.x = pan.transform_start_x + (x - pan.start_x);
				v.transform.y = pan.transform_start_y + (y - pan.start_y);
			}
			Gesture::Idle => {
				let p = v.transform.to_graph(x, y);
				let slop = HIT_SLOP / v.transform.k;
				let hit = session
					.try_with_value(|s| s.node_at(p, slop).map(|n| n.id.clone()))
					.flatten();
				if hit == v.pointer_over {
					return;
				}
				let changed = session
					.try_update_value(|s| match &hit {
						Some(id) => s.hover_enter(id),
						None => s.hover_leave(),
					})
					.unwrap_or(false);
				v.pointer_over = hit;
				if changed {
					bump();
				}
			}
		}
	};

	let view_ml = view.clone();
	let on_mouseleave = move |_: MouseEvent| {
		if let Some(ref mut v) = *view_ml.borrow_mut() {
			v.pointer_over = None;
		}
		if session.try_update_value(|s| s.hover_leave()).unwrap_or(false) {
			bump();
		}
	};

	let view_wh = view.clone();
	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		let Some((x, y)) = pointer_position(canvas_ref, &ev) else {
			return;
		};
		if let Some(ref mut v) = *view_wh.borrow_mut() {
			let factor = if ev.delta_y() > 0.0 { 0.9 } else { 1.1 };
			v.transform.zoom_at(x, y, factor);
		}
	};

	view! {
		<canvas
			node_ref=canvas_ref
			class="force-graph-canvas"
			on:mousedown=on_mousedown
			on:mousemove=on_mousemove
			on:mouseleave=on_mouseleave
			on:wheel=on_wheel
			style="display: block; cursor: grab;"
		/>
	}
}
