use std::f64::consts::PI;

use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

use super::state::CanvasState;
use crate::network::{Direction, EdgeEmphasis, NetworkSession, NodeEmphasis, Point};

const BACKGROUND: &str = "#1a1a2e";
const GROUP_COLORS: &[&str] = &["#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd"];

const EDGE_DEFAULT: &str = "rgba(98, 114, 164, 0.25)";
const EDGE_OUTGOING: &str = "rgba(64, 196, 255, 0.4)";
const EDGE_INCOMING: &str = "rgba(255, 159, 64, 0.4)";

const NODE_SELECTED: &str = "rgba(64, 196, 255, 0.8)";
const NODE_HOVERED: &str = "rgba(64, 196, 255, 0.7)";
const NODE_OUTGOING: &str = "rgba(64, 196, 255, 0.6)";
const NODE_INCOMING: &str = "rgba(255, 159, 64, 0.6)";
const NODE_SEARCH_MATCH: &str = "rgba(255, 159, 64, 0.8)";
const NODE_DEFAULT: &str = "rgba(98, 114, 164, 0.6)";
const NODE_DIMMED: &str = "rgba(98, 114, 164, 0.3)";

fn ease_out_cubic(t: f64) -> f64 {
	1.0 - (1.0 - t).powi(3)
}

pub fn render(session: &NetworkSession, view: &CanvasState, ctx: &CanvasRenderingContext2d) {
	ctx.set_fill_style_str(BACKGROUND);
	ctx.fill_rect(0.0, 0.0, view.width, view.height);
	ctx.save();
	let _ = ctx.translate(view.transform.x, view.transform.y);
	let _ = ctx.scale(view.transform.k, view.transform.k);
	draw_edges(session, view, ctx);
	draw_nodes(session, view, ctx);
	ctx.restore();
}

fn edge_color(style: EdgeEmphasis) -> &'static str {
	match style {
		EdgeEmphasis::Outgoing => EDGE_OUTGOING,
		EdgeEmphasis::Incoming => EDGE_INCOMING,
		EdgeEmphasis::Default | EdgeEmphasis::Hidden => EDGE_DEFAULT,
	}
}

fn node_color(style: NodeEmphasis) -> &'static str {
	match style {
		NodeEmphasis::Selected => NODE_SELECTED,
		NodeEmphasis::Hovered => NODE_HOVERED,
		NodeEmphasis::Connected(Direction::Outgoing) => NODE_OUTGOING,
		NodeEmphasis::Connected(Direction::Incoming) => NODE_INCOMING,
		NodeEmphasis::SearchMatch => NODE_SEARCH_MATCH,
		NodeEmphasis::Default => NODE_DEFAULT,
		NodeEmphasis::Dimmed => NODE_DIMMED,
	}
}

fn draw_edges(session: &NetworkSession, view: &CanvasState, ctx: &CanvasRenderingContext2d) {
	let k = view.transform.k;
	let (line_width, dash, gap, arrow_size) = (1.5 / k, 8.0 / k, 4.0 / k, 6.0 / k);
	let dash_offset = -(view.flow_time * 30.0) % (dash + gap);
	let t = ease_out_cubic(view.highlight_t);
	let graph = session.graph();

	for idx in session.render_edges() {
		let edge = &graph.edges()[idx];
		let style = session.edge_style(edge);
		if !style.is_visible() {
			continue;
		}
		let (Some(from), Some(to)) = (
			session.layout().position(&edge.source),
			session.layout().position(&edge.target),
		) else {
			continue;
		};
		let radius = graph.node(&edge.target).map_or(8.0, |n| n.radius);
		let highlighted = style != EdgeEmphasis::Default;

		ctx.set_stroke_style_str(edge_color(style));
		ctx.set_line_width(if highlighted {
			line_width * (1.0 + 0.3 * t)
		} else {
			line_width
		});

		if edge.is_self_loop() {
			ctx.begin_path();
			let _ = ctx.arc(from.x, from.y - radius, radius * 0.8, 0.0, 2.0 * PI);
			ctx.stroke();
			continue;
		}

		let (dx, dy) = (to.x - from.x, to.y - from.y);
		let dist = (dx * dx + dy * dy).sqrt();
		if dist < 0.001 {
			continue;
		}
		let (ux, uy) = (dx / dist, dy / dist);

		if highlighted {
			let _ = ctx.set_line_dash(&js_sys::Array::of2(
				&JsValue::from_f64(dash),
				&JsValue::from_f64(gap),
			));
			ctx.set_line_dash_offset(dash_offset);
		}
		ctx.begin_path();
		ctx.move_to(from.x, from.y);
		ctx.line_to(
			to.x - ux * (radius + arrow_size),
			to.y - uy * (radius + arrow_size),
		);
		ctx.stroke();
		if highlighted {
			let _ = ctx.set_line_dash(&js_sys::Array::new());
		}

		ctx.set_fill_style_str(edge_color(style));
		draw_arrow(ctx, Point::new(to.x - ux * radius, to.y - uy * radius), ux, uy, arrow_size);
	}
}

fn draw_arrow(ctx: &CanvasRenderingContext2d, tip: Point, ux: f64, uy: f64, size: f64) {
	let (back_x, back_y) = (tip.x - ux * size, tip.y - uy * size);
	let (px, py) = (-uy * size * 0.5, ux * size * 0.5);
	ctx.begin_path();
	ctx.move_to(tip.x, tip.y);
	ctx.line_to(back_x + px, back_y + py);
	ctx.line_to(back_x - px, back_y - py);
	ctx.close_path();
	ctx.fill();
}

fn draw_nodes(session: &NetworkSession, view: &CanvasState, ctx: &CanvasRenderingContext2d) {
	let (t, k) = (ease_out_cubic(view.highlight_t), view.transform.k);
	let styles = session.node_styles();

	for (node, style) in session.graph().nodes().iter().zip(styles) {
		let Some(p) = session.layout().position(&node.id) else {
			continue;
		};
		let emphasised = matches!(style, NodeEmphasis::Selected | NodeEmphasis::Hovered);
		let radius = match style {
			NodeEmphasis::Selected | NodeEmphasis::Hovered => node.radius * (1.0 + 0.35 * t),
			NodeEmphasis::Connected(_) => node.radius * (1.0 + 0.2 * t),
			_ => node.radius,
		};

		if emphasised && t > 0.01 {
			draw_glow(ctx, p, radius, node.radius * (1.8 + 1.2 * t), 0.35 * t);
		}

		ctx.begin_path();
		let _ = ctx.arc(p.x, p.y, radius, 0.0, 2.0 * PI);
		ctx.set_fill_style_str(node_color(style));
		ctx.fill();
		if style != NodeEmphasis::Dimmed {
			ctx.set_stroke_style_str(GROUP_COLORS[node.group as usize % GROUP_COLORS.len()]);
			ctx.set_line_width(1.0 / k);
			ctx.stroke();
		}

		if style == NodeEmphasis::Selected {
			ctx.begin_path();
			let _ = ctx.arc(p.x, p.y, radius + 2.0 / k, 0.0, 2.0 * PI);
			ctx.set_stroke_style_str("rgba(255, 255, 255, 0.7)");
			ctx.set_line_width(1.5 / k);
			ctx.stroke();
		}

		if !matches!(style, NodeEmphasis::Default | NodeEmphasis::Dimmed) {
			ctx.set_fill_style_str("white");
			ctx.set_font(&format!("{}px sans-serif", 10.0 / k.max(0.5)));
			let _ = ctx.fill_text(&node.name, p.x + radius + 3.0, p.y + 3.0);
		}
	}
}

fn draw_glow(ctx: &CanvasRenderingContext2d, p: Point, inner: f64, outer: f64, alpha: f64) {
	let Ok(gradient) = ctx.create_radial_gradient(p.x, p.y, inner * 0.3, p.x, p.y, outer) else {
		return;
	};
	let _ = gradient.add_color_stop(0.0, &format!("rgba(255, 255, 255, {})", alpha));
	let _ = gradient.add_color_stop(0.6, &format!("rgba(200, 220, 255, {})", alpha * 0.3));
	let _ = gradient.add_color_stop(1.0, "rgba(255, 255, 255, 0)");
	ctx.begin_path();
	let _ = ctx.arc(p.x, p.y, outer, 0.0, 2.0 * PI);
	#[allow(deprecated)]
	ctx.set_fill_style(&gradient);
	ctx.fill();
}
