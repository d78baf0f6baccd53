use std::time::Duration;

use leptos::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::network::paginator::{Bounds, EdgeFilter, HighVolume};
use crate::network::source::high_volume_edges;
use crate::network::stats::EdgeSummary;
use crate::network::{Direction, Edge, NetworkSession, NodeId};

/// Size of the generated result set behind the high-volume preview.
const HIGH_VOLUME_EDGES: usize = 100_000;
const PREVIEW_DELAY: Duration = Duration::from_millis(500);
const PREVIEW_SEED: u64 = 0x5eed;

fn weight_bounds(filter: &mut EdgeFilter) -> &mut Bounds<f64> {
	&mut filter.weight
}

fn metric1_bounds(filter: &mut EdgeFilter) -> &mut Bounds<f64> {
	&mut filter.metric1
}

fn edge_row(edge: &Edge, focus: &NodeId) -> impl IntoView + use<> {
	let other = edge
		.other_endpoint(focus)
		.map_or_else(|| focus.to_string(), NodeId::to_string);
	view! {
		<tr>
			<td>{other}</td>
			<td>{format!("{:.2}", edge.weight)}</td>
			<td>{format!("{:.2}", edge.metric1)}</td>
			<td>{format!("{:.2}", edge.metric2)}</td>
			<td>{edge.timestamp.format("%Y-%m-%d %H:%M").to_string()}</td>
		</tr>
	}
}

fn edge_table(rows: Vec<AnyView>) -> impl IntoView {
	view! {
		<table class="edge-table">
			<thead>
				<tr>
					<th>"Node"</th>
					<th>"Weight"</th>
					<th>"Metric 1"</th>
					<th>"Metric 2"</th>
					<th>"Time"</th>
				</tr>
			</thead>
			<tbody>{rows}</tbody>
		</table>
	}
}

fn summary_view(summary: &EdgeSummary) -> impl IntoView + use<> {
	let span = match (summary.earliest, summary.latest) {
		(Some(a), Some(b)) => format!("{} to {}", a.format("%Y-%m-%d"), b.format("%Y-%m-%d")),
		_ => "-".to_string(),
	};
	view! {
		<dl class="preview-summary">
			<dt>"Total edges"</dt>
			<dd>{summary.total}</dd>
			<dt>"Avg. metric 1"</dt>
			<dd>{summary.avg_metric1}</dd>
			<dt>"Avg. metric 2"</dt>
			<dd>{summary.avg_metric2}</dd>
			<dt>"Avg. weight"</dt>
			<dd>{summary.avg_weight}</dd>
			<dt>"Time span"</dt>
			<dd>{span}</dd>
		</dl>
	}
}

/// Incoming and outgoing edges of the selected node, with range filters,
/// incremental loading and a capped preview of a very large edge set.
#[component]
pub fn DataBrowser(session: StoredValue<NetworkSession>, revision: RwSignal<u64>) -> impl IntoView {
	let rng = StoredValue::new(StdRng::seed_from_u64(PREVIEW_SEED));
	let preparing = RwSignal::new(false);
	let bump = move || revision.update(|r| *r += 1);

	let set_direction = move |direction: Direction| {
		session.try_update_value(|s| s.set_browser_direction(direction));
		bump();
	};
	let load_more = move |_| {
		session.try_update_value(|s| s.browser_load_more());
		bump();
	};
	let set_bound = move |select: fn(&mut EdgeFilter) -> &mut Bounds<f64>, lower: bool, raw: String| {
		let value = raw.trim().parse::<f64>().ok();
		session.try_update_value(|s| {
			let mut filter = s.browser().filter().clone();
			let bounds = select(&mut filter);
			if lower {
				bounds.min = value;
			} else {
				bounds.max = value;
			}
			s.set_browser_filter(filter);
		});
		bump();
	};

	let open_preview = move |_| {
		let Some(node) = session.try_with_value(|s| s.interaction().selected().cloned()).flatten() else {
			return;
		};
		preparing.set(true);
		set_timeout(
			move || {
				let target = session
					.try_with_value(|s| {
						s.graph()
							.incident_edges(&node)
							.find_map(|(_, e)| e.other_endpoint(&node).cloned())
					})
					.flatten()
					.unwrap_or_else(|| node.clone());
				let Some(edges) = rng.try_update_value(|rng| {
					high_volume_edges(rng, HIGH_VOLUME_EDGES, &node, &target, crate::now())
				}) else {
					return;
				};
				let still_selected = session
					.try_update_value(|s| {
						let current = s.interaction().selected() == Some(&node);
						if current {
							s.open_high_volume(edges);
						}
						current
					})
					.unwrap_or(false);
				preparing.try_set(false);
				if still_selected {
					bump();
				}
			},
			PREVIEW_DELAY,
		);
	};
	let reveal_more = move |_| {
		session.try_update_value(|s| s.reveal_more());
		bump();
	};
	let close_preview = move |_| {
		session.try_update_value(|s| s.close_high_volume());
		bump();
	};

	let listing = move |s: &NetworkSession, node: &NodeId| -> AnyView {
		let Some(page) = s.browser_page() else {
			return ().into_any();
		};
		let remaining = page.total.saturating_sub(page.items.len());
		let rows = page
			.items
			.iter()
			.map(|e| edge_row(e, node).into_any())
			.collect::<Vec<_>>();
		view! {
			{edge_table(rows)}
			<Show when=move || { remaining > 0 }>
				<button class="load-more" on:click=load_more>
					{format!("Load more ({} remaining)", remaining)}
				</button>
			</Show>
		}
		.into_any()
	};

	let preview = move |hv: &HighVolume, node: &NodeId| -> AnyView {
		let rows = hv
			.window
			.prefix(&hv.edges)
			.iter()
			.map(|e| edge_row(e, node).into_any())
			.collect::<Vec<_>>();
		let shown = hv.window.visible(hv.edges.len());
		let has_more = hv.window.has_more(hv.edges.len());
		let cap = hv.window.cap();
		view! {
			<div class="high-volume">
				{summary_view(&hv.summary)}
				{edge_table(rows)}
				<p class="preview-count">{format!("Showing {} (at most {})", shown, cap)}</p>
				<Show when=move || has_more>
					<button on:click=reveal_more>"Show more"</button>
				</Show>
				<button on:click=close_preview>"Close preview"</button>
			</div>
		}
		.into_any()
	};

	view! {
		<div class="data-browser">
			{move || {
				revision.track();
				session
					.try_with_value(|s| {
						let node = s.selected_node()?.id.clone();
						let (incoming, outgoing) = s.browser_counts();
						let direction = s.browser().direction();
						let tab_class = move |d: Direction| if d == direction { "tab active" } else { "tab" };
						let body = match s.browser().high_volume() {
							Some(hv) => preview(hv, &node),
							None => listing(s, &node),
						};
						Some(view! {
							<h2>{format!("Data flow: {}", node)}</h2>
							<div class="tabs">
								<button
									class=tab_class(Direction::Incoming)
									on:click=move |_| set_direction(Direction::Incoming)
								>
									{format!("Incoming ({})", incoming)}
								</button>
								<button
									class=tab_class(Direction::Outgoing)
									on:click=move |_| set_direction(Direction::Outgoing)
								>
									{format!("Outgoing ({})", outgoing)}
								</button>
							</div>
							<div class="filters">
								<input
									type="number"
									placeholder="min weight"
									on:change=move |ev| set_bound(weight_bounds, true, event_target_value(&ev))
								/>
								<input
									type="number"
									placeholder="max weight"
									on:change=move |ev| set_bound(weight_bounds, false, event_target_value(&ev))
								/>
								<input
									type="number"
									placeholder="min metric 1"
									on:change=move |ev| set_bound(metric1_bounds, true, event_target_value(&ev))
								/>
								<input
									type="number"
									placeholder="max metric 1"
									on:change=move |ev| set_bound(metric1_bounds, false, event_target_value(&ev))
								/>
							</div>
							{body}
							<Show when=move || !preparing.get()
								fallback=|| view! { <p class="loading">"Loading high-volume data..."</p> }>
								<button class="preview-open" on:click=open_preview>
									"Preview high-volume traffic"
								</button>
							</Show>
						})
					})
					.flatten()
			}}
		</div>
	}
}
