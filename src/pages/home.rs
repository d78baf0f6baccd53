use std::time::Duration;

use leptos::prelude::*;
use log::warn;

use crate::components::data_browser::DataBrowser;
use crate::components::force_graph::ForceGraphCanvas;
use crate::components::statistics::StatisticsPanel;
use crate::network::{GraphSource, LoadStatus, MockGraphSource, NetworkConfig, NetworkSession, NodeId};

const SEED: u64 = 7;
const NODE_COUNT: usize = 50;
/// Simulated round trip to the data source.
const LOAD_DELAY: Duration = Duration::from_millis(500);
const SUGGESTION_LIMIT: usize = 8;
const CONFIG_ATTRIBUTE: &str = "data-network-config";

/// Reads overrides from the root element's config attribute, falling back to
/// defaults when it is absent or rejected.
fn load_config() -> NetworkConfig {
	let doc = web_sys::window()
		.and_then(|w| w.document())
		.and_then(|d| d.document_element())
		.and_then(|root| root.get_attribute(CONFIG_ATTRIBUTE));
	let Some(doc) = doc else {
		return NetworkConfig::default();
	};
	NetworkConfig::from_json(&doc).unwrap_or_else(|err| {
		warn!("ignoring {}: {}", CONFIG_ATTRIBUTE, err);
		NetworkConfig::default()
	})
}

/// Default Home Page
#[component]
pub fn Home() -> impl IntoView {
	let config = load_config();
	let source = StoredValue::new(
		MockGraphSource::new(SEED, NODE_COUNT, crate::now()).with_self_loops(config.statistics.self_loops),
	);
	let session = StoredValue::new(NetworkSession::new(config, SEED));
	let revision = RwSignal::new(0u64);
	let search = RwSignal::new(String::new());
	let bump = move || revision.update(|r| *r += 1);

	on_cleanup(move || {
		session.try_update_value(|s| s.teardown());
	});

	// Each refresh takes a ticket; a slower, older response is dropped on arrival.
	let refresh = move || {
		let Some(ticket) = session.try_update_value(|s| s.begin_refresh()) else {
			return;
		};
		bump();
		set_timeout(
			move || {
				let Some(result) = source.try_update_value(|src| {
					src.set_now(crate::now());
					src.fetch()
				}) else {
					return;
				};
				if session.try_update_value(|s| s.complete_refresh(ticket, result)).is_some() {
					bump();
				}
			},
			LOAD_DELAY,
		);
	};
	Effect::new(move |_| refresh());

	let on_search = move |ev: leptos::ev::Event| {
		let term = event_target_value(&ev);
		session.try_update_value(|s| s.set_search(term.clone()));
		search.set(term);
	};
	let choose = move |id: &NodeId| {
		session.try_update_value(|s| s.choose_suggestion(id));
		search.set(String::new());
		bump();
	};
	let reset = move |_| {
		session.try_update_value(|s| s.reset_selection());
		search.set(String::new());
		bump();
	};
	let suggestions = move || {
		search.track();
		revision.track();
		session
			.try_with_value(|s| {
				s.search_suggestions()
					.into_iter()
					.take(SUGGESTION_LIMIT)
					.map(|n| (n.id.clone(), n.name.clone()))
					.collect::<Vec<_>>()
			})
			.unwrap_or_default()
	};
	let status = move || {
		revision.track();
		session.try_with_value(|s| s.status().clone()).unwrap_or_default()
	};

	view! {
		<ErrorBoundary fallback=|errors| {
			view! {
				<h1>"Uh oh! Something went wrong!"</h1>

				<p>"Errors: "</p>
				<ul>
					{move || {
						errors
							.get()
							.into_iter()
							.map(|(_, e)| view! { <li>{e.to_string()}</li> })
							.collect_view()
					}}
				</ul>
			}
		}>

			<div class="fullscreen-graph">
				<ForceGraphCanvas session=session revision=revision fullscreen=true />
				<div class="graph-overlay">
					<h1>"Network Explorer"</h1>
					<p class="subtitle">
						"Click a node to inspect it. Drag nodes to reposition. Scroll to zoom."
					</p>
					<div class="controls">
						<input
							type="search"
							placeholder="Search nodes..."
							prop:value=move || search.get()
							on:input=on_search
						/>
						<button on:click=reset>"Reset selection"</button>
						<button on:click=move |_| refresh()>"Reload data"</button>
					</div>
					<ul class="suggestions">
						{move || {
							suggestions()
								.into_iter()
								.map(|(id, name)| view! { <li on:click=move |_| choose(&id)>{name}</li> })
								.collect_view()
						}}
					</ul>
					{move || match status() {
						LoadStatus::Loading => {
							view! { <p class="status loading">"Loading network..."</p> }.into_any()
						}
						LoadStatus::Failed(reason) => {
							view! { <p class="status error">{format!("Refresh failed: {}", reason)}</p> }
								.into_any()
						}
						LoadStatus::Ready => ().into_any(),
					}}
				</div>
				<div class="side-panels">
					<StatisticsPanel session=session revision=revision />
					<DataBrowser session=session revision=revision />
				</div>
			</div>
		</ErrorBoundary>
	}
}
