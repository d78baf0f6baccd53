use leptos::prelude::*;

use crate::network::{NetworkSession, NetworkStats};

/// Network totals, plus the selected node's connections when there is one.
#[component]
pub fn StatisticsPanel(session: StoredValue<NetworkSession>, revision: RwSignal<u64>) -> impl IntoView {
	let stats = move || {
		revision.track();
		session
			.try_with_value(|s| s.stats().clone())
			.unwrap_or_default()
	};
	let selected = move || {
		revision.track();
		session
			.try_with_value(|s| {
				let node = s.selected_node()?;
				Some((node.name.clone(), s.selected_connection_count().unwrap_or(0)))
			})
			.flatten()
	};

	view! {
		<div class="statistics-panel">
			<h2>"Network Statistics"</h2>
			{move || {
				let NetworkStats {
					total_nodes,
					total_edges,
					avg_connections,
					max_connections,
					isolated_nodes,
					avg_weight,
					density_score,
				} = stats();
				view! {
					<dl>
						<dt>"Nodes"</dt>
						<dd>{total_nodes}</dd>
						<dt>"Edges"</dt>
						<dd>{total_edges}</dd>
						<dt>"Avg. connections"</dt>
						<dd>{format!("{:.1}", avg_connections)}</dd>
						<dt>"Max connections"</dt>
						<dd>{max_connections}</dd>
						<dt>"Isolated nodes"</dt>
						<dd>{isolated_nodes}</dd>
						<dt>"Avg. weight"</dt>
						<dd>{format!("{:.2}", avg_weight)}</dd>
						<dt>"Density"</dt>
						<dd>{format!("{:.2}%", density_score)}</dd>
					</dl>
				}
			}}
			{move || {
				selected()
					.map(|(name, connections)| {
						view! {
							<p class="selected-node">
								<strong>{name}</strong>
								{format!(" has {} connections", connections)}
							</p>
						}
					})
			}}
		</div>
	}
}
