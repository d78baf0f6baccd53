//! Tunables for the whole core, loadable from JSON.

use serde::{Deserialize, Serialize};

use super::error::ConfigError;
use super::model::SelfLoopPolicy;

/// Force simulation parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
	/// Rest length of the spring along each edge.
	pub spring_distance: f64,
	pub spring_strength: f64,
	/// Many-body repulsion constant; larger pushes harder.
	pub repulsion_strength: f64,
	/// Floor applied to inter-node distance before any division.
	pub min_distance: f64,
	pub collision: bool,
	/// Extra spacing added to the sum of radii by the collision force.
	pub collision_padding: f64,
	pub collision_strength: f64,
	/// 1.0 recentres the layout fully on every step.
	pub centering_strength: f64,
	pub center: (f64, f64),
	/// Side of the square around the centre in which new nodes are placed.
	pub initial_spread: f64,
	/// Fraction of velocity lost per step.
	pub velocity_decay: f64,
	/// Below this energy the simulation stops doing work until reheated.
	pub alpha_min: f64,
	pub alpha_decay: f64,
	/// Energy restored on a data update.
	pub reheat_alpha: f64,
	/// Energy the simulation is held at while a node is dragged.
	pub drag_alpha_target: f64,
}

impl Default for LayoutConfig {
	fn default() -> Self {
		let alpha_min: f64 = 0.001;
		Self {
			spring_distance: 100.0,
			spring_strength: 1.0,
			repulsion_strength: 200.0,
			min_distance: 1.0,
			collision: true,
			collision_padding: 2.0,
			collision_strength: 0.7,
			centering_strength: 1.0,
			center: (0.0, 0.0),
			initial_spread: 100.0,
			velocity_decay: 0.4,
			alpha_min,
			// reaches alpha_min after ~300 steps
			alpha_decay: 1.0 - alpha_min.powf(1.0 / 300.0),
			reheat_alpha: 0.3,
			drag_alpha_target: 0.3,
		}
	}
}

/// Bulk edge downsampling for rendering.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
	/// Approximate number of edges kept once sampling kicks in.
	pub target_size: usize,
	/// Edge count above which sampling is applied.
	pub bulk_threshold: usize,
}

impl Default for SamplingConfig {
	fn default() -> Self {
		Self {
			target_size: 2_000,
			bulk_threshold: 5_000,
		}
	}
}

/// Paging of a node's incident edges in the data browser.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
	pub page_size: usize,
	pub initial_display: usize,
	pub load_more_increment: usize,
	pub preview_initial: usize,
	pub preview_increment: usize,
	/// Absolute ceiling on rows revealed by the bounded preview.
	pub preview_cap: usize,
}

impl Default for BrowserConfig {
	fn default() -> Self {
		Self {
			page_size: 20,
			initial_display: 5,
			load_more_increment: 20,
			preview_initial: 20,
			preview_increment: 50,
			preview_cap: 1_000,
		}
	}
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionConfig {
	/// Seconds a pointer must rest on a node before it counts as hovered.
	pub hover_debounce: f64,
}

impl Default for InteractionConfig {
	fn default() -> Self {
		Self {
			hover_debounce: 0.08,
		}
	}
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatisticsConfig {
	pub self_loops: SelfLoopPolicy,
}

/// Every recognised option, grouped by the component that consumes it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
	pub layout: LayoutConfig,
	pub sampling: SamplingConfig,
	pub browser: BrowserConfig,
	pub interaction: InteractionConfig,
	pub statistics: StatisticsConfig,
}

impl NetworkConfig {
	/// Parses a (possibly partial) JSON document over the defaults, then validates it.
	pub fn from_json(doc: &str) -> Result<Self, ConfigError> {
		let config: Self = serde_json::from_str(doc)?;
		config.validate()?;
		Ok(config)
	}

	/// Rejects values the core cannot operate with.
	pub fn validate(&self) -> Result<(), ConfigError> {
		let invalid = |field, reason| Err(ConfigError::Invalid { field, reason });
		let l = &self.layout;

		if !non_negative(l.spring_distance) {
			return invalid("layout.spring_distance", "must be non-negative");
		}
		if !non_negative(l.spring_strength) || !non_negative(l.repulsion_strength) {
			return invalid("layout strengths", "must be non-negative");
		}
		if !(l.min_distance.is_finite() && l.min_distance > 0.0) {
			return invalid("layout.min_distance", "must be positive");
		}
		if !(0.0..=1.0).contains(&l.velocity_decay) {
			return invalid("layout.velocity_decay", "must lie in [0, 1]");
		}
		if !(l.alpha_decay > 0.0 && l.alpha_decay < 1.0) {
			return invalid("layout.alpha_decay", "must lie in (0, 1)");
		}
		if self.sampling.target_size == 0 {
			return invalid("sampling.target_size", "must be at least 1");
		}
		let b = &self.browser;
		if b.page_size == 0 || b.load_more_increment == 0 || b.preview_increment == 0 {
			return invalid("browser", "page size and increments must be at least 1");
		}
		if b.preview_cap < b.preview_initial {
			return invalid("browser.preview_cap", "must not be below preview_initial");
		}
		if !non_negative(self.interaction.hover_debounce) {
			return invalid("interaction.hover_debounce", "must be non-negative");
		}
		Ok(())
	}
}

/// False for NaN as well as negatives.
fn non_negative(value: f64) -> bool {
	value >= 0.0
}
