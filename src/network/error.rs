//! Error types for the network core.

use thiserror::Error;

use super::model::NodeId;

/// A generation could not be assembled into a well-formed graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
	/// Two nodes in the same generation share an id.
	#[error("duplicate node id `{0}`")]
	DuplicateNode(NodeId),
}

/// The graph data source failed to produce a generation.
#[derive(Debug, Error)]
pub enum SourceError {
	/// The source returned data that does not form a valid graph.
	#[error("malformed graph: {0}")]
	Malformed(#[from] ModelError),
	/// The source could not be reached or gave up.
	#[error("data source unavailable: {0}")]
	Unavailable(String),
}

/// Configuration could not be parsed or holds an unusable value.
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("invalid configuration document: {0}")]
	Parse(#[from] serde_json::Error),
	#[error("`{field}` {reason}")]
	Invalid {
		field: &'static str,
		reason: &'static str,
	},
}
