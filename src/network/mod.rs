//! Renderer-independent core: the graph model, force layout, interaction
//! state, edge sampling, browsing and statistics.

pub mod config;
pub mod error;
pub mod interaction;
pub mod layout;
pub mod model;
pub mod paginator;
pub mod sampler;
pub mod session;
pub mod source;
pub mod stats;

pub use config::NetworkConfig;
pub use error::{ConfigError, ModelError, SourceError};
pub use interaction::{EdgeEmphasis, NodeEmphasis};
pub use layout::Point;
pub use model::{Direction, Edge, Graph, Node, NodeId};
pub use session::{LoadStatus, NetworkSession, Ticket};
pub use source::{GraphSource, MockGraphSource};
pub use stats::NetworkStats;
