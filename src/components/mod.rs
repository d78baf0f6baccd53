pub mod data_browser;
pub mod force_graph;
pub mod statistics;
