pub mod demo;
pub mod graph;
