pub mod graph_utils;
pub mod gui;
pub mod history;
pub mod persistence;
