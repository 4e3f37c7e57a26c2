pub mod global;
pub mod node;
pub mod session;
