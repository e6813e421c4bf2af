pub mod draw;
pub mod graph;
pub mod letterbox;
pub mod masks;
