pub mod context;
pub mod shape;
