pub mod consumer;
pub mod engine;
pub mod mask;
pub mod pool;
