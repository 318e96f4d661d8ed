pub mod compositor;
pub mod soft;
pub mod texture;
