pub mod interactive;
pub mod render;
