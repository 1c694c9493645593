pub mod canvas;
pub mod share;
