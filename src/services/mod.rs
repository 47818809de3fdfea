pub mod canvas;
pub mod cursor;
pub mod reaper;
pub mod shape;
