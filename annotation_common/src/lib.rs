pub mod annotation;
pub mod frame;
pub mod palette;
pub mod shape_drawer;
