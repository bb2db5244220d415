pub mod fill;
pub mod shapes;
pub mod transform;
