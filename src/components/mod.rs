pub mod history;
pub mod overlay;
pub mod selection;
pub mod tools;
