pub mod extract;
pub mod inputs;
pub mod inspect;
pub mod render;
