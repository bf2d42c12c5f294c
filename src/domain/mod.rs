pub mod cell;
pub mod color;
pub mod maze;
