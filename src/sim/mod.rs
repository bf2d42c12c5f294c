pub mod event;
pub mod generator;
pub mod level;
pub mod runtime;
pub mod session;
pub mod step;
pub mod view;
