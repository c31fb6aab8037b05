pub mod app;
pub mod camera3d;
pub mod cli;
pub mod config;
pub mod constraint;
pub mod drag;
pub mod host;
pub mod input;
pub mod mesh;
pub mod picking;
pub mod renderer;
pub mod rig;
pub mod scene;

pub use app::{run_with_overrides, App};
