#[macro_use]
extern crate slog;

extern crate nalgebra as na;
extern crate nalgebra_glm as glm;

pub mod blobby;
pub mod common;
pub mod headless;
pub mod octree;
