pub mod decode;
pub mod group;
pub mod lifecycle;
pub mod registry;
pub mod shape;
pub mod stats;

mod cycle;
