pub mod cluster;
pub mod linear;
pub mod picard;
pub mod solver;
pub mod timeline;
pub mod timing;
