pub mod generator;
pub mod mesh;
pub mod quadrature;
pub mod space;
