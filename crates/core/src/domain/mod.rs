pub mod area;
pub mod material;
pub mod payment;
