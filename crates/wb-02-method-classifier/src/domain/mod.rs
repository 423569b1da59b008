pub mod classifier;
pub mod methods;
