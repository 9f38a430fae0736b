pub mod instance;
pub mod propagation;
