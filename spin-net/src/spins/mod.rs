pub mod config;
pub mod energy;

pub use config::SpinConfig;
pub use energy::Hamiltonian;
