//! Feedforward neural network with backpropagation-based gradient descent training

mod activation;
mod backprop;
mod error;
mod gradient;
mod init;
mod iteration;
mod net;
mod snapshot;
mod trainer;

pub use activation::*;
pub use backprop::*;
pub use error::*;
pub use gradient::*;
pub use init::InitConfig;
pub(crate) use init::Initializer;
pub use iteration::*;
pub use net::Network;
pub use snapshot::*;
