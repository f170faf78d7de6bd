//! # Activation Functions Module
//!
//! Element-wise non-linearities used between the layers of the Q-network.
//!
//! ## Available Activations
//!
//! - **ReLU** (Rectified Linear Unit): `max(0, x)`, the default for hidden layers
//! - **Tanh**: Hyperbolic tangent, outputs between -1 and 1
//! - **Linear**: Identity function, used by the output layer feeding the dueling head
//!
//! ## Usage Example
//!
//! ```rust
//! use duel::activations::Activation;
//! use ndarray::array;
//!
//! let relu: Activation = "relu".parse().unwrap();
//! let mut data = array![1.0, -0.5, 0.0, 2.0];
//! relu.apply(&mut data);
//! assert_eq!(data, array![1.0, 0.0, 0.0, 2.0]);
//! ```
//!
//! Only `relu` and `tanh` are accepted from the command line; `Linear` is
//! reserved for the output layer.

pub mod functions;

pub use functions::Activation;
