pub mod inputs;
pub mod outputs;

pub use inputs::*;
pub use outputs::*;
