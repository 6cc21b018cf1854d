pub mod citation;
pub mod legacy;
pub mod modern;

pub use citation::*;
pub use legacy::*;
pub use modern::*;
