pub mod artifact;
pub mod backend;
pub mod decode;
pub mod error;
pub mod session;
pub mod task;
pub mod tensor;

pub use artifact::*;
pub use backend::*;
pub use decode::*;
pub use error::*;
pub use session::*;
pub use task::*;
pub use tensor::*;
