pub mod types;
pub mod resolved;
pub mod validator;
pub mod loader;
pub mod env;

pub use types::*;
pub use resolved::*;
pub use validator::*;
pub use loader::*;
pub use env::*;
