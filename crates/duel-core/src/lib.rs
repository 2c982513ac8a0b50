pub mod bundle;
pub mod contract;
pub mod error;
pub mod traits;
pub mod types;

pub use bundle::*;
pub use contract::*;
pub use error::*;
pub use traits::*;
pub use types::*;
