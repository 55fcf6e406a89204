pub mod error;
pub mod types;
pub mod vat;

pub use error::*;
pub use types::*;
pub use vat::*;
