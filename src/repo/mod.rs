pub mod file;
pub mod memory;
pub mod prices;

pub use file::*;
pub use memory::*;
pub use prices::*;
