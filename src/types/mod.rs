pub mod errors;
pub mod records;
pub mod registration;
pub mod tx;

pub use errors::*;
pub use records::*;
pub use registration::*;
pub use tx::*;
