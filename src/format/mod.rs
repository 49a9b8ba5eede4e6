pub mod cmc;
pub mod error;

pub use cmc::{decode, encode, load, save};
pub use error::CmcError;
