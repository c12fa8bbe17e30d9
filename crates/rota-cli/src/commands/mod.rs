pub mod agenda;
pub mod hash;
pub mod parse;
pub mod preview;
