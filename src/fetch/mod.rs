pub mod error;
pub mod met_no;
pub mod source;
