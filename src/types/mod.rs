pub mod condition;
pub mod forecast;
pub mod location;
pub mod observation;
pub mod required_fields;
