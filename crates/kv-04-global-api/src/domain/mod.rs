pub mod iterator;
pub mod path;
