pub mod print;
pub mod summary;
