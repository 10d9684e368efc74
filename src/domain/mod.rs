pub mod address;
pub mod logic;
