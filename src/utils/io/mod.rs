//! IO utilities: delimited-text input and columnar table output.

pub mod csv;
pub mod table;

pub use csv::read_csv;
pub use table::{read_table, write_table};
