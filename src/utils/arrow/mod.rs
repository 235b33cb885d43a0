//! Arrow data handling utilities
//!
//! Helpers for building new record batches out of existing ones: projecting,
//! renaming, replacing and appending columns.

pub mod array_utils;

pub use array_utils::{
    append_columns, downcast_array, drop_columns, get_column_by_name, get_column_index,
    null_counts, rename_columns, replace_column, select_columns,
};
