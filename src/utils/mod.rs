//! Shared helpers for Arrow tables, file IO and logging.

pub mod arrow;
pub mod io;
pub mod logging;
