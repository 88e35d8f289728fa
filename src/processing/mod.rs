pub mod csv_writer;
pub mod snapshot;
pub mod summary;
