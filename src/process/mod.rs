// src/process/mod.rs

pub mod archive;
pub mod persist;
pub mod records;
pub mod table;

pub use archive::{unzip, ArchiveMember};
pub use persist::write_atomic;
pub use records::{decode_json_records, Record};
pub use table::{read_table, write_table, Table};
