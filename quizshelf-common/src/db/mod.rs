//! Database bootstrap: connection setup, schema and migrations

pub mod init;
pub mod migrations;

pub use init::{create_schema, init_database, open_in_memory};
pub use migrations::{get_schema_version, run_migrations, CURRENT_SCHEMA_VERSION};
