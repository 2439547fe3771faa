pub mod connection_supervisor;
pub mod firebird_adapter;
pub mod sql_utils;
