pub mod firebird;
pub mod gcp;
pub mod local_storage;
