pub mod source_port;
pub mod storage_port;
pub mod task_port;
