pub mod catalog;
pub mod chunked_exporter;
pub mod orchestrator;
pub mod task_tracker;
pub mod uploader;
pub mod worker;

#[cfg(test)]
pub mod test_doubles;
