pub mod checkpoint;
pub mod checkpoint_log;
pub mod classifier;
pub mod csv_sink;
pub mod persistence;
pub mod sqlite_store;

pub use checkpoint::CheckpointTracker;
pub use checkpoint_log::CheckpointLog;
pub use classifier::{Classification, ExtractedResponse, ResponseClassifier};
pub use csv_sink::CsvSink;
pub use persistence::PersistenceSink;
pub use sqlite_store::SqliteStore;
