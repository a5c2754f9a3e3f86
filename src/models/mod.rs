pub mod checkpoint;
pub mod identifier;
pub mod loaders;
pub mod outcome;

pub use checkpoint::{AttemptStatus, CheckpointRecord};
pub use identifier::{Identifier, PendingSet};
pub use loaders::CsvSource;
pub use outcome::{Category, FatalReason, Outcome, Resolution, SessionState, TransientReason};
