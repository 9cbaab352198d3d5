#![forbid(unsafe_code)]

pub mod memory;
pub mod record;
pub mod repository;

pub use memory::InMemoryRepository;
pub use record::{QuestionRecord, RecordError};
pub use repository::{
    AttemptRecorder, PerformanceStore, QuestionQuery, QuestionRepository, SetFilter, Storage,
    StorageError,
};
