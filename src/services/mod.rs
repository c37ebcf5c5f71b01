pub mod aggregator;
pub mod scheduler;

pub use aggregator::{CycleReport, FeedService, PageReport};
pub use scheduler::{BatchReport, BoundedScheduler, FetchTask, FetchUnit, Spawner, TaskOutcome, TokioSpawner};
