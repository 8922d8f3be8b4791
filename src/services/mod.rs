// Service exports
pub mod memory;
pub mod postgres;
pub mod repository;
pub mod tasks;

pub use memory::MemoryRepository;
pub use postgres::PostgresRepository;
pub use repository::{ActivityKind, RepositoryError, SkillQuery, SkillRepository};
pub use tasks::{spawn_worker, RatingSummary, ReviewEvent, Task, TaskError, TaskHandler, TaskQueue};
