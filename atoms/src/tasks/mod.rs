pub mod model;
pub mod store;

pub use model::{
    CreateTaskPayload, ReminderType, Task, TaskPriority, TaskStats, TaskStatus, UpdateTaskPayload,
};
