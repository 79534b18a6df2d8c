pub mod task;
pub mod user;
pub mod verification;

pub use task::{
    NewTask, PageMeta, Task, TaskChanges, TaskInput, TaskListParams, TaskPage, TaskQuery,
    TaskSort, TaskStatus, UpdateTaskRequest,
};
pub use user::{Account, AccountChanges, AccountProfile, UpdateProfileRequest};
pub use verification::{NewPendingRegistration, PendingRegistration, RegistrationReceipt};
