pub mod interval;
pub mod scheduled_task;
pub mod task_result;
pub mod webfarm_task;

pub use interval::*;
pub use scheduled_task::*;
pub use task_result::*;
pub use webfarm_task::*;
