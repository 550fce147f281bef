pub mod engine;
pub mod manager;

pub use engine::{
    Progress,
    ReindexOptions,
    Reindexer,
};
pub use manager::{
    ItemStatus,
    JobItemSnapshot,
    JobSnapshot,
    JobStatus,
    Manager,
};
