pub mod doc;
pub mod worker;

pub use doc::map_asset_doc;
pub use worker::{
    Worker,
    WorkerConfig,
};
