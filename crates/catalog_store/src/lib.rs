pub mod id;
pub mod list_token;
pub mod naming;
pub mod patch;
pub mod store;

pub use id::IdGenerator;
pub use list_token::ListToken;
pub use patch::{
    AssetPatch,
    ViewPatch,
};
pub use store::Store;
