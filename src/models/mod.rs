pub mod media_item;
pub mod page_window;
pub mod query_key;
pub mod row_model;

pub use media_item::*;
pub use page_window::*;
pub use query_key::*;
pub use row_model::*;
