pub mod page;
pub mod record;
pub mod resource;

pub use page::*;
pub use record::*;
pub use resource::*;
