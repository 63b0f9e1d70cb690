pub mod metadata;
pub mod document;

pub use document::Document;
pub use metadata::Metadata;
