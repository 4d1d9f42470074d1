pub mod archive;
pub mod backup;
pub mod collection;
pub mod media;
pub mod mutation;
