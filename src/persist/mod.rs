pub mod clip_writer;
pub mod depth_store;
pub mod manifest;
pub mod persister;
pub mod trimmer;
