pub mod capture_source;
pub mod recording_buffer;
pub mod recorder_state;
pub mod capture_loop;
