pub mod op_helper;
pub mod record_op;
pub mod replay_op;
pub mod watch_op;
pub mod clip_op;
