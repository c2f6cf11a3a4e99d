pub mod capture_recorder;
pub mod channels;
pub mod ephemeral_storage;
pub mod segment_player;
pub mod stream_delegate;
