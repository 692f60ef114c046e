pub mod audio;
pub mod caption;
pub mod effect;
pub mod event;
pub mod playback;
pub mod reactor;
pub mod session;
pub mod state;
pub mod telemetry;
pub mod time;
pub mod timer;
pub mod transcript;
