pub mod audio;
pub mod config;
pub mod driver;
pub mod error;
pub mod kernel;
pub mod outputs;
pub mod protocol;

pub use config::ReactorConfig;
pub use error::{InterviewError, InterviewResult};
pub use kernel::reactor::InterviewReactor;
