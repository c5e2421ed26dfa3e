pub mod errors;
pub mod local;
pub mod messages;

pub use errors::AppError;
pub use local::App;
pub use messages::{EventOutcome, Message, Reply};
