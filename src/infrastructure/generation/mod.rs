pub mod noop_generator;
pub mod offline_generator;
pub mod openai_generator;

pub use noop_generator::NoOpGenerator;
pub use offline_generator::OfflineGenerator;
pub use openai_generator::OpenAiCompatibleGenerator;
