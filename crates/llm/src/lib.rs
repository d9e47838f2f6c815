pub mod providers;

pub use providers::create_provider;
pub use providers::openai_tools::OpenAiToolProvider;
pub use providers::prompted::PromptedToolProvider;
