// Public modules
pub mod chat_completion;
pub mod model;
pub mod turn;
pub mod usage;

// Re-exports
pub use chat_completion::{ChatCompletion, ChatCompletionRequest, Choice, ChoiceMessage, Reply};
pub use model::{KnownModel, Model};
pub use turn::{Role, Turn};
pub use usage::Usage;
