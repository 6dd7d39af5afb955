pub mod error;
pub mod openai;
pub mod traits;
pub mod util;

pub use error::{AiError, Result};
pub use openai::{Completion, OpenAi, SearchContextSize};
pub use traits::{Message, MessageRole};
pub use util::{truncate_to_char_boundary, truncate_with_ellipsis};
