mod chat;
mod template;

pub use chat::ChatPromptTemplate;
pub use template::{vars, PromptTemplate, PromptVars};
