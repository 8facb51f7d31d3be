use examgrade_core::{GradeError, Message};

use crate::{PromptTemplate, PromptVars};

/// A fixed system + user prompt pair, the shape every grading tool sends.
#[derive(Debug, Clone)]
pub struct ChatPromptTemplate {
    system: PromptTemplate,
    user: PromptTemplate,
}

impl ChatPromptTemplate {
    pub fn new(system: &str, user: &str) -> Self {
        Self {
            system: PromptTemplate::new(system),
            user: PromptTemplate::new(user),
        }
    }

    pub fn format_messages(&self, vars: &PromptVars) -> Result<Vec<Message>, GradeError> {
        Ok(vec![
            Message::system(self.system.render(vars)?),
            Message::user(self.user.render(vars)?),
        ])
    }
}
