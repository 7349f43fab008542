/// Who is chatting and in which conversation.
///
/// Passed explicitly instead of read from process-wide state, so the manager
/// and its tests never depend on a singleton.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    pub user_id: Option<String>,
    pub conversation_id: Option<String>,
    /// Agent credited with assistant replies when they are persisted.
    pub agent_id: String,
}

impl SessionContext {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            conversation_id: None,
            agent_id: "1".into(),
        }
    }

    pub fn anonymous() -> Self {
        Self {
            agent_id: "1".into(),
            ..Self::default()
        }
    }

    pub fn with_conversation(mut self, id: impl Into<String>) -> Self {
        self.conversation_id = Some(id.into());
        self
    }

    pub fn with_agent(mut self, id: impl Into<String>) -> Self {
        self.agent_id = id.into();
        self
    }
}
