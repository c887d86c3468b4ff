use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use toolrelay_core::{AgentDefinition, AgentService, OutputSubmitter, RunPoller, ServiceError};
use toolrelay_protocol::{
    AgentId, FileId, MessageRole, RunId, RunRef, RunSnapshot, RunState, ThreadId, ThreadMessage,
    ToolOutput,
};

/// One recorded `submit` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub run: RunRef,
    pub outputs: Vec<ToolOutput>,
}

#[derive(Debug, Default)]
struct State {
    next_id: usize,
    snapshots: VecDeque<RunSnapshot>,
    replies: VecDeque<String>,
    run_replies: HashMap<RunId, String>,
    polls: usize,
    created_agents: Vec<AgentDefinition>,
    deleted_agents: Vec<AgentId>,
    deleted_threads: Vec<ThreadId>,
    uploaded_files: Vec<(FileId, PathBuf)>,
    deleted_files: Vec<FileId>,
    messages: Vec<(ThreadId, String, Vec<String>)>,
    submissions: Vec<Submission>,
    cancelled: Vec<RunRef>,
}

/// In-memory agent service that replays scripted run snapshots.
///
/// Each poll pops the next scripted snapshot; once the script is empty the
/// run reports `Completed`. Each created run pops the next scripted reply and
/// stores it as that run's assistant message.
#[derive(Debug, Default)]
pub struct ScriptedAgentService {
    state: Mutex<State>,
    fail_thread_creation: bool,
    fail_deletes: bool,
    fail_uploads_after: Option<usize>,
}

impl ScriptedAgentService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append snapshots returned by successive polls.
    pub fn with_snapshots(self, snapshots: impl IntoIterator<Item = RunSnapshot>) -> Self {
        self.state.lock().snapshots.extend(snapshots);
        self
    }

    /// Append assistant replies, one per created run.
    pub fn with_replies<I, S>(self, replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state
            .lock()
            .replies
            .extend(replies.into_iter().map(Into::into));
        self
    }

    pub fn failing_thread_creation(mut self) -> Self {
        self.fail_thread_creation = true;
        self
    }

    /// Reject every upload once `count` files have been uploaded.
    pub fn failing_uploads_after(mut self, count: usize) -> Self {
        self.fail_uploads_after = Some(count);
        self
    }

    pub fn failing_deletes(mut self) -> Self {
        self.fail_deletes = true;
        self
    }

    pub fn polls(&self) -> usize {
        self.state.lock().polls
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.state.lock().submissions.clone()
    }

    pub fn created_agents(&self) -> Vec<AgentDefinition> {
        self.state.lock().created_agents.clone()
    }

    pub fn deleted_agents(&self) -> Vec<AgentId> {
        self.state.lock().deleted_agents.clone()
    }

    pub fn deleted_threads(&self) -> Vec<ThreadId> {
        self.state.lock().deleted_threads.clone()
    }

    /// Uploaded files as `(file_id, path)`.
    pub fn uploaded_files(&self) -> Vec<(FileId, PathBuf)> {
        self.state.lock().uploaded_files.clone()
    }

    pub fn deleted_files(&self) -> Vec<FileId> {
        self.state.lock().deleted_files.clone()
    }

    /// Posted messages as `(thread_id, content, attachments)`.
    pub fn messages(&self) -> Vec<(ThreadId, String, Vec<String>)> {
        self.state.lock().messages.clone()
    }

    pub fn cancelled(&self) -> Vec<RunRef> {
        self.state.lock().cancelled.clone()
    }

    fn next_id(state: &mut State, prefix: &str) -> String {
        state.next_id += 1;
        format!("{prefix}_{}", state.next_id)
    }
}

#[async_trait]
impl RunPoller for ScriptedAgentService {
    async fn poll(&self, run: &RunRef) -> RunSnapshot {
        let mut state = self.state.lock();
        state.polls += 1;
        state
            .snapshots
            .pop_front()
            .unwrap_or_else(|| RunSnapshot::new(run.run_id.clone(), RunState::Completed))
    }
}

#[async_trait]
impl OutputSubmitter for ScriptedAgentService {
    async fn submit(
        &self,
        run: &RunRef,
        outputs: &[ToolOutput],
    ) -> Result<RunSnapshot, ServiceError> {
        self.state.lock().submissions.push(Submission {
            run: run.clone(),
            outputs: outputs.to_vec(),
        });
        Ok(RunSnapshot::new(run.run_id.clone(), RunState::Pending))
    }
}

#[async_trait]
impl AgentService for ScriptedAgentService {
    async fn create_agent(&self, definition: &AgentDefinition) -> Result<AgentId, ServiceError> {
        let mut state = self.state.lock();
        state.created_agents.push(definition.clone());
        Ok(Self::next_id(&mut state, "asst"))
    }

    async fn delete_agent(&self, agent_id: &str) -> Result<(), ServiceError> {
        self.state.lock().deleted_agents.push(agent_id.to_string());
        if self.fail_deletes {
            return Err(ServiceError::Request("delete refused".to_string()));
        }
        Ok(())
    }

    async fn create_thread(&self) -> Result<ThreadId, ServiceError> {
        if self.fail_thread_creation {
            return Err(ServiceError::Status {
                status: 500,
                body: "thread creation failed".to_string(),
            });
        }
        let mut state = self.state.lock();
        Ok(Self::next_id(&mut state, "thread"))
    }

    async fn delete_thread(&self, thread_id: &str) -> Result<(), ServiceError> {
        self.state.lock().deleted_threads.push(thread_id.to_string());
        if self.fail_deletes {
            return Err(ServiceError::Request("delete refused".to_string()));
        }
        Ok(())
    }

    async fn upload_file(&self, path: &Path) -> Result<FileId, ServiceError> {
        let mut state = self.state.lock();
        if let Some(limit) = self.fail_uploads_after
            && state.uploaded_files.len() >= limit
        {
            return Err(ServiceError::InvalidRequest(format!(
                "upload refused: {}",
                path.display()
            )));
        }
        let file_id = Self::next_id(&mut state, "file");
        state
            .uploaded_files
            .push((file_id.clone(), path.to_path_buf()));
        Ok(file_id)
    }

    async fn delete_file(&self, file_id: &str) -> Result<(), ServiceError> {
        self.state.lock().deleted_files.push(file_id.to_string());
        if self.fail_deletes {
            return Err(ServiceError::Request("delete refused".to_string()));
        }
        Ok(())
    }

    async fn add_message(
        &self,
        thread_id: &str,
        content: &str,
        attachments: &[String],
    ) -> Result<(), ServiceError> {
        self.state.lock().messages.push((
            thread_id.to_string(),
            content.to_string(),
            attachments.to_vec(),
        ));
        Ok(())
    }

    async fn create_run(&self, thread_id: &str, _agent_id: &str) -> Result<RunRef, ServiceError> {
        let mut state = self.state.lock();
        let run_id = Self::next_id(&mut state, "run");
        if let Some(reply) = state.replies.pop_front() {
            state.run_replies.insert(run_id.clone(), reply);
        }
        Ok(RunRef::new(thread_id, run_id))
    }

    async fn cancel_run(&self, run: &RunRef) -> Result<(), ServiceError> {
        self.state.lock().cancelled.push(run.clone());
        Ok(())
    }

    async fn latest_assistant_message(
        &self,
        run: &RunRef,
    ) -> Result<Option<ThreadMessage>, ServiceError> {
        Ok(self
            .state
            .lock()
            .run_replies
            .get(&run.run_id)
            .map(|text| ThreadMessage {
                role: MessageRole::Assistant,
                text: text.clone(),
            }))
    }
}
