//! Test doubles shared by the integration tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use forge::core::{ForgeError, Message, Result, ToolCall};
use forge::llm::{InvokeOptions, ModelProvider};
use forge::memory::InstructionStore;
use forge::store::InMemoryStore;
use forge::tools::SearchProvider;
use forge::{RunConfig, Services};

/// One recorded model invocation
#[derive(Debug, Clone)]
pub struct Invocation {
    pub messages: Vec<Message>,
    pub options: InvokeOptions,
}

impl Invocation {
    pub fn system(&self) -> &str {
        self.messages.first().map(Message::text).unwrap_or_default()
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.options
            .tools
            .iter()
            .map(|t| t.function.name.clone())
            .collect()
    }
}

/// Model that replays a script of replies and records what it was sent
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<Message>>>,
    /// Returned once the script runs out
    fallback: Option<Message>,
    calls: Mutex<Vec<Invocation>>,
}

impl ScriptedModel {
    pub fn new(replies: Vec<Message>) -> Arc<Self> {
        Self::build(replies.into_iter().map(Ok).collect(), None)
    }

    pub fn with_results(replies: Vec<Result<Message>>) -> Arc<Self> {
        Self::build(replies, None)
    }

    /// Answers every call with `reply`
    pub fn repeating(reply: Message) -> Arc<Self> {
        Self::build(Vec::new(), Some(reply))
    }

    fn build(replies: Vec<Result<Message>>, fallback: Option<Message>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            fallback,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ModelProvider for ScriptedModel {
    async fn invoke(&self, messages: &[Message], options: &InvokeOptions) -> Result<Message> {
        self.calls.lock().unwrap().push(Invocation {
            messages: messages.to_vec(),
            options: options.clone(),
        });

        let next = self.replies.lock().unwrap().pop_front();
        match (next, &self.fallback) {
            (Some(reply), _) => reply,
            (None, Some(fallback)) => Ok(fallback.clone()),
            (None, None) => Err(ForgeError::model("script exhausted")),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Search that answers every query with a canned text, failing on one query
pub struct CannedSearch {
    answer: String,
    fail_on: Option<String>,
    queries: Mutex<Vec<String>>,
    /// Cancelled on the first search, when set
    cancel: Option<CancellationToken>,
}

impl CannedSearch {
    pub fn new(answer: &str) -> Arc<Self> {
        Self::build(answer, None, None)
    }

    pub fn failing_on(answer: &str, query: &str) -> Arc<Self> {
        Self::build(answer, Some(query.to_string()), None)
    }

    pub fn cancelling(answer: &str, token: CancellationToken) -> Arc<Self> {
        Self::build(answer, None, Some(token))
    }

    fn build(answer: &str, fail_on: Option<String>, cancel: Option<CancellationToken>) -> Arc<Self> {
        Arc::new(Self {
            answer: answer.to_string(),
            fail_on,
            queries: Mutex::new(Vec::new()),
            cancel,
        })
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchProvider for CannedSearch {
    async fn search(&self, query: &str) -> Result<String> {
        self.queries.lock().unwrap().push(query.to_string());
        if let Some(token) = &self.cancel {
            token.cancel();
        }
        if self.fail_on.as_deref() == Some(query) {
            return Err(ForgeError::search("upstream timed out"));
        }
        Ok(format!("{}: {}", query, self.answer))
    }
}

/// Assistant message requesting the given `(id, name, args)` calls
pub fn calls(requests: &[(&str, &str, Value)]) -> Message {
    Message::assistant_tool_calls(
        None,
        requests
            .iter()
            .map(|(id, name, args)| ToolCall::new(*id, *name, args.clone()))
            .collect(),
    )
}

pub fn memory_instructions() -> InstructionStore {
    InstructionStore::new(Arc::new(InMemoryStore::new()))
}

pub fn services(model: Arc<ScriptedModel>) -> Services {
    Services::new(model, "test/options")
}

pub fn run_config() -> RunConfig {
    RunConfig::new("user-1", "assistant-1", "test/main")
}
