use anyhow::Result;
use serde::Serialize;
use tracing::{debug, warn};

use crate::capabilities::catalog::Capability;
use crate::capabilities::dispatch::dispatch;
use crate::capabilities::store::StatsStore;
use crate::errors::AgentError;
use crate::models::message::Message;
use crate::models::tool::Tool;
use crate::prompt_template::load_prompt_file;
use crate::providers::base::Provider;

/// Loop configuration. `max_iterations` bounds the number of oracle
/// invocations per run; hitting the bound is a defined terminal state, not
/// an error.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub max_iterations: u32,
}

impl AgentConfig {
    pub fn new(max_iterations: u32) -> Self {
        Self {
            // The bound must admit at least one oracle turn
            max_iterations: max_iterations.max(1),
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self { max_iterations: 20 }
    }
}

/// What a finished run hands back to the front end: the answer, plus the
/// most recent executed query and its raw results for display.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub text: String,
    pub last_query: Option<String>,
    pub last_query_results: Option<String>,
}

#[derive(Serialize)]
struct PromptContext {
    current_iteration: u32,
    max_iterations: u32,
    tools: Vec<Tool>,
}

/// Per-run bookkeeping: the transcript, the oracle-invocation counter, and
/// the most recent run_query capture. Created fresh for every user query
/// and dropped once the reply is produced.
struct RunState {
    messages: Vec<Message>,
    iterations: u32,
    last_query: Option<String>,
    last_query_results: Option<String>,
}

impl RunState {
    fn new(user_query: &str) -> Self {
        Self {
            messages: vec![Message::user().with_text(user_query)],
            iterations: 0,
            last_query: None,
            last_query_results: None,
        }
    }

    fn into_reply(self, text: String) -> Reply {
        Reply {
            text,
            last_query: self.last_query,
            last_query_results: self.last_query_results,
        }
    }
}

/// Drives the oracle/capability exchange for one question at a time. The
/// provider and the store are injected at construction; the agent itself
/// holds no connection or ambient state, so independent runs can execute
/// concurrently on clones or separate instances.
pub struct Agent {
    provider: Box<dyn Provider>,
    store: Box<dyn StatsStore>,
    config: AgentConfig,
}

impl Agent {
    pub fn new(provider: Box<dyn Provider>, store: Box<dyn StatsStore>, config: AgentConfig) -> Self {
        Self {
            provider,
            store,
            config,
        }
    }

    fn system_prompt(&self, current_iteration: u32) -> Result<String> {
        let context = PromptContext {
            current_iteration,
            max_iterations: self.config.max_iterations,
            tools: Capability::declarations(),
        };
        load_prompt_file("system.md", &context)
            .map_err(|e| AgentError::Internal(e.to_string()).into())
    }

    /// Run the loop to completion for a single user question.
    ///
    /// Every turn the oracle sees the full transcript. A response without
    /// capability requests is the final answer; otherwise the requests are
    /// dispatched in emission order, one at a time, and their results are
    /// appended before the oracle is consulted again. Once the iteration
    /// budget is exhausted the oracle's last text is returned as-is, with
    /// no further dispatch.
    ///
    /// Only a failure to reach the oracle escapes as an error; capability
    /// failures of any kind travel through the transcript as payloads.
    pub async fn run(&self, user_query: &str) -> Result<Reply> {
        let mut state = RunState::new(user_query);
        let tools = Capability::declarations();

        loop {
            let system = self.system_prompt(state.iterations + 1)?;
            let (response, _usage) = self
                .provider
                .complete(&system, &state.messages, &tools)
                .await?;
            state.iterations += 1;
            debug!(iteration = state.iterations, "oracle responded");

            let requests: Vec<_> = response
                .tool_requests()
                .into_iter()
                .cloned()
                .collect();
            state.messages.push(response.clone());

            if requests.is_empty() {
                return Ok(state.into_reply(response.text()));
            }

            if state.iterations >= self.config.max_iterations {
                warn!(
                    iterations = state.iterations,
                    "iteration budget exhausted, returning last oracle text"
                );
                return Ok(state.into_reply(response.text()));
            }

            let mut results = Message::user();
            for request in &requests {
                let output = match &request.tool_call {
                    Ok(call) => {
                        let payload = dispatch(self.store.as_ref(), call).await;
                        if call.name == Capability::RunQuery.name() {
                            if let Some(sql) =
                                call.arguments.get("sql_query").and_then(|v| v.as_str())
                            {
                                state.last_query = Some(sql.to_string());
                            }
                            state.last_query_results = Some(payload.clone());
                        }
                        payload
                    }
                    // The request never decoded into a call; echo the
                    // decode error back as the result payload
                    Err(e) => format!("Error: {}", e),
                };
                results = results.with_tool_response(&request.id, output);
            }
            state.messages.push(results);
        }
    }
}
