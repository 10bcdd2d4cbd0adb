//! Integration tests for agents, graphs and runnable composition
//!
//! These tests verify end-to-end behaviour using mock components.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use strand_rs::adk::agent::{AgentExecutor, AgentOutcome, StructuredOutput};
use strand_rs::adk::callbacks::{CallbackManager, TraceCallbackHandler, TraceLog};
use strand_rs::adk::error::{ExecutionError, ModelError, ToolError};
use strand_rs::adk::message::{Message, ROLE_TOOL_RESPONSE};
use strand_rs::adk::model::Model;
use strand_rs::adk::runnable::{
    Chain, Runnable, RunnableBranch, RunnableLambda, RunnableParallel, RunnablePassthrough,
};
use strand_rs::adk::tool::{FunctionTool, Tool, ToolSchema};
use strand_rs::strand::workflow::graph::Graph;
use strand_rs::strand::workflow::loader::SettingsLoader;
use strand_rs::strand::workflow::state::{FieldType, ReducerType, StateFieldDef, StateSchema};

// ============================================================================
// Mock Components
// ============================================================================

/// Mock model that returns predefined replies
struct MockModel {
    responses: Vec<String>,
    response_index: AtomicUsize,
}

impl MockModel {
    fn new(responses: Vec<Value>) -> Self {
        Self {
            responses: responses.iter().map(Value::to_string).collect(),
            response_index: AtomicUsize::new(0),
        }
    }

    fn text_response(text: &str) -> Value {
        json!({"role": "AI", "reasoning": "", "content": text, "tool_calls": null})
    }

    fn tool_call_response(tool_name: &str, args: Value) -> Value {
        json!({
            "role": "AI",
            "reasoning": "",
            "content": format!("Calling {}", tool_name),
            "tool_calls": [{"name": tool_name, "arguments": args}],
        })
    }

    fn calls(&self) -> usize {
        self.response_index.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Model for MockModel {
    async fn generate(&self, _prompt: &str) -> Result<String, ModelError> {
        let idx = self.response_index.fetch_add(1, Ordering::SeqCst);
        if idx < self.responses.len() {
            Ok(self.responses[idx].clone())
        } else {
            Ok(MockModel::text_response("Max responses reached").to_string())
        }
    }
}

/// Static schema for MockTool
static MOCK_TOOL_SCHEMA: Lazy<ToolSchema> = Lazy::new(|| ToolSchema {
    name: "lookup".to_string(),
    description: "Mock tool: lookup".to_string(),
    arguments: json!({
        "type": "object",
        "properties": {
            "input": {"description": "input", "type": "string"}
        },
        "required": ["input"],
    }),
});

/// Mock tool that returns a predefined response
struct MockTool {
    response: Value,
}

#[async_trait]
impl Tool for MockTool {
    fn name(&self) -> &str {
        &MOCK_TOOL_SCHEMA.name
    }

    fn description(&self) -> &str {
        &MOCK_TOOL_SCHEMA.description
    }

    fn schema(&self) -> &ToolSchema {
        &MOCK_TOOL_SCHEMA
    }

    async fn execute(&self, arguments: Value) -> Result<Value, ToolError> {
        if arguments.get("input").and_then(Value::as_str).is_none() {
            return Err(ToolError::InvalidArguments {
                tool: self.name().to_string(),
                message: "missing field `input`".to_string(),
            });
        }
        Ok(self.response.clone())
    }
}

#[derive(Deserialize, JsonSchema)]
struct Operands {
    a: i64,
    b: i64,
}

fn calculator_tools() -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(FunctionTool::new("add", "Adds two numbers.", |o: Operands| {
            Ok::<_, String>(o.a + o.b)
        })),
        Arc::new(FunctionTool::new(
            "subtract",
            "Subtracts two numbers.",
            |o: Operands| Ok::<_, String>(o.a - o.b),
        )),
    ]
}

// ============================================================================
// Agent Loop Tests
// ============================================================================

#[tokio::test]
async fn test_agent_add_end_to_end() {
    let model = Arc::new(MockModel::new(vec![
        MockModel::tool_call_response("add", json!({"a": 2, "b": 3})),
        MockModel::text_response("2 + 3 = 5"),
    ]));
    let agent = AgentExecutor::new(model.clone())
        .bind_tools(calculator_tools(), vec!["add".to_string()]);

    let turn = agent.run("add 2 and 3", Vec::new()).await;

    assert_eq!(turn.history.len(), 4);
    let tool_message = &turn.history[2];
    assert_eq!(tool_message.role, ROLE_TOOL_RESPONSE);
    assert_eq!(tool_message.content, json!([{"name": "add", "content": "5"}]));

    let content = turn.outcome.content().unwrap().as_str().unwrap();
    assert!(content.contains('5'));
    assert_eq!(model.calls(), 2);
}

#[tokio::test]
async fn test_agent_mixed_tool_round() {
    let model = Arc::new(MockModel::new(vec![
        json!({
            "content": "",
            "tool_calls": [
                {"name": "lookup", "arguments": {"input": "weather"}},
                {"name": "lookup", "arguments": {}},
                {"name": "forecast", "arguments": {}},
            ],
        }),
        MockModel::text_response("It is sunny."),
    ]));
    let lookup: Arc<dyn Tool> = Arc::new(MockTool {
        response: json!("sunny"),
    });
    let agent = AgentExecutor::new(model).bind_tools(vec![lookup], Vec::new());

    let turn = agent.run("weather?", Vec::new()).await;

    let responses = turn.history[2].content.as_array().unwrap();
    assert_eq!(responses.len(), 3);
    assert_eq!(responses[0]["content"], "sunny");
    assert!(responses[1]["content"]
        .as_str()
        .unwrap()
        .starts_with("Error: "));
    assert!(responses[2]["content"]
        .as_str()
        .unwrap()
        .starts_with("ERROR: Unknown tool"));
    assert_eq!(turn.outcome, AgentOutcome::Answer(json!("It is sunny.")));
}

#[tokio::test]
async fn test_agent_never_calling_mandatory_tool_terminates() {
    // The mock falls back to a plain text reply forever
    let model = Arc::new(MockModel::new(vec![]));
    let agent = AgentExecutor::new(model.clone())
        .bind_tools(calculator_tools(), vec!["add".to_string()]);

    let outcome = agent.run_once("add 2 and 3").await;

    assert_eq!(outcome, AgentOutcome::Answer(json!("Max responses reached")));
    assert_eq!(model.calls(), 4);
}

#[tokio::test]
async fn test_agent_from_yaml_settings() {
    let yaml = r#"
name: Calculator
system: "You are a careful calculator."
tool_choices: [add, subtract]
correction_depth: 1
"#;
    let settings = SettingsLoader::parse_yaml(yaml).expect("Failed to parse YAML");
    let model = Arc::new(MockModel::new(vec![
        MockModel::tool_call_response("add", json!({"a": 1, "b": 2})),
        MockModel::text_response("3"),
        MockModel::text_response("still 3"),
    ]));
    let agent = AgentExecutor::new(model.clone())
        .with_settings(&settings)
        .bind_tools(calculator_tools(), settings.tool_choices.clone());

    let turn = agent.run("1 + 2", Vec::new()).await;

    assert_eq!(turn.outcome, AgentOutcome::Answer(json!("still 3")));
    assert_eq!(model.calls(), 3);
    assert_eq!(
        turn.history[4].content,
        json!("The tools [subtract] were not used in the conversation.")
    );
}

#[derive(Deserialize, JsonSchema)]
#[allow(dead_code)]
struct Verdict {
    answer: i64,
    confident: bool,
}

#[tokio::test]
async fn test_agent_structured_output_multi_turn() {
    let model = Arc::new(MockModel::new(vec![
        json!({"content": {"answer": 5}}),
        json!({"content": {"answer": 5, "confident": true}}),
        json!({"content": {"answer": 7, "confident": false}}),
    ]));
    let agent = AgentExecutor::new(model.clone())
        .with_structured_output(StructuredOutput::of::<Verdict>());

    let first = agent.run("2 + 3?", Vec::new()).await;
    assert_eq!(
        first.outcome,
        AgentOutcome::Answer(json!({"answer": 5, "confident": true}))
    );
    assert_eq!(first.history.len(), 2);

    let second = agent.run("3 + 4?", first.history).await;
    assert_eq!(second.history.len(), 4);
    assert_eq!(second.history[2], Message::human("3 + 4?"));
    assert_eq!(model.calls(), 3);
}

// ============================================================================
// Graph Workflow Tests
// ============================================================================

fn chat_schema() -> StateSchema {
    StateSchema::default().field(
        "messages",
        StateFieldDef::new(FieldType::Array)
            .with_reducer(ReducerType::Append)
            .with_default(json!([])),
    )
}

fn last_content(state: &strand_rs::strand::workflow::state::WorkflowState) -> String {
    state
        .get("messages")
        .and_then(Value::as_array)
        .and_then(|m| m.last())
        .and_then(|m| m["content"].as_str())
        .unwrap_or_default()
        .to_string()
}

/// user -> user_conditional -> {ai, END}; ai -> user
fn chat_graph(user_turns: Vec<&'static str>, ai: Arc<dyn Runnable>) -> Graph {
    let turns = Mutex::new(user_turns.into_iter());
    let mut graph = Graph::with_schema("chat", chat_schema());

    graph
        .add_action("user", move |_| {
            let next = turns
                .lock()
                .unwrap_or_else(|p| p.into_inner())
                .next()
                .unwrap_or("stop");
            Ok(json!({"messages": [Message::human(next)]}))
        })
        .unwrap();
    graph.add_node("ai", ai).unwrap();
    graph.add_action("END", |_| Ok(Value::Null)).unwrap();

    graph
        .add_conditional_edges(
            "user",
            |state| {
                if last_content(state) == "stop" {
                    "END".to_string()
                } else {
                    "ai".to_string()
                }
            },
            [("ai", "ai".to_string()), ("END", "END".to_string())],
        )
        .unwrap();
    graph.add_edge("ai", "user").unwrap();
    graph.set_start("user").unwrap();
    graph.set_terminals(["END"]).unwrap();
    graph
}

#[tokio::test]
async fn test_graph_stop_appends_one_message() {
    let ai = Arc::new(RunnableLambda::new("ai", |_| {
        Ok(json!({"messages": [{"role": "AI", "content": "unused"}]}))
    }));
    let graph = chat_graph(vec!["stop"], ai);

    let out = graph.invoke(json!({"messages": []}), None).await.unwrap();

    assert_eq!(out["messages"].as_array().unwrap().len(), 1);
    assert_eq!(out["messages"][0]["content"], "stop");
}

#[tokio::test]
async fn test_graph_with_agent_node() {
    let model = Arc::new(MockModel::new(vec![
        MockModel::tool_call_response("add", json!({"a": 2, "b": 3})),
        MockModel::text_response("The sum is 5."),
    ]));
    let agent = AgentExecutor::new(model).bind_tools(calculator_tools(), Vec::new());

    // state -> last human text -> agent -> AI message update
    let ai = Chain::new(
        Arc::new(RunnableLambda::new("last_message", |state: Value| {
            Ok(state["messages"]
                .as_array()
                .and_then(|m| m.last())
                .map(|m| m["content"].clone())
                .unwrap_or(Value::Null))
        })),
        Arc::new(agent),
    )
    .pipe(Arc::new(RunnableLambda::new("to_update", |content| {
        Ok(json!({"messages": [Message::ai(content, None)]}))
    })));

    let graph = chat_graph(vec!["add 2 and 3", "stop"], Arc::new(ai));
    let trace = TraceLog::new();
    let callbacks =
        CallbackManager::default().with_handler(Arc::new(TraceCallbackHandler::new(trace.clone())));

    let out = graph.invoke(Value::Null, Some(&callbacks)).await.unwrap();

    let messages = out["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[1]["content"], "The sum is 5.");
    assert_eq!(messages[2]["content"], "stop");

    let logs = trace.logs();
    assert!(logs.iter().any(|l| l.trim_start().starts_with("Starting: add with input")));
    assert!(logs.iter().any(|l| l.trim_start().starts_with("Finished: user_conditional")));
}

#[tokio::test]
async fn test_graph_routing_error_propagates() {
    let mut graph = Graph::new("router");
    graph.add_action("a", |_| Ok(json!({"route": "nowhere"}))).unwrap();
    graph.add_action("b", |_| Ok(Value::Null)).unwrap();
    graph
        .add_conditional_edges(
            "a",
            |state| {
                state
                    .get("route")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string()
            },
            [("b", "b".to_string())],
        )
        .unwrap();
    graph.set_start("a").unwrap();
    graph.set_terminals(["b"]).unwrap();

    let err = graph.invoke(Value::Null, None).await.unwrap_err();
    assert!(matches!(err, ExecutionError::Routing { ref value, .. } if value == "nowhere"));
}

// ============================================================================
// Runnable Composition Tests
// ============================================================================

#[tokio::test]
async fn test_parallel_agents_and_branch() {
    let upper = Arc::new(RunnableLambda::new("upper", |v: Value| {
        Ok(json!(v.as_str().unwrap_or_default().to_uppercase()))
    }));
    let agent = Arc::new(
        AgentExecutor::new(Arc::new(MockModel::new(vec![MockModel::text_response("hi")])))
            .with_name("greeter"),
    );

    let parallel = RunnableParallel::new()
        .branch("upper", upper)
        .branch("greeting", agent);
    let out = parallel.invoke(json!("hello"), None).await.unwrap();
    assert_eq!(out, json!({"upper": "HELLO", "greeting": "hi"}));

    let branch = RunnableBranch::new()
        .when(|v| v["greeting"] == "hi", Arc::new(RunnablePassthrough::keys(["upper"])));
    assert_eq!(branch.invoke(out, None).await.unwrap(), json!("HELLO"));
    assert_eq!(branch.invoke(json!({}), None).await.unwrap(), Value::Null);
}

#[tokio::test]
async fn test_parallel_fails_fast() {
    let failing = Arc::new(RunnableLambda::new("failing", |_| {
        Err(ExecutionError::step("failing", "boom"))
    }));
    let parallel = RunnableParallel::new()
        .branch("ok", Arc::new(RunnablePassthrough::all()))
        .branch("failing", failing);

    let err = parallel.invoke(json!(1), None).await.unwrap_err();
    assert!(matches!(err, ExecutionError::Step { ref step, .. } if step == "failing"));
}
