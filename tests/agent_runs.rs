//! End-to-end runs of the agent graphs against scripted doubles

mod common;

use std::collections::BTreeMap;

use serde_json::{json, Value};
use tokio_test::{assert_err, assert_ok};
use tokio_util::sync::CancellationToken;

use common::{calls, memory_instructions, run_config, services, CannedSearch, ScriptedModel};
use forge::agent::prompts;
use forge::core::{ForgeError, Message, Role};
use forge::memory::instructions::{ASSISTANT_NAME, MAIN_INSTRUCTION};
use forge::{Agent, GraphKind};

#[tokio::test]
async fn test_search_then_answer() {
    let model = ScriptedModel::new(vec![
        calls(&[("t1", "web_search", json!({"query": "weather"}))]),
        Message::assistant("It is sunny."),
    ]);
    let search = CannedSearch::new("sunny");
    let agent = Agent::new(
        GraphKind::Builder,
        &services(model.clone()).with_search(search.clone()),
    )
    .unwrap();

    let conversation = agent
        .run(vec![Message::user("What's the weather?")], run_config())
        .await
        .unwrap();

    assert_eq!(conversation.len(), 4);
    assert_eq!(conversation[0].role, Role::User);
    assert!(conversation[1].has_tool_calls());
    assert_eq!(conversation[2].role, Role::Tool);
    assert_eq!(conversation[2].tool_call_id.as_deref(), Some("t1"));
    assert_eq!(conversation[2].text(), "weather: sunny");
    assert_eq!(conversation[3].text(), "It is sunny.");

    assert_eq!(search.queries(), vec!["weather"]);
    assert_eq!(model.call_count(), 2);
    // The second call sees the tool result
    let second = &model.calls()[1];
    assert!(second.messages.iter().any(|m| m.role == Role::Tool));
}

#[tokio::test]
async fn test_two_calls_one_failure() {
    let model = ScriptedModel::new(vec![
        calls(&[
            ("a", "web_search", json!({"query": "rust"})),
            ("b", "web_search", json!({"query": "broken"})),
        ]),
        Message::assistant("Found something about rust."),
    ]);
    let search = CannedSearch::failing_on("ok", "broken");
    let agent = Agent::new(
        GraphKind::Builder,
        &services(model.clone()).with_search(search),
    )
    .unwrap();

    let conversation = assert_ok!(agent.run(vec![Message::user("look up")], run_config()).await);

    let results: Vec<&Message> = conversation.iter().filter(|m| m.role == Role::Tool).collect();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].tool_call_id.as_deref(), Some("a"));
    assert!(!results[0].is_error);
    assert_eq!(results[1].tool_call_id.as_deref(), Some("b"));
    assert!(results[1].is_error);
    assert!(results[1].text().contains("upstream timed out"));
    assert_eq!(conversation.last().map(Message::text), Some("Found something about rust."));
}

#[tokio::test]
async fn test_unknown_tool_is_reported_to_model() {
    let model = ScriptedModel::new(vec![
        calls(&[("x", "teleport", json!({}))]),
        Message::assistant("I can't do that."),
    ]);
    let agent = Agent::new(GraphKind::Builder, &services(model.clone())).unwrap();

    let conversation = agent
        .run(vec![Message::user("beam me up")], run_config())
        .await
        .unwrap();

    let result = &conversation[2];
    assert_eq!(result.tool_call_id.as_deref(), Some("x"));
    assert!(result.is_error);
    assert!(result.text().contains("Unknown tool: teleport"));
    assert_eq!(model.call_count(), 2);
}

#[tokio::test]
async fn test_persist_merges_and_is_idempotent() {
    let instructions = memory_instructions();
    let model = ScriptedModel::new(vec![
        calls(&[("p1", "upsert_instructions", json!({"assistantName": "Chef"}))]),
        Message::assistant("Saved the name."),
        calls(&[("p2", "upsert_instructions", json!({"mainInstruction": "Suggest recipes"}))]),
        Message::assistant("Saved the behavior."),
        calls(&[("p3", "upsert_instructions", json!({"mainInstruction": "Suggest recipes"}))]),
        Message::assistant("Nothing changed."),
    ]);
    let agent = Agent::new(
        GraphKind::Builder,
        &services(model).with_instructions(instructions.clone()),
    )
    .unwrap();

    let first = agent
        .run(vec![Message::user("Call it Chef")], run_config())
        .await
        .unwrap();
    let outcome: Value = serde_json::from_str(first[2].text()).unwrap();
    assert_eq!(outcome["assistantId"], "assistant-1");
    assert!(outcome["changes"][0]["old"].is_null());

    let second = agent.run(first, run_config()).await.unwrap();
    let mut history = second;
    history.push(Message::user("Again"));
    let third = agent.run(history, run_config()).await.unwrap();

    let record = instructions
        .load("user-1", "assistant-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.get(ASSISTANT_NAME), Some("Chef"));
    assert_eq!(record.get(MAIN_INSTRUCTION), Some("Suggest recipes"));
    assert_eq!(record.fields.len(), 2);

    // The repeated write reports the value from before it as `old`
    let last_result = third.iter().rev().find(|m| m.role == Role::Tool).unwrap();
    let outcome: Value = serde_json::from_str(last_result.text()).unwrap();
    let main = outcome["changes"]
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["field"] == MAIN_INSTRUCTION)
        .unwrap();
    assert_eq!(main["old"], "Suggest recipes");
    assert_eq!(main["new"], "Suggest recipes");
}

#[tokio::test]
async fn test_mixed_turn_answers_every_call_in_order() {
    let instructions = memory_instructions();
    let model = ScriptedModel::new(vec![
        calls(&[
            ("w1", "upsert_instructions", json!({"assistantName": "Chef"})),
            ("s1", "web_search", json!({"query": "pasta"})),
            ("w2", "upsert_instructions", json!({"mainInstruction": "Suggest recipes"})),
        ]),
        Message::assistant("All set."),
    ]);
    let search = CannedSearch::new("carbonara");
    let agent = Agent::new(
        GraphKind::Builder,
        &services(model.clone())
            .with_search(search.clone())
            .with_instructions(instructions.clone()),
    )
    .unwrap();

    let conversation = agent
        .run(vec![Message::user("Make a cooking assistant")], run_config())
        .await
        .unwrap();

    let results: Vec<&Message> = conversation.iter().filter(|m| m.role == Role::Tool).collect();
    let ids: Vec<_> = results.iter().map(|m| m.tool_call_id.as_deref()).collect();
    assert_eq!(ids, vec![Some("w1"), Some("s1"), Some("w2")]);
    assert!(results.iter().all(|m| !m.is_error));
    assert_eq!(results[1].text(), "pasta: carbonara");

    let record = instructions
        .load("user-1", "assistant-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.get(ASSISTANT_NAME), Some("Chef"));
    assert_eq!(record.get(MAIN_INSTRUCTION), Some("Suggest recipes"));
    assert_eq!(search.queries(), vec!["pasta"]);
    assert_eq!(model.call_count(), 2);
}

#[tokio::test]
async fn test_empty_upsert_is_rejected_and_run_continues() {
    let instructions = memory_instructions();
    let model = ScriptedModel::new(vec![
        calls(&[("p1", "upsert_instructions", json!({}))]),
        Message::assistant("Let me try again later."),
    ]);
    let agent = Agent::new(
        GraphKind::Builder,
        &services(model).with_instructions(instructions.clone()),
    )
    .unwrap();

    let conversation = agent.run(vec![Message::user("hi")], run_config()).await.unwrap();
    assert!(conversation[2].is_error);
    assert!(conversation[2].text().contains("Invalid arguments"));
    assert!(instructions.load("user-1", "assistant-1").await.unwrap().is_none());
}

#[tokio::test]
async fn test_persist_without_store_aborts_run() {
    let model = ScriptedModel::new(vec![
        calls(&[("p1", "upsert_instructions", json!({"assistantName": "Chef"}))]),
        Message::assistant("unreachable"),
    ]);
    let agent = Agent::new(GraphKind::Builder, &services(model.clone())).unwrap();

    let err = assert_err!(agent.run(vec![Message::user("hi")], run_config()).await);
    assert!(matches!(err, ForgeError::StoreUnavailable));
    assert_eq!(model.call_count(), 1);
}

#[tokio::test]
async fn test_finalize_generates_options_and_ends() {
    let model = ScriptedModel::new(vec![
        calls(&[("o1", "inline_action", json!({"inlineOptionContext": "Pick a pasta"}))]),
        calls(&[(
            "e1",
            "emit_options",
            json!({"inlineOptions": ["Carbonara", "Pesto"], "mainOptions": ["Help"]}),
        )]),
    ]);
    let agent = Agent::new(GraphKind::Template, &services(model.clone())).unwrap();

    let conversation = agent
        .run(vec![Message::user("What can I cook?")], run_config())
        .await
        .unwrap();

    assert_eq!(conversation.len(), 3);
    let result = &conversation[2];
    assert_eq!(result.tool_call_id.as_deref(), Some("o1"));
    let options: Value = serde_json::from_str(result.text()).unwrap();
    assert_eq!(options["inlineOptions"], json!(["Carbonara", "Pesto"]));
    assert_eq!(options["mainOptions"], json!(["Help"]));

    // One main call plus the option call; nothing after finalize
    let invocations = model.calls();
    assert_eq!(invocations.len(), 2);
    assert_eq!(invocations[1].options.model, "options");
    assert_eq!(invocations[1].tool_names(), vec!["emit_options"]);
    assert!(invocations[1].system().starts_with(prompts::INLINE_OPTIONS_INSTRUCTION));
}

#[tokio::test]
async fn test_template_uses_stored_instruction() {
    let instructions = memory_instructions();
    let fields = BTreeMap::from([(MAIN_INSTRUCTION.to_string(), "You are Chef.".to_string())]);
    instructions
        .merge_fields("user-1", "assistant-1", &fields)
        .await
        .unwrap();

    let model = ScriptedModel::new(vec![Message::assistant("Hello from Chef")]);
    let agent = Agent::new(
        GraphKind::Template,
        &services(model.clone()).with_instructions(instructions),
    )
    .unwrap();

    agent
        .run(
            vec![Message::user("hi")],
            run_config().with_system_prompt("ignored"),
        )
        .await
        .unwrap();

    assert_eq!(model.calls()[0].system(), "You are Chef.");
}

#[tokio::test]
async fn test_title_graph_single_call_without_tools() {
    let model = ScriptedModel::new(vec![Message::assistant("Weeknight Pasta Ideas")]);
    let agent = Agent::new(GraphKind::Title, &services(model.clone())).unwrap();

    let conversation = agent
        .run(
            vec![Message::user("pasta ideas?"), Message::assistant("Try carbonara.")],
            run_config().with_system_prompt("ignored"),
        )
        .await
        .unwrap();

    assert_eq!(conversation.last().map(Message::text), Some("Weeknight Pasta Ideas"));
    let invocations = model.calls();
    assert_eq!(invocations.len(), 1);
    assert!(invocations[0].tool_names().is_empty());
    assert_eq!(invocations[0].system(), prompts::TITLE_INSTRUCTION);
}

#[tokio::test]
async fn test_step_limit_stops_endless_tool_loop() {
    let model = ScriptedModel::repeating(calls(&[("s", "web_search", json!({"query": "more"}))]));
    let agent = Agent::new(
        GraphKind::Builder,
        &services(model.clone()).with_search(CannedSearch::new("again")),
    )
    .unwrap();

    let err = agent
        .run(vec![Message::user("loop")], run_config().with_max_steps(Some(5)))
        .await
        .unwrap_err();

    assert!(matches!(err, ForgeError::StepLimitExceeded(5)));
    assert_eq!(model.call_count(), 3);
}

#[tokio::test]
async fn test_cancel_between_steps() {
    let token = CancellationToken::new();
    let model = ScriptedModel::repeating(calls(&[("s", "web_search", json!({"query": "q"}))]));
    let search = CannedSearch::cancelling("r", token.clone());
    let agent = Agent::new(
        GraphKind::Builder,
        &services(model.clone()).with_search(search.clone()),
    )
    .unwrap();

    let err = agent
        .run_cancellable(vec![Message::user("go")], run_config(), token)
        .await
        .unwrap_err();

    assert!(matches!(err, ForgeError::Cancelled));
    // The in-flight search finished; no model call followed it
    assert_eq!(search.queries().len(), 1);
    assert_eq!(model.call_count(), 1);
}

#[tokio::test]
async fn test_model_failure_aborts_run() {
    let model = ScriptedModel::with_results(vec![Err(ForgeError::Other("connection reset".into()))]);
    let agent = Agent::new(GraphKind::Builder, &services(model)).unwrap();

    let err = agent
        .run(vec![Message::user("hi")], run_config())
        .await
        .unwrap_err();
    assert!(matches!(err, ForgeError::ModelInvocation(_)));
}

#[tokio::test]
async fn test_context_message_is_appended() {
    let model = ScriptedModel::new(vec![Message::assistant("done")]);
    let agent = Agent::new(GraphKind::Builder, &services(model.clone())).unwrap();

    agent
        .run(
            vec![Message::user("hi")],
            run_config().with_context(forge::CallContext::new("order 42", "refund")),
        )
        .await
        .unwrap();

    let sent = &model.calls()[0].messages;
    assert_eq!(sent.last().map(Message::text), Some("Context: order 42\nAction: refund"));
}
