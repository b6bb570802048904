//! End-to-end turns over a real SQLite store and knowledge index, with a
//! scripted model standing in for the provider.

use std::sync::Arc;

use serde_json::json;

use helpdesk_agent::{
    default_registry, AgentError, CapabilityRegistry, OrchestrationLoop, PresetConfirmer, ScriptedConfirmer,
    SupportAgent, TurnContext, NO_DOCUMENT_MATCH, NO_INFO_FOUND,
};
use helpdesk_core::config::{AgentConfig, KnowledgeConfig};
use helpdesk_core::types::{FaqEntry, Message, TeamMember, TicketStatus};
use helpdesk_knowledge::{KnowledgeBase, RetrievalAnswerer};
use helpdesk_llm::{ChatMessage, ChatRole, HashEmbedding, ModelReply, ScriptedModel, ToolCall};
use helpdesk_storage::{Database, SqliteSupportStore, SupportStore};

struct Harness {
    store: Arc<SqliteSupportStore>,
    model: Arc<ScriptedModel>,
    registry: Arc<CapabilityRegistry>,
    agent: OrchestrationLoop,
    _root: tempfile::TempDir,
}

async fn harness(documents: &[(&str, &str)], docs_model: Arc<ScriptedModel>) -> Harness {
    let root = tempfile::tempdir().unwrap();
    let docs_dir = root.path().join("documents");
    std::fs::create_dir_all(&docs_dir).unwrap();
    for (name, body) in documents {
        std::fs::write(docs_dir.join(name), body).unwrap();
    }

    let store = Arc::new(SqliteSupportStore::new(Arc::new(Database::in_memory().unwrap())));
    store
        .teams()
        .insert(&TeamMember {
            name: "Alice".into(),
            bio: "Head of customer success, handles escalations".into(),
        })
        .unwrap();
    store
        .faq()
        .insert(&FaqEntry {
            question: "What are your opening hours?".into(),
            answer: "Monday to Friday, 9am to 5pm.".into(),
        })
        .unwrap();

    let kb = KnowledgeBase::open(
        &KnowledgeConfig::default(),
        docs_dir,
        root.path().join("index"),
        Arc::new(HashEmbedding::new(64)),
    )
    .unwrap();
    kb.sync().await.unwrap();
    let answerer = Arc::new(RetrievalAnswerer::new(Arc::new(kb), docs_model.clone(), 3));

    let model = Arc::new(ScriptedModel::default());
    let registry = Arc::new(default_registry(store.clone(), answerer, docs_model));
    let agent = OrchestrationLoop::new(model.clone(), registry.clone());

    Harness {
        store,
        model,
        registry,
        agent,
        _root: root,
    }
}

fn call(id: &str, name: &str, arguments: serde_json::Value) -> ModelReply {
    ModelReply::calls(vec![ToolCall {
        id: id.into(),
        name: name.into(),
        arguments,
    }])
}

/// Tool results the model saw in its last request, oldest first.
fn tool_results(requests: &[Vec<ChatMessage>]) -> Vec<String> {
    requests
        .last()
        .map(|msgs| {
            msgs.iter()
                .filter(|m| m.role == ChatRole::Tool)
                .map(|m| m.content.clone())
                .collect()
        })
        .unwrap_or_default()
}

fn declining() -> TurnContext {
    TurnContext::new(Arc::new(PresetConfirmer::new(false)))
}

#[tokio::test]
async fn test_who_is_alice_answered_from_team_directory() {
    let h = harness(&[], Arc::new(ScriptedModel::default())).await;
    h.model
        .push(call("1", "query_database_tool", json!({"question": "who is alice"})));
    h.model
        .push(ModelReply::text("Alice is our head of customer success."));

    let outcome = h.agent.run_turn(&[], "who is alice", &declining()).await.unwrap();

    assert_eq!(outcome.answer, "Alice is our head of customer success.");
    assert_eq!(outcome.tools_used, vec!["query_database_tool"]);
    assert_eq!(
        tool_results(&h.model.requests()),
        vec!["Alice: Head of customer success, handles escalations"]
    );
}

#[tokio::test]
async fn test_resolved_ticket_answer_wins_over_directory() {
    let h = harness(&[], Arc::new(ScriptedModel::default())).await;
    let ticket = h.store.create_ticket("sam", "who is alice").unwrap();
    h.store
        .respond_to_ticket(
            &ticket.ticket_id,
            "Alice moved to the Berlin office.",
            TicketStatus::Closed,
        )
        .unwrap();

    h.model
        .push(call("1", "query_database_tool", json!({"question": "who is alice"})));
    h.model.push(ModelReply::text("She moved to Berlin."));

    h.agent.run_turn(&[], "who is alice", &declining()).await.unwrap();

    assert_eq!(
        tool_results(&h.model.requests()),
        vec!["Alice moved to the Berlin office."]
    );
}

#[tokio::test]
async fn test_unanswerable_question_with_declined_ticket() {
    let h = harness(&[], Arc::new(ScriptedModel::default())).await;
    let question = "Can you integrate with my mainframe?";
    h.model
        .push(call("1", "query_database_tool", json!({"question": "mainframe integration"})));
    h.model
        .push(call("2", "query_rag_tool", json!({"question": question})));
    h.model
        .push(call("3", "create_support_ticket_tool", json!({"user_question": question})));
    h.model.push(ModelReply::text(
        "Understood, no ticket was created. Let me know if you change your mind.",
    ));

    let outcome = h.agent.run_turn(&[], question, &declining()).await.unwrap();

    assert_eq!(outcome.iterations, 4);
    assert_eq!(
        tool_results(&h.model.requests()),
        vec![
            NO_INFO_FOUND.to_string(),
            NO_DOCUMENT_MATCH.to_string(),
            "Okay, no ticket was created.".to_string(),
        ]
    );
    assert!(h.store.list_tickets(None, 10).unwrap().is_empty());
    assert_eq!(outcome.history.last(), Some(&Message::assistant(outcome.answer.clone())));
}

#[tokio::test]
async fn test_confirmed_ticket_then_status_check() {
    let h = harness(&[], Arc::new(ScriptedModel::default())).await;
    let confirmer = Arc::new(ScriptedConfirmer::new(["yes"]));
    let ctx = TurnContext::new(confirmer.clone()).with_user_name(Some("Priya".into()));

    h.model.push(call(
        "1",
        "create_support_ticket_tool",
        json!({"user_question": "Do you support SAML?"}),
    ));
    h.model.push(ModelReply::text("I've opened a ticket for you."));
    let first = h.agent.run_turn(&[], "Do you support SAML?", &ctx).await.unwrap();

    let tickets = h.store.list_tickets(Some(TicketStatus::Open), 10).unwrap();
    assert_eq!(tickets.len(), 1);
    assert_eq!(tickets[0].user_name, "Priya");
    let id = tickets[0].ticket_id.clone();
    assert_eq!(confirmer.prompts().len(), 1);

    h.model
        .push(call("2", "check_ticket_status_tool", json!({"ticket_id": id})));
    h.model.push(ModelReply::text("Your ticket is still open."));
    let second = h
        .agent
        .run_turn(&first.history, &format!("status of {id}?"), &ctx)
        .await
        .unwrap();

    assert_eq!(second.history.len(), 4);
    assert_eq!(
        tool_results(&h.model.requests()),
        vec![format!(
            "Ticket {id} (open)\nIssue: Do you support SAML?\nResponse: Pending from support."
        )]
    );
}

#[tokio::test]
async fn test_unknown_ticket_status() {
    let h = harness(&[], Arc::new(ScriptedModel::default())).await;
    h.model
        .push(call("1", "check_ticket_status_tool", json!({"ticket_id": "TKT-00000000"})));
    h.model.push(ModelReply::text("I couldn't find that ticket."));

    h.agent
        .run_turn(&[], "status of TKT-00000000", &declining())
        .await
        .unwrap();

    assert_eq!(
        tool_results(&h.model.requests()),
        vec!["Ticket TKT-00000000 not found."]
    );
}

#[tokio::test]
async fn test_documentation_answer() {
    let docs_model = Arc::new(ScriptedModel::new(vec![ModelReply::text(
        "Refunds are available within 30 days of purchase.",
    )]));
    let h = harness(
        &[("policy.txt", "Refund policy: refunds are available within 30 days of purchase.")],
        docs_model,
    )
    .await;
    h.model
        .push(call("1", "query_rag_tool", json!({"question": "refund policy"})));
    h.model.push(ModelReply::text("You can get a refund within 30 days."));

    let outcome = h.agent.run_turn(&[], "refund policy?", &declining()).await.unwrap();

    assert_eq!(outcome.answer, "You can get a refund within 30 days.");
    assert_eq!(
        tool_results(&h.model.requests()),
        vec!["Refunds are available within 30 days of purchase."]
    );
}

#[tokio::test]
async fn test_iteration_cap_ends_the_turn() {
    let h = harness(&[], Arc::new(ScriptedModel::default())).await;
    let agent = OrchestrationLoop::new(h.model.clone(), Arc::new(CapabilityRegistry::new()))
        .with_max_iterations(2);
    for i in 0..5 {
        h.model
            .push(call(&i.to_string(), "query_database_tool", json!({"question": "x"})));
    }

    let err = agent.run_turn(&[], "x", &declining()).await.unwrap_err();

    assert!(matches!(err, AgentError::IterationLimit(2)));
    assert_eq!(h.model.call_count(), 2);
}

#[tokio::test]
async fn test_session_window_bounds_what_the_model_sees() {
    let h = harness(&[], Arc::new(ScriptedModel::default())).await;
    let config = AgentConfig {
        history_window: 2,
        ..AgentConfig::default()
    };
    let agent = SupportAgent::new(
        OrchestrationLoop::from_config(h.model.clone(), h.registry.clone(), &config),
        &config,
    );
    let mut session = agent.new_session();

    h.model
        .push(call("1", "query_database_tool", json!({"question": "who is alice"})));
    h.model.push(ModelReply::text("Alice heads customer success."));
    agent
        .respond(&mut session, "who is alice", &declining())
        .await
        .unwrap();

    h.model.push(ModelReply::text("We are open 9am to 5pm."));
    agent
        .respond(&mut session, "what are your opening hours?", &declining())
        .await
        .unwrap();

    h.model.push(ModelReply::text("You're welcome."));
    agent
        .respond(&mut session, "great, that helps a lot", &declining())
        .await
        .unwrap();

    // system + the last exchange only + the new message
    let last = h.model.requests().last().cloned().unwrap();
    assert_eq!(last.len(), 4);
    assert_eq!(last[1].content, "what are your opening hours?");
    assert_eq!(last[2].content, "We are open 9am to 5pm.");
    assert_eq!(last[3].content, "great, that helps a lot");

    assert_eq!(session.len(), 6);
    assert_eq!(session.messages()[0], Message::user("who is alice"));
    assert_eq!(session.window().len(), 2);
}
