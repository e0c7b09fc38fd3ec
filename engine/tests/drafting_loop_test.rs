//! Integration tests for the drafting control loop
//!
//! Drives full proposal runs over a scripted model provider and an
//! in-memory document source, checking section ordering, retry and
//! forced-accept behavior, and the events published along the way.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;

use quill_engine::bus::{Event, EventType, GradeDisposition, MessageBus};
use quill_engine::drafting::{
    DraftingEngine, LoopState, ProposalContext, ResearchRetriever, ResearchSettings, SectionSpec,
    SectionWriter,
};
use quill_engine::llm::{Completion, LLMProvider, Message, ModelRouter};
use quill_engine::retrieval::{Document, DocumentFilter, StaticSource};

type Script = Arc<Mutex<VecDeque<String>>>;

/// Provider that replays a fixed reply sequence across all roles
struct ScriptedProvider {
    replies: Script,
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn is_local(&self) -> bool {
        true
    }

    async fn generate(&self, _messages: &[Message]) -> quill_engine::llm::Result<Completion> {
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .expect("script ran out of replies");
        Ok(Completion::new(reply))
    }
}

fn proposal_context() -> ProposalContext {
    ProposalContext {
        project_idea: "Mobile health clinics for the county".to_string(),
        funding_requirements: "Rural health foundation, max $250k".to_string(),
        proposal_structure: "Standard grant proposal".to_string(),
        user_name: "Dana".to_string(),
        client_name: "Prairie Health Network".to_string(),
        about_client: "A rural health nonprofit".to_string(),
    }
}

/// Build an engine whose every model call pops the next scripted reply
async fn scripted_engine(
    specs: Vec<SectionSpec>,
    source: StaticSource,
    script: &[&str],
    max_search_depth: u32,
) -> (DraftingEngine, Script, mpsc::Receiver<Event>) {
    let replies: Script = Arc::new(Mutex::new(
        script.iter().map(|s| s.to_string()).collect(),
    ));
    let provider: Arc<dyn LLMProvider> = Arc::new(ScriptedProvider {
        replies: Arc::clone(&replies),
    });
    let router = Arc::new(ModelRouter::new(
        vec![Arc::clone(&provider)],
        vec![Arc::clone(&provider)],
        vec![provider],
    ));

    let ctx = proposal_context();
    let retriever = ResearchRetriever::new(
        Arc::clone(&router),
        Arc::new(source),
        DocumentFilter::Client("prairie-health".to_string()),
        ctx.clone(),
        ResearchSettings {
            number_of_queries: 3,
            max_vector_results: 5,
            max_attempts: 2,
        },
    );
    let writer = SectionWriter::new(router, ctx);

    let bus = MessageBus::new();
    let events = bus.subscribe(EventType::All).await;
    let engine = DraftingEngine::new(specs, retriever, writer, bus, max_search_depth);
    (engine, replies, events)
}

fn drain(events: &mut mpsc::Receiver<Event>) -> Vec<Event> {
    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    seen
}

fn graded(events: &[Event]) -> Vec<(String, GradeDisposition)> {
    events
        .iter()
        .filter_map(|event| match event {
            Event::SectionGraded {
                section,
                disposition,
            } => Some((section.clone(), *disposition)),
            _ => None,
        })
        .collect()
}

fn assert_script_drained(replies: &Script) {
    let left = replies.lock().unwrap();
    assert!(left.is_empty(), "unused scripted replies: {:?}", *left);
}

#[tokio::test]
async fn test_sections_pass_through_research_write_grade_and_assemble() {
    let specs = vec![
        SectionSpec::new("Executive Summary", "Summarize the whole ask", false),
        SectionSpec::new("Statement of Need", "Show the coverage gap", true),
        SectionSpec::new("Project Description", "Describe the clinic program", true),
    ];
    let source = StaticSource::new(vec![
        Document::new(
            "need-1",
            Some("County health survey".to_string()),
            "county uninsured rates are twice the state average",
        ),
        Document::new(
            "desc-1",
            None,
            "mobile clinic program design and staffing plan",
        ),
        Document::new("misc-1", None, "annual gala fundraising totals"),
    ]);

    // Each draft passes on the first grade; the summary section is written
    // at finalization from the assembled body.
    let script = [
        r#"["uninsured rates"]"#,
        r#"{"binary_score": "yes"}"#,
        r#"{"binary_score": "no"}"#,
        r#"{"binary_score": "no"}"#,
        "Need draft",
        r#"{"grade": "pass", "follow_up_queries": []}"#,
        r#"["program design"]"#,
        r#"{"binary_score": "yes"}"#,
        r#"{"binary_score": "no"}"#,
        r#"{"binary_score": "no"}"#,
        "Description draft",
        r#"{"grade": "pass", "follow_up_queries": []}"#,
        "# Executive Summary\n\nThe ask in brief.",
    ];
    let (engine, replies, mut events) = scripted_engine(specs, source, &script, 2).await;

    let summary = engine.run().await.unwrap();

    assert_eq!(summary.sections, 3);
    assert_eq!(
        summary.proposal,
        "\n\nNeed draft\n\nDescription draft\n\n# Executive Summary\n\nThe ask in brief."
    );
    assert!(summary.forced_sections.is_empty());
    assert!(summary.exhausted_sections.is_empty());
    assert!(summary.started_at <= summary.finished_at);
    assert_script_drained(&replies);

    let seen = drain(&mut events);
    assert_eq!(
        graded(&seen),
        vec![
            ("Statement of Need".to_string(), GradeDisposition::Pass),
            ("Project Description".to_string(), GradeDisposition::Pass),
        ]
    );
    assert!(matches!(
        seen.last(),
        Some(Event::ProposalFinalized { sections: 3, .. })
    ));
}

#[tokio::test]
async fn test_failed_grades_retry_then_accept_the_last_draft_at_budget() {
    let specs = vec![SectionSpec::new(
        "Statement of Need",
        "Show the coverage gap",
        true,
    )];
    let source = StaticSource::new(vec![Document::new(
        "need-1",
        None,
        "county uninsured rates are twice the state average",
    )]);

    // Two drafts fail review. With a retry budget of 2 the second failure
    // exhausts the budget, so the second draft is committed as-is and no
    // third draft is ever written.
    let script = [
        r#"["uninsured rates"]"#,
        r#"{"binary_score": "yes"}"#,
        "first draft",
        r#"{"grade": "fail", "follow_up_queries": ["per capita uninsured"]}"#,
        r#"{"binary_score": "yes"}"#,
        "second draft",
        r#"{"grade": "fail", "follow_up_queries": ["county demographics"]}"#,
    ];
    let (engine, replies, mut events) = scripted_engine(specs, source, &script, 2).await;

    let summary = engine.run().await.unwrap();

    assert_eq!(summary.proposal, "\n\nsecond draft");
    assert_eq!(summary.forced_sections, vec!["Statement of Need".to_string()]);
    assert_script_drained(&replies);

    // One graded event per draft: a fail for the retried first draft,
    // then the forced accept of the second.
    let seen = drain(&mut events);
    assert_eq!(
        graded(&seen),
        vec![
            ("Statement of Need".to_string(), GradeDisposition::Fail),
            ("Statement of Need".to_string(), GradeDisposition::Forced),
        ]
    );
}

#[tokio::test]
async fn test_empty_retrieval_still_drafts_the_section() {
    let specs = vec![SectionSpec::new(
        "Statement of Need",
        "Show the coverage gap",
        true,
    )];

    // No documents exist, so research exhausts both attempts and the
    // writer drafts from an empty source text.
    let script = [
        r#"["uninsured rates"]"#,
        "thin draft",
        r#"{"grade": "pass", "follow_up_queries": []}"#,
    ];
    let (engine, replies, mut events) =
        scripted_engine(specs, StaticSource::empty(), &script, 2).await;

    let summary = engine.run().await.unwrap();

    assert_eq!(summary.proposal, "\n\nthin draft");
    assert_eq!(
        summary.exhausted_sections,
        vec!["Statement of Need".to_string()]
    );
    assert_script_drained(&replies);

    let seen = drain(&mut events);
    assert!(seen.iter().any(|event| matches!(
        event,
        Event::ResearchExhausted {
            attempts: 2,
            ..
        }
    )));
}

#[tokio::test]
async fn test_non_research_sections_are_written_last_without_research() {
    let specs = vec![
        SectionSpec::new("Executive Summary", "Summarize", false),
        SectionSpec::new("Statement of Need", "Show the gap", true),
        SectionSpec::new("Conclusion", "Close it out", false),
    ];
    let source = StaticSource::new(vec![Document::new(
        "need-1",
        None,
        "community need evidence",
    )]);

    let script = [
        r#"["community need"]"#,
        r#"{"binary_score": "yes"}"#,
        "need body",
        r#"{"grade": "pass", "follow_up_queries": []}"#,
        "summary body",
        "conclusion body",
    ];
    let (engine, replies, mut events) = scripted_engine(specs, source, &script, 2).await;

    let summary = engine.run().await.unwrap();

    // Research sections first, then the synthesized ones in plan order.
    assert_eq!(
        summary.proposal,
        "\n\nneed body\n\nsummary body\n\nconclusion body"
    );
    assert_eq!(summary.sections, 3);
    assert_script_drained(&replies);

    // Only the research section was ever claimed.
    let seen = drain(&mut events);
    let started: Vec<_> = seen
        .iter()
        .filter(|event| matches!(event, Event::SectionStarted { .. }))
        .collect();
    assert_eq!(started.len(), 1);
}

#[tokio::test]
async fn test_zero_retry_budget_accepts_the_first_draft() {
    let specs = vec![SectionSpec::new(
        "Statement of Need",
        "Show the coverage gap",
        true,
    )];

    // With max_search_depth 0 a failing grade cannot trigger a retry;
    // the first draft is committed as forced.
    let script = [
        r#"["uninsured rates"]"#,
        "only draft",
        r#"{"grade": "fail", "follow_up_queries": ["more data"]}"#,
    ];
    let (engine, replies, mut events) =
        scripted_engine(specs, StaticSource::empty(), &script, 0).await;

    let summary = engine.run().await.unwrap();

    assert_eq!(summary.proposal, "\n\nonly draft");
    assert_eq!(summary.forced_sections, vec!["Statement of Need".to_string()]);
    assert_script_drained(&replies);

    let seen = drain(&mut events);
    assert_eq!(
        graded(&seen),
        vec![("Statement of Need".to_string(), GradeDisposition::Forced)]
    );
}

#[tokio::test]
async fn test_loop_states_advance_in_order() {
    let specs = vec![SectionSpec::new(
        "Statement of Need",
        "Show the coverage gap",
        true,
    )];
    let source = StaticSource::new(vec![Document::new(
        "need-1",
        None,
        "county uninsured rates",
    )]);

    let script = [
        r#"["uninsured rates"]"#,
        r#"{"binary_score": "yes"}"#,
        "need body",
        r#"{"grade": "pass", "follow_up_queries": []}"#,
    ];
    let (mut engine, replies, _events) = scripted_engine(specs, source, &script, 2).await;

    assert_eq!(engine.state(), LoopState::AwaitingClaim);

    assert_eq!(engine.step().await.unwrap(), LoopState::Researching);
    let actives = engine
        .registry()
        .records()
        .iter()
        .filter(|record| record.is_active)
        .count();
    assert_eq!(actives, 1);

    assert_eq!(engine.step().await.unwrap(), LoopState::Writing);
    assert_eq!(engine.step().await.unwrap(), LoopState::Grading);

    // The pass commits the only section, which finalizes the run.
    assert_eq!(engine.step().await.unwrap(), LoopState::Finalized);
    assert!(!engine.registry().records()[0].is_active);
    assert!(engine.registry().records()[0].is_written);
    assert_script_drained(&replies);
}

#[tokio::test]
async fn test_retry_researches_with_follow_up_queries_only() {
    let specs = vec![SectionSpec::new(
        "Budget Narrative",
        "Justify the budget",
        true,
    )];
    // The corpus matches the follow-up query, not the original one, so
    // the retry round can only succeed if the follow-ups replaced the
    // original queries.
    let source = StaticSource::new(vec![Document::new(
        "cost-1",
        None,
        "equipment cost breakdown",
    )]);

    let script = [
        r#"["staff salaries"]"#,
        r#"{"binary_score": "no"}"#,
        r#"{"binary_score": "no"}"#,
        "vague budget draft",
        r#"{"grade": "fail", "follow_up_queries": ["equipment cost"]}"#,
        r#"{"binary_score": "yes"}"#,
        "precise budget draft",
        r#"{"grade": "pass", "follow_up_queries": []}"#,
    ];
    let (engine, replies, mut events) = scripted_engine(specs, source, &script, 3).await;

    let summary = engine.run().await.unwrap();

    assert_eq!(summary.proposal, "\n\nprecise budget draft");
    assert!(summary.forced_sections.is_empty());
    assert_script_drained(&replies);

    let seen = drain(&mut events);
    assert_eq!(
        graded(&seen),
        vec![
            ("Budget Narrative".to_string(), GradeDisposition::Fail),
            ("Budget Narrative".to_string(), GradeDisposition::Pass),
        ]
    );
}
