//! End-to-end workflow scenarios driven through `Orchestrator::route`

mod common;

use common::{plan_reply, TestContext, SALES_CSV};
use serde_json::Value;
use std::sync::Arc;
use tabflow::data::Table;
use tabflow::llm::ScriptedModel;
use tabflow::orchestrator::{CLEANING_RESULT, CURRENT_FILE, FINAL_REPORT, INSIGHTS};
use tabflow::session::SessionManager;
use tabflow::workflow::WorkflowStage;

const CLEAN_CODE: &str = "drop_duplicates()\ndrop_nulls()";

fn context() -> TestContext {
    TestContext::new().with_dataset("sales.csv", SALES_CSV)
}

#[tokio::test]
async fn test_ingesting_a_file_from_idle() {
    let ctx = context();
    let model = Arc::new(ScriptedModel::with_responses([
        "## Data Profile for 'sales.csv'\n### 1. Domain Context\nRegional sales.",
    ]));
    let mut orchestrator = ctx.orchestrator(model).await;

    let reply = orchestrator.route("sales.csv").await;

    assert!(reply.contains("Regional sales."));
    assert_eq!(orchestrator.stage(), WorkflowStage::Ingesting);
    assert_eq!(
        orchestrator.manager().context_value(CURRENT_FILE),
        Some(&Value::String("sales.csv".to_string()))
    );
    let log = orchestrator.manager().messages();
    assert_eq!(log.len(), 1);
    assert!(log[0].content.starts_with("Data Profile: ## Data Profile"));
}

#[tokio::test]
async fn test_clean_please_runs_refinery_on_resolved_path() {
    let ctx = context();
    let model = Arc::new(ScriptedModel::with_responses([
        "profile".to_string(),
        format!("Sure!\n```json\n{}\n```", plan_reply(CLEAN_CODE)),
    ]));
    let mut orchestrator = ctx.orchestrator(model.clone()).await;
    orchestrator.route("sales.csv").await;

    let reply = orchestrator.route("clean please").await;

    let cleaned = ctx.data_path("cleaned_sales.csv");
    assert!(reply.starts_with("Refinery finished. Saved to: "));
    assert!(reply.contains("cleaned_sales.csv"));
    assert_eq!(orchestrator.stage(), WorkflowStage::Cleaning);
    assert_eq!(
        orchestrator.manager().context_value(CLEANING_RESULT),
        Some(&Value::String(cleaned.display().to_string()))
    );

    let table = Table::read_path(&cleaned).unwrap();
    assert_eq!(table.num_rows(), 2);
    let prompts = model.prompts().await;
    assert!(prompts[1].contains("Nulls: {\"amount\":1,\"region\":0,\"units\":0}"));
}

#[tokio::test]
async fn test_cleaning_failure_keeps_ingesting() {
    let ctx = context();
    let model = Arc::new(ScriptedModel::with_responses([
        "profile".to_string(),
        plan_reply("cast(\"region\", \"int\")"),
    ]));
    let mut orchestrator = ctx.orchestrator(model).await;
    orchestrator.route("sales.csv").await;
    let before = orchestrator.manager().session().snapshot();

    let reply = orchestrator.route("clean please").await;

    assert!(reply.starts_with("Refinery failed: "));
    assert!(reply.contains("Error"));
    assert_eq!(orchestrator.stage(), WorkflowStage::Ingesting);
    assert_eq!(orchestrator.manager().session().snapshot(), before);
    assert!(!ctx.data_path("cleaned_sales.csv").exists());
}

#[tokio::test]
async fn test_analysis_failure_keeps_cleaning() {
    let ctx = context();
    // No narrative queued, so the analysis model call fails
    let model = Arc::new(ScriptedModel::with_responses([
        "profile".to_string(),
        plan_reply(CLEAN_CODE),
    ]));
    let mut orchestrator = ctx.orchestrator(model).await;
    orchestrator.route("sales.csv").await;
    orchestrator.route("clean").await;
    let before = orchestrator.manager().session().snapshot();

    let reply = orchestrator.route("analyze").await;

    assert!(reply.contains("Error"), "{}", reply);
    assert_eq!(orchestrator.stage(), WorkflowStage::Cleaning);
    assert_eq!(orchestrator.manager().session().snapshot(), before);
    assert!(orchestrator.refs().insights.is_none());
}

#[tokio::test]
async fn test_report_failure_keeps_analyzing() {
    let ctx = context();
    let model = Arc::new(ScriptedModel::with_responses([
        "profile".to_string(),
        plan_reply(CLEAN_CODE),
        "narrative".to_string(),
    ]));
    let mut orchestrator = ctx.orchestrator(model).await;
    for input in ["sales.csv", "clean", "analyze"] {
        orchestrator.route(input).await;
    }
    let before = orchestrator.manager().session().snapshot();

    let reply = orchestrator.route("report").await;

    assert!(reply.contains("Error"), "{}", reply);
    assert_eq!(orchestrator.stage(), WorkflowStage::Analyzing);
    assert_eq!(orchestrator.manager().session().snapshot(), before);
    assert!(orchestrator.manager().context_value(FINAL_REPORT).is_none());
}

#[tokio::test]
async fn test_question_in_cleaning_uses_fallback() {
    let ctx = context();
    let model = Arc::new(ScriptedModel::with_responses([
        "profile".to_string(),
        plan_reply(CLEAN_CODE),
        "```\nprint(\"Nulls left:\", count_null(\"amount\"))\n```".to_string(),
    ]));
    let mut orchestrator = ctx.orchestrator(model.clone()).await;
    orchestrator.route("sales.csv").await;
    orchestrator.route("clean").await;

    let reply = orchestrator.route("why do 12 rows have nulls").await;

    assert_eq!(
        reply,
        "💡 **Q&A Insight:**\nNulls left: 0\n\nData cleaned. Ready to analyze?"
    );
    assert_eq!(orchestrator.stage(), WorkflowStage::Cleaning);
    assert!(model.prompts().await[2].contains("QUESTION: why do 12 rows have nulls"));
}

#[tokio::test]
async fn test_full_workflow_records_artifacts_in_order() {
    let ctx = context();
    let model = Arc::new(ScriptedModel::with_responses([
        "profile".to_string(),
        plan_reply(CLEAN_CODE),
        "North and east only.".to_string(),
        "# Executive Summary\nTwo regions remain.".to_string(),
    ]));
    let mut orchestrator = ctx.orchestrator(model.clone()).await;

    let mut stages = vec![orchestrator.stage()];
    for input in ["sales.csv", "yes", "yes", "yes"] {
        orchestrator.route(input).await;
        stages.push(orchestrator.stage());
    }
    assert_eq!(
        stages,
        vec![
            WorkflowStage::Idle,
            WorkflowStage::Ingesting,
            WorkflowStage::Cleaning,
            WorkflowStage::Analyzing,
            WorkflowStage::Reporting,
        ]
    );

    let manager = orchestrator.manager();
    assert_eq!(manager.messages().len(), 4);
    assert_eq!(
        manager.context_value(INSIGHTS).unwrap()["findings"]["Deep_Dive"],
        "North and east only."
    );
    assert_eq!(
        manager.context_value(FINAL_REPORT),
        Some(&Value::String("# Executive Summary\nTwo regions remain.".into()))
    );
    // The report prompt sees the analysis findings
    assert!(model.prompts().await[3].contains("North and east only."));
}

#[tokio::test]
async fn test_stage_never_skips_on_arbitrary_input() {
    let ctx = context();
    let model = Arc::new(ScriptedModel::new());
    let mut orchestrator = ctx.orchestrator(model).await;

    for input in [
        "report", "analyze", "clean", "reset", "yes", "REPORT now", "start", "nonsense",
    ] {
        let before = orchestrator.stage();
        orchestrator.route(input).await;
        assert!(before.can_transition_to(orchestrator.stage()));
        assert_eq!(orchestrator.stage(), WorkflowStage::Idle);
    }
}

#[tokio::test]
async fn test_reset_clears_references() {
    let ctx = context();
    let model = Arc::new(ScriptedModel::with_responses([
        "profile".to_string(),
        plan_reply(CLEAN_CODE),
        "narrative".to_string(),
        "report".to_string(),
    ]));
    let mut orchestrator = ctx.orchestrator(model).await;
    for input in ["sales.csv", "clean", "analyze", "report"] {
        orchestrator.route(input).await;
    }

    assert_eq!(orchestrator.route("please reset").await, "System reset.");
    assert_eq!(orchestrator.stage(), WorkflowStage::Idle);
    assert!(orchestrator.manager().context().is_empty());
    assert!(orchestrator.refs().current_file.is_none());
    assert!(orchestrator.refs().cleaning_result.is_none());
    assert!(orchestrator.refs().insights.is_none());

    // A second reset in IDLE only restates the prompt
    assert_eq!(orchestrator.route("reset").await, "Type 'start' to begin.");
}

#[tokio::test]
async fn test_resumed_session_continues_without_rerunning_stages() {
    let ctx = context();
    let first_model = Arc::new(ScriptedModel::with_responses([
        "profile".to_string(),
        plan_reply(CLEAN_CODE),
    ]));
    let mut first = ctx.orchestrator(first_model).await;
    first.route("sales.csv").await;
    first.route("clean").await;
    first.manager().save_state().await.unwrap();
    let id = first.manager().id().clone();

    let mut manager = SessionManager::new(ctx.store()).await.unwrap();
    manager.load_state(Some(&id)).await.unwrap();
    let model = Arc::new(ScriptedModel::with_responses(["resumed narrative"]));
    let mut resumed = ctx.orchestrator_for(manager, model.clone());

    assert_eq!(resumed.stage(), WorkflowStage::Cleaning);
    assert_eq!(resumed.refs().current_file.as_deref(), Some("sales.csv"));

    let reply = resumed.route("analyze").await;
    assert_eq!(reply, "Analyst Squad finished.\n\nProceed to report?");
    assert_eq!(model.prompts().await.len(), 1);
}
