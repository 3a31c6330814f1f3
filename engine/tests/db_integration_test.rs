/// Integration tests for run history
///
/// Runs a scripted pipeline, stores the result set and reads it back the
/// way `scribe history` and `scribe replay` do.
use std::sync::Arc;

use scribe_engine::conductor::{default_pipeline, Orchestrator, RunState};
use scribe_engine::config::Config;
use scribe_engine::db::Database;
use scribe_engine::llm::scripted::{ScriptedProvider, ScriptedReply};
use scribe_engine::report::{render_summary, ReportSection};
use serde_json::json;
use tempfile::TempDir;

#[tokio::test]
async fn test_database_lifecycle() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("scribe.db");

    let db = Database::new(&db_path).await.unwrap();
    assert!(db_path.exists());

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM runs")
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(count, 0);

    let indexes: Vec<String> = sqlx::query_scalar(
        "SELECT name FROM sqlite_master WHERE type='index' AND name LIKE 'idx_%' ORDER BY name",
    )
    .fetch_all(db.pool())
    .await
    .unwrap();
    assert_eq!(indexes, vec!["idx_run_steps_run_id", "idx_runs_created_at"]);

    db.close().await.unwrap();
}

#[tokio::test]
async fn test_store_and_replay_run() {
    let temp_dir = TempDir::new().unwrap();
    let db = Database::new(&temp_dir.path().join("scribe.db"))
        .await
        .unwrap();

    let mut config = Config::default();
    config.pipeline.steps = vec!["insights".into(), "notes".into()];
    config.pipeline.max_iterations = 1;

    let script = ScriptedProvider::new(vec![
        ScriptedReply::text(r#"{"action_type": "COMPLETE", "result": ["Budget approved"]}"#),
        ScriptedReply::text("not json"),
    ]);
    let orchestrator =
        Orchestrator::new(default_pipeline(&config, Arc::new(script)).unwrap()).unwrap();

    let repo = db.runs();
    let results = orchestrator.run("Kai: budget approved").await;
    repo.save_result_set("run-42", "Kai: budget approved", &results, 15)
        .await
        .unwrap();

    let run = repo.get_run("run-42").await.unwrap().unwrap();
    assert_eq!(run.state, RunState::CompletedWithDegradation.as_str());
    assert!(run.partial_failure);
    assert_eq!(run.transcript_excerpt, "Kai: budget approved");

    let steps = repo.get_run_steps("run-42").await.unwrap();
    assert_eq!(steps.len(), 2);
    assert_eq!(steps[0].step, "insights");
    assert_eq!(steps[0].payload, json!(["Budget approved"]));
    assert!(!steps[1].success);
    assert_eq!(steps[1].payload["error"], json!(true));

    let history = repo.get_recent_runs(10).await.unwrap();
    assert_eq!(history.len(), 1);

    let markdown =
        render_summary("Replay", run.partial_failure, &ReportSection::from_stored(&steps)).unwrap();
    assert!(markdown.contains("- Budget approved"));
    assert!(markdown.contains("> **Degraded:**"));

    db.close().await.unwrap();
}
