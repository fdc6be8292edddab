mod common;

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use common::*;
use konspekt_core::{
    ClientConfig, KnowledgeLevel, KonspektError, Phase, PhaseOutcome, SessionError, StudyClient,
    Transition, find_cached_notes, get_notes_path, save_notes, session::CONNECTION_ERROR_MESSAGE,
};
use serde_json::json;
use tempfile::TempDir;
use tokio::sync::mpsc;

fn client(scripts: Vec<Script>) -> (StudyClient<ScriptedConnector>, Arc<Mutex<Log>>) {
    let connector = ScriptedConnector::new(scripts);
    let log = connector.log();
    let config = ClientConfig::default().with_phase_timeout(Duration::from_millis(200));
    (StudyClient::with_connector(config, connector), log)
}

#[tokio::test]
async fn phase_one_end_to_end() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let (client, log) = client(vec![phase_one_script()]);
    let mut client = client.with_updates(tx);

    let outcome = client.submit_url(URL, KnowledgeLevel::Beginner).await.unwrap();
    assert_eq!(outcome, PhaseOutcome::Completed(Phase::KeyConcepts));

    let session = client.session();
    let concepts = &session.key_concepts.as_ref().unwrap().key_concepts;
    assert_eq!(concepts.len(), 1);
    assert_eq!(concepts[0].term, "X");
    assert_eq!(session.loading_phase, None);
    assert_eq!(session.active_phase, Phase::KeyConcepts);
    assert!(!client.is_connected());

    let log = log.lock().unwrap();
    assert_eq!(log.urls, vec!["ws://localhost:8000/ws/phase1".to_string()]);
    assert_eq!(
        log.sent,
        vec![json!({"video_url": URL, "knowledge_level": "beginner"})]
    );
    assert_eq!(log.closed, 1);

    let mut updates = Vec::new();
    while let Ok(t) = rx.try_recv() {
        updates.push(t);
    }
    assert!(matches!(updates.first(), Some(Transition::Progress { .. })));
    assert_eq!(updates.last(), Some(&Transition::Completed(Phase::KeyConcepts)));
}

#[tokio::test]
async fn all_five_phases_in_order() {
    let (mut client, log) = client(vec![
        phase_one_script(),
        result_script(json!({
            "main_thesis": "Money is a social technology",
            "argument_chains": [{"title": "Trust", "premise": "p", "reasoning_steps": ["a", "b"], "conclusion": "c"}],
            "claims": [{"claim": "Gold is scarce", "claim_type": "fact"}]
        })),
        result_script(json!({
            "connections": [{"concept_a": "X", "concept_b": "Trust", "relationship": "r", "significance": "s"}],
            "synthesis": "all together"
        })),
        result_script(json!({
            "verified_claims": [{"claim": "Gold is scarce", "claim_type": "fact", "verdict": "supported", "reasoning": "geology"}]
        })),
        result_script(json!({
            "questions": [
                {"question": "q1", "options": ["a", "b"], "correct_answer": 1, "explanation": "e", "difficulty": "easy"},
                {"question": "q2", "options": ["a", "b"], "correct_answer": 0, "explanation": "e", "difficulty": "medium"}
            ],
            "quiz_focus": "basics"
        })),
    ]);

    assert!(client.submit_url(URL, KnowledgeLevel::Intermediate).await.unwrap().is_completed());
    for phase in [
        Phase::ThesisArguments,
        Phase::Connections,
        Phase::ClaimVerification,
        Phase::Quiz,
    ] {
        let outcome = client.run_phase(phase).await.unwrap();
        assert_eq!(outcome, PhaseOutcome::Completed(phase));
        assert_eq!(client.session().active_phase, phase);
        assert_eq!(client.session().expanded_section, Some(phase));
    }

    let log = log.lock().unwrap();
    assert_eq!(log.urls.len(), 5);
    assert!(log.urls[4].ends_with("/ws/phase5"));
    assert_eq!(log.sent[1], json!({"video_id": "XYZ"}));
    assert_eq!(log.sent[2]["key_concepts"][0]["term"], "X");
    assert_eq!(log.sent[3]["thesis"], "Money is a social technology");
    assert_eq!(log.sent[3]["claims"][0]["claim"], "Gold is scarce");
    assert_eq!(log.sent[4]["connections"][0]["concept_b"], "Trust");
    assert_eq!(log.closed, 5);
    drop(log);

    assert!(client.answer_question(0, 1));
    assert!(client.answer_question(1, 1));
    assert_eq!(client.submit_quiz(), Ok(50));
    assert!(!client.answer_question(1, 0));
    assert_eq!(client.submit_quiz(), Ok(50));
    client.retake_quiz();
    assert!(client.answer_question(1, 0));
    assert!(client.answer_question(0, 1));
    assert_eq!(client.submit_quiz(), Ok(100));
    assert_eq!(client.session().notes().quiz_score, Some(100));
}

#[tokio::test]
async fn gated_phases_never_connect() {
    let (mut client, log) = client(vec![]);
    for phase in [
        Phase::ThesisArguments,
        Phase::Connections,
        Phase::ClaimVerification,
        Phase::Quiz,
    ] {
        let err = client.run_phase(phase).await.unwrap_err();
        assert!(matches!(
            err,
            KonspektError::Session(SessionError::MissingPrerequisite { .. })
        ));
    }
    let err = client
        .submit_url("https://example.com/not-a-video", KnowledgeLevel::Beginner)
        .await
        .unwrap_err();
    assert!(matches!(err, KonspektError::Session(SessionError::InvalidUrl { .. })));
    assert!(log.lock().unwrap().urls.is_empty());
}

#[tokio::test]
async fn phase_four_needs_thesis_even_with_concepts() {
    let (mut client, log) = client(vec![phase_one_script()]);
    client.submit_url(URL, KnowledgeLevel::Beginner).await.unwrap();
    let err = client.run_phase(Phase::ClaimVerification).await.unwrap_err();
    assert!(matches!(
        err,
        KonspektError::Session(SessionError::MissingPrerequisite {
            phase: Phase::ClaimVerification,
            requires: Phase::ThesisArguments
        })
    ));
    assert_eq!(log.lock().unwrap().urls.len(), 1);
}

#[tokio::test]
async fn refused_connection_is_a_generic_connection_error() {
    let (mut client, _log) = client(vec![Script::Refuse]);
    let outcome = client.submit_url(URL, KnowledgeLevel::Beginner).await.unwrap();
    assert_eq!(
        outcome,
        PhaseOutcome::Failed {
            phase: Phase::KeyConcepts,
            message: CONNECTION_ERROR_MESSAGE.into()
        }
    );
    assert_eq!(client.session().loading_phase, None);
}

#[tokio::test]
async fn broken_stream_fails_the_phase() {
    let (mut client, log) = client(vec![Script::Steps(vec![
        frame(json!({"type": "started"})),
        Step::Break,
    ])]);
    let outcome = client.submit_url(URL, KnowledgeLevel::Beginner).await.unwrap();
    assert!(matches!(outcome, PhaseOutcome::Failed { .. }));
    assert!(client.session().key_concepts.is_none());
    assert_eq!(log.lock().unwrap().closed, 1);
}

#[tokio::test]
async fn server_error_is_surfaced_and_blocks_downstream() {
    let (mut client, _log) = client(vec![Script::Steps(vec![
        frame(json!({"type": "started"})),
        frame(json!({"type": "error", "message": "Failed to fetch transcript: disabled"})),
        frame(json!({"type": "completed", "output": concepts_output()})),
    ])]);
    let outcome = client.submit_url(URL, KnowledgeLevel::Beginner).await.unwrap();
    assert_eq!(
        outcome,
        PhaseOutcome::Failed {
            phase: Phase::KeyConcepts,
            message: "Phase 1: Failed to fetch transcript: disabled".into()
        }
    );
    assert!(client.session().key_concepts.is_none());
    assert!(client.run_phase(Phase::ThesisArguments).await.is_err());
}

#[tokio::test]
async fn close_without_result_is_logged_not_an_error() {
    let (mut client, _log) = client(vec![Script::Steps(vec![
        frame(json!({"type": "started"})),
        frame(json!({"type": "completed", "output": null})),
        Step::Close,
    ])]);
    let outcome = client.submit_url(URL, KnowledgeLevel::Beginner).await.unwrap();
    assert_eq!(outcome, PhaseOutcome::Closed(Phase::KeyConcepts));
    let session = client.session();
    assert_eq!(session.loading_phase, None);
    assert!(session.error.is_none());
    assert!(session.key_concepts.is_none());
    assert_eq!(session.progress.last().unwrap().text, "Connection closed");
}

#[tokio::test]
async fn silent_backend_times_out() {
    let (mut client, log) = client(vec![Script::Steps(vec![
        frame(json!({"type": "started"})),
        Step::Hang,
    ])]);
    let outcome = client.submit_url(URL, KnowledgeLevel::Beginner).await.unwrap();
    assert!(matches!(outcome, PhaseOutcome::Failed { ref message, .. } if message.contains("timed out")));
    assert_eq!(client.session().loading_phase, None);
    assert_eq!(log.lock().unwrap().closed, 1);
}

#[tokio::test]
async fn cancel_handle_interrupts_a_running_phase() {
    let (mut client, log) = client(vec![Script::Steps(vec![
        frame(json!({"type": "started"})),
        Step::Hang,
    ])]);
    let handle = client.cancel_handle();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        handle.cancel();
    });

    let outcome = client.submit_url(URL, KnowledgeLevel::Beginner).await.unwrap();
    assert_eq!(outcome, PhaseOutcome::Cancelled(Phase::KeyConcepts));
    assert_eq!(client.session().loading_phase, None);
    assert_eq!(client.session().progress.last().unwrap().text, "Cancelled");
    assert_eq!(log.lock().unwrap().closed, 1);

    // idempotent once nothing is loading
    assert_eq!(client.cancel().await, Transition::Ignored);
}

#[tokio::test]
async fn interrupted_run_is_torn_down_before_the_next_phase() {
    let (mut client, log) = client(vec![
        Script::Steps(vec![frame(json!({"type": "started"})), Step::Hang]),
        phase_one_script(),
    ]);

    // drop the first run mid-flight, leaving its socket open
    let first = tokio::time::timeout(
        Duration::from_millis(20),
        client.submit_url(URL, KnowledgeLevel::Beginner),
    )
    .await;
    assert!(first.is_err());
    assert!(client.is_connected());
    assert_eq!(log.lock().unwrap().closed, 0);

    let outcome = client.submit_url(URL, KnowledgeLevel::Beginner).await.unwrap();
    assert!(outcome.is_completed());
    assert_eq!(log.lock().unwrap().closed, 2);
    assert!(!client.is_connected());
}

#[tokio::test]
async fn unknown_and_malformed_frames_are_skipped() {
    let (mut client, _log) = client(vec![Script::Steps(vec![
        frame(json!({"type": "something_unrecognized", "output": concepts_output()})),
        Step::Frame("this is not json".into()),
        frame(json!({"type": "workflow_output", "event": concepts_output()})),
    ])]);
    let outcome = client.submit_url(URL, KnowledgeLevel::Beginner).await.unwrap();
    assert!(outcome.is_completed());
    assert_eq!(client.session().progress.len(), 2);
}

#[tokio::test]
async fn cached_notes_skip_finished_phases() {
    let dir = TempDir::new().unwrap();

    let (mut first, _log) = client(vec![phase_one_script()]);
    first.submit_url(URL, KnowledgeLevel::Beginner).await.unwrap();
    let notes = first.session().notes();
    let path = get_notes_path(dir.path(), "XYZ", KnowledgeLevel::Beginner);
    save_notes(&notes, &path).await.unwrap();

    assert!(
        find_cached_notes(dir.path(), URL, KnowledgeLevel::Advanced)
            .await
            .unwrap()
            .is_none()
    );
    let cached = find_cached_notes(dir.path(), URL, KnowledgeLevel::Beginner)
        .await
        .unwrap()
        .expect("notes were saved for this video and level");
    assert_eq!(cached, notes);

    let (mut client, log) = client(vec![result_script(json!({"main_thesis": "T"}))]);
    client.resume(cached).await.unwrap();
    assert!(client.session().has_result(Phase::KeyConcepts));

    let outcome = client.run_phase(Phase::ThesisArguments).await.unwrap();
    assert_eq!(outcome, PhaseOutcome::Completed(Phase::ThesisArguments));

    let log = log.lock().unwrap();
    assert_eq!(log.urls, vec!["ws://localhost:8000/ws/phase2".to_string()]);
    assert_eq!(log.sent, vec![json!({"video_id": "XYZ"})]);
}
