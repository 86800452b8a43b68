use super::*;
use crate::{export::PersistenceClient, player::TICK_STEP};
use anyhow::anyhow;
use async_trait::async_trait;
use axum::{routing::post, Json, Router};
use shared::{
    domain::RatingDimension,
    protocol::{SaveDataRequest, SAVE_DATA_ROUTE},
};
use storage::MemorySessionStore;
use tokio::net::TcpListener;

/// Store whose every call fails.
struct FailingStore;

#[async_trait]
impl SessionStore for FailingStore {
    async fn append(&self, _record: &SessionRecord) -> anyhow::Result<()> {
        Err(anyhow!("disk unavailable"))
    }

    async fn list_all(&self) -> anyhow::Result<Vec<SessionRecord>> {
        Err(anyhow!("disk unavailable"))
    }

    async fn clear(&self) -> anyhow::Result<u64> {
        Err(anyhow!("disk unavailable"))
    }
}

fn awareness() -> AwarenessForm {
    AwarenessForm {
        influence_question: "not really".into(),
        awareness_text: String::new(),
        noticed_condition: "no".into(),
    }
}

fn drive_to_awareness(session: &mut ExperimentSession) {
    session.give_consent(true).expect("consent");
    session
        .submit_demographics(&DemographicsForm {
            participant_id: "p-55".into(),
            age: "40".into(),
            gender: "female".into(),
            ai_familiarity: "little".into(),
        })
        .expect("demographics");
    let generation = session.start_playback().expect("start").generation;
    session.record_notes("operant vs classical").expect("notes");
    while !session
        .tick_playback(generation, TICK_STEP)
        .expect("tick")
        .complete
    {}
    session.continue_to_rating().expect("continue");
    let ratings: RatingsForm = RatingDimension::ALL
        .iter()
        .zip(["6", "5", "7", "4"])
        .map(|(dimension, value)| (dimension.as_str(), value))
        .collect();
    session.submit_ratings(&ratings).expect("ratings");
}

#[tokio::test]
async fn finishing_appends_to_store_and_builds_debrief() {
    let store = Arc::new(MemorySessionStore::new());
    let mut session =
        ExperimentSession::new(ConditionAssigner::seeded(11), store.clone(), ExportSink::new());
    drive_to_awareness(&mut session);

    let completed = session.finish(&awareness()).await.expect("finish");
    assert_eq!(session.screen(), Screen::Debrief);
    assert_eq!(completed.debrief.average, 5.5);
    assert!(completed.persistence.is_none());
    assert!(completed.record.is_complete());
    assert_eq!(completed.record.notes, "operant vs classical");

    let stored = store.list_all().await.expect("list");
    assert_eq!(stored, vec![completed.record]);
}

#[tokio::test]
async fn store_failure_does_not_block_debrief() {
    let mut session = ExperimentSession::new(
        ConditionAssigner::seeded(11),
        Arc::new(FailingStore),
        ExportSink::new(),
    );
    drive_to_awareness(&mut session);

    let completed = session.finish(&awareness()).await.expect("finish");
    assert_eq!(session.screen(), Screen::Debrief);
    assert_eq!(completed.record.participant_id, "p-55");
}

#[tokio::test]
async fn invalid_awareness_keeps_participant_on_screen() {
    let store = Arc::new(MemorySessionStore::new());
    let mut session =
        ExperimentSession::new(ConditionAssigner::seeded(3), store.clone(), ExportSink::new());
    drive_to_awareness(&mut session);

    let err = session
        .finish(&AwarenessForm::default())
        .await
        .err()
        .expect("missing fields");
    assert!(matches!(err, SessionError::Flow(ref flow) if flow.is_validation()));
    assert_eq!(session.screen(), Screen::Awareness);
    assert!(store.list_all().await.expect("list").is_empty());
}

#[tokio::test]
async fn unreachable_persistence_service_does_not_block_debrief() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let sink = ExportSink::new()
        .with_persistence(PersistenceClient::new(&format!("http://{addr}")).expect("client"));
    let mut session =
        ExperimentSession::new(ConditionAssigner::seeded(5), Arc::new(MemorySessionStore::new()), sink);
    drive_to_awareness(&mut session);

    let completed = session.finish(&awareness()).await.expect("finish");
    assert_eq!(session.screen(), Screen::Debrief);
    let outcome = completed
        .persistence
        .expect("transmission attempted")
        .await
        .expect("join");
    assert!(outcome.is_none());
}

#[tokio::test]
async fn persistence_receives_condition_ratings_and_notes() {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<SaveDataRequest>();
    let app = Router::new().route(
        SAVE_DATA_ROUTE,
        post(move |Json(body): Json<SaveDataRequest>| {
            let tx = tx.clone();
            async move {
                let filename = format!("participant_x_{}.json", body.condition);
                let _ = tx.send(body);
                Json(SaveDataResponse {
                    success: true,
                    filename,
                })
            }
        }),
    );
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });

    let sink = ExportSink::new()
        .with_persistence(PersistenceClient::new(&format!("http://{addr}")).expect("client"));
    let mut session =
        ExperimentSession::new(ConditionAssigner::seeded(8), Arc::new(MemorySessionStore::new()), sink);
    let condition = session.flow().condition();
    drive_to_awareness(&mut session);

    let completed = session.finish(&awareness()).await.expect("finish");
    let response = completed
        .persistence
        .expect("configured")
        .await
        .expect("join")
        .expect("saved");
    assert!(response.success);

    let payload = rx.recv().await.expect("payload");
    assert_eq!(payload.condition, condition);
    assert_eq!(payload.notes, "operant vs classical");
    assert_eq!(payload.ratings, completed.record.ratings);
}

#[tokio::test]
async fn artifact_can_be_downloaded_repeatedly_after_debrief() {
    let dir = tempfile::tempdir().expect("tempdir");
    let sink = ExportSink::new().with_artifact_dir(dir.path());
    let mut session =
        ExperimentSession::new(ConditionAssigner::seeded(2), Arc::new(MemorySessionStore::new()), sink);
    drive_to_awareness(&mut session);
    let completed = session.finish(&awareness()).await.expect("finish");

    let first = session
        .download_artifact()
        .await
        .expect("download")
        .expect("path");
    let parsed: SessionRecord =
        serde_json::from_str(&std::fs::read_to_string(&first).expect("read")).expect("parse");
    assert_eq!(parsed, completed.record);

    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let second = session
        .download_artifact()
        .await
        .expect("download")
        .expect("path");
    assert!(second.exists());
}

#[tokio::test]
async fn restart_after_debrief_starts_a_clean_session() {
    let store = Arc::new(MemorySessionStore::new());
    let mut session =
        ExperimentSession::new(ConditionAssigner::seeded(9), store.clone(), ExportSink::new());
    drive_to_awareness(&mut session);
    session.finish(&awareness()).await.expect("finish");

    session.restart();
    assert_eq!(session.screen(), Screen::Consent);
    assert!(session.flow().record().ratings.is_empty());
    assert_eq!(store.list_all().await.expect("list").len(), 1);
}

#[tokio::test]
async fn artifact_is_unavailable_before_debrief() {
    let dir = tempfile::tempdir().expect("tempdir");
    let sink = ExportSink::new().with_artifact_dir(dir.path());
    let mut session =
        ExperimentSession::new(ConditionAssigner::seeded(4), Arc::new(MemorySessionStore::new()), sink);

    let err = session.download_artifact().await.expect_err("consent screen");
    assert!(matches!(
        err,
        SessionError::Flow(FlowError::WrongScreen {
            expected: Screen::Debrief,
            actual: Screen::Consent,
        })
    ));

    drive_to_awareness(&mut session);
    assert!(session.download_artifact().await.is_err());

    session.finish(&awareness()).await.expect("finish");
    session.restart();
    assert!(session.download_artifact().await.is_err());
    assert!(std::fs::read_dir(dir.path()).expect("dir").next().is_none());
}
