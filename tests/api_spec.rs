use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum_test::TestServer;
use johari::api::create_router;
use johari::identity::Identity;
use johari::manager::{SelectionPolicy, SessionManager};
use johari::models::*;
use johari::store::MemoryStore;
use tokio_stream::StreamExt;
use tower::ServiceExt;

fn exercise_vocabulary() -> Vocabulary {
    Vocabulary::from_terms(["Bold", "Calm", "Kind", "Shy"].map(String::from))
}

fn setup() -> TestServer {
    setup_with(exercise_vocabulary(), SelectionPolicy::uncapped())
}

fn setup_with(vocabulary: Vocabulary, policy: SelectionPolicy) -> TestServer {
    let manager = SessionManager::new(Arc::new(MemoryStore::new()), vocabulary, policy);
    let app = create_router(manager);
    TestServer::new(app).expect("Failed to create test server")
}

async fn create_test_session(server: &TestServer, token: &str) -> Session {
    server
        .post("/api/v1/sessions")
        .add_header("Authorization", format!("Bearer {token}"))
        .json(&CreateSessionInput {
            display_name: "Ada".to_string(),
        })
        .await
        .json::<Session>()
}

mod health {
    use super::*;

    #[tokio::test]
    async fn reports_ok() {
        let server = setup();
        let response = server.get("/api/v1/health").await;
        response.assert_status_ok();
    }
}

mod vocabulary {
    use super::*;

    #[tokio::test]
    async fn lists_every_descriptor_in_order() {
        let server = setup();

        let response = server.get("/api/v1/vocabulary").await;
        response.assert_status_ok();

        let terms: Vec<String> = response.json();
        assert_eq!(terms, ["Bold", "Calm", "Kind", "Shy"]);
    }

    #[tokio::test]
    async fn serves_the_standard_list_by_default() {
        let server = setup_with(Vocabulary::standard(), SelectionPolicy::uncapped());

        let terms: Vec<String> = server.get("/api/v1/vocabulary").await.json();
        assert_eq!(terms.len(), 56);
        assert!(terms.contains(&"Trustworthy".to_string()));
    }
}

mod sessions {
    use super::*;

    #[tokio::test]
    async fn creating_a_session_returns_201_with_the_new_session() {
        let server = setup();

        let response = server
            .post("/api/v1/sessions")
            .add_header("Authorization", "Bearer alice")
            .json(&CreateSessionInput {
                display_name: "Ada".to_string(),
            })
            .await;

        response.assert_status(StatusCode::CREATED);
        let session: Session = response.json();
        assert_eq!(session.display_name, "Ada");
        assert_eq!(session.state(), SessionState::Created);
        assert!(session.self_selections.is_empty());
    }

    #[tokio::test]
    async fn sessions_can_be_fetched_by_anyone() {
        let server = setup();
        let session = create_test_session(&server, "alice").await;

        // No Authorization header at all.
        let response = server
            .get(&format!("/api/v1/sessions/{}", session.id))
            .await;

        response.assert_status_ok();
        let fetched: Session = response.json();
        assert_eq!(fetched.id, session.id);
    }

    #[tokio::test]
    async fn unknown_sessions_are_404() {
        let server = setup();
        let response = server.get("/api/v1/sessions/does-not-exist").await;
        response.assert_status_not_found();
    }

    #[tokio::test]
    async fn the_creator_can_submit_a_self_assessment() {
        let server = setup();
        let session = create_test_session(&server, "alice").await;

        let response = server
            .put(&format!("/api/v1/sessions/{}/self", session.id))
            .add_header("Authorization", "Bearer alice")
            .json(&SubmitSelectionsInput {
                selections: vec!["Bold".to_string(), "Kind".to_string()],
            })
            .await;

        response.assert_status_ok();
        let updated: Session = response.json();
        assert_eq!(updated.self_selections, ["Bold", "Kind"]);
        assert_eq!(updated.state(), SessionState::SelfAssessed);
    }

    #[tokio::test]
    async fn only_the_creator_may_self_assess() {
        let server = setup();
        let session = create_test_session(&server, "alice").await;

        let response = server
            .put(&format!("/api/v1/sessions/{}/self", session.id))
            .add_header("Authorization", "Bearer mallory")
            .json(&SubmitSelectionsInput {
                selections: vec!["Bold".to_string()],
            })
            .await;

        response.assert_status(StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn anonymous_callers_do_not_retain_ownership() {
        let server = setup();

        // Create without a token: the creator identity is minted for that
        // one request only.
        let session = server
            .post("/api/v1/sessions")
            .json(&CreateSessionInput {
                display_name: "Ada".to_string(),
            })
            .await
            .json::<Session>();

        let response = server
            .put(&format!("/api/v1/sessions/{}/self", session.id))
            .json(&SubmitSelectionsInput {
                selections: vec!["Bold".to_string()],
            })
            .await;

        response.assert_status(StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn unknown_descriptors_are_rejected_with_a_message() {
        let server = setup();
        let session = create_test_session(&server, "alice").await;

        let response = server
            .put(&format!("/api/v1/sessions/{}/self", session.id))
            .add_header("Authorization", "Bearer alice")
            .json(&SubmitSelectionsInput {
                selections: vec!["Zesty".to_string()],
            })
            .await;

        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        assert!(response.text().contains("not in the vocabulary"));
    }

    #[tokio::test]
    async fn oversized_selections_are_rejected_when_capped() {
        let server = setup_with(exercise_vocabulary(), SelectionPolicy::capped(2));
        let session = create_test_session(&server, "alice").await;

        let response = server
            .put(&format!("/api/v1/sessions/{}/self", session.id))
            .add_header("Authorization", "Bearer alice")
            .json(&SubmitSelectionsInput {
                selections: vec![
                    "Bold".to_string(),
                    "Calm".to_string(),
                    "Kind".to_string(),
                ],
            })
            .await;

        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        assert!(response.text().contains("at most 2"));
    }

    #[tokio::test]
    async fn the_creator_may_rename_the_session() {
        let server = setup();
        let session = create_test_session(&server, "alice").await;

        let response = server
            .put(&format!("/api/v1/sessions/{}/display-name", session.id))
            .add_header("Authorization", "Bearer alice")
            .json(&RenameSessionInput {
                display_name: "Grace".to_string(),
            })
            .await;

        response.assert_status_ok();
        let renamed: Session = response.json();
        assert_eq!(renamed.display_name, "Grace");
    }

    #[tokio::test]
    async fn renaming_is_creator_only() {
        let server = setup();
        let session = create_test_session(&server, "alice").await;

        let response = server
            .put(&format!("/api/v1/sessions/{}/display-name", session.id))
            .add_header("Authorization", "Bearer mallory")
            .json(&RenameSessionInput {
                display_name: "Mallory's now".to_string(),
            })
            .await;

        response.assert_status(StatusCode::FORBIDDEN);
    }
}

mod feedback {
    use super::*;

    #[tokio::test]
    async fn submitting_records_the_callers_perception() {
        let server = setup();
        let session = create_test_session(&server, "alice").await;

        let response = server
            .put(&format!("/api/v1/sessions/{}/feedback", session.id))
            .add_header("Authorization", "Bearer bob")
            .json(&SubmitSelectionsInput {
                selections: vec!["Kind".to_string(), "Shy".to_string()],
            })
            .await;

        response.assert_status_ok();
        let record: FeedbackRecord = response.json();
        assert_eq!(record.session_id, session.id);
        assert_eq!(record.selections, ["Kind", "Shy"]);
    }

    #[tokio::test]
    async fn resubmission_replaces_rather_than_duplicates() {
        let server = setup();
        let session = create_test_session(&server, "alice").await;

        for selections in [vec!["Bold".to_string()], vec!["Shy".to_string()]] {
            server
                .put(&format!("/api/v1/sessions/{}/feedback", session.id))
                .add_header("Authorization", "Bearer bob")
                .json(&SubmitSelectionsInput { selections })
                .await
                .assert_status_ok();
        }

        let records: Vec<FeedbackRecord> = server
            .get(&format!("/api/v1/sessions/{}/feedback", session.id))
            .await
            .json();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].selections, ["Shy"]);
    }

    #[tokio::test]
    async fn each_submitter_is_listed_separately() {
        let server = setup();
        let session = create_test_session(&server, "alice").await;

        for token in ["bob", "carol"] {
            server
                .put(&format!("/api/v1/sessions/{}/feedback", session.id))
                .add_header("Authorization", format!("Bearer {token}"))
                .json(&SubmitSelectionsInput {
                    selections: vec!["Kind".to_string()],
                })
                .await
                .assert_status_ok();
        }

        let records: Vec<FeedbackRecord> = server
            .get(&format!("/api/v1/sessions/{}/feedback", session.id))
            .await
            .json();
        assert_eq!(records.len(), 2);
        assert_ne!(records[0].submitter_id, records[1].submitter_id);
    }

    #[tokio::test]
    async fn feedback_for_a_missing_session_is_404() {
        let server = setup();

        let response = server
            .put("/api/v1/sessions/does-not-exist/feedback")
            .add_header("Authorization", "Bearer bob")
            .json(&SubmitSelectionsInput {
                selections: vec!["Kind".to_string()],
            })
            .await;

        response.assert_status_not_found();
    }
}

mod windows {
    use super::*;

    #[tokio::test]
    async fn the_window_partitions_the_vocabulary() {
        let server = setup();
        let session = create_test_session(&server, "alice").await;

        server
            .put(&format!("/api/v1/sessions/{}/self", session.id))
            .add_header("Authorization", "Bearer alice")
            .json(&SubmitSelectionsInput {
                selections: vec!["Bold".to_string(), "Kind".to_string()],
            })
            .await
            .assert_status_ok();
        server
            .put(&format!("/api/v1/sessions/{}/feedback", session.id))
            .add_header("Authorization", "Bearer bob")
            .json(&SubmitSelectionsInput {
                selections: vec!["Kind".to_string(), "Shy".to_string()],
            })
            .await
            .assert_status_ok();

        let response = server
            .get(&format!("/api/v1/sessions/{}/window", session.id))
            .await;

        response.assert_status_ok();
        let window: WindowSnapshot = response.json();
        assert_eq!(window.state, SessionState::SelfAssessed);
        assert_eq!(window.partition.arena, ["Kind"]);
        assert_eq!(window.partition.blind_spot, ["Shy"]);
        assert_eq!(window.partition.facade, ["Bold"]);
        assert_eq!(window.partition.unknown, ["Calm"]);
        assert_eq!(window.feedback.len(), 1);
    }

    #[tokio::test]
    async fn fresh_sessions_are_entirely_unknown() {
        let server = setup();
        let session = create_test_session(&server, "alice").await;

        let window: WindowSnapshot = server
            .get(&format!("/api/v1/sessions/{}/window", session.id))
            .await
            .json();

        assert_eq!(window.state, SessionState::Created);
        assert_eq!(window.partition.unknown, ["Bold", "Calm", "Kind", "Shy"]);
    }

    #[tokio::test]
    async fn event_streams_open_with_the_current_window() {
        let manager = SessionManager::new(
            Arc::new(MemoryStore::new()),
            exercise_vocabulary(),
            SelectionPolicy::uncapped(),
        );
        let session = manager
            .create_session(
                Identity::from("alice"),
                CreateSessionInput {
                    display_name: "Ada".to_string(),
                },
            )
            .expect("Failed to create session");
        manager
            .submit_self_assessment(
                &session.id,
                SubmitSelectionsInput {
                    selections: vec!["Bold".to_string()],
                },
            )
            .expect("Failed to submit");
        let app = create_router(manager);

        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/api/v1/sessions/{}/events", session.id))
                    .body(Body::empty())
                    .expect("Failed to build request"),
            )
            .await
            .expect("Failed to route request");

        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        assert!(
            content_type.starts_with("text/event-stream"),
            "unexpected content type {content_type:?}"
        );

        let mut body = response.into_body().into_data_stream();
        let frame = tokio::time::timeout(Duration::from_secs(1), body.next())
            .await
            .expect("No event arrived")
            .expect("Stream ended before the first event")
            .expect("Stream errored");
        let frame = String::from_utf8(frame.to_vec()).expect("Event was not UTF-8");

        assert!(
            frame.starts_with("event: window"),
            "first frame was {frame:?}"
        );
        let data = frame
            .lines()
            .find_map(|line| line.strip_prefix("data: "))
            .expect("Event carried no data line");
        let window: WindowSnapshot = serde_json::from_str(data).expect("Failed to parse window");
        assert_eq!(window.session.id, session.id);
        assert_eq!(window.state, SessionState::SelfAssessed);
        assert_eq!(window.partition.facade, ["Bold"]);
    }

    #[tokio::test]
    async fn event_streams_for_missing_sessions_are_404() {
        let server = setup();
        let response = server.get("/api/v1/sessions/does-not-exist/events").await;
        response.assert_status_not_found();
    }
}
