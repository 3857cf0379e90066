mod common;

use axum::http::StatusCode;
use common::{parse_body, Part, TestApp};
use eventsphere_backend::config::SubArrayPolicy;
use serde_json::json;
use std::collections::HashSet;

const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 1, 2, 3];

fn fest_parts<'a>() -> Vec<Part<'a>> {
    vec![
        Part::Text("Title", "Fest"),
        Part::Text("Category", "Music"),
        Part::Text("Description", "Summer music festival"),
        Part::Text("EventType", "Venue"),
        Part::Text("Location", "Central Park"),
        Part::Text("EventStart", "2025-06-01T10:00"),
        Part::Text("EventEnd", "2025-06-01T18:00"),
    ]
}

#[tokio::test]
async fn test_fest_scenario_forces_organizer_from_token() {
    let app = TestApp::new().await;
    let (user_id, token) = app.verified_user("Olivia Organizer", "olivia@example.com").await;

    let mut parts = fest_parts();
    parts.push(Part::Text("OrganizerId", "999"));
    parts.push(Part::File("CoverImage", "cover.PNG", PNG));

    let res = app.send_form("/api/events", Some(&token), &parts).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body = parse_body(res).await;

    let event_id = body["eventId"].as_i64().unwrap();
    assert!(event_id > 0);
    let cover_url = body["coverImageUrl"].as_str().unwrap().to_string();
    assert!(cover_url.starts_with("/uploads/covers/"));
    assert!(cover_url.ends_with(".png"));
    assert!(body["vibeVideoUrl"].is_null());
    assert_eq!(body["mediaUrls"], json!([]));

    let res = app.send_json("GET", &format!("/api/events/{}", event_id), None, None).await;
    assert_eq!(res.status(), StatusCode::OK);
    let event = parse_body(res).await["data"].clone();
    assert_eq!(event["eventId"], event_id);
    assert_eq!(event["organizerId"], user_id);
    assert_eq!(event["title"], "Fest");
    assert_eq!(event["category"], "Music");
    assert_eq!(event["eventType"], "Venue");
    assert_eq!(event["recurrenceType"], "Once");
    assert_eq!(event["status"], "Draft");
    assert_eq!(event["coverImage"], cover_url.as_str());
    assert_eq!(event["registrationDeadline"], event["eventStart"]);

    // Stored on disk and served back under /uploads
    let name = cover_url.rsplit('/').next().unwrap();
    assert!(app.uploads.path().join("covers").join(name).exists());
    let res = app.send_json("GET", &cover_url, None, None).await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_children_are_stamped_with_new_event_id() {
    let app = TestApp::new().await;
    let (_, token) = app.verified_user("Olivia Organizer", "olivia@example.com").await;

    let speakers = json!([
        {"SpeakerId": 500, "EventId": 42, "Name": "Ada", "Bio": "Mathematician"},
        {"speakerId": 501, "name": "Grace", "bio": "Admiral"}
    ]).to_string();
    let faqs = json!([{"FaqId": 77, "Question": "Parking?", "Answer": "Yes"}]).to_string();
    let occurrences = json!([
        {"StartTime": "2025-06-01T10:00", "EndTime": "2025-06-01T12:00"},
        {"startTime": "2025-06-08T10:00:00Z", "endTime": "2025-06-08T12:00:00Z", "eventTitle": "Week two"}
    ]).to_string();

    let mut parts = fest_parts();
    parts.push(Part::Text("Speakers", &speakers));
    parts.push(Part::Text("Faqs", &faqs));
    parts.push(Part::Text("Occurrences", &occurrences));

    let res = app.send_form("/api/events", Some(&token), &parts).await;
    assert_eq!(res.status(), StatusCode::OK);
    let event_id = parse_body(res).await["eventId"].as_i64().unwrap();

    let aggregate = parse_body(app.send_json("GET", &format!("/api/events/{}", event_id), None, None).await).await["data"].clone();

    let speakers = aggregate["speakers"].as_array().unwrap();
    assert_eq!(speakers.len(), 2);
    assert_eq!(speakers[0]["name"], "Ada");
    for speaker in speakers {
        assert_eq!(speaker["eventId"], event_id);
        assert_ne!(speaker["speakerId"], 500);
        assert_ne!(speaker["speakerId"], 501);
    }

    let faqs = aggregate["faqs"].as_array().unwrap();
    assert_eq!(faqs.len(), 1);
    assert_eq!(faqs[0]["eventId"], event_id);
    assert_ne!(faqs[0]["faqId"], 77);

    let occurrences = aggregate["occurrences"].as_array().unwrap();
    assert_eq!(occurrences.len(), 2);
    assert_eq!(occurrences[0]["eventTitle"], "Fest");
    assert_eq!(occurrences[1]["eventTitle"], "Week two");
    assert!(occurrences.iter().all(|o| o["eventId"] == event_id));
}

#[tokio::test]
async fn test_media_and_speaker_uploads_resolve_to_folders() {
    let app = TestApp::new().await;
    let (_, token) = app.verified_user("Olivia Organizer", "olivia@example.com").await;

    let media = json!([
        {"MediaType": "Video", "Description": "Teaser"},
        {"mediaUrl": "https://cdn.example.com/poster.png", "mediaType": "Image"}
    ]).to_string();
    let speakers = json!([{"Name": "Ada", "Bio": "Mathematician"}]).to_string();

    let mut parts = fest_parts();
    parts.push(Part::Text("Media", &media));
    parts.push(Part::Text("Speakers", &speakers));
    parts.push(Part::File("Media[0].MediaFile", "teaser.mp4", b"fake-video"));
    parts.push(Part::File("Speakers[0].Image", "ada.jpg", PNG));
    parts.push(Part::File("VibeVideo", "vibe.mp4", b"vibe"));
    parts.push(Part::File("media", "inline-1.png", PNG));
    parts.push(Part::File("media", "inline-2.png", PNG));

    let res = app.send_form("/api/events", Some(&token), &parts).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body = parse_body(res).await;
    assert!(body["coverImageUrl"].is_null());
    assert!(body["vibeVideoUrl"].as_str().unwrap().starts_with("/uploads/videos/"));

    let inline: Vec<&str> = body["mediaUrls"].as_array().unwrap().iter().map(|v| v.as_str().unwrap()).collect();
    assert_eq!(inline.len(), 2);
    assert!(inline.iter().all(|u| u.starts_with("/uploads/inline-media/")));
    assert_eq!(inline.iter().collect::<HashSet<_>>().len(), 2);

    let event_id = body["eventId"].as_i64().unwrap();
    let aggregate = parse_body(app.send_json("GET", &format!("/api/events/{}", event_id), None, None).await).await["data"].clone();
    let media = aggregate["media"].as_array().unwrap();
    assert!(media[0]["mediaUrl"].as_str().unwrap().starts_with("/uploads/media-videos/"));
    assert_eq!(media[0]["mediaType"], "Video");
    assert_eq!(media[0]["isActive"], true);
    assert_eq!(media[1]["mediaUrl"], "https://cdn.example.com/poster.png");
    assert!(aggregate["speakers"][0]["photoUrl"].as_str().unwrap().starts_with("/uploads/speaker-photos/"));
}

#[tokio::test]
async fn test_malformed_faqs_rejected_when_strict() {
    let app = TestApp::new().await;
    let (_, token) = app.verified_user("Olivia Organizer", "olivia@example.com").await;

    let mut parts = fest_parts();
    parts.push(Part::Text("Faqs", "[{\"Question\": \"broken\""));
    parts.push(Part::File("CoverImage", "cover.png", PNG));

    let res = app.send_form("/api/events", Some(&token), &parts).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = parse_body(res).await;
    assert_eq!(body["success"], false);
    assert!(body["message"].as_str().unwrap().contains("Faqs"));

    // Nothing persisted, nothing written
    let list = parse_body(app.send_json("GET", "/api/events", None, None).await).await;
    assert_eq!(list["data"], json!([]));
    assert!(!app.uploads.path().join("covers").exists());
}

#[tokio::test]
async fn test_malformed_faqs_dropped_when_lenient() {
    let app = TestApp::with_policy(SubArrayPolicy::Lenient).await;
    let (_, token) = app.verified_user("Olivia Organizer", "olivia@example.com").await;

    let mut parts = fest_parts();
    parts.push(Part::Text("Faqs", "not json at all"));

    let res = app.send_form("/api/events", Some(&token), &parts).await;
    assert_eq!(res.status(), StatusCode::OK);
    let event_id = parse_body(res).await["eventId"].as_i64().unwrap();

    let aggregate = parse_body(app.send_json("GET", &format!("/api/events/{}", event_id), None, None).await).await["data"].clone();
    assert_eq!(aggregate["faqs"], json!([]));
}

#[tokio::test]
async fn test_create_requires_bearer_token() {
    let app = TestApp::new().await;

    let res = app.send_form("/api/events", None, &fest_parts()).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = app.send_form("/api/events", Some("not-a-jwt"), &fest_parts()).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(parse_body(res).await["success"], false);
}

#[tokio::test]
async fn test_end_before_start_rejected() {
    let app = TestApp::new().await;
    let (_, token) = app.verified_user("Olivia Organizer", "olivia@example.com").await;

    let parts = vec![
        Part::Text("Title", "Backwards"),
        Part::Text("EventStart", "2025-06-01T18:00"),
        Part::Text("EventEnd", "2025-06-01T10:00"),
    ];
    let res = app.send_form("/api/events", Some(&token), &parts).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let occurrences = json!([{"StartTime": "2025-06-02T12:00", "EndTime": "2025-06-02T11:00"}]).to_string();
    let mut parts = fest_parts();
    parts.push(Part::Text("Occurrences", &occurrences));
    let res = app.send_form("/api/events", Some(&token), &parts).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert!(parse_body(res).await["message"].as_str().unwrap().contains("Occurrence 0"));
}

#[tokio::test]
async fn test_delete_cascades_and_missing_is_not_found() {
    let app = TestApp::new().await;
    let (_, token) = app.verified_user("Olivia Organizer", "olivia@example.com").await;

    let res = app.send_json("DELETE", "/api/events/4242", Some(&token), None).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let speakers = json!([{"Name": "Ada"}]).to_string();
    let faqs = json!([{"Question": "Q", "Answer": "A"}]).to_string();
    let occurrences = json!([{"StartTime": "2025-06-01T10:00", "EndTime": "2025-06-01T11:00"}]).to_string();
    let mut parts = fest_parts();
    parts.push(Part::Text("Speakers", &speakers));
    parts.push(Part::Text("Faqs", &faqs));
    parts.push(Part::Text("Occurrences", &occurrences));
    let event_id = parse_body(app.send_form("/api/events", Some(&token), &parts).await).await["eventId"].as_i64().unwrap();
    assert_eq!(app.count_rows("event_speakers", event_id).await, 1);

    let res = app.send_json("DELETE", &format!("/api/events/{}", event_id), Some(&token), None).await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = app.send_json("GET", &format!("/api/events/{}", event_id), None, None).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    for table in ["event_speakers", "event_faqs", "event_media", "event_occurrences"] {
        assert_eq!(app.count_rows(table, event_id).await, 0, "{} not cascaded", table);
    }
}

#[tokio::test]
async fn test_update_authorization_and_occurrence_replacement() {
    let app = TestApp::new().await;
    let (_, owner_token) = app.verified_user("Olivia Organizer", "olivia@example.com").await;
    let (_, stranger_token) = app.verified_user("Sam Stranger", "sam@example.com").await;

    let speakers = json!([{"Name": "Ada"}]).to_string();
    let occurrences = json!([
        {"StartTime": "2025-06-01T10:00", "EndTime": "2025-06-01T11:00"},
        {"StartTime": "2025-06-02T10:00", "EndTime": "2025-06-02T11:00"}
    ]).to_string();
    let mut parts = fest_parts();
    parts.push(Part::Text("Speakers", &speakers));
    parts.push(Part::Text("Occurrences", &occurrences));
    let event_id = parse_body(app.send_form("/api/events", Some(&owner_token), &parts).await).await["eventId"].as_i64().unwrap();
    let uri = format!("/api/events/{}", event_id);

    let res = app.send_json("PUT", &uri, Some(&stranger_token), Some(json!({"title": "Mine now"}))).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let res = app.send_json("DELETE", &uri, Some(&stranger_token), None).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = app.send_json("PUT", &uri, None, Some(json!({"title": "Anonymous"}))).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = app.send_json("PUT", &uri, Some(&owner_token), Some(json!({
        "Title": "Fest 2025",
        "status": "Published",
        "isVerifiedByAdmin": true,
        "organizerId": 999,
        "occurrences": [{"startTime": "2025-07-01T10:00", "endTime": "2025-07-01T12:00"}]
    }))).await;
    assert_eq!(res.status(), StatusCode::OK);
    let updated = parse_body(res).await["data"].clone();
    assert_eq!(updated["title"], "Fest 2025");
    assert_eq!(updated["status"], "Published");
    assert_eq!(updated["isVerifiedByAdmin"], false);
    assert_ne!(updated["organizerId"], 999);

    let aggregate = parse_body(app.send_json("GET", &uri, None, None).await).await["data"].clone();
    let occurrences = aggregate["occurrences"].as_array().unwrap();
    assert_eq!(occurrences.len(), 1);
    assert_eq!(occurrences[0]["eventTitle"], "Fest 2025");
    assert_eq!(aggregate["speakers"].as_array().unwrap().len(), 1);

    let res = app.send_json("PUT", &uri, Some(&owner_token), Some(json!({"eventEnd": "2025-05-01T00:00"}))).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_admin_can_verify_any_event() {
    let app = TestApp::new().await;
    let (_, owner_token) = app.verified_user("Olivia Organizer", "olivia@example.com").await;
    let (admin_id, _) = app.verified_user("Alex Admin", "alex@example.com").await;
    let admin_token = app.promote_to_admin(admin_id, "alex@example.com").await;

    let event_id = parse_body(app.send_form("/api/events", Some(&owner_token), &fest_parts()).await).await["eventId"].as_i64().unwrap();
    let uri = format!("/api/events/{}", event_id);

    let res = app.send_json("PUT", &uri, Some(&admin_token), Some(json!({
        "isVerifiedByAdmin": true,
        "adminComments": "Looks good"
    }))).await;
    assert_eq!(res.status(), StatusCode::OK);
    let updated = parse_body(res).await["data"].clone();
    assert_eq!(updated["isVerifiedByAdmin"], true);
    assert_eq!(updated["adminComments"], "Looks good");
    assert!(updated["adminVerifiedAt"].is_string());

    let res = app.send_json("DELETE", &uri, Some(&admin_token), None).await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_list_returns_events_in_creation_order() {
    let app = TestApp::new().await;
    let (_, token) = app.verified_user("Olivia Organizer", "olivia@example.com").await;

    for title in ["First", "Second"] {
        let parts = vec![
            Part::Text("Title", title),
            Part::Text("EventStart", "2025-06-01T10:00"),
            Part::Text("EventEnd", "2025-06-01T11:00"),
        ];
        assert_eq!(app.send_form("/api/events", Some(&token), &parts).await.status(), StatusCode::OK);
    }

    let res = app.send_json("GET", "/api/events", None, None).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body = parse_body(res).await;
    assert_eq!(body["success"], true);
    let titles: Vec<&str> = body["data"].as_array().unwrap().iter().map(|e| e["title"].as_str().unwrap()).collect();
    assert_eq!(titles, vec!["First", "Second"]);
}

#[tokio::test]
async fn test_put_with_null_clears_optional_fields() {
    let app = TestApp::new().await;
    let (_, token) = app.verified_user("Olivia Organizer", "olivia@example.com").await;

    let mut parts = fest_parts();
    parts.push(Part::Text("IsPaidEvent", "true"));
    parts.push(Part::Text("Price", "10"));
    parts.push(Part::Text("MaxAttendees", "50"));
    parts.push(Part::Text("OrganizerEmail", "olivia@example.com"));
    let event_id = parse_body(app.send_form("/api/events", Some(&token), &parts).await).await["eventId"].as_i64().unwrap();
    let uri = format!("/api/events/{}", event_id);

    let created = parse_body(app.send_json("GET", &uri, None, None).await).await["data"].clone();
    assert_eq!(created["price"], 10.0);
    assert_eq!(created["location"], "Central Park");

    // Round-trip the full event with the commercial fields cleared
    let mut body = created.clone();
    body["isPaidEvent"] = json!(false);
    body["price"] = json!(null);
    body["location"] = json!(null);
    body["maxAttendees"] = json!(null);
    body["organizerEmail"] = json!(null);
    let res = app.send_json("PUT", &uri, Some(&token), Some(body)).await;
    assert_eq!(res.status(), StatusCode::OK);

    let updated = parse_body(app.send_json("GET", &uri, None, None).await).await["data"].clone();
    assert_eq!(updated["isPaidEvent"], false);
    assert!(updated["price"].is_null());
    assert!(updated["location"].is_null());
    assert!(updated["maxAttendees"].is_null());
    assert!(updated["organizerEmail"].is_null());
    assert_eq!(updated["title"], "Fest");
    assert_eq!(updated["category"], "Music");

    // Absent fields are left alone
    let res = app.send_json("PUT", &uri, Some(&token), Some(json!({"location": "Pier 17"}))).await;
    assert_eq!(res.status(), StatusCode::OK);
    let res = app.send_json("PUT", &uri, Some(&token), Some(json!({"title": "Fest Reloaded"}))).await;
    let updated = parse_body(res).await["data"].clone();
    assert_eq!(updated["location"], "Pier 17");
    assert_eq!(updated["title"], "Fest Reloaded");
}

#[tokio::test]
async fn test_malformed_input_gets_json_400() {
    let app = TestApp::new().await;
    let (_, token) = app.verified_user("Olivia Organizer", "olivia@example.com").await;
    let event_id = parse_body(app.send_form("/api/events", Some(&token), &fest_parts()).await).await["eventId"].as_i64().unwrap();

    let res = app.send_json("PUT", &format!("/api/events/{}", event_id), Some(&token), Some(json!({"price": "x"}))).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = parse_body(res).await;
    assert_eq!(body["success"], false);
    assert!(body["message"].as_str().unwrap().contains("price"));

    let res = app.send_json("GET", "/api/events/abc", None, None).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(parse_body(res).await["success"], false);

    let res = app.send_json("DELETE", "/api/events/abc", Some(&token), None).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(parse_body(res).await["success"], false);
}

#[tokio::test]
async fn test_child_insert_failure_rolls_back_event_and_files() {
    let app = TestApp::new().await;
    let (_, token) = app.verified_user("Olivia Organizer", "olivia@example.com").await;

    sqlx::query("DROP TABLE event_faqs").execute(&app.pool).await.unwrap();

    let faqs = json!([{"Question": "Parking?", "Answer": "Yes"}]).to_string();
    let mut parts = fest_parts();
    parts.push(Part::Text("Faqs", &faqs));
    parts.push(Part::File("CoverImage", "cover.png", PNG));

    let res = app.send_form("/api/events", Some(&token), &parts).await;
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(parse_body(res).await["success"], false);

    let events: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM events")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(events, 0);

    let covers = app.uploads.path().join("covers");
    let leftover = std::fs::read_dir(&covers).map(|dir| dir.count()).unwrap_or(0);
    assert_eq!(leftover, 0);
}

#[tokio::test]
async fn test_oversized_upload_is_413() {
    let app = TestApp::with_upload_limit(1024).await;
    let (_, token) = app.verified_user("Olivia Organizer", "olivia@example.com").await;

    let big = vec![7u8; 8 * 1024];
    let mut parts = fest_parts();
    parts.push(Part::File("CoverImage", "huge.png", &big));

    let res = app.send_form("/api/events", Some(&token), &parts).await;
    assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(parse_body(res).await["success"], false);

    let list = parse_body(app.send_json("GET", "/api/events", None, None).await).await;
    assert_eq!(list["data"], json!([]));
}
