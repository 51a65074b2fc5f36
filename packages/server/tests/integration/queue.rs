use serde_json::json;

use crate::common::{TestApp, routes};

#[tokio::test]
async fn empty_queue_has_no_index() {
    let app = TestApp::spawn().await;
    let (alice, _) = app.create_user("alice").await;

    let res = alice.get(routes::QUEUE).await;
    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["message"], "The queue is empty");
    assert!(res.body["queue"].as_array().unwrap().is_empty());
    assert!(res.body.get("queueIndex").is_none());
}

#[tokio::test]
async fn set_keeps_order_and_duplicates() {
    let app = TestApp::spawn().await;
    let (alice, alice_id) = app.create_user("alice").await;
    let a = app.insert_song(alice_id, "A", b"x").await;
    let b = app.insert_song(alice_id, "B", b"x").await;

    let res = alice
        .post(routes::SET_QUEUE, &json!({"queue": [b, a, b]}))
        .await;
    assert_eq!(res.status, 200, "{}", res.text);

    let queue = alice.get(routes::QUEUE).await;
    assert_eq!(queue.body["queue"], json!([b, a, b]));
    assert_eq!(queue.body["queueIndex"], 0);
}

#[tokio::test]
async fn change_song_stays_within_bounds() {
    let app = TestApp::spawn().await;
    let (alice, alice_id) = app.create_user("alice").await;
    let a = app.insert_song(alice_id, "A", b"x").await;
    let b = app.insert_song(alice_id, "B", b"x").await;
    alice.post(routes::SET_QUEUE, &json!({"queue": [a, b]})).await;

    let mut seen = Vec::new();
    for action in ["backward", "forward", "forward", "backward"] {
        let res = alice
            .patch(routes::CHANGE_QUEUE_SONG, &json!({"action": action}))
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        seen.push(alice.get(routes::QUEUE).await.body["queueIndex"].clone());
    }
    assert_eq!(seen, vec![json!(0), json!(1), json!(1), json!(0)]);

    let bad = alice
        .patch(routes::CHANGE_QUEUE_SONG, &json!({"action": "sideways"}))
        .await;
    assert_eq!(bad.status, 400);
    assert_eq!(bad.body["message"], "Action must either be forward or backward");
}

#[tokio::test]
async fn deleting_a_queued_song_keeps_the_index_in_range() {
    let app = TestApp::spawn().await;
    let (alice, alice_id) = app.create_user("alice").await;
    let a = app.insert_song(alice_id, "A", b"x").await;
    let b = app.insert_song(alice_id, "B", b"x").await;
    alice.post(routes::SET_QUEUE, &json!({"queue": [a, b]})).await;
    alice
        .patch(routes::CHANGE_QUEUE_SONG, &json!({"action": "forward"}))
        .await;

    let res = alice
        .delete(routes::DELETE_SONG, &json!({"songId": b}))
        .await;
    assert_eq!(res.status, 200, "{}", res.text);

    let queue = alice.get(routes::QUEUE).await;
    assert_eq!(queue.body["queue"], json!([a]));
    assert_eq!(queue.body["queueIndex"], 0);
}

#[tokio::test]
async fn set_rejects_foreign_songs_and_clear_empties() {
    let app = TestApp::spawn().await;
    let (alice, alice_id) = app.create_user("alice").await;
    let (_, bob_id) = app.create_user("bob").await;
    let mine = app.insert_song(alice_id, "Mine", b"x").await;
    let theirs = app.insert_song(bob_id, "Theirs", b"x").await;

    let res = alice
        .post(routes::SET_QUEUE, &json!({"queue": [mine, theirs]}))
        .await;
    assert_eq!(res.status, 403);

    alice.post(routes::SET_QUEUE, &json!({"queue": [mine]})).await;
    let cleared = alice.delete(routes::CLEAR_QUEUE, &json!({})).await;
    assert_eq!(cleared.status, 200);
    assert!(
        alice.get(routes::QUEUE).await.body["queue"]
            .as_array()
            .unwrap()
            .is_empty()
    );
}
