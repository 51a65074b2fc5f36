use reqwest::Method;
use serde_json::json;

use crate::common::{TestApp, TestClient, routes};

async fn create(client: &TestClient, name: &str) -> i32 {
    let res = client
        .multipart(
            Method::POST,
            routes::CREATE_PLAYLIST,
            &[("name", name), ("description", "Songs for testing")],
        )
        .await;
    assert_eq!(res.status, 200, "create playlist failed: {}", res.text);

    let list = client.get(routes::PLAYLISTS).await;
    list.body["playlists"]
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["name"] == name)
        .and_then(|p| p["playlistId"].as_i64())
        .expect("created playlist is listed") as i32
}

#[tokio::test]
async fn create_uses_a_stock_cover() {
    let app = TestApp::spawn().await;
    let (alice, _) = app.create_user("alice").await;
    let id = create(&alice, "Road Trip").await;

    let res = alice.get(&routes::playlist(id)).await;
    assert_eq!(res.status, 200, "{}", res.text);
    let playlist = &res.body["playlist"];
    assert_eq!(playlist["name"], "Road Trip");
    assert_eq!(playlist["description"], "Songs for testing");
    assert_eq!(playlist["songCount"], 0);

    let cover = playlist["cover"].as_str().unwrap();
    let path = &cover[cover.find("/playlists/cover/").unwrap()..];
    let image = alice.get(path).await;
    assert_eq!(image.status, 200);
    assert_eq!(image.bytes, b"stock playlist cover");
}

#[tokio::test]
async fn create_requires_a_name() {
    let app = TestApp::spawn().await;
    let (alice, _) = app.create_user("alice").await;

    let res = alice
        .multipart(Method::POST, routes::CREATE_PLAYLIST, &[("description", "x")])
        .await;
    assert_eq!(res.status, 400);
    assert_eq!(res.body["message"], "Missing data");
}

#[tokio::test]
async fn songs_are_added_once_and_removed() {
    let app = TestApp::spawn().await;
    let (alice, alice_id) = app.create_user("alice").await;
    let id = create(&alice, "Mix").await;
    let first = app.insert_song(alice_id, "B side", b"x").await;
    let second = app.insert_song(alice_id, "A side", b"x").await;

    let res = alice
        .post(
            routes::ADD_SONG,
            &json!({"playlistId": id, "songIds": [first, second, first]}),
        )
        .await;
    assert_eq!(res.status, 200, "{}", res.text);
    let again = alice
        .post(routes::ADD_SONG, &json!({"playlistId": id, "songIds": [second]}))
        .await;
    assert_eq!(again.status, 200);

    let detail = alice.get(&routes::playlist(id)).await;
    let playlist = &detail.body["playlist"];
    assert_eq!(playlist["songCount"], 2);
    assert_eq!(playlist["playlistDuration"], 360.0);
    let titles: Vec<&str> = playlist["songs"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["A side", "B side"]);

    let removed = alice
        .delete(routes::REMOVE_SONG, &json!({"playlistId": id, "songId": first}))
        .await;
    assert_eq!(removed.status, 200);
    let twice = alice
        .delete(routes::REMOVE_SONG, &json!({"playlistId": id, "songId": first}))
        .await;
    assert_eq!(twice.status, 404);
    assert_eq!(twice.body["message"], "Song is not in playlist");
}

#[tokio::test]
async fn only_own_songs_can_be_added() {
    let app = TestApp::spawn().await;
    let (alice, _) = app.create_user("alice").await;
    let (_, bob_id) = app.create_user("bob").await;
    let id = create(&alice, "Mix").await;
    let bobs = app.insert_song(bob_id, "Not yours", b"x").await;

    let res = alice
        .post(routes::ADD_SONG, &json!({"playlistId": id, "songIds": [bobs]}))
        .await;
    assert_eq!(res.status, 403);
    assert_eq!(res.body["message"], "Not your song");

    let missing = alice
        .post(routes::ADD_SONG, &json!({"playlistId": id, "songIds": [bobs + 100]}))
        .await;
    assert_eq!(missing.status, 404);
    assert_eq!(missing.body["message"], "Song not found");
}

#[tokio::test]
async fn edit_and_delete_check_ownership() {
    let app = TestApp::spawn().await;
    let (alice, alice_id) = app.create_user("alice").await;
    let (bob, _) = app.create_user("bob").await;
    let id = create(&alice, "Mix").await;
    let song_id = app.insert_song(alice_id, "Kept", b"x").await;
    alice
        .post(routes::ADD_SONG, &json!({"playlistId": id, "songIds": [song_id]}))
        .await;
    let id_text = id.to_string();

    let stranger = bob
        .multipart(
            Method::PATCH,
            routes::EDIT_PLAYLIST,
            &[("playlistId", id_text.as_str()), ("name", "Hijacked")],
        )
        .await;
    assert_eq!(stranger.status, 403);
    assert_eq!(stranger.body["message"], "Not your playlist");

    let res = alice
        .multipart(
            Method::PATCH,
            routes::EDIT_PLAYLIST,
            &[
                ("playlistId", id_text.as_str()),
                ("name", "Renamed"),
                ("description", ""),
            ],
        )
        .await;
    assert_eq!(res.status, 200, "{}", res.text);
    let detail = alice.get(&routes::playlist(id)).await;
    assert_eq!(detail.body["playlist"]["name"], "Renamed");
    assert!(detail.body["playlist"]["description"].is_null());

    assert_eq!(
        bob.delete(routes::DELETE_PLAYLIST, &json!({"playlistId": id}))
            .await
            .status,
        403
    );
    let deleted = alice
        .delete(routes::DELETE_PLAYLIST, &json!({"playlistId": id}))
        .await;
    assert_eq!(deleted.status, 200);
    assert_eq!(alice.get(&routes::playlist(id)).await.status, 404);
    assert!(app.find_song(song_id).await.is_some(), "songs outlive the playlist");
}
