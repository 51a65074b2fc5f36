use reqwest::Method;
use serde_json::json;

use crate::common::{TestApp, routes};

fn audio() -> Vec<u8> {
    (0..1000u32).map(|i| (i % 251) as u8).collect()
}

mod library {
    use super::*;

    #[tokio::test]
    async fn songs_are_listed_by_title_for_their_owner_only() {
        let app = TestApp::spawn().await;
        let (alice, alice_id) = app.create_user("alice").await;
        let (bob, bob_id) = app.create_user("bob").await;
        app.insert_song(alice_id, "Zebra", b"z").await;
        app.insert_song(alice_id, "Apple", b"a").await;
        app.insert_song(bob_id, "Bob's", b"b").await;

        let res = alice.get(routes::SONGS).await;
        assert_eq!(res.status, 200, "{}", res.text);
        let titles: Vec<&str> = res.body["songs"]
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["title"].as_str().unwrap())
            .collect();
        assert_eq!(titles, vec!["Apple", "Zebra"]);

        let bobs = bob.get(routes::SONGS).await;
        assert_eq!(bobs.body["songs"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn single_song_checks_ownership() {
        let app = TestApp::spawn().await;
        let (alice, alice_id) = app.create_user("alice").await;
        let (bob, _) = app.create_user("bob").await;
        let song_id = app.insert_song(alice_id, "Mine", b"x").await;
        let stem = app.find_song(song_id).await.unwrap().file_stem;

        let res = alice.get(&routes::song(song_id)).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["song"]["songId"], song_id);
        assert_eq!(res.body["song"]["isFavorite"], false);
        assert!(
            res.body["song"]["cover"]
                .as_str()
                .unwrap()
                .ends_with(&format!("/songs/cover/{stem}.jpg"))
        );

        let stranger = bob.get(&routes::song(song_id)).await;
        assert_eq!(stranger.status, 403);
        assert_eq!(stranger.body["message"], "Not your song");

        let missing = alice.get(&routes::song(song_id + 100)).await;
        assert_eq!(missing.status, 404);
        assert_eq!(missing.body["message"], "Song not found");

        let invalid = alice.get("/songs/single?songId=abc").await;
        assert_eq!(invalid.status, 400);
    }

    #[tokio::test]
    async fn covers_are_served_to_the_owner() {
        let app = TestApp::spawn().await;
        let (alice, alice_id) = app.create_user("alice").await;
        let (bob, _) = app.create_user("bob").await;
        let song_id = app.insert_song(alice_id, "Mine", b"x").await;
        let stem = app.find_song(song_id).await.unwrap().file_stem;
        let path = format!("/songs/cover/{stem}.jpg");

        let res = alice.get(&path).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.header("content-type"), Some("image/jpeg"));
        assert_eq!(res.bytes, b"cover bytes");

        assert_eq!(bob.get(&path).await.status, 403);
        assert_eq!(alice.get("/songs/cover/nothing.jpg").await.status, 404);
    }

    #[tokio::test]
    async fn toggle_favorite_flips_the_flag() {
        let app = TestApp::spawn().await;
        let (alice, alice_id) = app.create_user("alice").await;
        let song_id = app.insert_song(alice_id, "Fav", b"x").await;

        for expected in [true, false] {
            let res = alice
                .post(routes::TOGGLE_FAVORITE, &json!({"songId": song_id}))
                .await;
            assert_eq!(res.status, 200);
            assert_eq!(app.find_song(song_id).await.unwrap().is_favorite, expected);
        }
    }

    #[tokio::test]
    async fn edit_updates_fields_and_artists() {
        let app = TestApp::spawn().await;
        let (alice, alice_id) = app.create_user("alice").await;
        let song_id = app.insert_song(alice_id, "Old", b"x").await;
        let id = song_id.to_string();

        let res = alice
            .multipart(
                Method::PATCH,
                routes::EDIT_SONG,
                &[
                    ("songId", id.as_str()),
                    ("title", "New"),
                    ("genre", "Jazz"),
                    ("releaseYear", "1999"),
                    ("artistAdd", r#"["Ella", "Louis"]"#),
                ],
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);

        let song = alice.get(&routes::song(song_id)).await.body["song"].clone();
        assert_eq!(song["title"], "New");
        assert_eq!(song["genre"], "Jazz");
        assert_eq!(song["releaseYear"], 1999);
        let artists: Vec<&str> = song["artists"]
            .as_array()
            .unwrap()
            .iter()
            .map(|a| a["name"].as_str().unwrap())
            .collect();
        assert_eq!(artists, vec!["Ella", "Louis"]);

        let res = alice
            .multipart(
                Method::PATCH,
                routes::EDIT_SONG,
                &[("songId", id.as_str()), ("artistDelete", r#"["louis"]"#)],
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);

        let artists = alice.get(routes::ARTISTS).await;
        let names: Vec<&str> = artists.body["artists"]
            .as_array()
            .unwrap()
            .iter()
            .map(|a| a["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["Ella"], "uncredited artist is pruned");
    }

    #[tokio::test]
    async fn edit_rejects_bad_input() {
        let app = TestApp::spawn().await;
        let (alice, alice_id) = app.create_user("alice").await;
        let song_id = app.insert_song(alice_id, "Song", b"x").await;
        let id = song_id.to_string();

        let missing = alice
            .multipart(Method::PATCH, routes::EDIT_SONG, &[("title", "x")])
            .await;
        assert_eq!(missing.status, 400);
        assert_eq!(missing.body["message"], "Missing data");

        let year = alice
            .multipart(
                Method::PATCH,
                routes::EDIT_SONG,
                &[("songId", id.as_str()), ("releaseYear", "10000")],
            )
            .await;
        assert_eq!(year.status, 400);

        let unknown_artist = alice
            .multipart(
                Method::PATCH,
                routes::EDIT_SONG,
                &[("songId", id.as_str()), ("artistDelete", r#"["Nobody"]"#)],
            )
            .await;
        assert_eq!(unknown_artist.status, 404);
        assert_eq!(unknown_artist.body["message"], "Artist to delete not found");
    }

    #[tokio::test]
    async fn delete_removes_rows_and_files() {
        let app = TestApp::spawn().await;
        let (alice, alice_id) = app.create_user("alice").await;
        let (bob, _) = app.create_user("bob").await;
        let song_id = app.insert_song(alice_id, "Gone", b"x").await;
        let stem = app.find_song(song_id).await.unwrap().file_stem;

        let stranger = bob
            .delete(routes::DELETE_SONG, &json!({"songId": song_id}))
            .await;
        assert_eq!(stranger.status, 403);

        let res = alice
            .delete(routes::DELETE_SONG, &json!({"songId": song_id}))
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert!(app.find_song(song_id).await.is_none());
        assert!(
            app.store
                .size(::common::storage::MediaKind::Audio, &stem)
                .await
                .is_err()
        );
    }
}

mod streaming {
    use super::*;

    #[tokio::test]
    async fn whole_file_without_range() {
        let app = TestApp::spawn().await;
        let (alice, alice_id) = app.create_user("alice").await;
        let song_id = app.insert_song(alice_id, "Song", &audio()).await;

        let res = alice.get(&routes::play(song_id)).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.header("content-type"), Some("audio/mp4"));
        assert_eq!(res.header("accept-ranges"), Some("bytes"));
        assert_eq!(res.bytes, audio());
    }

    #[tokio::test]
    async fn single_range_is_partial_content() {
        let app = TestApp::spawn().await;
        let (alice, alice_id) = app.create_user("alice").await;
        let song_id = app.insert_song(alice_id, "Song", &audio()).await;

        let res = alice.get_range(&routes::play(song_id), "bytes=100-199").await;
        assert_eq!(res.status, 206);
        assert_eq!(res.header("content-range"), Some("bytes 100-199/1000"));
        assert_eq!(res.bytes, audio()[100..200].to_vec());

        let open = alice.get_range(&routes::play(song_id), "bytes=900-").await;
        assert_eq!(open.status, 206);
        assert_eq!(open.header("content-range"), Some("bytes 900-999/1000"));
        assert_eq!(open.bytes.len(), 100);

        let suffix = alice.get_range(&routes::play(song_id), "bytes=-10").await;
        assert_eq!(suffix.status, 206);
        assert_eq!(suffix.bytes, audio()[990..].to_vec());
    }

    #[tokio::test]
    async fn bad_ranges() {
        let app = TestApp::spawn().await;
        let (alice, alice_id) = app.create_user("alice").await;
        let song_id = app.insert_song(alice_id, "Song", &audio()).await;

        let beyond = alice.get_range(&routes::play(song_id), "bytes=1000-").await;
        assert_eq!(beyond.status, 416);
        assert_eq!(beyond.header("content-range"), Some("bytes */1000"));

        let malformed = alice.get_range(&routes::play(song_id), "bytes=abc").await;
        assert_eq!(malformed.status, 400);
        assert_eq!(malformed.body["code"], "VALIDATION_ERROR");
        assert_eq!(malformed.body["message"], "Malformed Range header");
    }

    #[tokio::test]
    async fn strangers_cannot_stream_even_with_a_bad_range() {
        let app = TestApp::spawn().await;
        let (_, alice_id) = app.create_user("alice").await;
        let (bob, _) = app.create_user("bob").await;
        let song_id = app.insert_song(alice_id, "Song", &audio()).await;

        assert_eq!(bob.get(&routes::play(song_id)).await.status, 403);
        assert_eq!(
            bob.get_range(&routes::play(song_id), "bytes=abc")
                .await
                .status,
            403
        );
        assert_eq!(bob.get(&routes::play(song_id + 100)).await.status, 404);
        assert_eq!(app.client().get(&routes::play(song_id)).await.status, 401);
    }
}

mod tools {
    use super::*;

    #[tokio::test]
    async fn download_reports_extractor_failure() {
        let app = TestApp::spawn().await;
        let (alice, _) = app.create_user("alice").await;

        let res = alice
            .post(
                routes::DOWNLOAD,
                &json!({"songURL": "https://example.com/track"}),
            )
            .await;
        assert_eq!(res.status, 500);
        assert_eq!(res.body["code"], "UPSTREAM_ERROR");
        assert_eq!(res.body["message"], "Error while downloading the song");
        assert!(alice.get(routes::SONGS).await.body["songs"]
            .as_array()
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn download_requires_a_url() {
        let app = TestApp::spawn().await;
        let (alice, _) = app.create_user("alice").await;

        let res = alice.post(routes::DOWNLOAD, &json!({"songURL": "  "})).await;
        assert_eq!(res.status, 400);
        assert_eq!(res.body["message"], "Missing data");
    }

    #[tokio::test]
    async fn reset_of_untagged_audio_reports_metadata_error() {
        let app = TestApp::spawn().await;
        let (alice, alice_id) = app.create_user("alice").await;
        let song_id = app.insert_song(alice_id, "Song", b"not really audio").await;

        let res = alice.put("/songs/reset", &json!({"songId": song_id})).await;
        assert_eq!(res.status, 500);
        assert_eq!(res.body["message"], "Error while reading metadata");
        assert_eq!(app.find_song(song_id).await.unwrap().title, "Song");
    }
}
