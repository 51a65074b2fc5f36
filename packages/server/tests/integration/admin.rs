use serde_json::json;

use crate::common::{OWNER_NAME, PASSWORD, TestApp, routes};

#[tokio::test]
async fn owner_approves_a_register_request() {
    let app = TestApp::spawn().await;
    let owner = app.owner().await;

    let applicant = app.client();
    applicant
        .post(
            routes::REGISTER,
            &json!({"username": "alice", "email": "alice@example.com", "password": PASSWORD}),
        )
        .await;

    let pending = owner.get(routes::REGISTER_REQUESTS).await;
    assert_eq!(pending.status, 200);
    let requests = pending.body["requests"].as_array().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0]["username"], "alice");
    let user_id = requests[0]["userId"].as_i64().unwrap();

    let res = owner
        .patch(routes::APPROVE_REGISTER, &json!({"userId": user_id}))
        .await;
    assert_eq!(res.status, 200, "{}", res.text);

    applicant.login("alice", PASSWORD).await;

    let again = owner
        .patch(routes::APPROVE_REGISTER, &json!({"userId": user_id}))
        .await;
    assert_eq!(again.status, 409);
    assert_eq!(again.body["message"], "User is already registered");
}

#[tokio::test]
async fn denying_a_request_deletes_the_account() {
    let app = TestApp::spawn().await;
    let owner = app.owner().await;
    app.client()
        .post(
            routes::REGISTER,
            &json!({"username": "alice", "email": "alice@example.com", "password": PASSWORD}),
        )
        .await;
    let user_id = app.user_id("alice").await;

    let res = owner
        .patch(routes::DENY_REGISTER, &json!({"userId": user_id}))
        .await;
    assert_eq!(res.status, 200, "{}", res.text);

    let pending = owner.get(routes::REGISTER_REQUESTS).await;
    assert!(pending.body["requests"].as_array().unwrap().is_empty());

    // The name is free again.
    let reregister = app
        .client()
        .post(
            routes::REGISTER,
            &json!({"username": "alice", "email": "alice@example.com", "password": PASSWORD}),
        )
        .await;
    assert_eq!(reregister.status, 201);
}

#[tokio::test]
async fn regular_users_cannot_administer() {
    let app = TestApp::spawn().await;
    let (alice, _) = app.create_user("alice").await;
    let (_, bob_id) = app.create_user("bob").await;

    let list = alice.get(routes::USERS).await;
    assert_eq!(list.status, 403);
    assert_eq!(list.body["message"], "Only admins and the owner can view users");

    let delete = alice
        .delete(routes::DELETE_USER, &json!({"userId": bob_id}))
        .await;
    assert_eq!(delete.status, 403);

    let promote = alice
        .patch(routes::MAKE_ADMIN, &json!({"userId": bob_id}))
        .await;
    assert_eq!(promote.status, 403);
    assert_eq!(promote.body["message"], "Only the owner can manage user roles");
}

#[tokio::test]
async fn owner_manages_roles() {
    let app = TestApp::spawn().await;
    let owner = app.owner().await;
    let (alice, alice_id) = app.create_user("alice").await;

    let promote = owner
        .patch(routes::MAKE_ADMIN, &json!({"userId": alice_id}))
        .await;
    assert_eq!(promote.status, 200, "{}", promote.text);

    let list = alice.get(routes::USERS).await;
    assert_eq!(list.status, 200);
    let names: Vec<&str> = list.body["users"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["username"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["alice", OWNER_NAME]);

    let twice = owner
        .patch(routes::MAKE_ADMIN, &json!({"userId": alice_id}))
        .await;
    assert_eq!(twice.status, 409);

    let demote = owner
        .patch(routes::REMOVE_ADMIN, &json!({"userId": alice_id}))
        .await;
    assert_eq!(demote.status, 200);
    assert_eq!(alice.get(routes::USERS).await.status, 403);

    let owner_id = app.user_id(OWNER_NAME).await;
    let self_demote = owner
        .patch(routes::REMOVE_ADMIN, &json!({"userId": owner_id}))
        .await;
    assert_eq!(self_demote.status, 403);
    assert_eq!(self_demote.body["message"], "Can't change the owners role");
}

#[tokio::test]
async fn admins_cannot_delete_admins_or_the_owner() {
    let app = TestApp::spawn().await;
    let owner = app.owner().await;
    let (admin, admin_id) = app.create_user("admin_one").await;
    let (_, other_id) = app.create_user("admin_two").await;
    for id in [admin_id, other_id] {
        owner.patch(routes::MAKE_ADMIN, &json!({"userId": id})).await;
    }

    let res = admin
        .delete(routes::DELETE_USER, &json!({"userId": other_id}))
        .await;
    assert_eq!(res.status, 403);
    assert_eq!(res.body["message"], "Can only delete admins as owner");

    let owner_id = app.user_id(OWNER_NAME).await;
    let res = admin
        .delete(routes::DELETE_USER, &json!({"userId": owner_id}))
        .await;
    assert_eq!(res.status, 403);
    assert_eq!(res.body["message"], "Can't delete owner");
}

#[tokio::test]
async fn deleting_a_user_removes_their_library() {
    let app = TestApp::spawn().await;
    let owner = app.owner().await;
    let (alice, alice_id) = app.create_user("alice").await;
    let song_id = app.insert_song(alice_id, "Doomed", b"audio").await;
    let stem = app.find_song(song_id).await.unwrap().file_stem;

    let res = owner
        .delete(routes::DELETE_USER, &json!({"userId": alice_id}))
        .await;
    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["message"], "Successfully deleted 'alice'");

    assert!(app.find_song(song_id).await.is_none());
    assert!(
        app.store
            .size(::common::storage::MediaKind::Audio, &stem)
            .await
            .is_err()
    );

    // The session died with the account.
    assert_eq!(alice.get(routes::USER_DATA).await.status, 401);
}
