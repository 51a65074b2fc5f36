use serde_json::json;

use crate::common::{OWNER_EMAIL, OWNER_NAME, OWNER_PASSWORD, PASSWORD, TestApp, routes};

mod registration {
    use super::*;

    #[tokio::test]
    async fn register_creates_a_pending_request() {
        let app = TestApp::spawn().await;
        let client = app.client();

        let res = client
            .post(
                routes::REGISTER,
                &json!({"username": "alice", "email": "Alice@Example.com", "password": PASSWORD}),
            )
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["success"], true);

        let login = client
            .post(routes::LOGIN, &json!({"username": "alice", "password": PASSWORD}))
            .await;
        assert_eq!(login.status, 403);
        assert_eq!(login.body["message"], "Register request hasn't been approved yet");
    }

    #[tokio::test]
    async fn taken_username_and_email_conflict() {
        let app = TestApp::spawn().await;
        let client = app.client();
        let first = client
            .post(
                routes::REGISTER,
                &json!({"username": "alice", "email": "alice@example.com", "password": PASSWORD}),
            )
            .await;
        assert_eq!(first.status, 201);

        let same_name = client
            .post(
                routes::REGISTER,
                &json!({"username": "alice", "email": "other@example.com", "password": PASSWORD}),
            )
            .await;
        assert_eq!(same_name.status, 409);
        assert_eq!(same_name.body["message"], "Username is taken");

        let same_email = client
            .post(
                routes::REGISTER,
                &json!({"username": "bob", "email": "ALICE@example.com", "password": PASSWORD}),
            )
            .await;
        assert_eq!(same_email.status, 409);
        assert_eq!(same_email.body["message"], "E-Mail is taken");
    }

    #[tokio::test]
    async fn incomplete_or_invalid_requests_are_rejected() {
        let app = TestApp::spawn().await;
        let client = app.client();

        let missing = client
            .post(routes::REGISTER, &json!({"username": "alice", "password": PASSWORD}))
            .await;
        assert_eq!(missing.status, 400);
        assert_eq!(missing.body["message"], "Missing data");

        let short = client
            .post(
                routes::REGISTER,
                &json!({"username": "alice", "email": "alice@example.com", "password": "short"}),
            )
            .await;
        assert_eq!(short.status, 400);
        assert_eq!(short.body["code"], "VALIDATION_ERROR");

        let bad_name = client
            .post(
                routes::REGISTER,
                &json!({"username": "no spaces!", "email": "alice@example.com", "password": PASSWORD}),
            )
            .await;
        assert_eq!(bad_name.status, 400);
    }
}

mod sessions {
    use super::*;

    #[tokio::test]
    async fn login_state_follows_the_session_cookie() {
        let app = TestApp::spawn().await;
        let client = app.client();

        let before = client.get(routes::LOGIN_STATE).await;
        assert_eq!(before.status, 200);
        assert_eq!(before.body["loggedIn"], false);

        client.login(OWNER_NAME, OWNER_PASSWORD).await;
        let during = client.get(routes::LOGIN_STATE).await;
        assert_eq!(during.body["loggedIn"], true);

        let logout = client.post(routes::LOGOUT, &json!({})).await;
        assert_eq!(logout.status, 200);

        let after = client.get(routes::LOGIN_STATE).await;
        assert_eq!(after.body["loggedIn"], false);
    }

    #[tokio::test]
    async fn login_by_email_is_case_insensitive() {
        let app = TestApp::spawn().await;
        let client = app.client();

        let res = client
            .post(
                routes::LOGIN,
                &json!({"email": OWNER_EMAIL.to_uppercase(), "password": OWNER_PASSWORD}),
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_user() {
        let app = TestApp::spawn().await;
        let client = app.client();

        let wrong = client
            .post(routes::LOGIN, &json!({"username": OWNER_NAME, "password": "not-it-at-all"}))
            .await;
        assert_eq!(wrong.status, 401);
        assert_eq!(wrong.body["message"], "Wrong password");

        let unknown = client
            .post(routes::LOGIN, &json!({"username": "ghost", "password": PASSWORD}))
            .await;
        assert_eq!(unknown.status, 404);
        assert_eq!(unknown.body["message"], "User not found");
    }

    #[tokio::test]
    async fn protected_routes_require_a_session() {
        let app = TestApp::spawn().await;
        let client = app.client();

        let res = client.get(routes::USER_DATA).await;
        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "NOT_LOGGED_IN");
    }

    #[tokio::test]
    async fn user_data_returns_the_profile() {
        let app = TestApp::spawn().await;
        let (client, _) = app.create_user("alice").await;

        let res = client.get(routes::USER_DATA).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["user"]["username"], "alice");
        assert_eq!(res.body["user"]["email"], "alice@example.com");
        assert_eq!(res.body["user"]["role"], "user");
    }
}

mod passwords {
    use super::*;

    fn otp_from(body: &str) -> String {
        body.rsplit(' ').next().unwrap().to_string()
    }

    #[tokio::test]
    async fn change_password_with_the_old_one() {
        let app = TestApp::spawn().await;
        let (client, _) = app.create_user("alice").await;

        let wrong = client
            .patch(
                routes::CHANGE_PASSWORD,
                &json!({"passwordOld": "not-the-password", "passwordNew": "brand-new-pass"}),
            )
            .await;
        assert_eq!(wrong.status, 401);

        let res = client
            .patch(
                routes::CHANGE_PASSWORD,
                &json!({"passwordOld": PASSWORD, "passwordNew": "brand-new-pass"}),
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);

        app.client().login("alice", "brand-new-pass").await;
    }

    #[tokio::test]
    async fn otp_resets_the_password_and_ends_sessions() {
        let app = TestApp::spawn().await;
        let (client, _) = app.create_user("alice").await;

        let anonymous = app.client();
        let sent = anonymous
            .post(routes::SEND_OTP, &json!({"email": "alice@example.com"}))
            .await;
        assert_eq!(sent.status, 200, "{}", sent.text);
        let code = otp_from(&app.mailer.last_to("alice@example.com").unwrap());
        assert_eq!(code.len(), 6);

        let res = anonymous
            .patch(
                routes::CHANGE_PASSWORD,
                &json!({
                    "email": "alice@example.com",
                    "otp": code.to_lowercase(),
                    "passwordNew": "reset-password",
                }),
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);

        let state = client.get(routes::LOGIN_STATE).await;
        assert_eq!(state.body["loggedIn"], false);
        app.client().login("alice", "reset-password").await;

        // The code is single use.
        let reuse = anonymous
            .patch(
                routes::CHANGE_PASSWORD,
                &json!({"email": "alice@example.com", "otp": code, "passwordNew": "another-one"}),
            )
            .await;
        assert_eq!(reuse.status, 404);
    }

    #[tokio::test]
    async fn wrong_otp_spends_attempts() {
        let app = TestApp::spawn().await;
        app.create_user("alice").await;
        let anonymous = app.client();

        anonymous
            .post(routes::SEND_OTP, &json!({"email": "alice@example.com"}))
            .await;
        let code = otp_from(&app.mailer.last_to("alice@example.com").unwrap());
        let wrong = if code == "AAAAAA" { "BBBBBB" } else { "AAAAAA" };

        let mut remaining = Vec::new();
        for _ in 0..3 {
            let res = anonymous
                .patch(
                    routes::CHANGE_PASSWORD,
                    &json!({"email": "alice@example.com", "otp": wrong, "passwordNew": "reset-password"}),
                )
                .await;
            assert_eq!(res.status, 401);
            remaining.push(res.body["attemptsRemaining"].as_i64().unwrap());
        }
        assert_eq!(remaining, vec![2, 1, 0]);

        // Out of attempts: the right code no longer works either.
        let res = anonymous
            .patch(
                routes::CHANGE_PASSWORD,
                &json!({"email": "alice@example.com", "otp": code, "passwordNew": "reset-password"}),
            )
            .await;
        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn short_new_password_keeps_the_otp() {
        let app = TestApp::spawn().await;
        app.create_user("alice").await;
        let anonymous = app.client();

        anonymous
            .post(routes::SEND_OTP, &json!({"email": "alice@example.com"}))
            .await;
        let code = otp_from(&app.mailer.last_to("alice@example.com").unwrap());

        let res = anonymous
            .patch(
                routes::CHANGE_PASSWORD,
                &json!({"email": "alice@example.com", "otp": code, "passwordNew": "short"}),
            )
            .await;
        assert_eq!(res.status, 400, "{}", res.text);

        let res = anonymous
            .patch(
                routes::CHANGE_PASSWORD,
                &json!({"email": "alice@example.com", "otp": code, "passwordNew": "reset-password"}),
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        app.client().login("alice", "reset-password").await;
    }

    #[tokio::test]
    async fn send_otp_to_unknown_email() {
        let app = TestApp::spawn().await;

        let res = app
            .client()
            .post(routes::SEND_OTP, &json!({"email": "nobody@example.com"}))
            .await;
        assert_eq!(res.status, 404);
        assert_eq!(res.body["message"], "No user with this E-Mail");
    }
}
