use axum::extract::DefaultBodyLimit;
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::config::AppConfig;
use crate::handlers;
use crate::state::AppState;

pub fn api_routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .nest("/users", user_routes())
        .nest("/songs", song_routes(config))
        .nest("/playlists", playlist_routes(config))
        .nest("/artists", artist_routes(config))
        .nest("/queue", queue_routes())
}

/// Body limit for routes taking image uploads: the file plus room for the
/// text fields and multipart framing.
fn upload_body_limit(config: &AppConfig) -> DefaultBodyLimit {
    let limit = config.media.max_upload_size.saturating_add(1024 * 1024);
    DefaultBodyLimit::max(usize::try_from(limit).unwrap_or(usize::MAX))
}

fn user_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::user::list_users))
        .routes(routes!(handlers::user::register))
        .routes(routes!(handlers::user::login))
        .routes(routes!(handlers::user::logout))
        .routes(routes!(handlers::user::login_state))
        .routes(routes!(handlers::user::user_data))
        .routes(routes!(handlers::user::change_password))
        .routes(routes!(handlers::user::send_otp))
        .routes(routes!(handlers::user::delete_user))
        .routes(routes!(handlers::user::make_admin))
        .routes(routes!(handlers::user::remove_admin))
        .routes(routes!(handlers::user::approve_register))
        .routes(routes!(handlers::user::deny_register))
        .routes(routes!(handlers::user::register_requests))
}

fn song_routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    let edit = OpenApiRouter::new()
        .routes(routes!(handlers::song::edit_song))
        .layer(upload_body_limit(config));

    OpenApiRouter::new()
        .routes(routes!(handlers::song::list_songs))
        .routes(routes!(handlers::song::play_song))
        .routes(routes!(handlers::song::download_song))
        .routes(routes!(handlers::song::browse_songs))
        .routes(routes!(handlers::song::get_song))
        .routes(routes!(handlers::song::get_cover))
        .routes(routes!(handlers::song::delete_song))
        .routes(routes!(handlers::song::toggle_favorite))
        .routes(routes!(handlers::song::reset_song))
        .merge(edit)
}

fn playlist_routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    let uploads = OpenApiRouter::new()
        .routes(routes!(handlers::playlist::create_playlist))
        .routes(routes!(handlers::playlist::edit_playlist))
        .layer(upload_body_limit(config));

    OpenApiRouter::new()
        .routes(routes!(handlers::playlist::list_playlists))
        .routes(routes!(handlers::playlist::get_playlist))
        .routes(routes!(handlers::playlist::delete_playlist))
        .routes(routes!(handlers::playlist::add_songs))
        .routes(routes!(handlers::playlist::remove_song))
        .routes(routes!(handlers::playlist::get_cover))
        .merge(uploads)
}

fn artist_routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    let edit = OpenApiRouter::new()
        .routes(routes!(handlers::artist::edit_artist))
        .layer(upload_body_limit(config));

    OpenApiRouter::new()
        .routes(routes!(handlers::artist::list_artists))
        .routes(routes!(handlers::artist::get_artist))
        .routes(routes!(handlers::artist::get_image))
        .merge(edit)
}

fn queue_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::queue::get_queue))
        .routes(routes!(handlers::queue::set_queue))
        .routes(routes!(handlers::queue::change_song))
        .routes(routes!(handlers::queue::clear_queue))
}
