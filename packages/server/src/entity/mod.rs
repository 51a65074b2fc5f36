pub mod artist;
pub mod one_time_password;
pub mod playlist;
pub mod playlist_song;
pub mod queued_song;
pub mod session;
pub mod song;
pub mod song_artist;
pub mod user;
