pub mod artist;
pub mod playlist;
pub mod queue;
pub mod song;
pub mod user;
