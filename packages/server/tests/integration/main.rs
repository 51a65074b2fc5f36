mod common;

mod admin;
mod playlist;
mod queue;
mod song;
mod user;
