pub mod action;
pub mod calendar;
pub mod chat;
pub mod config;
pub mod game;
pub mod notice;
pub mod player;
pub mod role;
