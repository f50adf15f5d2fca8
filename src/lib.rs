pub mod app;
pub mod card;
pub mod catalog;
pub mod config;
pub mod connectivity;
pub mod error;
pub mod genres;
pub mod models;
pub mod rated_pager;
pub mod ratings;
pub mod session;
pub mod tmdb;
pub mod view;
