//! Domain core for the council transparency site: storage, the public read
//! path, admin writes and the leaderboards.

pub mod auth;
pub mod config;
pub mod contact;
pub mod db;
pub mod error;
pub mod faq;
pub mod filter;
pub mod identity;
pub mod likes;
pub mod list_view;
pub mod media;
pub mod members;
pub mod news;
pub mod query;
pub mod questions;
pub mod rankings;
pub mod schema;
pub mod seed;
pub mod slides;

pub use error::{CouncilError, Result};
