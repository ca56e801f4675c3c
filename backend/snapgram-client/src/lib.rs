//! Snapgram client core
//!
//! Application logic of the Snapgram photo-sharing client on top of a hosted
//! document/blob/account backend:
//! - `services`: auth, posts, saves, users and media, with compensating
//!   cleanup around multi-step writes
//! - `feed`: cursor-paginated, de-duplicated infinite feeds
//! - `cache`: read-query cache with write-driven invalidation
//!
//! `Snapgram` wires everything from a `Config`.

pub mod app;
pub mod cache;
pub mod config;
pub mod error;
pub mod feed;
pub mod models;
pub mod services;
pub mod validators;

pub use app::Snapgram;
pub use cache::{QueryCache, QueryKey};
pub use config::Config;
pub use error::{AppError, Result};
pub use feed::{FeedItem, FeedPager, FeedQuery, PageOutcome, PageSource};
pub use models::{ImageRef, NewPost, NewUser, Post, Save, SignIn, UpdatePost, UpdateUser, User};
pub use services::Backend;
