//! Twitter API access: the [`TwitterApi`] seam, its OAuth 1.0a HTTP
//! implementation, an in-memory stand-in, and the tools built on top.

mod client;
mod memory;
pub mod oauth;
mod tools;

pub use client::{HttpTwitterClient, TwitterApi};
pub use memory::InMemoryTwitter;
pub use oauth::OAuthCredentials;
pub use tools::{DeleteTweet, GetUserProfile, GetUserTweets, ScheduleTweets, Tweet};
