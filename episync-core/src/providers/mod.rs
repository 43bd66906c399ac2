//! Concrete remote service clients.
//!
//! [`CrunchyrollProvider`] fetches raw watch history and normalizes it
//! into [`crate::history::WatchEvent`]s; [`AnilistClient`] submits the
//! combined GraphQL documents built by the batchers. Both take their
//! credentials at construction; nothing here reads the environment.

mod anilist;
mod crunchyroll;

pub use anilist::AnilistClient;
pub use crunchyroll::CrunchyrollProvider;
