//! Per-resource repositories.
//!
//! A repository binds the data-transfer service to the response store for
//! one resource family and owns that family's cache policy: media, sections
//! and my-list are cache-first (show the cache immediately, always refresh
//! over the network, last network response overwrites the record); sign-in
//! short-circuits on a cache hit; seasons and mutations always go to the
//! network.
//!
//! All repository methods assume a running tokio runtime: workers are
//! spawned, and completion callbacks fire on them.

mod auth;
mod media;
mod mylist;
mod seasons;
mod sections;

pub use auth::{AuthRepository, AuthRequest, SignInRequest, SignUpRequest};
pub use media::{MediaListRequest, MediaRepository};
pub use mylist::{MyListAction, MyListRepository, MyListRequest};
pub use seasons::SeasonRepository;
pub use sections::{SectionRepository, SectionsRequest};
