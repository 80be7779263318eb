//! Domain types shared across repositories.
//!
//! These are plain values: the wire envelope lives in the network stack and
//! persistence framing in the store. Everything here derives serde so it can
//! round-trip through both.

use serde::{Deserialize, Serialize};

/// An authenticated user session. The bearer token arrives in the
/// sign-in/sign-up response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSession {
  pub user_id: String,
  pub name: String,
  pub email: String,
  pub token: String,
}

/// One title in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Media {
  pub slug: String,
  pub title: String,
  #[serde(default)]
  pub overview: Option<String>,
  #[serde(default)]
  pub poster_path: Option<String>,
  #[serde(default)]
  pub genre: Option<String>,
}

impl Media {
  /// Cache identifier for this title's poster image.
  pub fn poster_identifier(&self) -> String {
    format!("poster_{}", self.slug)
  }
}

/// A curated home-screen row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
  pub id: String,
  pub title: String,
  #[serde(default)]
  pub media: Vec<Media>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
  pub id: String,
  pub number: u32,
  pub title: String,
  #[serde(default)]
  pub synopsis: Option<String>,
}

/// One season of a show, with its episodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Season {
  pub media_slug: String,
  pub number: u32,
  #[serde(default)]
  pub title: Option<String>,
  #[serde(default)]
  pub episodes: Vec<Episode>,
}

/// A user's saved-titles list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MyList {
  pub user_id: String,
  #[serde(default)]
  pub media: Vec<Media>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn poster_identifier_is_derived_from_the_slug() {
    let media = Media {
      slug: "show-42".into(),
      title: "Dark Water".into(),
      overview: None,
      poster_path: Some("/posters/show-42.jpg".into()),
      genre: None,
    };
    assert_eq!(media.poster_identifier(), "poster_show-42");
  }
}
