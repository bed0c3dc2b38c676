//! Purpose: Define the hero record and its publisher wire format.
//! Exports: `Hero`, `Publisher`, `ensure_hero_id`.
//! Role: Data entity shared by the store, the CLI, and the HTTP surface.
//! Invariants: JSON field names and publisher strings match the asset format.
//! Invariants: `alt_img` is omitted from JSON when absent.
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::error::{Error, ErrorKind};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Publisher {
    #[serde(rename = "DC Comics")]
    DcComics,
    #[serde(rename = "Marvel Comics")]
    MarvelComics,
}

impl Publisher {
    pub const ALL: [Publisher; 2] = [Publisher::DcComics, Publisher::MarvelComics];

    pub fn as_str(self) -> &'static str {
        match self {
            Publisher::DcComics => "DC Comics",
            Publisher::MarvelComics => "Marvel Comics",
        }
    }
}

impl fmt::Display for Publisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Hero {
    pub id: String,
    pub superhero: String,
    pub publisher: Publisher,
    #[serde(default)]
    pub alter_ego: String,
    #[serde(default)]
    pub first_appearance: String,
    #[serde(default)]
    pub characters: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt_img: Option<String>,
}

/// Guard against the one caller misuse the store cannot express: operating
/// on a blank hero id.
pub fn ensure_hero_id(id: &str) -> Result<(), Error> {
    if id.trim().is_empty() {
        return Err(Error::new(ErrorKind::Usage).with_message("hero id is required"));
    }
    Ok(())
}
