//! Purpose: Define the asset document format and the source collaborator trait.
//! Exports: `HeroSource`, `HeroDocument`, `parse_document`.
//! Role: Boundary between the store and wherever the seed records live.
//! Invariants: The asset document shape is `{"heroes": [Hero, ...]}`.
//! Invariants: Parse failures are `Parse` errors; transport is the source's concern.
use serde::Deserialize;

use crate::core::error::{Error, ErrorKind};
use crate::core::hero::Hero;

/// External collaborator the store loads its records from.
pub trait HeroSource {
    fn fetch_heroes(&self) -> Result<Vec<Hero>, Error>;

    /// Short human description used in diagnostics (a path or URL).
    fn describe(&self) -> String;
}

#[derive(Debug, Deserialize)]
pub struct HeroDocument {
    pub heroes: Vec<Hero>,
}

pub fn parse_document(bytes: &[u8]) -> Result<Vec<Hero>, Error> {
    let document: HeroDocument = serde_json::from_slice(bytes).map_err(|err| {
        Error::new(ErrorKind::Parse)
            .with_message("invalid hero asset document")
            .with_source(err)
    })?;
    Ok(document.heroes)
}

#[cfg(test)]
mod tests {
    use super::parse_document;
    use crate::core::error::ErrorKind;
    use crate::core::hero::Publisher;

    #[test]
    fn parses_a_single_record_document() {
        let body = br#"{"heroes":[{
            "id": "1",
            "superhero": "Superman",
            "publisher": "DC Comics",
            "alter_ego": "Clark Kent",
            "first_appearance": "Action Comics #1",
            "characters": "Clark Kent"
        }]}"#;
        let heroes = parse_document(body).expect("parse");
        assert_eq!(heroes.len(), 1);
        assert_eq!(heroes[0].id, "1");
        assert_eq!(heroes[0].superhero, "Superman");
        assert_eq!(heroes[0].publisher, Publisher::DcComics);
    }

    #[test]
    fn empty_collection_is_valid() {
        let heroes = parse_document(br#"{"heroes":[]}"#).expect("parse");
        assert!(heroes.is_empty());
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = parse_document(b"{heroes: nope").expect_err("err");
        assert_eq!(err.kind(), ErrorKind::Parse);
    }

    #[test]
    fn missing_heroes_field_is_a_parse_error() {
        let err = parse_document(br#"{"villains":[]}"#).expect_err("err");
        assert_eq!(err.kind(), ErrorKind::Parse);
    }

    #[test]
    fn ill_typed_heroes_field_is_a_parse_error() {
        let err = parse_document(br#"{"heroes":"Superman"}"#).expect_err("err");
        assert_eq!(err.kind(), ErrorKind::Parse);
    }
}
