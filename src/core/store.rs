//! Purpose: Own the in-memory hero collection and its CRUD operations.
//! Exports: `HeroStore`.
//! Role: Sole authority over the collection; controllers never touch it directly.
//! Invariants: `load_from_source` fetches at most once while the store is populated.
//! Invariants: Lookup misses degrade to absent/unchanged values, never panics.
//! Invariants: All returned collections are snapshots, not views.
use std::collections::HashSet;

use crate::core::error::{Error, ErrorKind};
use crate::core::hero::Hero;
use crate::core::source::HeroSource;

#[derive(Debug, Default)]
pub struct HeroStore {
    heroes: Vec<Hero>,
}

impl HeroStore {
    pub fn new() -> Self {
        Self { heroes: Vec::new() }
    }

    /// Seed a store directly, bypassing the source. Used by tests and by
    /// callers that already hold a fetched collection.
    pub fn from_heroes(heroes: Vec<Hero>) -> Self {
        Self { heroes }
    }

    pub fn is_loaded(&self) -> bool {
        !self.heroes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.heroes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heroes.is_empty()
    }

    /// Load the collection from the external asset collaborator.
    ///
    /// A populated store returns its records as-is without re-fetching, so
    /// the first successful load acts as a one-time cache. Fetch failures
    /// are logged and swallowed: callers see an empty collection and the
    /// store stays empty, so a later call retries the source.
    pub fn load_from_source(&mut self, source: &dyn HeroSource) -> Vec<Hero> {
        if !self.heroes.is_empty() {
            return self.heroes.clone();
        }
        match source.fetch_heroes() {
            Ok(heroes) => {
                warn_on_duplicate_ids(&heroes);
                self.heroes = heroes;
                self.heroes.clone()
            }
            Err(err) => {
                tracing::error!(
                    source = %source.describe(),
                    error = %err,
                    "failed to load heroes; continuing with an empty collection"
                );
                Vec::new()
            }
        }
    }

    /// Snapshot of the current collection.
    pub fn list(&self) -> Vec<Hero> {
        self.heroes.clone()
    }

    /// Linear scan by id. A miss is an absent value, not an error.
    pub fn find_by_id(&self, id: &str) -> Option<Hero> {
        self.heroes.iter().find(|hero| hero.id == id).cloned()
    }

    /// Case-insensitive substring match against the superhero name. All
    /// matches are returned in collection order; the empty query matches
    /// everything.
    pub fn suggest(&self, query: &str) -> Vec<Hero> {
        let needle = query.to_lowercase();
        self.heroes
            .iter()
            .filter(|hero| hero.superhero.to_lowercase().contains(&needle))
            .cloned()
            .collect()
    }

    /// Append a record, assigning `id = len().to_string()` and overwriting
    /// any caller-provided id. Returns the stored record.
    pub fn add(&mut self, mut hero: Hero) -> Hero {
        hero.id = self.heroes.len().to_string();
        let stored = hero.clone();
        self.heroes.push(hero);
        stored
    }

    /// Replace the record with a matching id and return it. On a miss the
    /// error is logged, the collection is left unchanged, and the input is
    /// returned as-is; callers that need to observe the miss use
    /// [`HeroStore::update_checked`].
    pub fn update(&mut self, hero: Hero) -> Hero {
        match self.heroes.iter_mut().find(|existing| existing.id == hero.id) {
            Some(slot) => {
                *slot = hero;
                slot.clone()
            }
            None => {
                tracing::error!(id = %hero.id, "update target not found; collection unchanged");
                hero
            }
        }
    }

    /// Same replacement as [`HeroStore::update`], with the miss surfaced as
    /// a `NotFound` error instead of a silent no-op.
    pub fn update_checked(&mut self, hero: Hero) -> Result<Hero, Error> {
        if self.heroes.iter().any(|existing| existing.id == hero.id) {
            Ok(self.update(hero))
        } else {
            Err(Error::new(ErrorKind::NotFound)
                .with_message("hero not found")
                .with_id(hero.id))
        }
    }

    /// Remove every record with a matching id. Returns whether the
    /// collection shrank.
    pub fn delete_by_id(&mut self, id: &str) -> bool {
        let before = self.heroes.len();
        self.heroes.retain(|hero| hero.id != id);
        self.heroes.len() < before
    }
}

// Length-derived ids collide once records are deleted, so a fresh asset can
// legitimately carry duplicates. Tolerate them, but say so.
fn warn_on_duplicate_ids(heroes: &[Hero]) {
    let mut seen = HashSet::new();
    for hero in heroes {
        if !seen.insert(hero.id.as_str()) {
            tracing::warn!(id = %hero.id, "duplicate hero id in asset document");
        }
    }
}
