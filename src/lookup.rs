use std::collections::HashMap;

use crate::roster::BootstrapResponse;

/// Display name used whenever an id has no mapping.
pub const UNKNOWN: &str = "n/a";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LookupCategory {
    Player,
    Team,
    Role,
}

/// Read-only id -> display name tables for players, teams and roles.
#[derive(Debug, Clone, Default)]
pub struct Lookup {
    names: HashMap<(LookupCategory, u32), String>,
}

impl Lookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_bootstrap(resp: &BootstrapResponse) -> Self {
        let mut lookup = Self::new();
        for player in &resp.players {
            lookup.insert(LookupCategory::Player, player.id, &player.web_name);
        }
        for team in &resp.teams {
            lookup.insert(LookupCategory::Team, team.id, &team.short_name);
        }
        for role in &resp.roles {
            lookup.insert(LookupCategory::Role, role.id, &role.short_name);
        }
        lookup
    }

    pub fn insert(&mut self, category: LookupCategory, id: u32, name: &str) {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return;
        }
        self.names.insert((category, id), trimmed.to_string());
    }

    pub fn with(mut self, category: LookupCategory, id: u32, name: &str) -> Self {
        self.insert(category, id, name);
        self
    }

    pub fn name_of(&self, category: LookupCategory, id: u32) -> &str {
        self.names
            .get(&(category, id))
            .map(String::as_str)
            .unwrap_or(UNKNOWN)
    }

    pub fn player(&self, id: u32) -> &str {
        self.name_of(LookupCategory::Player, id)
    }

    pub fn team(&self, id: u32) -> &str {
        self.name_of(LookupCategory::Team, id)
    }

    pub fn role(&self, id: u32) -> &str {
        self.name_of(LookupCategory::Role, id)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
