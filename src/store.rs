use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

pub const TEAM_CAPACITY: usize = 3;

static DATA_DIR: OnceLock<PathBuf> = OnceLock::new();

pub fn set_data_dir(dir: PathBuf) {
    let _ = DATA_DIR.set(dir);
}

pub fn data_dir() -> PathBuf {
    if let Some(dir) = DATA_DIR.get() {
        return dir.clone();
    }
    dirs_next::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pokedex")
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SetKind {
    Favorites,
    Collection,
    Team,
}

impl SetKind {
    fn file_name(&self) -> &'static str {
        match self {
            SetKind::Favorites => "favorites.json",
            SetKind::Collection => "collection.json",
            SetKind::Team => "team.json",
        }
    }
}

/// Denormalized team entry so the roster renders without a fetch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMember {
    pub id: String,
    pub name: String,
    pub image: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Toggled {
    Added,
    Removed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TeamToggle {
    Added,
    Removed,
    Full,
}

/// Client-side membership sets, kept in memory as the source of truth
/// and flushed whole to disk after every mutation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LocalSets {
    #[serde(default)]
    pub favorites: Vec<String>,
    #[serde(default)]
    pub collection: Vec<String>,
    #[serde(default)]
    pub team: Vec<TeamMember>,
}

impl LocalSets {
    pub fn is_favorite(&self, id: &str) -> bool {
        self.favorites.iter().any(|entry| entry == id)
    }

    pub fn is_collected(&self, id: &str) -> bool {
        self.collection.iter().any(|entry| entry == id)
    }

    pub fn in_team(&self, id: &str) -> bool {
        self.team.iter().any(|member| member.id == id)
    }

    pub fn toggle_favorite(&mut self, id: &str) -> Toggled {
        toggle_id(&mut self.favorites, id)
    }

    pub fn toggle_collection(&mut self, id: &str) -> Toggled {
        toggle_id(&mut self.collection, id)
    }

    /// Removal always succeeds; insertion is rejected once the team is
    /// at capacity, leaving the set untouched.
    pub fn toggle_team(&mut self, member: TeamMember) -> TeamToggle {
        if let Some(pos) = self.team.iter().position(|entry| entry.id == member.id) {
            self.team.remove(pos);
            return TeamToggle::Removed;
        }
        if self.team.len() >= TEAM_CAPACITY {
            return TeamToggle::Full;
        }
        self.team.push(member);
        TeamToggle::Added
    }

    pub fn clear(&mut self, kind: SetKind) {
        match kind {
            SetKind::Favorites => self.favorites.clear(),
            SetKind::Collection => self.collection.clear(),
            SetKind::Team => self.team.clear(),
        }
    }
}

fn toggle_id(ids: &mut Vec<String>, id: &str) -> Toggled {
    if let Some(pos) = ids.iter().position(|entry| entry == id) {
        ids.remove(pos);
        Toggled::Removed
    } else {
        ids.push(id.to_string());
        Toggled::Added
    }
}

/// Reads all three set files. A missing or unreadable file yields that
/// set empty instead of failing the whole load.
pub async fn load(dir: &Path) -> LocalSets {
    LocalSets {
        favorites: load_file(&dir.join(SetKind::Favorites.file_name())).await,
        collection: load_file(&dir.join(SetKind::Collection.file_name())).await,
        team: load_file(&dir.join(SetKind::Team.file_name())).await,
    }
}

async fn load_file<T: for<'de> Deserialize<'de> + Default>(path: &Path) -> T {
    match tokio::fs::read_to_string(path).await {
        Ok(contents) => serde_json::from_str(&contents).unwrap_or_default(),
        Err(_) => T::default(),
    }
}

pub async fn save(dir: &Path, sets: &LocalSets) -> Result<(), String> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| format!("Failed to create data dir: {e}"))?;
    save_file(&dir.join(SetKind::Favorites.file_name()), &sets.favorites).await?;
    save_file(&dir.join(SetKind::Collection.file_name()), &sets.collection).await?;
    save_file(&dir.join(SetKind::Team.file_name()), &sets.team).await?;
    Ok(())
}

async fn save_file<T: Serialize>(path: &Path, value: &T) -> Result<(), String> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| format!("Failed to serialize {}: {e}", path.display()))?;
    tokio::fs::write(path, json)
        .await
        .map_err(|e| format!("Failed to write {}: {e}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn member(id: &str) -> TeamMember {
        TeamMember {
            id: id.to_string(),
            name: id.to_uppercase(),
            image: String::new(),
        }
    }

    #[test]
    fn double_toggle_restores_membership() {
        let mut sets = LocalSets::default();
        assert_eq!(sets.toggle_favorite("a"), Toggled::Added);
        assert!(sets.is_favorite("a"));
        assert_eq!(sets.toggle_favorite("a"), Toggled::Removed);
        assert!(!sets.is_favorite("a"));
        assert!(sets.favorites.is_empty());
    }

    #[test]
    fn team_rejects_fourth_member() {
        let mut sets = LocalSets::default();
        for id in ["a", "b", "c"] {
            assert_eq!(sets.toggle_team(member(id)), TeamToggle::Added);
        }
        assert_eq!(sets.toggle_team(member("d")), TeamToggle::Full);
        assert_eq!(sets.team.len(), TEAM_CAPACITY);
        assert!(!sets.in_team("d"));
    }

    #[test]
    fn team_removal_allowed_at_capacity() {
        let mut sets = LocalSets::default();
        for id in ["a", "b", "c"] {
            sets.toggle_team(member(id));
        }
        assert_eq!(sets.toggle_team(member("b")), TeamToggle::Removed);
        assert_eq!(sets.team.len(), 2);
        assert_eq!(sets.toggle_team(member("d")), TeamToggle::Added);
    }

    #[test]
    fn clear_empties_one_set_only() {
        let mut sets = LocalSets::default();
        sets.toggle_favorite("a");
        sets.toggle_collection("b");
        sets.toggle_team(member("c"));
        sets.clear(SetKind::Collection);
        assert!(sets.collection.is_empty());
        assert!(sets.is_favorite("a"));
        assert!(sets.in_team("c"));
    }

    #[tokio::test]
    async fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut sets = LocalSets::default();
        sets.toggle_favorite("f1");
        sets.toggle_collection("c1");
        sets.toggle_collection("c2");
        sets.toggle_team(member("t1"));
        save(dir.path(), &sets).await.unwrap();
        let loaded = load(dir.path()).await;
        assert_eq!(loaded, sets);
    }

    #[tokio::test]
    async fn load_from_missing_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = load(&dir.path().join("nope")).await;
        assert_eq!(loaded, LocalSets::default());
    }
}
