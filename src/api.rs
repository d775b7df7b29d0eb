use std::future::Future;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::state::{BaseStats, NameSet, Pokemon};

const DEFAULT_API_BASE: &str = "http://localhost:3000/api";

static API_BASE: OnceLock<String> = OnceLock::new();

pub fn set_api_base(url: &str) {
    let _ = API_BASE.set(url.trim_end_matches('/').to_string());
}

fn api_base() -> &'static str {
    API_BASE.get().map(String::as_str).unwrap_or(DEFAULT_API_BASE)
}

/// Failures at the store-client boundary. Single attempt, no retries;
/// callers decide recovery per screen.
#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ApiError {
    #[error("not found")]
    NotFound,
    #[error("{0}")]
    Transport(String),
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PageWindow {
    pub items: Vec<Pokemon>,
    pub current_page: u32,
    pub total_pages: u32,
}

/// Flat legacy draft accepted by the create endpoint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewPokemon {
    pub name: String,
    pub hp: u16,
    pub cp: u16,
    pub picture: String,
    pub types: Vec<String>,
}

#[derive(Clone, Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    data: Vec<RawPokemon>,
    #[serde(rename = "totalPages", default)]
    total_pages: u32,
}

#[derive(Clone, Debug, Deserialize)]
struct ItemResponse {
    data: RawPokemon,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(u64),
}

#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
enum RawName {
    Localized {
        #[serde(default)]
        english: Option<String>,
        #[serde(default)]
        japanese: Option<String>,
        #[serde(default)]
        chinese: Option<String>,
        #[serde(default)]
        french: Option<String>,
    },
    Plain(String),
}

#[derive(Clone, Debug, Default, Deserialize)]
struct RawBase {
    #[serde(rename = "HP", alias = "hp", default)]
    hp: u16,
    #[serde(rename = "Attack", alias = "attack", default)]
    attack: u16,
    #[serde(rename = "Defense", alias = "defense", default)]
    defense: u16,
    #[serde(rename = "SpecialAttack", alias = "Sp. Attack", default)]
    sp_attack: u16,
    #[serde(rename = "SpecialDefense", alias = "Sp. Defense", default)]
    sp_defense: u16,
    #[serde(rename = "Speed", alias = "speed", default)]
    speed: u16,
}

/// Tolerant wire shape covering both schema variants: nested
/// (`name.{english,..}`, `type`, `base.*`, `image`) and flat legacy
/// (string `name`, `types`, `hp`, `cp`, `picture`).
#[derive(Clone, Debug, Deserialize)]
struct RawPokemon {
    #[serde(alias = "_id", default)]
    id: Option<RawId>,
    name: RawName,
    #[serde(rename = "type", alias = "types", default)]
    types: Vec<String>,
    #[serde(default)]
    base: Option<RawBase>,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    picture: Option<String>,
    #[serde(default)]
    hp: Option<u16>,
    #[serde(default)]
    cp: Option<u16>,
}

/// Folds either wire shape into the canonical entity. Missing stats
/// become 0 so downstream arithmetic never sees an absent field; the
/// flat schema's `cp` maps to attack and `picture` to image.
fn normalize(raw: RawPokemon) -> Pokemon {
    let id = match raw.id {
        Some(RawId::Text(text)) => text,
        Some(RawId::Number(number)) => number.to_string(),
        None => String::new(),
    };
    let name = match raw.name {
        RawName::Localized {
            english,
            japanese,
            chinese,
            french,
        } => NameSet {
            english: english.unwrap_or_else(|| "Unnamed".to_string()),
            japanese,
            chinese,
            french,
        },
        RawName::Plain(text) => NameSet::plain(text),
    };
    let base = match raw.base {
        Some(base) => BaseStats {
            hp: base.hp,
            attack: base.attack,
            defense: base.defense,
            sp_attack: base.sp_attack,
            sp_defense: base.sp_defense,
            speed: base.speed,
        },
        None => BaseStats {
            hp: raw.hp.unwrap_or(0),
            attack: raw.cp.unwrap_or(0),
            ..BaseStats::default()
        },
    };
    Pokemon {
        id,
        name,
        types: raw.types,
        base,
        image: raw.image.or(raw.picture).unwrap_or_default(),
    }
}

pub async fn list(page: u32, name: Option<&str>) -> Result<PageWindow, ApiError> {
    let mut url = format!("{}/pokemons?page={page}", api_base());
    if let Some(name) = name {
        if !name.is_empty() {
            url.push_str("&name=");
            url.push_str(&urlencoding::encode(name));
        }
    }
    let response = checked(http_client().get(&url).send().await).await?;
    let body: ListResponse = response.json().await.map_err(transport)?;
    Ok(PageWindow {
        items: body.data.into_iter().map(normalize).collect(),
        current_page: page,
        total_pages: body.total_pages.max(1),
    })
}

pub async fn get(id: &str) -> Result<Pokemon, ApiError> {
    let url = format!("{}/pokemons/{id}", api_base());
    let response = checked(http_client().get(&url).send().await).await?;
    let body: ItemResponse = response.json().await.map_err(transport)?;
    Ok(normalize(body.data))
}

pub async fn create(draft: &NewPokemon) -> Result<Pokemon, ApiError> {
    let url = format!("{}/pokemons", api_base());
    let response = checked(http_client().post(&url).json(draft).send().await).await?;
    parse_entity(response).await
}

pub async fn update(id: &str, pokemon: &Pokemon) -> Result<Pokemon, ApiError> {
    let url = format!("{}/pokemons/{id}", api_base());
    let response = checked(http_client().put(&url).json(pokemon).send().await).await?;
    parse_entity(response).await
}

pub async fn delete(id: &str) -> Result<(), ApiError> {
    let url = format!("{}/pokemons/{id}", api_base());
    checked(http_client().delete(&url).send().await).await?;
    Ok(())
}

/// Materializes the entire catalog by walking pages until the reported
/// total is reached. Any page failure aborts the whole fetch; callers
/// never see a silently truncated set. Only the global views (stats,
/// trending, comparison candidates) call this; browsing stays on
/// single-page fetches.
pub async fn fetch_all(name: Option<&str>) -> Result<Vec<Pokemon>, ApiError> {
    fetch_all_pages(|page| list(page, name)).await
}

pub async fn fetch_all_pages<F, Fut>(mut fetch: F) -> Result<Vec<Pokemon>, ApiError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<PageWindow, ApiError>>,
{
    let mut all = Vec::new();
    let mut page = 1;
    loop {
        let window = fetch(page).await?;
        let total = window.total_pages;
        all.extend(window.items);
        // Terminates even when the store reports 0 or 1 total pages.
        if page >= total {
            break;
        }
        page += 1;
    }
    Ok(all)
}

/// Per-id hydration for stored sets. Ids that fail to resolve are
/// skipped rather than aborting the whole hydration.
pub async fn fetch_many(ids: &[String]) -> Vec<Pokemon> {
    let mut out = Vec::with_capacity(ids.len());
    for id in ids {
        if let Ok(pokemon) = get(id).await {
            out.push(pokemon);
        }
    }
    out
}

async fn parse_entity(response: reqwest::Response) -> Result<Pokemon, ApiError> {
    // Mutation endpoints answer either `{ data: entity }` or the bare
    // entity depending on server version.
    let value: serde_json::Value = response.json().await.map_err(transport)?;
    let raw_value = match value {
        serde_json::Value::Object(ref map) if map.contains_key("data") => {
            map.get("data").cloned().unwrap_or_default()
        }
        other => other,
    };
    let raw: RawPokemon = serde_json::from_value(raw_value).map_err(transport)?;
    Ok(normalize(raw))
}

async fn checked(
    result: Result<reqwest::Response, reqwest::Error>,
) -> Result<reqwest::Response, ApiError> {
    let response = result.map_err(transport)?;
    if response.status() == reqwest::StatusCode::NOT_FOUND {
        return Err(ApiError::NotFound);
    }
    response.error_for_status().map_err(transport)
}

fn transport(err: impl std::fmt::Display) -> ApiError {
    ApiError::Transport(err.to_string())
}

fn http_client() -> &'static reqwest::Client {
    static CLIENT: OnceLock<reqwest::Client> = OnceLock::new();
    CLIENT.get_or_init(reqwest::Client::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::cell::Cell;

    #[test]
    fn normalizes_nested_schema() {
        let raw: RawPokemon = serde_json::from_str(
            r#"{
                "_id": "abc123",
                "name": {"english": "Pikachu", "japanese": "ピカチュウ"},
                "type": ["Electric"],
                "base": {"HP": 35, "Attack": 55, "Defense": 40,
                         "SpecialAttack": 50, "SpecialDefense": 50, "Speed": 90},
                "image": "http://img/pikachu.png"
            }"#,
        )
        .unwrap();
        let pokemon = normalize(raw);
        assert_eq!(pokemon.id, "abc123");
        assert_eq!(pokemon.name.english, "Pikachu");
        assert_eq!(pokemon.name.japanese.as_deref(), Some("ピカチュウ"));
        assert_eq!(pokemon.types, vec!["Electric"]);
        assert_eq!(pokemon.base.hp, 35);
        assert_eq!(pokemon.base.speed, 90);
        assert_eq!(pokemon.image, "http://img/pikachu.png");
    }

    #[test]
    fn normalizes_flat_legacy_schema() {
        let raw: RawPokemon = serde_json::from_str(
            r#"{
                "id": 25,
                "name": "Pikachu",
                "types": ["Electric"],
                "hp": 35,
                "cp": 410,
                "picture": "http://img/25.png"
            }"#,
        )
        .unwrap();
        let pokemon = normalize(raw);
        assert_eq!(pokemon.id, "25");
        assert_eq!(pokemon.name.english, "Pikachu");
        assert_eq!(pokemon.name.french, None);
        assert_eq!(pokemon.base.hp, 35);
        assert_eq!(pokemon.base.attack, 410);
        assert_eq!(pokemon.base.defense, 0);
        assert_eq!(pokemon.image, "http://img/25.png");
    }

    #[test]
    fn normalizes_partial_base_block_to_zeros() {
        let raw: RawPokemon =
            serde_json::from_str(r#"{"name": {"english": "Ditto"}, "base": {"HP": 48}}"#).unwrap();
        let pokemon = normalize(raw);
        assert_eq!(pokemon.base.hp, 48);
        assert_eq!(pokemon.base.attack, 0);
        assert!(pokemon.types.is_empty());
    }

    fn page(items: &[&str], current: u32, total: u32) -> PageWindow {
        PageWindow {
            items: items
                .iter()
                .map(|name| Pokemon {
                    id: name.to_lowercase(),
                    name: NameSet::plain(*name),
                    ..Pokemon::default()
                })
                .collect(),
            current_page: current,
            total_pages: total,
        }
    }

    #[tokio::test]
    async fn fetch_all_pages_walks_every_page_once() {
        let calls = Cell::new(0u32);
        let all = fetch_all_pages(|page_no| {
            calls.set(calls.get() + 1);
            let window = match page_no {
                1 => page(&["A", "B"], 1, 3),
                2 => page(&["C", "D"], 2, 3),
                _ => page(&["E"], 3, 3),
            };
            async move { Ok(window) }
        })
        .await
        .unwrap();
        assert_eq!(calls.get(), 3);
        let names: Vec<&str> = all.iter().map(|p| p.display_name()).collect();
        assert_eq!(names, vec!["A", "B", "C", "D", "E"]);
    }

    #[tokio::test]
    async fn fetch_all_pages_terminates_on_zero_total() {
        let calls = Cell::new(0u32);
        let all = fetch_all_pages(|_| {
            calls.set(calls.get() + 1);
            let window = page(&[], 1, 0);
            async move { Ok(window) }
        })
        .await
        .unwrap();
        assert_eq!(calls.get(), 1);
        assert!(all.is_empty());
    }

    #[tokio::test]
    async fn fetch_all_pages_aborts_on_failure() {
        let result = fetch_all_pages(|page_no| async move {
            if page_no == 1 {
                Ok(page(&["A"], 1, 3))
            } else {
                Err(ApiError::Transport("boom".to_string()))
            }
        })
        .await;
        assert_eq!(result, Err(ApiError::Transport("boom".to_string())));
    }
}
