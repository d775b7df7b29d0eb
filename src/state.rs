use serde::{Deserialize, Serialize};
use tui_dispatch_debug::debug::{ron_string, DebugSection, DebugState};

use crate::store::LocalSets;

pub const POKEMON_TYPES: &[&str] = &[
    "Normal", "Fire", "Water", "Electric", "Grass", "Ice", "Fighting", "Poison", "Ground",
    "Flying", "Psychic", "Bug", "Rock", "Ghost", "Dragon", "Dark", "Steel", "Fairy",
];

/// How long a transient message stays on screen, in ticks.
pub const MESSAGE_TICKS: u16 = 25;

pub const STATS_TOP_N: usize = 5;
pub const TRENDING_TOP_N: usize = 12;
pub const HISTOGRAM_TOP_N: usize = 8;
pub const CANDIDATE_LIMIT: usize = 10;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameSet {
    pub english: String,
    pub japanese: Option<String>,
    pub chinese: Option<String>,
    pub french: Option<String>,
}

impl NameSet {
    pub fn plain(english: impl Into<String>) -> Self {
        Self {
            english: english.into(),
            japanese: None,
            chinese: None,
            french: None,
        }
    }
}

/// Canonical six-stat block. Serializes in the nested wire shape so a
/// canonical entity can be PUT back to the server as-is.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseStats {
    #[serde(rename = "HP", default)]
    pub hp: u16,
    #[serde(rename = "Attack", default)]
    pub attack: u16,
    #[serde(rename = "Defense", default)]
    pub defense: u16,
    #[serde(rename = "SpecialAttack", default)]
    pub sp_attack: u16,
    #[serde(rename = "SpecialDefense", default)]
    pub sp_defense: u16,
    #[serde(rename = "Speed", default)]
    pub speed: u16,
}

impl BaseStats {
    pub fn total(&self) -> u64 {
        self.hp as u64
            + self.attack as u64
            + self.defense as u64
            + self.sp_attack as u64
            + self.sp_defense as u64
            + self.speed as u64
    }
}

/// Canonical entity shape. The wire mixes a flat legacy schema and this
/// nested one; `api::normalize` folds both into this.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Pokemon {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: NameSet,
    #[serde(rename = "type", default)]
    pub types: Vec<String>,
    #[serde(default)]
    pub base: BaseStats,
    #[serde(default)]
    pub image: String,
}

impl Pokemon {
    pub fn display_name(&self) -> &str {
        if self.name.english.is_empty() {
            "Unnamed"
        } else {
            &self.name.english
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Screen {
    Browse,
    Detail,
    Add,
    Favorites,
    Collection,
    Statistics,
    Trending,
    Comparison,
}

impl Screen {
    pub fn title(self) -> &'static str {
        match self {
            Screen::Browse => "Pokedex",
            Screen::Detail => "Detail",
            Screen::Add => "Add",
            Screen::Favorites => "Favorites",
            Screen::Collection => "Collection",
            Screen::Statistics => "Statistics",
            Screen::Trending => "Trending",
            Screen::Comparison => "Comparison",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortKey {
    Name,
    Hp,
    Attack,
}

impl SortKey {
    pub fn label(self) -> &'static str {
        match self {
            SortKey::Name => "name",
            SortKey::Hp => "hp",
            SortKey::Attack => "attack",
        }
    }

    pub fn next(self) -> Self {
        match self {
            SortKey::Name => SortKey::Hp,
            SortKey::Hp => SortKey::Attack,
            SortKey::Attack => SortKey::Name,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDir {
    Asc,
    Desc,
}

impl SortDir {
    pub fn flipped(self) -> Self {
        match self {
            SortDir::Asc => SortDir::Desc,
            SortDir::Desc => SortDir::Asc,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchState {
    pub active: bool,
    pub query: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BrowseState {
    /// Raw page as returned by the server.
    pub page_items: Vec<Pokemon>,
    /// Page after client-side type filter and sort; what the list shows.
    pub items: Vec<Pokemon>,
    pub current_page: u32,
    pub total_pages: u32,
    pub selected: usize,
    pub search: SearchState,
    pub type_filter: Option<String>,
    pub sort_key: SortKey,
    pub sort_dir: SortDir,
    pub loading: bool,
    /// Request-generation token; a page response with a stale generation
    /// is discarded so a slow early response cannot overwrite a later one.
    pub generation: u64,
}

impl Default for BrowseState {
    fn default() -> Self {
        Self {
            page_items: Vec::new(),
            items: Vec::new(),
            current_page: 1,
            total_pages: 1,
            selected: 0,
            search: SearchState::default(),
            type_filter: None,
            sort_key: SortKey::Name,
            sort_dir: SortDir::Asc,
            loading: false,
            generation: 0,
        }
    }
}

impl BrowseState {
    /// Re-derives the visible list from the raw page.
    pub fn rebuild_view(&mut self) {
        let filter = self.type_filter.as_ref().map(|t| t.to_lowercase());
        self.items = self
            .page_items
            .iter()
            .filter(|p| match &filter {
                Some(wanted) => p.types.iter().any(|t| t.to_lowercase() == *wanted),
                None => true,
            })
            .cloned()
            .collect();

        let dir = self.sort_dir;
        match self.sort_key {
            SortKey::Name => self
                .items
                .sort_by(|a, b| order(a.name.english.to_lowercase().cmp(&b.name.english.to_lowercase()), dir)),
            SortKey::Hp => self
                .items
                .sort_by(|a, b| order(a.base.hp.cmp(&b.base.hp), dir)),
            SortKey::Attack => self
                .items
                .sort_by(|a, b| order(a.base.attack.cmp(&b.base.attack), dir)),
        }

        if self.selected >= self.items.len() {
            self.selected = 0;
        }
    }

    pub fn selected_pokemon(&self) -> Option<&Pokemon> {
        self.items.get(self.selected)
    }
}

fn order(ordering: std::cmp::Ordering, dir: SortDir) -> std::cmp::Ordering {
    match dir {
        SortDir::Asc => ordering,
        SortDir::Desc => ordering.reverse(),
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetailState {
    pub id: String,
    pub pokemon: Option<Pokemon>,
    pub loading: bool,
    pub editing: bool,
    /// Edit buffer: snapshot of `pokemon`, mutated in place while editing.
    pub draft: Option<Pokemon>,
    pub field: usize,
    pub saving: bool,
}

impl DetailState {
    pub fn new(id: String) -> Self {
        Self {
            id,
            pokemon: None,
            loading: true,
            editing: false,
            draft: None,
            field: 0,
            saving: false,
        }
    }
}

/// Number of editable fields in the detail edit form: four names, the
/// image URL, one slot per type, then the six stats.
pub fn edit_field_count(draft: &Pokemon) -> usize {
    5 + draft.types.len() + 6
}

pub fn edit_field_label(draft: &Pokemon, field: usize) -> String {
    match field {
        0 => "Name (english)".to_string(),
        1 => "Name (japanese)".to_string(),
        2 => "Name (chinese)".to_string(),
        3 => "Name (french)".to_string(),
        4 => "Image URL".to_string(),
        i if i < 5 + draft.types.len() => format!("Type {}", i - 4),
        i => {
            let stat = i - 5 - draft.types.len();
            match stat {
                0 => "HP",
                1 => "Attack",
                2 => "Defense",
                3 => "Sp. Attack",
                4 => "Sp. Defense",
                _ => "Speed",
            }
            .to_string()
        }
    }
}

pub fn edit_field_value(draft: &Pokemon, field: usize) -> String {
    match field {
        0 => draft.name.english.clone(),
        1 => draft.name.japanese.clone().unwrap_or_default(),
        2 => draft.name.chinese.clone().unwrap_or_default(),
        3 => draft.name.french.clone().unwrap_or_default(),
        4 => draft.image.clone(),
        i if i < 5 + draft.types.len() => draft.types[i - 5].clone(),
        i => {
            let stat = i - 5 - draft.types.len();
            let value = match stat {
                0 => draft.base.hp,
                1 => draft.base.attack,
                2 => draft.base.defense,
                3 => draft.base.sp_attack,
                4 => draft.base.sp_defense,
                _ => draft.base.speed,
            };
            value.to_string()
        }
    }
}

pub fn edit_apply_char(draft: &mut Pokemon, field: usize, ch: char) {
    match field {
        0 => draft.name.english.push(ch),
        1 => draft.name.japanese.get_or_insert_with(String::new).push(ch),
        2 => draft.name.chinese.get_or_insert_with(String::new).push(ch),
        3 => draft.name.french.get_or_insert_with(String::new).push(ch),
        4 => draft.image.push(ch),
        i if i < 5 + draft.types.len() => draft.types[i - 5].push(ch),
        i => {
            if let Some(digit) = ch.to_digit(10) {
                let stat = stat_slot(draft, i - 5 - draft.types.len());
                *stat = stat.saturating_mul(10).saturating_add(digit as u16).min(999);
            }
        }
    }
}

pub fn edit_apply_backspace(draft: &mut Pokemon, field: usize) {
    match field {
        0 => {
            draft.name.english.pop();
        }
        1 => pop_opt(&mut draft.name.japanese),
        2 => pop_opt(&mut draft.name.chinese),
        3 => pop_opt(&mut draft.name.french),
        4 => {
            draft.image.pop();
        }
        i if i < 5 + draft.types.len() => {
            draft.types[i - 5].pop();
        }
        i => {
            let stat = stat_slot(draft, i - 5 - draft.types.len());
            *stat /= 10;
        }
    }
}

fn stat_slot(draft: &mut Pokemon, stat: usize) -> &mut u16 {
    match stat {
        0 => &mut draft.base.hp,
        1 => &mut draft.base.attack,
        2 => &mut draft.base.defense,
        3 => &mut draft.base.sp_attack,
        4 => &mut draft.base.sp_defense,
        _ => &mut draft.base.speed,
    }
}

fn pop_opt(field: &mut Option<String>) {
    if let Some(text) = field.as_mut() {
        text.pop();
        if text.is_empty() {
            *field = None;
        }
    }
}

/// Draft for the add form. Kept in the legacy flat shape because that is
/// what the create endpoint accepts; numeric fields stay as text buffers
/// until submit-time validation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AddFormState {
    pub name: String,
    pub hp: String,
    pub cp: String,
    pub picture: String,
    pub types: Vec<String>,
    pub field: usize,
    pub submitting: bool,
}

impl Default for AddFormState {
    fn default() -> Self {
        Self {
            name: String::new(),
            hp: String::new(),
            cp: String::new(),
            picture: String::new(),
            types: vec![String::new()],
            field: 0,
            submitting: false,
        }
    }
}

impl AddFormState {
    pub fn field_count(&self) -> usize {
        4 + self.types.len()
    }

    pub fn field_label(&self, field: usize) -> String {
        match field {
            0 => "Name".to_string(),
            1 => "HP".to_string(),
            2 => "CP".to_string(),
            3 => "Picture URL".to_string(),
            i => format!("Type {}", i - 3),
        }
    }

    pub fn field_value(&self, field: usize) -> &str {
        match field {
            0 => &self.name,
            1 => &self.hp,
            2 => &self.cp,
            3 => &self.picture,
            i => &self.types[i - 4],
        }
    }

    fn field_mut(&mut self, field: usize) -> &mut String {
        match field {
            0 => &mut self.name,
            1 => &mut self.hp,
            2 => &mut self.cp,
            3 => &mut self.picture,
            i => &mut self.types[i - 4],
        }
    }

    pub fn apply_char(&mut self, ch: char) {
        let numeric = matches!(self.field, 1 | 2);
        if numeric && !ch.is_ascii_digit() {
            return;
        }
        let field = self.field;
        self.field_mut(field).push(ch);
    }

    pub fn apply_backspace(&mut self) {
        let field = self.field;
        self.field_mut(field).pop();
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RosterKind {
    Favorites,
    Collection,
}

impl RosterKind {
    pub fn label(self) -> &'static str {
        match self {
            RosterKind::Favorites => "favorites",
            RosterKind::Collection => "collection",
        }
    }
}

/// Shared state for the two hydrated-set screens.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RosterState {
    pub items: Vec<Pokemon>,
    pub selected: usize,
    pub loading: bool,
    pub generation: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatsScope {
    Collection,
    Catalog,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatsState {
    pub scope: StatsScope,
    pub summary: Option<crate::metrics::CollectionStats>,
    pub top: Vec<Pokemon>,
    pub loading: bool,
    pub generation: u64,
}

impl Default for StatsState {
    fn default() -> Self {
        Self {
            scope: StatsScope::Catalog,
            summary: None,
            top: Vec::new(),
            loading: false,
            generation: 0,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TrendingState {
    pub items: Vec<Pokemon>,
    pub loading: bool,
    pub generation: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComparisonMode {
    Duel,
    Team,
}

/// Which comparison slot currently owns the search box. Only one slot
/// may be searching at a time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlotId {
    Duel(usize),
    Opponent,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComparisonState {
    pub mode: ComparisonMode,
    /// Full catalog, materialized once per visit for candidate search.
    pub all: Vec<Pokemon>,
    pub all_loading: bool,
    pub generation: u64,
    pub slots: [Option<Pokemon>; 2],
    pub my_team: Vec<Pokemon>,
    pub team_loading: bool,
    pub team_generation: u64,
    pub opponents: Vec<Pokemon>,
    pub active_slot: Option<SlotId>,
    pub query: String,
    pub candidate_index: usize,
}

impl Default for ComparisonState {
    fn default() -> Self {
        Self {
            mode: ComparisonMode::Duel,
            all: Vec::new(),
            all_loading: false,
            generation: 0,
            slots: [None, None],
            my_team: Vec::new(),
            team_loading: false,
            team_generation: 0,
            opponents: Vec::new(),
            active_slot: None,
            query: String::new(),
            candidate_index: 0,
        }
    }
}

impl ComparisonState {
    /// Case-insensitive substring match over the materialized catalog,
    /// capped to the first ten hits. Empty query matches nothing.
    pub fn candidates(&self) -> Vec<&Pokemon> {
        let query = self.query.trim().to_lowercase();
        if query.is_empty() {
            return Vec::new();
        }
        self.all
            .iter()
            .filter(|p| p.name.english.to_lowercase().contains(&query))
            .take(CANDIDATE_LIMIT)
            .collect()
    }

    pub fn close_search(&mut self) {
        self.active_slot = None;
        self.query.clear();
        self.candidate_index = 0;
    }
}

/// One destructive action pending user confirmation. All clear/delete
/// flows funnel through this single modal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ConfirmAction {
    ClearFavorites,
    ClearCollection,
    ClearTeam,
    DeletePokemon { id: String },
}

impl ConfirmAction {
    pub fn prompt(&self) -> String {
        match self {
            ConfirmAction::ClearFavorites => "Clear all favorites?".to_string(),
            ConfirmAction::ClearCollection => "Clear the whole collection?".to_string(),
            ConfirmAction::ClearTeam => "Disband the team?".to_string(),
            ConfirmAction::DeletePokemon { .. } => "Delete this Pokemon permanently?".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AppState {
    pub terminal_size: (u16, u16),
    pub screen: Screen,
    pub browse: BrowseState,
    pub detail: Option<DetailState>,
    pub add_form: AddFormState,
    pub favorites_view: RosterState,
    pub collection_view: RosterState,
    pub stats: StatsState,
    pub trending: TrendingState,
    pub comparison: ComparisonState,
    pub sets: LocalSets,
    pub confirm: Option<ConfirmAction>,
    pub message: Option<String>,
    pub message_timer: u16,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            terminal_size: (80, 24),
            screen: Screen::Browse,
            browse: BrowseState::default(),
            detail: None,
            add_form: AddFormState::default(),
            favorites_view: RosterState::default(),
            collection_view: RosterState::default(),
            stats: StatsState::default(),
            trending: TrendingState::default(),
            comparison: ComparisonState::default(),
            sets: LocalSets::default(),
            confirm: None,
            message: None,
            message_timer: 0,
        }
    }
}

impl AppState {
    pub fn with_sets(sets: LocalSets) -> Self {
        Self {
            sets,
            ..Self::default()
        }
    }

    pub fn notify(&mut self, message: impl Into<String>) {
        self.message = Some(message.into());
        self.message_timer = MESSAGE_TICKS;
    }

    pub fn roster_mut(&mut self, kind: RosterKind) -> &mut RosterState {
        match kind {
            RosterKind::Favorites => &mut self.favorites_view,
            RosterKind::Collection => &mut self.collection_view,
        }
    }

    pub fn roster(&self, kind: RosterKind) -> &RosterState {
        match kind {
            RosterKind::Favorites => &self.favorites_view,
            RosterKind::Collection => &self.collection_view,
        }
    }
}

impl DebugState for AppState {
    fn debug_sections(&self) -> Vec<DebugSection> {
        vec![
            DebugSection::new("Screen")
                .entry("screen", ron_string(&self.screen))
                .entry("message", ron_string(&self.message))
                .entry("confirm", ron_string(&self.confirm)),
            DebugSection::new("Browse")
                .entry("page", ron_string(&self.browse.current_page))
                .entry("total_pages", ron_string(&self.browse.total_pages))
                .entry("items", ron_string(&self.browse.items.len()))
                .entry("search", ron_string(&self.browse.search.query))
                .entry("type_filter", ron_string(&self.browse.type_filter))
                .entry("sort", ron_string(&self.browse.sort_key.label()))
                .entry("generation", ron_string(&self.browse.generation))
                .entry("loading", ron_string(&self.browse.loading)),
            DebugSection::new("Sets")
                .entry("favorites", ron_string(&self.sets.favorites.len()))
                .entry("collection", ron_string(&self.sets.collection.len()))
                .entry("team", ron_string(&self.sets.team.len())),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mon(name: &str, types: &[&str], hp: u16, attack: u16) -> Pokemon {
        Pokemon {
            id: name.to_lowercase(),
            name: NameSet::plain(name),
            types: types.iter().map(|t| t.to_string()).collect(),
            base: BaseStats {
                hp,
                attack,
                ..BaseStats::default()
            },
            image: String::new(),
        }
    }

    #[test]
    fn rebuild_view_filters_by_type_and_sorts() {
        let mut browse = BrowseState {
            page_items: vec![
                mon("Squirtle", &["Water"], 44, 48),
                mon("Charmander", &["Fire"], 39, 52),
                mon("Vulpix", &["Fire"], 38, 41),
            ],
            type_filter: Some("Fire".to_string()),
            sort_key: SortKey::Attack,
            sort_dir: SortDir::Desc,
            ..BrowseState::default()
        };
        browse.rebuild_view();
        let names: Vec<&str> = browse.items.iter().map(|p| p.display_name()).collect();
        assert_eq!(names, vec!["Charmander", "Vulpix"]);
    }

    #[test]
    fn rebuild_view_clamps_selection() {
        let mut browse = BrowseState {
            page_items: vec![mon("Pikachu", &["Electric"], 35, 55)],
            selected: 7,
            ..BrowseState::default()
        };
        browse.rebuild_view();
        assert_eq!(browse.selected, 0);
    }

    #[test]
    fn candidates_match_case_insensitive_and_cap_at_ten() {
        let mut comparison = ComparisonState::default();
        for i in 0..15 {
            comparison.all.push(mon(&format!("Chu{i}"), &["Electric"], 1, 1));
        }
        comparison.all.push(mon("Eevee", &["Normal"], 1, 1));
        comparison.query = "chu".to_string();
        assert_eq!(comparison.candidates().len(), CANDIDATE_LIMIT);
        comparison.query = "EEV".to_string();
        assert_eq!(comparison.candidates().len(), 1);
        comparison.query = "  ".to_string();
        assert!(comparison.candidates().is_empty());
    }

    #[test]
    fn edit_buffer_round_trips_stat_digits() {
        let mut draft = mon("Pikachu", &["Electric"], 35, 55);
        let stat_base = 5 + draft.types.len();
        edit_apply_backspace(&mut draft, stat_base); // 35 -> 3
        assert_eq!(draft.base.hp, 3);
        edit_apply_char(&mut draft, stat_base, '9');
        assert_eq!(draft.base.hp, 39);
        edit_apply_char(&mut draft, stat_base, 'x');
        assert_eq!(draft.base.hp, 39);
    }
}
