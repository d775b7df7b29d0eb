use tui_dispatch::DispatchResult;

use crate::action::Action;
use crate::api::NewPokemon;
use crate::effect::Effect;
use crate::metrics;
use crate::state::{
    edit_apply_backspace, edit_apply_char, edit_field_count, AddFormState, AppState,
    ComparisonMode, ConfirmAction, DetailState, RosterKind, Screen, SlotId, StatsScope,
    POKEMON_TYPES, STATS_TOP_N, TRENDING_TOP_N,
};
use crate::store::{SetKind, TeamMember, TeamToggle, Toggled, TEAM_CAPACITY};

pub fn reducer(state: &mut AppState, action: Action) -> DispatchResult<Effect> {
    match action {
        Action::Init => DispatchResult::changed_with(start_page_load(state, 1)),

        Action::Navigate(screen) => navigate(state, screen),

        Action::PageDidLoad { generation, window } => {
            if generation != state.browse.generation {
                return DispatchResult::unchanged();
            }
            state.browse.loading = false;
            state.browse.page_items = window.items;
            state.browse.current_page = window.current_page;
            state.browse.total_pages = window.total_pages;
            state.browse.rebuild_view();
            DispatchResult::changed()
        }

        Action::PageDidError { generation, error } => {
            if generation != state.browse.generation {
                return DispatchResult::unchanged();
            }
            state.browse.loading = false;
            state.notify(format!("Page load failed: {error}"));
            DispatchResult::changed()
        }

        Action::PageNext => {
            if state.browse.current_page >= state.browse.total_pages {
                return DispatchResult::unchanged();
            }
            let page = state.browse.current_page + 1;
            DispatchResult::changed_with(start_page_load(state, page))
        }

        Action::PagePrev => {
            if state.browse.current_page <= 1 {
                return DispatchResult::unchanged();
            }
            let page = state.browse.current_page - 1;
            DispatchResult::changed_with(start_page_load(state, page))
        }

        Action::BrowseMove(delta) => {
            let moved = step(state.browse.selected, delta, state.browse.items.len());
            if moved == state.browse.selected {
                return DispatchResult::unchanged();
            }
            state.browse.selected = moved;
            DispatchResult::changed()
        }

        Action::BrowseOpenSelected => match state.browse.selected_pokemon() {
            Some(pokemon) => open_detail(state, pokemon.id.clone()),
            None => DispatchResult::unchanged(),
        },

        Action::SearchStart => {
            state.browse.search.active = true;
            DispatchResult::changed()
        }

        Action::SearchCancel => {
            state.browse.search.active = false;
            if state.browse.search.query.is_empty() {
                return DispatchResult::changed();
            }
            state.browse.search.query.clear();
            DispatchResult::changed_with(start_page_load(state, 1))
        }

        Action::SearchSubmit => {
            state.browse.search.active = false;
            DispatchResult::changed_with(start_page_load(state, 1))
        }

        Action::SearchInput(ch) => {
            state.browse.search.query.push(ch);
            DispatchResult::changed()
        }

        Action::SearchBackspace => {
            state.browse.search.query.pop();
            DispatchResult::changed()
        }

        Action::TypeFilterNext => {
            state.browse.type_filter = cycle_type(&state.browse.type_filter, true);
            state.browse.rebuild_view();
            DispatchResult::changed()
        }

        Action::TypeFilterPrev => {
            state.browse.type_filter = cycle_type(&state.browse.type_filter, false);
            state.browse.rebuild_view();
            DispatchResult::changed()
        }

        Action::TypeFilterClear => {
            if state.browse.type_filter.is_none() {
                return DispatchResult::unchanged();
            }
            state.browse.type_filter = None;
            state.browse.rebuild_view();
            DispatchResult::changed()
        }

        Action::SortKeyNext => {
            state.browse.sort_key = state.browse.sort_key.next();
            state.browse.rebuild_view();
            DispatchResult::changed()
        }

        Action::SortDirToggle => {
            state.browse.sort_dir = state.browse.sort_dir.flipped();
            state.browse.rebuild_view();
            DispatchResult::changed()
        }

        Action::OpenDetail { id } => open_detail(state, id),

        Action::DetailDidLoad(pokemon) => {
            let Some(detail) = state.detail.as_mut() else {
                return DispatchResult::unchanged();
            };
            if detail.id != pokemon.id {
                return DispatchResult::unchanged();
            }
            detail.loading = false;
            detail.pokemon = Some(pokemon);
            DispatchResult::changed()
        }

        Action::DetailDidError { id, error } => {
            let matches_open = state
                .detail
                .as_ref()
                .map(|detail| detail.id == id)
                .unwrap_or(false);
            if !matches_open {
                return DispatchResult::unchanged();
            }
            if error.is_not_found() {
                state.detail = None;
                state.screen = Screen::Browse;
                state.notify("Pokemon not found");
            } else {
                if let Some(detail) = state.detail.as_mut() {
                    detail.loading = false;
                }
                state.notify(format!("Detail load failed: {error}"));
            }
            DispatchResult::changed()
        }

        Action::EditStart => {
            let Some(detail) = state.detail.as_mut() else {
                return DispatchResult::unchanged();
            };
            let Some(pokemon) = detail.pokemon.clone() else {
                return DispatchResult::unchanged();
            };
            detail.editing = true;
            detail.draft = Some(pokemon);
            detail.field = 0;
            DispatchResult::changed()
        }

        Action::EditCancel => {
            let Some(detail) = state.detail.as_mut() else {
                return DispatchResult::unchanged();
            };
            detail.editing = false;
            detail.draft = None;
            detail.field = 0;
            DispatchResult::changed()
        }

        Action::EditFieldNext => move_edit_field(state, 1),
        Action::EditFieldPrev => move_edit_field(state, -1),

        Action::EditInput(ch) => {
            let Some(detail) = state.detail.as_mut() else {
                return DispatchResult::unchanged();
            };
            let field = detail.field;
            let Some(draft) = detail.draft.as_mut() else {
                return DispatchResult::unchanged();
            };
            edit_apply_char(draft, field, ch);
            DispatchResult::changed()
        }

        Action::EditBackspace => {
            let Some(detail) = state.detail.as_mut() else {
                return DispatchResult::unchanged();
            };
            let field = detail.field;
            let Some(draft) = detail.draft.as_mut() else {
                return DispatchResult::unchanged();
            };
            edit_apply_backspace(draft, field);
            DispatchResult::changed()
        }

        Action::EditSave => {
            let (id, draft) = match state.detail.as_ref() {
                Some(detail) if detail.editing && !detail.saving => match detail.draft.clone() {
                    Some(draft) => (detail.id.clone(), draft),
                    None => return DispatchResult::unchanged(),
                },
                _ => return DispatchResult::unchanged(),
            };
            if draft.name.english.trim().is_empty() {
                state.notify("An english name is required");
                return DispatchResult::changed();
            }
            if let Some(detail) = state.detail.as_mut() {
                detail.saving = true;
            }
            DispatchResult::changed_with(Effect::UpdatePokemon { id, pokemon: draft })
        }

        Action::UpdateDidSave(pokemon) => {
            if let Some(detail) = state.detail.as_mut() {
                if detail.id == pokemon.id {
                    detail.saving = false;
                    detail.editing = false;
                    detail.draft = None;
                    detail.pokemon = Some(pokemon.clone());
                }
            }
            if let Some(entry) = state
                .browse
                .page_items
                .iter_mut()
                .find(|entry| entry.id == pokemon.id)
            {
                *entry = pokemon.clone();
                state.browse.rebuild_view();
            }
            state.notify(format!("Saved {}", pokemon.display_name()));
            DispatchResult::changed()
        }

        Action::UpdateDidError { id, error } => {
            if let Some(detail) = state.detail.as_mut() {
                if detail.id == id {
                    detail.saving = false;
                }
            }
            state.notify(format!("Save failed: {error}"));
            DispatchResult::changed()
        }

        Action::DeleteDidComplete { id } => {
            let was_open = state
                .detail
                .as_ref()
                .map(|detail| detail.id == id)
                .unwrap_or(false);
            if was_open {
                state.detail = None;
                state.screen = Screen::Browse;
            }
            state.browse.page_items.retain(|entry| entry.id != id);
            state.browse.rebuild_view();
            state.notify("Deleted");
            // Deleting the last entry of the last page would otherwise
            // reload a page past the new end.
            let page = if state.browse.page_items.is_empty() && state.browse.current_page > 1 {
                state.browse.current_page - 1
            } else {
                state.browse.current_page
            };
            DispatchResult::changed_with(start_page_load(state, page))
        }

        Action::DeleteDidError { error, .. } => {
            state.notify(format!("Delete failed: {error}"));
            DispatchResult::changed()
        }

        Action::ToggleFavorite { id } => {
            let toggled = state.sets.toggle_favorite(&id);
            match toggled {
                Toggled::Added => state.notify("Added to favorites"),
                Toggled::Removed => state.notify("Removed from favorites"),
            }
            sync_roster_view(state, RosterKind::Favorites);
            DispatchResult::changed_with(persist(state))
        }

        Action::ToggleCollection { id } => {
            let toggled = state.sets.toggle_collection(&id);
            match toggled {
                Toggled::Added => state.notify("Added to collection"),
                Toggled::Removed => state.notify("Removed from collection"),
            }
            sync_roster_view(state, RosterKind::Collection);
            DispatchResult::changed_with(persist(state))
        }

        Action::ToggleTeam { id, name, image } => {
            let member = TeamMember { id, name, image };
            match state.sets.toggle_team(member) {
                TeamToggle::Added => state.notify("Joined the team"),
                TeamToggle::Removed => {
                    let sets = state.sets.clone();
                    state
                        .comparison
                        .my_team
                        .retain(|pokemon| sets.in_team(&pokemon.id));
                    state.notify("Left the team");
                }
                TeamToggle::Full => {
                    state.notify(format!("Team is full ({TEAM_CAPACITY} max)"));
                    return DispatchResult::changed();
                }
            }
            DispatchResult::changed_with(persist(state))
        }

        Action::SetsDidPersist => DispatchResult::unchanged(),

        Action::SetsPersistError(error) => {
            state.notify(format!("Could not save sets: {error}"));
            DispatchResult::changed()
        }

        Action::AddFieldNext => {
            let count = state.add_form.field_count();
            state.add_form.field = (state.add_form.field + 1) % count;
            DispatchResult::changed()
        }

        Action::AddFieldPrev => {
            let count = state.add_form.field_count();
            state.add_form.field = (state.add_form.field + count - 1) % count;
            DispatchResult::changed()
        }

        Action::AddInput(ch) => {
            state.add_form.apply_char(ch);
            DispatchResult::changed()
        }

        Action::AddBackspace => {
            state.add_form.apply_backspace();
            DispatchResult::changed()
        }

        Action::AddTypeField => {
            state.add_form.types.push(String::new());
            state.add_form.field = state.add_form.field_count() - 1;
            DispatchResult::changed()
        }

        Action::RemoveTypeField => {
            if state.add_form.types.len() <= 1 {
                return DispatchResult::unchanged();
            }
            state.add_form.types.pop();
            let count = state.add_form.field_count();
            if state.add_form.field >= count {
                state.add_form.field = count - 1;
            }
            DispatchResult::changed()
        }

        Action::AddSubmit => {
            if state.add_form.submitting {
                return DispatchResult::unchanged();
            }
            match build_create_draft(&state.add_form) {
                Ok(draft) => {
                    state.add_form.submitting = true;
                    DispatchResult::changed_with(Effect::CreatePokemon { draft })
                }
                Err(problem) => {
                    state.notify(problem);
                    DispatchResult::changed()
                }
            }
        }

        Action::CreateDidComplete(pokemon) => {
            state.add_form = AddFormState::default();
            state.screen = Screen::Browse;
            state.notify(format!("Created {}", pokemon.display_name()));
            DispatchResult::changed_with(start_page_load(state, 1))
        }

        Action::CreateDidError(error) => {
            state.add_form.submitting = false;
            state.notify(format!("Create failed: {error}"));
            DispatchResult::changed()
        }

        Action::RosterDidHydrate {
            kind,
            generation,
            items,
        } => {
            let roster = state.roster_mut(kind);
            if generation != roster.generation {
                return DispatchResult::unchanged();
            }
            roster.loading = false;
            roster.items = items;
            if roster.selected >= roster.items.len() {
                roster.selected = 0;
            }
            DispatchResult::changed()
        }

        Action::RosterMove(delta) => {
            let Some(kind) = roster_kind_for(state.screen) else {
                return DispatchResult::unchanged();
            };
            let roster = state.roster_mut(kind);
            let moved = step(roster.selected, delta, roster.items.len());
            if moved == roster.selected {
                return DispatchResult::unchanged();
            }
            roster.selected = moved;
            DispatchResult::changed()
        }

        Action::RosterRemoveSelected => {
            let Some(kind) = roster_kind_for(state.screen) else {
                return DispatchResult::unchanged();
            };
            let Some(id) = state
                .roster(kind)
                .items
                .get(state.roster(kind).selected)
                .map(|pokemon| pokemon.id.clone())
            else {
                return DispatchResult::unchanged();
            };
            match kind {
                RosterKind::Favorites => {
                    state.sets.toggle_favorite(&id);
                    state.notify("Removed from favorites");
                }
                RosterKind::Collection => {
                    state.sets.toggle_collection(&id);
                    state.notify("Removed from collection");
                }
            }
            sync_roster_view(state, kind);
            DispatchResult::changed_with(persist(state))
        }

        Action::StatsDidLoad {
            generation,
            scope,
            items,
        } => {
            if generation != state.stats.generation {
                return DispatchResult::unchanged();
            }
            state.stats.loading = false;
            state.stats.scope = scope;
            state.stats.summary = Some(metrics::collection_stats(&items));
            state.stats.top = metrics::top_by_attack(&items, STATS_TOP_N);
            DispatchResult::changed()
        }

        Action::StatsDidError { generation, error } => {
            if generation != state.stats.generation {
                return DispatchResult::unchanged();
            }
            state.stats.loading = false;
            state.notify(format!("Statistics failed: {error}"));
            DispatchResult::changed()
        }

        Action::TrendingDidLoad { generation, items } => {
            if generation != state.trending.generation {
                return DispatchResult::unchanged();
            }
            state.trending.loading = false;
            state.trending.items = metrics::top_by_attack(&items, TRENDING_TOP_N);
            DispatchResult::changed()
        }

        Action::TrendingDidError { generation, error } => {
            if generation != state.trending.generation {
                return DispatchResult::unchanged();
            }
            state.trending.loading = false;
            state.notify(format!("Trending failed: {error}"));
            DispatchResult::changed()
        }

        Action::ComparisonModeToggle => {
            state.comparison.mode = match state.comparison.mode {
                ComparisonMode::Duel => ComparisonMode::Team,
                ComparisonMode::Team => ComparisonMode::Duel,
            };
            state.comparison.close_search();
            DispatchResult::changed()
        }

        Action::CandidatesDidLoad { generation, items } => {
            if generation != state.comparison.generation {
                return DispatchResult::unchanged();
            }
            state.comparison.all_loading = false;
            state.comparison.all = items;
            DispatchResult::changed()
        }

        Action::CandidatesDidError { generation, error } => {
            if generation != state.comparison.generation {
                return DispatchResult::unchanged();
            }
            state.comparison.all_loading = false;
            state.notify(format!("Catalog load failed: {error}"));
            DispatchResult::changed()
        }

        Action::TeamDidHydrate { generation, items } => {
            if generation != state.comparison.team_generation {
                return DispatchResult::unchanged();
            }
            state.comparison.team_loading = false;
            state.comparison.my_team = items;
            DispatchResult::changed()
        }

        Action::SlotActivate(slot) => {
            if slot == SlotId::Opponent && state.comparison.opponents.len() >= TEAM_CAPACITY {
                state.notify(format!("Opponent team is full ({TEAM_CAPACITY} max)"));
                return DispatchResult::changed();
            }
            state.comparison.active_slot = Some(slot);
            state.comparison.query.clear();
            state.comparison.candidate_index = 0;
            DispatchResult::changed()
        }

        Action::SlotQueryInput(ch) => {
            if state.comparison.active_slot.is_none() {
                return DispatchResult::unchanged();
            }
            state.comparison.query.push(ch);
            state.comparison.candidate_index = 0;
            DispatchResult::changed()
        }

        Action::SlotQueryBackspace => {
            if state.comparison.active_slot.is_none() {
                return DispatchResult::unchanged();
            }
            state.comparison.query.pop();
            state.comparison.candidate_index = 0;
            DispatchResult::changed()
        }

        Action::SlotSearchCancel => {
            if state.comparison.active_slot.is_none() {
                return DispatchResult::unchanged();
            }
            state.comparison.close_search();
            DispatchResult::changed()
        }

        Action::CandidateMove(delta) => {
            let count = state.comparison.candidates().len();
            let moved = step(state.comparison.candidate_index, delta, count);
            if moved == state.comparison.candidate_index {
                return DispatchResult::unchanged();
            }
            state.comparison.candidate_index = moved;
            DispatchResult::changed()
        }

        Action::SlotPick => {
            let Some(slot) = state.comparison.active_slot else {
                return DispatchResult::unchanged();
            };
            let Some(pick) = state
                .comparison
                .candidates()
                .get(state.comparison.candidate_index)
                .map(|pokemon| (*pokemon).clone())
            else {
                return DispatchResult::unchanged();
            };
            match slot {
                SlotId::Duel(index) => {
                    state.comparison.slots[index.min(1)] = Some(pick);
                }
                SlotId::Opponent => {
                    if state
                        .comparison
                        .opponents
                        .iter()
                        .any(|pokemon| pokemon.id == pick.id)
                    {
                        state.notify("Already on the opponent team");
                        state.comparison.close_search();
                        return DispatchResult::changed();
                    }
                    if state.comparison.opponents.len() >= TEAM_CAPACITY {
                        state.notify(format!("Opponent team is full ({TEAM_CAPACITY} max)"));
                        state.comparison.close_search();
                        return DispatchResult::changed();
                    }
                    state.comparison.opponents.push(pick);
                }
            }
            state.comparison.close_search();
            DispatchResult::changed()
        }

        Action::DuelSlotRemove(index) => {
            if index > 1 || state.comparison.slots[index].is_none() {
                return DispatchResult::unchanged();
            }
            state.comparison.slots[index] = None;
            DispatchResult::changed()
        }

        Action::OpponentRemove(index) => {
            if index >= state.comparison.opponents.len() {
                return DispatchResult::unchanged();
            }
            state.comparison.opponents.remove(index);
            DispatchResult::changed()
        }

        Action::ConfirmRequest(pending) => {
            state.confirm = Some(pending);
            DispatchResult::changed()
        }

        Action::ConfirmCancel => {
            if state.confirm.take().is_none() {
                return DispatchResult::unchanged();
            }
            DispatchResult::changed()
        }

        Action::ConfirmAccept => {
            let Some(pending) = state.confirm.take() else {
                return DispatchResult::unchanged();
            };
            match pending {
                ConfirmAction::ClearFavorites => {
                    state.sets.clear(SetKind::Favorites);
                    state.favorites_view.items.clear();
                    state.favorites_view.selected = 0;
                    state.notify("Favorites cleared");
                    DispatchResult::changed_with(persist(state))
                }
                ConfirmAction::ClearCollection => {
                    state.sets.clear(SetKind::Collection);
                    state.collection_view.items.clear();
                    state.collection_view.selected = 0;
                    state.notify("Collection cleared");
                    DispatchResult::changed_with(persist(state))
                }
                ConfirmAction::ClearTeam => {
                    state.sets.clear(SetKind::Team);
                    state.comparison.my_team.clear();
                    state.notify("Team disbanded");
                    DispatchResult::changed_with(persist(state))
                }
                ConfirmAction::DeletePokemon { id } => {
                    DispatchResult::changed_with(Effect::DeletePokemon { id })
                }
            }
        }

        Action::Tick => {
            if state.message_timer > 0 {
                state.message_timer -= 1;
                if state.message_timer == 0 {
                    state.message = None;
                }
                return DispatchResult::changed();
            }
            DispatchResult::unchanged()
        }

        Action::UiTerminalResize(width, height) => {
            state.terminal_size = (width, height);
            DispatchResult::changed()
        }

        Action::Quit => DispatchResult::unchanged(),
    }
}

fn navigate(state: &mut AppState, screen: Screen) -> DispatchResult<Effect> {
    match screen {
        Screen::Browse => {
            state.screen = Screen::Browse;
            if state.browse.page_items.is_empty() && !state.browse.loading {
                return DispatchResult::changed_with(start_page_load(state, 1));
            }
            DispatchResult::changed()
        }

        // Detail is only reachable through an entity, never by tab.
        Screen::Detail => {
            if state.detail.is_none() {
                return DispatchResult::unchanged();
            }
            state.screen = Screen::Detail;
            DispatchResult::changed()
        }

        Screen::Add => {
            state.screen = Screen::Add;
            state.add_form = AddFormState::default();
            DispatchResult::changed()
        }

        Screen::Favorites => {
            state.screen = Screen::Favorites;
            DispatchResult::changed_with(hydrate_roster(state, RosterKind::Favorites))
        }

        Screen::Collection => {
            state.screen = Screen::Collection;
            DispatchResult::changed_with(hydrate_roster(state, RosterKind::Collection))
        }

        Screen::Statistics => {
            state.screen = Screen::Statistics;
            state.stats.generation += 1;
            state.stats.loading = true;
            let (scope, ids) = if state.sets.collection.is_empty() {
                (StatsScope::Catalog, Vec::new())
            } else {
                (StatsScope::Collection, state.sets.collection.clone())
            };
            state.stats.scope = scope;
            DispatchResult::changed_with(Effect::LoadStats {
                scope,
                ids,
                generation: state.stats.generation,
            })
        }

        Screen::Trending => {
            state.screen = Screen::Trending;
            state.trending.generation += 1;
            state.trending.loading = true;
            DispatchResult::changed_with(Effect::LoadTrending {
                generation: state.trending.generation,
            })
        }

        Screen::Comparison => {
            state.screen = Screen::Comparison;
            let mut effects = Vec::new();
            if state.comparison.all.is_empty() && !state.comparison.all_loading {
                state.comparison.generation += 1;
                state.comparison.all_loading = true;
                effects.push(Effect::LoadCandidates {
                    generation: state.comparison.generation,
                });
            }
            state.comparison.team_generation += 1;
            state.comparison.team_loading = true;
            effects.push(Effect::HydrateTeam {
                ids: state
                    .sets
                    .team
                    .iter()
                    .map(|member| member.id.clone())
                    .collect(),
                generation: state.comparison.team_generation,
            });
            DispatchResult::changed_with_many(effects)
        }
    }
}

fn start_page_load(state: &mut AppState, page: u32) -> Effect {
    state.browse.generation += 1;
    state.browse.loading = true;
    state.browse.current_page = page;
    let query = state.browse.search.query.trim();
    let name = if query.is_empty() {
        None
    } else {
        Some(query.to_string())
    };
    Effect::LoadPage {
        page,
        name,
        generation: state.browse.generation,
    }
}

fn open_detail(state: &mut AppState, id: String) -> DispatchResult<Effect> {
    state.screen = Screen::Detail;
    state.detail = Some(DetailState::new(id.clone()));
    DispatchResult::changed_with(Effect::LoadDetail { id })
}

fn hydrate_roster(state: &mut AppState, kind: RosterKind) -> Effect {
    let ids = match kind {
        RosterKind::Favorites => state.sets.favorites.clone(),
        RosterKind::Collection => state.sets.collection.clone(),
    };
    let roster = state.roster_mut(kind);
    roster.generation += 1;
    roster.loading = true;
    Effect::HydrateRoster {
        kind,
        ids,
        generation: roster.generation,
    }
}

fn persist(state: &AppState) -> Effect {
    Effect::PersistSets {
        sets: state.sets.clone(),
    }
}

/// Drops hydrated entries whose id left the backing set, keeping the
/// roster view consistent without a refetch.
fn sync_roster_view(state: &mut AppState, kind: RosterKind) {
    let sets = state.sets.clone();
    let roster = state.roster_mut(kind);
    roster.items.retain(|pokemon| match kind {
        RosterKind::Favorites => sets.is_favorite(&pokemon.id),
        RosterKind::Collection => sets.is_collected(&pokemon.id),
    });
    if roster.selected >= roster.items.len() {
        roster.selected = 0;
    }
}

fn roster_kind_for(screen: Screen) -> Option<RosterKind> {
    match screen {
        Screen::Favorites => Some(RosterKind::Favorites),
        Screen::Collection => Some(RosterKind::Collection),
        _ => None,
    }
}

fn move_edit_field(state: &mut AppState, delta: i32) -> DispatchResult<Effect> {
    let Some(detail) = state.detail.as_mut() else {
        return DispatchResult::unchanged();
    };
    let Some(draft) = detail.draft.as_ref() else {
        return DispatchResult::unchanged();
    };
    let count = edit_field_count(draft) as i32;
    detail.field = ((detail.field as i32 + delta + count) % count) as usize;
    DispatchResult::changed()
}

fn step(selected: usize, delta: i16, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    let moved = selected as i64 + i64::from(delta);
    moved.clamp(0, len as i64 - 1) as usize
}

fn cycle_type(filter: &Option<String>, forward: bool) -> Option<String> {
    let position = filter
        .as_deref()
        .and_then(|current| POKEMON_TYPES.iter().position(|t| *t == current));
    let next = match (position, forward) {
        (None, true) => Some(0),
        (None, false) => Some(POKEMON_TYPES.len() - 1),
        (Some(i), true) if i + 1 < POKEMON_TYPES.len() => Some(i + 1),
        (Some(_), true) => None,
        (Some(0), false) => None,
        (Some(i), false) => Some(i - 1),
    };
    next.map(|i| POKEMON_TYPES[i].to_string())
}

fn build_create_draft(form: &AddFormState) -> Result<NewPokemon, String> {
    let name = form.name.trim();
    if name.is_empty() {
        return Err("Name is required".to_string());
    }
    let hp: u16 = form
        .hp
        .trim()
        .parse()
        .map_err(|_| "HP must be a number".to_string())?;
    let cp: u16 = form
        .cp
        .trim()
        .parse()
        .map_err(|_| "CP must be a number".to_string())?;
    let picture = form.picture.trim();
    if picture.is_empty() {
        return Err("Picture URL is required".to_string());
    }
    let types: Vec<String> = form
        .types
        .iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    if types.is_empty() {
        return Err("At least one type is required".to_string());
    }
    Ok(NewPokemon {
        name: name.to_string(),
        hp,
        cp,
        picture: picture.to_string(),
        types,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::PageWindow;
    use crate::state::{BaseStats, NameSet, Pokemon};
    use pretty_assertions::assert_eq;

    fn mon(name: &str, hp: u16, attack: u16) -> Pokemon {
        Pokemon {
            id: name.to_lowercase(),
            name: NameSet::plain(name),
            types: vec!["Normal".to_string()],
            base: BaseStats {
                hp,
                attack,
                ..BaseStats::default()
            },
            image: String::new(),
        }
    }

    fn window(names: &[&str], page: u32, total: u32) -> PageWindow {
        PageWindow {
            items: names.iter().map(|n| mon(n, 10, 10)).collect(),
            current_page: page,
            total_pages: total,
        }
    }

    fn loaded_state(names: &[&str]) -> AppState {
        let mut state = AppState::default();
        let _ = reducer(&mut state, Action::Init);
        let generation = state.browse.generation;
        let _ = reducer(
            &mut state,
            Action::PageDidLoad {
                generation,
                window: window(names, 1, 2),
            },
        );
        state
    }

    #[test]
    fn init_requests_first_page() {
        let mut state = AppState::default();
        let result = reducer(&mut state, Action::Init);
        assert!(state.browse.loading);
        assert_eq!(result.effects.len(), 1);
        assert!(matches!(
            result.effects[0],
            Effect::LoadPage { page: 1, .. }
        ));
    }

    #[test]
    fn stale_page_response_is_discarded() {
        let mut state = AppState::default();
        let _ = reducer(&mut state, Action::Init);
        let stale = state.browse.generation;
        let _ = reducer(&mut state, Action::SearchSubmit);

        let result = reducer(
            &mut state,
            Action::PageDidLoad {
                generation: stale,
                window: window(&["Old"], 1, 1),
            },
        );
        assert!(!result.changed);
        assert!(state.browse.items.is_empty());
        assert!(state.browse.loading);

        let fresh = state.browse.generation;
        let result = reducer(
            &mut state,
            Action::PageDidLoad {
                generation: fresh,
                window: window(&["New"], 1, 1),
            },
        );
        assert!(result.changed);
        assert_eq!(state.browse.items[0].display_name(), "New");
    }

    #[test]
    fn page_next_respects_bounds() {
        let mut state = loaded_state(&["A"]);
        assert_eq!(state.browse.current_page, 1);
        let result = reducer(&mut state, Action::PagePrev);
        assert!(!result.changed);

        let result = reducer(&mut state, Action::PageNext);
        assert_eq!(result.effects.len(), 1);
        assert!(matches!(
            result.effects[0],
            Effect::LoadPage { page: 2, .. }
        ));
    }

    #[test]
    fn edit_cancel_restores_original() {
        let mut state = AppState::default();
        let _ = open_detail(&mut state, "pikachu".to_string());
        let _ = reducer(&mut state, Action::DetailDidLoad(mon("Pikachu", 35, 55)));

        let _ = reducer(&mut state, Action::EditStart);
        let _ = reducer(&mut state, Action::EditInput('X'));
        let draft_name = state
            .detail
            .as_ref()
            .and_then(|d| d.draft.as_ref())
            .map(|p| p.name.english.clone());
        assert_eq!(draft_name.as_deref(), Some("PikachuX"));

        let _ = reducer(&mut state, Action::EditCancel);
        let detail = state.detail.as_ref().unwrap();
        assert!(!detail.editing);
        assert!(detail.draft.is_none());
        assert_eq!(
            detail.pokemon.as_ref().unwrap().name.english,
            "Pikachu"
        );
    }

    #[test]
    fn edit_save_requires_english_name() {
        let mut state = AppState::default();
        let _ = open_detail(&mut state, "p".to_string());
        let _ = reducer(&mut state, Action::DetailDidLoad(mon("P", 10, 10)));
        let _ = reducer(&mut state, Action::EditStart);
        let _ = reducer(&mut state, Action::EditBackspace);

        let result = reducer(&mut state, Action::EditSave);
        assert!(result.effects.is_empty());
        assert!(state.message.is_some());
        assert!(!state.detail.as_ref().unwrap().saving);
    }

    #[test]
    fn fourth_team_member_is_rejected_without_persist() {
        let mut state = AppState::default();
        for name in ["a", "b", "c"] {
            let result = reducer(
                &mut state,
                Action::ToggleTeam {
                    id: name.to_string(),
                    name: name.to_uppercase(),
                    image: String::new(),
                },
            );
            assert_eq!(result.effects.len(), 1);
        }
        let result = reducer(
            &mut state,
            Action::ToggleTeam {
                id: "d".to_string(),
                name: "D".to_string(),
                image: String::new(),
            },
        );
        assert!(result.effects.is_empty());
        assert_eq!(state.sets.team.len(), 3);
        assert_eq!(state.message.as_deref(), Some("Team is full (3 max)"));
    }

    #[test]
    fn slot_pick_fills_duel_slot_and_closes_search() {
        let mut state = AppState::default();
        state.comparison.all = vec![mon("Pikachu", 35, 55), mon("Eevee", 55, 55)];
        let _ = reducer(&mut state, Action::SlotActivate(SlotId::Duel(0)));
        for ch in "pika".chars() {
            let _ = reducer(&mut state, Action::SlotQueryInput(ch));
        }
        let _ = reducer(&mut state, Action::SlotPick);

        assert_eq!(
            state.comparison.slots[0].as_ref().map(|p| p.display_name()),
            Some("Pikachu")
        );
        assert_eq!(state.comparison.active_slot, None);
        assert!(state.comparison.query.is_empty());
    }

    #[test]
    fn opponent_duplicates_are_ignored() {
        let mut state = AppState::default();
        state.comparison.all = vec![mon("Eevee", 55, 55)];
        for _ in 0..2 {
            let _ = reducer(&mut state, Action::SlotActivate(SlotId::Opponent));
            for ch in "eev".chars() {
                let _ = reducer(&mut state, Action::SlotQueryInput(ch));
            }
            let _ = reducer(&mut state, Action::SlotPick);
        }
        assert_eq!(state.comparison.opponents.len(), 1);
    }

    #[test]
    fn add_submit_validates_before_any_effect() {
        let mut state = AppState::default();
        state.add_form.name = "Mew".to_string();
        state.add_form.hp = "abc".to_string();
        state.add_form.cp = "90".to_string();
        state.add_form.picture = "http://img/mew.png".to_string();
        state.add_form.types = vec!["Psychic".to_string()];

        let result = reducer(&mut state, Action::AddSubmit);
        assert!(result.effects.is_empty());
        assert!(!state.add_form.submitting);
        assert_eq!(state.message.as_deref(), Some("HP must be a number"));

        state.add_form.hp = "100".to_string();
        let result = reducer(&mut state, Action::AddSubmit);
        assert!(state.add_form.submitting);
        assert!(matches!(result.effects[0], Effect::CreatePokemon { .. }));
    }

    #[test]
    fn confirm_flow_gates_destructive_clear() {
        let mut state = AppState::default();
        state.sets.toggle_favorite("a");
        let _ = reducer(
            &mut state,
            Action::ConfirmRequest(ConfirmAction::ClearFavorites),
        );
        let _ = reducer(&mut state, Action::ConfirmCancel);
        assert!(state.sets.is_favorite("a"));

        let _ = reducer(
            &mut state,
            Action::ConfirmRequest(ConfirmAction::ClearFavorites),
        );
        let result = reducer(&mut state, Action::ConfirmAccept);
        assert!(state.sets.favorites.is_empty());
        assert!(matches!(result.effects[0], Effect::PersistSets { .. }));
        assert_eq!(state.confirm, None);
    }

    #[test]
    fn confirm_delete_emits_delete_effect_only() {
        let mut state = AppState::default();
        let _ = reducer(
            &mut state,
            Action::ConfirmRequest(ConfirmAction::DeletePokemon {
                id: "abc".to_string(),
            }),
        );
        let result = reducer(&mut state, Action::ConfirmAccept);
        assert_eq!(result.effects.len(), 1);
        assert!(
            matches!(&result.effects[0], Effect::DeletePokemon { id } if id == "abc")
        );
    }

    #[test]
    fn deleting_last_item_of_last_page_steps_back_a_page() {
        let mut state = AppState::default();
        let _ = reducer(&mut state, Action::Init);
        let generation = state.browse.generation;
        let _ = reducer(
            &mut state,
            Action::PageDidLoad {
                generation,
                window: window(&["Solo"], 2, 2),
            },
        );

        let result = reducer(
            &mut state,
            Action::DeleteDidComplete {
                id: "solo".to_string(),
            },
        );
        assert!(matches!(
            result.effects[0],
            Effect::LoadPage { page: 1, .. }
        ));

        // A delete that leaves the page populated reloads it in place.
        let mut state = loaded_state(&["A", "B"]);
        let result = reducer(
            &mut state,
            Action::DeleteDidComplete {
                id: "a".to_string(),
            },
        );
        assert!(matches!(
            result.effects[0],
            Effect::LoadPage { page: 1, .. }
        ));
        assert_eq!(state.browse.items.len(), 1);
    }

    #[test]
    fn message_expires_after_timer() {
        let mut state = AppState::default();
        state.notify("hello");
        for _ in 0..crate::state::MESSAGE_TICKS {
            let _ = reducer(&mut state, Action::Tick);
        }
        assert_eq!(state.message, None);
    }

    #[test]
    fn type_filter_cycles_back_to_none() {
        let mut state = loaded_state(&["A"]);
        let _ = reducer(&mut state, Action::TypeFilterNext);
        assert_eq!(state.browse.type_filter.as_deref(), Some("Normal"));
        let _ = reducer(&mut state, Action::TypeFilterPrev);
        assert_eq!(state.browse.type_filter, None);
    }

    #[test]
    fn statistics_falls_back_to_catalog_when_collection_empty() {
        let mut state = AppState::default();
        let result = reducer(&mut state, Action::Navigate(Screen::Statistics));
        assert!(matches!(
            result.effects[0],
            Effect::LoadStats {
                scope: StatsScope::Catalog,
                ..
            }
        ));

        let mut state = AppState::default();
        state.sets.toggle_collection("a");
        let result = reducer(&mut state, Action::Navigate(Screen::Statistics));
        assert!(matches!(
            &result.effects[0],
            Effect::LoadStats {
                scope: StatsScope::Collection,
                ids,
                ..
            } if ids.len() == 1
        ));
    }
}
