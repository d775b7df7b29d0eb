use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Cell, Clear, Paragraph, Row, Table, Wrap},
    Frame,
};
use tui_dispatch::{EventKind, EventOutcome, RenderContext};

use crate::action::Action;
use crate::metrics::{self, Winner};
use crate::state::{
    edit_field_count, edit_field_label, edit_field_value, AppState, ComparisonMode,
    ComparisonState, ConfirmAction, Pokemon, RosterKind, Screen, SlotId, SortDir, StatsScope,
    HISTOGRAM_TOP_N,
};
use crate::store::TEAM_CAPACITY;

const BG_PANEL: Color = Color::Rgb(26, 30, 44);
const TEXT_MAIN: Color = Color::Rgb(222, 226, 234);
const TEXT_DIM: Color = Color::Rgb(140, 148, 166);
const ACCENT: Color = Color::Rgb(240, 92, 84);
const ACCENT_ALT: Color = Color::Rgb(116, 192, 252);
const ACCENT_GOLD: Color = Color::Rgb(236, 200, 110);
const HIGHLIGHT_BG: Color = Color::Rgb(60, 70, 96);
const BORDER: Color = Color::Rgb(70, 78, 100);

const TABS: &[(Screen, &str)] = &[
    (Screen::Browse, "1 Pokedex"),
    (Screen::Add, "2 Add"),
    (Screen::Favorites, "3 Favorites"),
    (Screen::Collection, "4 Collection"),
    (Screen::Statistics, "5 Stats"),
    (Screen::Trending, "6 Trending"),
    (Screen::Comparison, "7 Compare"),
];

pub fn render(frame: &mut Frame, area: Rect, state: &AppState, _ctx: RenderContext) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(3),
        ])
        .split(area);

    render_header(frame, chunks[0], state);
    match state.screen {
        Screen::Browse => render_browse(frame, chunks[1], state),
        Screen::Detail => render_detail(frame, chunks[1], state),
        Screen::Add => render_add(frame, chunks[1], state),
        Screen::Favorites => render_roster(frame, chunks[1], state, RosterKind::Favorites),
        Screen::Collection => render_roster(frame, chunks[1], state, RosterKind::Collection),
        Screen::Statistics => render_statistics(frame, chunks[1], state),
        Screen::Trending => render_trending(frame, chunks[1], state),
        Screen::Comparison => render_comparison(frame, chunks[1], state),
    }
    render_footer(frame, chunks[2], state);

    if let Some(pending) = &state.confirm {
        render_confirm(frame, area, pending);
    }
}

fn panel(title: &str) -> Block<'_> {
    Block::default()
        .title(format!(" {title} "))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(BORDER))
        .style(Style::default().bg(BG_PANEL).fg(TEXT_MAIN))
}

fn render_header(frame: &mut Frame, area: Rect, state: &AppState) {
    let mut spans = Vec::new();
    for (screen, label) in TABS {
        let active = state.screen == *screen
            || (state.screen == Screen::Detail && *screen == Screen::Browse);
        let style = if active {
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(TEXT_DIM)
        };
        spans.push(Span::styled(format!(" {label} "), style));
        spans.push(Span::styled("|", Style::default().fg(BORDER)));
    }
    spans.pop();
    let header = Paragraph::new(Line::from(spans))
        .alignment(Alignment::Center)
        .block(panel(state.screen.title()));
    frame.render_widget(header, area);
}

fn render_footer(frame: &mut Frame, area: Rect, state: &AppState) {
    let line = if let Some(message) = &state.message {
        Line::from(Span::styled(
            message.clone(),
            Style::default().fg(ACCENT_GOLD).add_modifier(Modifier::BOLD),
        ))
    } else {
        Line::from(Span::styled(hints_for(state), Style::default().fg(TEXT_DIM)))
    };
    let footer = Paragraph::new(line)
        .alignment(Alignment::Center)
        .block(panel(""));
    frame.render_widget(footer, area);
}

fn hints_for(state: &AppState) -> String {
    match state.screen {
        Screen::Browse if state.browse.search.active => {
            "type to search  Enter submit  Esc cancel".to_string()
        }
        Screen::Browse => {
            "arrows move  Enter open  / search  [ ] type  0 clear  s/o sort  f/c/t mark  q quit"
                .to_string()
        }
        Screen::Detail => match state.detail.as_ref() {
            Some(detail) if detail.editing => {
                "Tab next field  Enter save  Esc discard".to_string()
            }
            _ => "e edit  d delete  f/c/t mark  Esc back".to_string(),
        },
        Screen::Add => "Tab next field  Ctrl+t add type  Ctrl+d drop type  Enter create  Esc back"
            .to_string(),
        Screen::Favorites | Screen::Collection => {
            "arrows move  Enter open  r remove  x clear all  Esc back".to_string()
        }
        Screen::Statistics | Screen::Trending => "Esc back  q quit".to_string(),
        Screen::Comparison => match state.comparison.active_slot {
            Some(_) => "type to search  arrows choose  Enter pick  Esc cancel".to_string(),
            None => match state.comparison.mode {
                ComparisonMode::Duel => {
                    "a/b fill slot  A/B clear slot  m team mode  Esc back".to_string()
                }
                ComparisonMode::Team => {
                    "a add opponent  r drop opponent  x disband team  m duel mode  Esc back"
                        .to_string()
                }
            },
        },
    }
}

fn marks(state: &AppState, pokemon: &Pokemon) -> String {
    let mut out = String::new();
    if state.sets.is_favorite(&pokemon.id) {
        out.push('*');
    }
    if state.sets.is_collected(&pokemon.id) {
        out.push('+');
    }
    if state.sets.in_team(&pokemon.id) {
        out.push('T');
    }
    out
}

fn render_browse(frame: &mut Frame, area: Rect, state: &AppState) {
    let browse = &state.browse;
    let mut title = format!("Pokedex  page {}/{}", browse.current_page, browse.total_pages);
    if !browse.search.query.is_empty() || browse.search.active {
        title.push_str(&format!("  search: {}", browse.search.query));
        if browse.search.active {
            title.push('_');
        }
    }
    if let Some(filter) = &browse.type_filter {
        title.push_str(&format!("  type: {filter}"));
    }
    title.push_str(&format!(
        "  sort: {} {}",
        browse.sort_key.label(),
        match browse.sort_dir {
            SortDir::Asc => "asc",
            SortDir::Desc => "desc",
        }
    ));

    if browse.loading {
        let loading = Paragraph::new("Loading...")
            .alignment(Alignment::Center)
            .block(panel(&title));
        frame.render_widget(loading, area);
        return;
    }
    if browse.items.is_empty() {
        let empty = Paragraph::new("No Pokemon on this page")
            .alignment(Alignment::Center)
            .style(Style::default().fg(TEXT_DIM))
            .block(panel(&title));
        frame.render_widget(empty, area);
        return;
    }

    let header = Row::new(vec!["", "Name", "Types", "HP", "Attack", "Power"])
        .style(Style::default().fg(ACCENT_ALT).add_modifier(Modifier::BOLD));
    let rows = browse.items.iter().enumerate().map(|(index, pokemon)| {
        let row = Row::new(vec![
            Cell::from(marks(state, pokemon)),
            Cell::from(pokemon.display_name().to_string()),
            Cell::from(pokemon.types.join("/")),
            Cell::from(pokemon.base.hp.to_string()),
            Cell::from(pokemon.base.attack.to_string()),
            Cell::from(pokemon.base.total().to_string()),
        ]);
        if index == browse.selected {
            row.style(Style::default().bg(HIGHLIGHT_BG).add_modifier(Modifier::BOLD))
        } else {
            row
        }
    });
    let table = Table::new(
        rows,
        [
            Constraint::Length(4),
            Constraint::Min(14),
            Constraint::Min(14),
            Constraint::Length(5),
            Constraint::Length(7),
            Constraint::Length(6),
        ],
    )
    .header(header)
    .block(panel(&title));
    frame.render_widget(table, area);
}

fn stat_lines(pokemon: &Pokemon) -> Vec<Line<'static>> {
    [
        ("HP", pokemon.base.hp),
        ("Attack", pokemon.base.attack),
        ("Defense", pokemon.base.defense),
        ("Sp. Attack", pokemon.base.sp_attack),
        ("Sp. Defense", pokemon.base.sp_defense),
        ("Speed", pokemon.base.speed),
    ]
    .into_iter()
    .map(|(label, value)| {
        Line::from(vec![
            Span::styled(format!("{label:<12}"), Style::default().fg(TEXT_DIM)),
            Span::styled(format!("{value:>4}  "), Style::default().fg(TEXT_MAIN)),
            Span::styled(
                "#".repeat((value / 10).min(30) as usize),
                Style::default().fg(ACCENT_ALT),
            ),
        ])
    })
    .collect()
}

fn render_detail(frame: &mut Frame, area: Rect, state: &AppState) {
    let Some(detail) = state.detail.as_ref() else {
        return;
    };
    if detail.editing {
        render_edit_form(frame, area, state);
        return;
    }
    let Some(pokemon) = detail.pokemon.as_ref() else {
        let loading = Paragraph::new(if detail.loading { "Loading..." } else { "" })
            .alignment(Alignment::Center)
            .block(panel("Detail"));
        frame.render_widget(loading, area);
        return;
    };

    let mut lines = vec![
        Line::from(Span::styled(
            pokemon.display_name().to_string(),
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            pokemon.types.join(" / "),
            Style::default().fg(ACCENT_ALT),
        )),
        Line::from(""),
    ];
    for (label, value) in [
        ("Japanese", pokemon.name.japanese.as_deref()),
        ("Chinese", pokemon.name.chinese.as_deref()),
        ("French", pokemon.name.french.as_deref()),
    ] {
        if let Some(value) = value {
            lines.push(Line::from(vec![
                Span::styled(format!("{label:<12}"), Style::default().fg(TEXT_DIM)),
                Span::raw(value.to_string()),
            ]));
        }
    }
    lines.push(Line::from(""));
    lines.extend(stat_lines(pokemon));
    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::styled("Total power ", Style::default().fg(TEXT_DIM)),
        Span::styled(
            pokemon.base.total().to_string(),
            Style::default().fg(ACCENT_GOLD).add_modifier(Modifier::BOLD),
        ),
    ]));
    if !pokemon.image.is_empty() {
        lines.push(Line::from(Span::styled(
            pokemon.image.clone(),
            Style::default().fg(TEXT_DIM),
        )));
    }
    let marks = marks(state, pokemon);
    if !marks.is_empty() {
        lines.push(Line::from(Span::styled(
            format!("Marked: {marks}"),
            Style::default().fg(ACCENT_GOLD),
        )));
    }

    let body = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(panel("Detail"));
    frame.render_widget(body, area);
}

fn render_edit_form(frame: &mut Frame, area: Rect, state: &AppState) {
    let Some(detail) = state.detail.as_ref() else {
        return;
    };
    let Some(draft) = detail.draft.as_ref() else {
        return;
    };
    let mut lines = Vec::new();
    for field in 0..edit_field_count(draft) {
        let selected = field == detail.field;
        let cursor = if selected { "_" } else { "" };
        let label_style = if selected {
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(TEXT_DIM)
        };
        lines.push(Line::from(vec![
            Span::styled(format!("{:<16}", edit_field_label(draft, field)), label_style),
            Span::raw(format!("{}{cursor}", edit_field_value(draft, field))),
        ]));
    }
    if detail.saving {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Saving...",
            Style::default().fg(ACCENT_GOLD),
        )));
    }
    let title = format!("Edit {}", draft.display_name());
    let form = Paragraph::new(lines).block(panel(&title));
    frame.render_widget(form, area);
}

fn render_add(frame: &mut Frame, area: Rect, state: &AppState) {
    let form = &state.add_form;
    let mut lines = Vec::new();
    for field in 0..form.field_count() {
        let selected = field == form.field;
        let cursor = if selected { "_" } else { "" };
        let label_style = if selected {
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(TEXT_DIM)
        };
        lines.push(Line::from(vec![
            Span::styled(format!("{:<16}", form.field_label(field)), label_style),
            Span::raw(format!("{}{cursor}", form.field_value(field))),
        ]));
    }
    if form.submitting {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Creating...",
            Style::default().fg(ACCENT_GOLD),
        )));
    }
    let body = Paragraph::new(lines).block(panel("New Pokemon"));
    frame.render_widget(body, area);
}

fn render_roster(frame: &mut Frame, area: Rect, state: &AppState, kind: RosterKind) {
    let roster = state.roster(kind);
    let title = format!("{} ({})", state.screen.title(), roster.items.len());
    if roster.loading {
        let loading = Paragraph::new("Loading...")
            .alignment(Alignment::Center)
            .block(panel(&title));
        frame.render_widget(loading, area);
        return;
    }
    if roster.items.is_empty() {
        let hint = match kind {
            RosterKind::Favorites => "No favorites yet. Mark one with 'f' in the Pokedex.",
            RosterKind::Collection => "Collection is empty. Mark one with 'c' in the Pokedex.",
        };
        let empty = Paragraph::new(hint)
            .alignment(Alignment::Center)
            .style(Style::default().fg(TEXT_DIM))
            .block(panel(&title));
        frame.render_widget(empty, area);
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(4)])
        .split(area);

    let rows = roster.items.iter().enumerate().map(|(index, pokemon)| {
        let row = Row::new(vec![
            Cell::from(pokemon.display_name().to_string()),
            Cell::from(pokemon.types.join("/")),
            Cell::from(pokemon.base.hp.to_string()),
            Cell::from(pokemon.base.attack.to_string()),
            Cell::from(pokemon.base.total().to_string()),
        ]);
        if index == roster.selected {
            row.style(Style::default().bg(HIGHLIGHT_BG).add_modifier(Modifier::BOLD))
        } else {
            row
        }
    });
    let header = Row::new(vec!["Name", "Types", "HP", "Attack", "Power"])
        .style(Style::default().fg(ACCENT_ALT).add_modifier(Modifier::BOLD));
    let table = Table::new(
        rows,
        [
            Constraint::Min(14),
            Constraint::Min(14),
            Constraint::Length(5),
            Constraint::Length(7),
            Constraint::Length(6),
        ],
    )
    .header(header)
    .block(panel(&title));
    frame.render_widget(table, chunks[0]);

    // Running summary of the hydrated set.
    let stats = metrics::collection_stats(&roster.items);
    let summary = Paragraph::new(vec![Line::from(vec![
        Span::styled("avg HP ", Style::default().fg(TEXT_DIM)),
        Span::raw(stats.average.hp.to_string()),
        Span::styled("   avg Attack ", Style::default().fg(TEXT_DIM)),
        Span::raw(stats.average.attack.to_string()),
        Span::styled("   total power ", Style::default().fg(TEXT_DIM)),
        Span::styled(
            stats.total_power.to_string(),
            Style::default().fg(ACCENT_GOLD),
        ),
        Span::styled("   types ", Style::default().fg(TEXT_DIM)),
        Span::raw(stats.distinct_types.to_string()),
    ])])
    .block(panel("Summary"));
    frame.render_widget(summary, chunks[1]);
}

fn render_statistics(frame: &mut Frame, area: Rect, state: &AppState) {
    let stats = &state.stats;
    let title = match stats.scope {
        StatsScope::Collection => "Statistics (collection)",
        StatsScope::Catalog => "Statistics (full catalog)",
    };
    if stats.loading {
        let loading = Paragraph::new("Crunching the numbers...")
            .alignment(Alignment::Center)
            .block(panel(title));
        frame.render_widget(loading, area);
        return;
    }
    let Some(summary) = stats.summary.as_ref() else {
        frame.render_widget(panel(title), area);
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let mut left = vec![
        Line::from(vec![
            Span::styled("Pokemon      ", Style::default().fg(TEXT_DIM)),
            Span::styled(
                summary.count.to_string(),
                Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(vec![
            Span::styled("Total power  ", Style::default().fg(TEXT_DIM)),
            Span::styled(
                summary.total_power.to_string(),
                Style::default().fg(ACCENT_GOLD),
            ),
        ]),
        Line::from(vec![
            Span::styled("Types seen   ", Style::default().fg(TEXT_DIM)),
            Span::raw(summary.distinct_types.to_string()),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            "Average stats",
            Style::default().fg(ACCENT_ALT).add_modifier(Modifier::BOLD),
        )),
    ];
    for (label, value) in [
        ("HP", summary.average.hp),
        ("Attack", summary.average.attack),
        ("Defense", summary.average.defense),
        ("Sp. Attack", summary.average.sp_attack),
        ("Sp. Defense", summary.average.sp_defense),
        ("Speed", summary.average.speed),
    ] {
        left.push(Line::from(vec![
            Span::styled(format!("{label:<12}"), Style::default().fg(TEXT_DIM)),
            Span::raw(format!("{value:>4}  ")),
            Span::styled(
                "#".repeat((value / 10).min(30) as usize),
                Style::default().fg(ACCENT_ALT),
            ),
        ]));
    }
    frame.render_widget(Paragraph::new(left).block(panel(title)), chunks[0]);

    let right_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(chunks[1]);

    let max_count = summary.type_counts.first().map(|(_, c)| *c).unwrap_or(1).max(1);
    let histogram: Vec<Line> = summary
        .type_counts
        .iter()
        .take(HISTOGRAM_TOP_N)
        .map(|(name, count)| {
            let width = (count * 24 / max_count).max(1) as usize;
            Line::from(vec![
                Span::styled(format!("{name:<12}"), Style::default().fg(TEXT_DIM)),
                Span::styled("#".repeat(width), Style::default().fg(ACCENT)),
                Span::raw(format!(" {count}")),
            ])
        })
        .collect();
    frame.render_widget(
        Paragraph::new(histogram).block(panel("Types")),
        right_chunks[0],
    );

    let top: Vec<Line> = stats
        .top
        .iter()
        .enumerate()
        .map(|(rank, pokemon)| {
            Line::from(vec![
                Span::styled(format!("{:>2}. ", rank + 1), Style::default().fg(TEXT_DIM)),
                Span::styled(
                    format!("{:<16}", pokemon.display_name()),
                    Style::default().fg(TEXT_MAIN),
                ),
                Span::styled(
                    format!("atk {}", pokemon.base.attack),
                    Style::default().fg(ACCENT_GOLD),
                ),
            ])
        })
        .collect();
    frame.render_widget(
        Paragraph::new(top).block(panel("Strongest")),
        right_chunks[1],
    );
}

fn render_trending(frame: &mut Frame, area: Rect, state: &AppState) {
    let trending = &state.trending;
    if trending.loading {
        let loading = Paragraph::new("Scanning the catalog...")
            .alignment(Alignment::Center)
            .block(panel("Trending"));
        frame.render_widget(loading, area);
        return;
    }
    let lines: Vec<Line> = trending
        .items
        .iter()
        .enumerate()
        .map(|(rank, pokemon)| {
            let rank_style = match rank {
                0 => Style::default().fg(ACCENT_GOLD).add_modifier(Modifier::BOLD),
                1 | 2 => Style::default().fg(ACCENT),
                _ => Style::default().fg(TEXT_DIM),
            };
            Line::from(vec![
                Span::styled(format!("{:>2}. ", rank + 1), rank_style),
                Span::styled(
                    format!("{:<16}", pokemon.display_name()),
                    Style::default().fg(TEXT_MAIN),
                ),
                Span::styled(
                    format!("{:<18}", pokemon.types.join("/")),
                    Style::default().fg(ACCENT_ALT),
                ),
                Span::styled(
                    format!("atk {:<5}", pokemon.base.attack),
                    Style::default().fg(ACCENT_GOLD),
                ),
                Span::styled(
                    format!("power {}", pokemon.base.total()),
                    Style::default().fg(TEXT_DIM),
                ),
            ])
        })
        .collect();
    let body = Paragraph::new(lines).block(panel("Trending: highest attack"));
    frame.render_widget(body, area);
}

fn slot_line(label: &str, occupant: Option<&Pokemon>, active: bool) -> Line<'static> {
    let label_style = if active {
        Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(TEXT_DIM)
    };
    let value = match occupant {
        Some(pokemon) => format!(
            "{} (atk {})",
            pokemon.display_name(),
            pokemon.base.attack
        ),
        None => "empty".to_string(),
    };
    Line::from(vec![
        Span::styled(format!("{label:<12}"), label_style),
        Span::raw(value),
    ])
}

fn render_comparison(frame: &mut Frame, area: Rect, state: &AppState) {
    let comparison = &state.comparison;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(6), Constraint::Min(3)])
        .split(area);

    match comparison.mode {
        ComparisonMode::Duel => render_duel(frame, chunks, comparison),
        ComparisonMode::Team => render_team_battle(frame, chunks, state),
    }

    if comparison.active_slot.is_some() {
        render_candidate_popup(frame, area, comparison);
    }
}

fn render_duel(
    frame: &mut Frame,
    chunks: std::rc::Rc<[Rect]>,
    comparison: &ComparisonState,
) {
    let title = if comparison.all_loading {
        "Duel (loading catalog...)"
    } else {
        "Duel"
    };
    let slots = Paragraph::new(vec![
        slot_line(
            "Slot A",
            comparison.slots[0].as_ref(),
            comparison.active_slot == Some(SlotId::Duel(0)),
        ),
        slot_line(
            "Slot B",
            comparison.slots[1].as_ref(),
            comparison.active_slot == Some(SlotId::Duel(1)),
        ),
    ])
    .block(panel(title));
    frame.render_widget(slots, chunks[0]);

    let (Some(left), Some(right)) = (&comparison.slots[0], &comparison.slots[1]) else {
        let hint = Paragraph::new("Fill both slots to compare")
            .alignment(Alignment::Center)
            .style(Style::default().fg(TEXT_DIM))
            .block(panel("Verdict"));
        frame.render_widget(hint, chunks[1]);
        return;
    };

    let mut lines = Vec::new();
    for (label, diff) in metrics::compare_pair(&left.base, &right.base) {
        let (left_style, right_style) = match diff.winner {
            Winner::Left => (
                Style::default().fg(ACCENT_GOLD).add_modifier(Modifier::BOLD),
                Style::default().fg(TEXT_DIM),
            ),
            Winner::Right => (
                Style::default().fg(TEXT_DIM),
                Style::default().fg(ACCENT_GOLD).add_modifier(Modifier::BOLD),
            ),
            Winner::Tie => (
                Style::default().fg(TEXT_MAIN),
                Style::default().fg(TEXT_MAIN),
            ),
        };
        lines.push(Line::from(vec![
            Span::styled(format!("{label:<12}"), Style::default().fg(TEXT_DIM)),
            Span::styled(format!("{:>4}", diff.left), left_style),
            Span::styled("  vs  ", Style::default().fg(BORDER)),
            Span::styled(format!("{:<4}", diff.right), right_style),
            Span::styled(
                if diff.magnitude > 0 {
                    format!("  ({:+})", i32::from(diff.left) - i32::from(diff.right))
                } else {
                    String::new()
                },
                Style::default().fg(TEXT_DIM),
            ),
        ]));
    }
    lines.push(Line::from(""));
    let verdict = match metrics::duel_winner(left, right) {
        Winner::Left => format!("{} wins the duel", left.display_name()),
        Winner::Right => format!("{} wins the duel", right.display_name()),
        Winner::Tie => "Attack is even: a draw".to_string(),
    };
    lines.push(Line::from(Span::styled(
        verdict,
        Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
    )));
    frame.render_widget(Paragraph::new(lines).block(panel("Verdict")), chunks[1]);
}

fn render_team_battle(frame: &mut Frame, chunks: std::rc::Rc<[Rect]>, state: &AppState) {
    let comparison = &state.comparison;
    let title = if comparison.team_loading {
        "Team battle (loading team...)"
    } else {
        "Team battle"
    };
    let top = Paragraph::new(vec![
        Line::from(vec![
            Span::styled("My team     ", Style::default().fg(TEXT_DIM)),
            Span::raw(roster_names(&comparison.my_team)),
        ]),
        Line::from(vec![
            Span::styled("Opponents   ", Style::default().fg(TEXT_DIM)),
            Span::raw(roster_names(&comparison.opponents)),
        ]),
    ])
    .block(panel(title));
    frame.render_widget(top, chunks[0]);

    let my_power = metrics::total_power(&comparison.my_team);
    let their_power = metrics::total_power(&comparison.opponents);
    let mut lines = vec![
        Line::from(vec![
            Span::styled("My power      ", Style::default().fg(TEXT_DIM)),
            Span::styled(my_power.to_string(), Style::default().fg(ACCENT_GOLD)),
        ]),
        Line::from(vec![
            Span::styled("Their power   ", Style::default().fg(TEXT_DIM)),
            Span::styled(their_power.to_string(), Style::default().fg(ACCENT_GOLD)),
        ]),
        Line::from(""),
    ];
    if comparison.my_team.is_empty() || comparison.opponents.is_empty() {
        lines.push(Line::from(Span::styled(
            format!(
                "Build both sides (up to {TEAM_CAPACITY} each) to fight",
            ),
            Style::default().fg(TEXT_DIM),
        )));
    } else {
        let verdict = match metrics::team_winner(&comparison.my_team, &comparison.opponents) {
            Winner::Left => "My team wins".to_string(),
            Winner::Right => "The opponents win".to_string(),
            Winner::Tie => "Dead even: a draw".to_string(),
        };
        lines.push(Line::from(Span::styled(
            verdict,
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        )));
    }
    frame.render_widget(Paragraph::new(lines).block(panel("Verdict")), chunks[1]);
}

fn roster_names(pokemons: &[Pokemon]) -> String {
    if pokemons.is_empty() {
        return "none".to_string();
    }
    pokemons
        .iter()
        .map(|p| p.display_name().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn render_candidate_popup(frame: &mut Frame, area: Rect, comparison: &ComparisonState) {
    let popup = centered_rect(area, 44, 14);
    frame.render_widget(Clear, popup);
    let mut lines = vec![Line::from(vec![
        Span::styled("Search: ", Style::default().fg(TEXT_DIM)),
        Span::raw(format!("{}_", comparison.query)),
    ])];
    for (index, candidate) in comparison.candidates().iter().enumerate() {
        let style = if index == comparison.candidate_index {
            Style::default().bg(HIGHLIGHT_BG).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(TEXT_MAIN)
        };
        lines.push(Line::from(Span::styled(
            format!(
                " {} (atk {})",
                candidate.display_name(),
                candidate.base.attack
            ),
            style,
        )));
    }
    let body = Paragraph::new(lines).block(panel("Pick a Pokemon"));
    frame.render_widget(body, popup);
}

fn render_confirm(frame: &mut Frame, area: Rect, pending: &ConfirmAction) {
    let popup = centered_rect(area, 40, 5);
    frame.render_widget(Clear, popup);
    let body = Paragraph::new(vec![
        Line::from(Span::styled(
            pending.prompt(),
            Style::default().fg(TEXT_MAIN).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "y confirm    n cancel",
            Style::default().fg(TEXT_DIM),
        )),
    ])
    .alignment(Alignment::Center)
    .block(
        panel("Are you sure?").border_style(Style::default().fg(ACCENT)),
    );
    frame.render_widget(body, popup);
}

fn centered_rect(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

pub fn handle_event(event: &EventKind, state: &AppState) -> EventOutcome<Action> {
    match event {
        EventKind::Resize(width, height) => {
            EventOutcome::action(Action::UiTerminalResize(*width, *height)).with_render()
        }
        EventKind::Key(key) => handle_key(*key, state),
        _ => EventOutcome::ignored(),
    }
}

fn handle_key(key: KeyEvent, state: &AppState) -> EventOutcome<Action> {
    if state.confirm.is_some() {
        return match key.code {
            KeyCode::Char('y') | KeyCode::Enter => EventOutcome::action(Action::ConfirmAccept),
            KeyCode::Char('n') | KeyCode::Esc => EventOutcome::action(Action::ConfirmCancel),
            _ => EventOutcome::ignored(),
        };
    }

    if state.screen == Screen::Browse && state.browse.search.active {
        return match key.code {
            KeyCode::Esc => EventOutcome::action(Action::SearchCancel),
            KeyCode::Enter => EventOutcome::action(Action::SearchSubmit),
            KeyCode::Backspace => EventOutcome::action(Action::SearchBackspace),
            KeyCode::Char(ch) => EventOutcome::action(Action::SearchInput(ch)),
            _ => EventOutcome::ignored(),
        };
    }

    if state.screen == Screen::Comparison && state.comparison.active_slot.is_some() {
        return match key.code {
            KeyCode::Esc => EventOutcome::action(Action::SlotSearchCancel),
            KeyCode::Enter => EventOutcome::action(Action::SlotPick),
            KeyCode::Up => EventOutcome::action(Action::CandidateMove(-1)),
            KeyCode::Down => EventOutcome::action(Action::CandidateMove(1)),
            KeyCode::Backspace => EventOutcome::action(Action::SlotQueryBackspace),
            KeyCode::Char(ch) => EventOutcome::action(Action::SlotQueryInput(ch)),
            _ => EventOutcome::ignored(),
        };
    }

    if state.screen == Screen::Detail {
        if let Some(detail) = state.detail.as_ref() {
            if detail.editing {
                return match key.code {
                    KeyCode::Esc => EventOutcome::action(Action::EditCancel),
                    KeyCode::Enter => EventOutcome::action(Action::EditSave),
                    KeyCode::Tab | KeyCode::Down => EventOutcome::action(Action::EditFieldNext),
                    KeyCode::BackTab | KeyCode::Up => EventOutcome::action(Action::EditFieldPrev),
                    KeyCode::Backspace => EventOutcome::action(Action::EditBackspace),
                    KeyCode::Char(ch) => EventOutcome::action(Action::EditInput(ch)),
                    _ => EventOutcome::ignored(),
                };
            }
        }
        return handle_detail_key(key, state);
    }

    if state.screen == Screen::Add {
        return match key.code {
            KeyCode::Esc => EventOutcome::action(Action::Navigate(Screen::Browse)),
            KeyCode::Enter => EventOutcome::action(Action::AddSubmit),
            KeyCode::Tab | KeyCode::Down => EventOutcome::action(Action::AddFieldNext),
            KeyCode::BackTab | KeyCode::Up => EventOutcome::action(Action::AddFieldPrev),
            KeyCode::Backspace => EventOutcome::action(Action::AddBackspace),
            KeyCode::Char('t') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                EventOutcome::action(Action::AddTypeField)
            }
            KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                EventOutcome::action(Action::RemoveTypeField)
            }
            KeyCode::Char(ch) => EventOutcome::action(Action::AddInput(ch)),
            _ => EventOutcome::ignored(),
        };
    }

    if let Some(action) = global_key(key) {
        return EventOutcome::action(action);
    }

    match state.screen {
        Screen::Browse => handle_browse_key(key, state),
        Screen::Favorites | Screen::Collection => handle_roster_key(key, state),
        Screen::Statistics | Screen::Trending => match key.code {
            KeyCode::Esc => EventOutcome::action(Action::Navigate(Screen::Browse)),
            _ => EventOutcome::ignored(),
        },
        Screen::Comparison => handle_comparison_key(key, state),
        _ => EventOutcome::ignored(),
    }
}

fn global_key(key: KeyEvent) -> Option<Action> {
    let action = match key.code {
        KeyCode::Char('q') => Action::Quit,
        KeyCode::Char('1') => Action::Navigate(Screen::Browse),
        KeyCode::Char('2') => Action::Navigate(Screen::Add),
        KeyCode::Char('3') => Action::Navigate(Screen::Favorites),
        KeyCode::Char('4') => Action::Navigate(Screen::Collection),
        KeyCode::Char('5') => Action::Navigate(Screen::Statistics),
        KeyCode::Char('6') => Action::Navigate(Screen::Trending),
        KeyCode::Char('7') => Action::Navigate(Screen::Comparison),
        _ => return None,
    };
    Some(action)
}

fn toggle_team_action(pokemon: &Pokemon) -> Action {
    Action::ToggleTeam {
        id: pokemon.id.clone(),
        name: pokemon.display_name().to_string(),
        image: pokemon.image.clone(),
    }
}

fn handle_browse_key(key: KeyEvent, state: &AppState) -> EventOutcome<Action> {
    let selected = state.browse.selected_pokemon();
    match key.code {
        KeyCode::Up => EventOutcome::action(Action::BrowseMove(-1)),
        KeyCode::Down => EventOutcome::action(Action::BrowseMove(1)),
        KeyCode::PageUp => EventOutcome::action(Action::BrowseMove(-10)),
        KeyCode::PageDown => EventOutcome::action(Action::BrowseMove(10)),
        KeyCode::Left | KeyCode::Char('p') => EventOutcome::action(Action::PagePrev),
        KeyCode::Right | KeyCode::Char('n') => EventOutcome::action(Action::PageNext),
        KeyCode::Enter => EventOutcome::action(Action::BrowseOpenSelected),
        KeyCode::Char('/') => EventOutcome::action(Action::SearchStart),
        KeyCode::Char('[') => EventOutcome::action(Action::TypeFilterPrev),
        KeyCode::Char(']') => EventOutcome::action(Action::TypeFilterNext),
        KeyCode::Char('0') => EventOutcome::action(Action::TypeFilterClear),
        KeyCode::Char('s') => EventOutcome::action(Action::SortKeyNext),
        KeyCode::Char('o') => EventOutcome::action(Action::SortDirToggle),
        KeyCode::Char('f') => match selected {
            Some(pokemon) => EventOutcome::action(Action::ToggleFavorite {
                id: pokemon.id.clone(),
            }),
            None => EventOutcome::ignored(),
        },
        KeyCode::Char('c') => match selected {
            Some(pokemon) => EventOutcome::action(Action::ToggleCollection {
                id: pokemon.id.clone(),
            }),
            None => EventOutcome::ignored(),
        },
        KeyCode::Char('t') => match selected {
            Some(pokemon) => EventOutcome::action(toggle_team_action(pokemon)),
            None => EventOutcome::ignored(),
        },
        KeyCode::Char('d') => match selected {
            Some(pokemon) => EventOutcome::action(Action::ConfirmRequest(
                ConfirmAction::DeletePokemon {
                    id: pokemon.id.clone(),
                },
            )),
            None => EventOutcome::ignored(),
        },
        _ => EventOutcome::ignored(),
    }
}

fn handle_detail_key(key: KeyEvent, state: &AppState) -> EventOutcome<Action> {
    if let Some(action) = global_key(key) {
        return EventOutcome::action(action);
    }
    let pokemon = state.detail.as_ref().and_then(|d| d.pokemon.as_ref());
    match key.code {
        KeyCode::Esc | KeyCode::Backspace => EventOutcome::action(Action::Navigate(Screen::Browse)),
        KeyCode::Char('e') => EventOutcome::action(Action::EditStart),
        KeyCode::Char('d') => match state.detail.as_ref() {
            Some(detail) => EventOutcome::action(Action::ConfirmRequest(
                ConfirmAction::DeletePokemon {
                    id: detail.id.clone(),
                },
            )),
            None => EventOutcome::ignored(),
        },
        KeyCode::Char('f') => match pokemon {
            Some(pokemon) => EventOutcome::action(Action::ToggleFavorite {
                id: pokemon.id.clone(),
            }),
            None => EventOutcome::ignored(),
        },
        KeyCode::Char('c') => match pokemon {
            Some(pokemon) => EventOutcome::action(Action::ToggleCollection {
                id: pokemon.id.clone(),
            }),
            None => EventOutcome::ignored(),
        },
        KeyCode::Char('t') => match pokemon {
            Some(pokemon) => EventOutcome::action(toggle_team_action(pokemon)),
            None => EventOutcome::ignored(),
        },
        _ => EventOutcome::ignored(),
    }
}

fn handle_roster_key(key: KeyEvent, state: &AppState) -> EventOutcome<Action> {
    let kind = if state.screen == Screen::Favorites {
        RosterKind::Favorites
    } else {
        RosterKind::Collection
    };
    match key.code {
        KeyCode::Up => EventOutcome::action(Action::RosterMove(-1)),
        KeyCode::Down => EventOutcome::action(Action::RosterMove(1)),
        KeyCode::Enter => {
            let roster = state.roster(kind);
            match roster.items.get(roster.selected) {
                Some(pokemon) => EventOutcome::action(Action::OpenDetail {
                    id: pokemon.id.clone(),
                }),
                None => EventOutcome::ignored(),
            }
        }
        KeyCode::Char('r') | KeyCode::Delete => {
            EventOutcome::action(Action::RosterRemoveSelected)
        }
        KeyCode::Char('x') => {
            let pending = match kind {
                RosterKind::Favorites => ConfirmAction::ClearFavorites,
                RosterKind::Collection => ConfirmAction::ClearCollection,
            };
            EventOutcome::action(Action::ConfirmRequest(pending))
        }
        KeyCode::Esc => EventOutcome::action(Action::Navigate(Screen::Browse)),
        _ => EventOutcome::ignored(),
    }
}

fn handle_comparison_key(key: KeyEvent, state: &AppState) -> EventOutcome<Action> {
    match (key.code, state.comparison.mode) {
        (KeyCode::Char('m'), _) => EventOutcome::action(Action::ComparisonModeToggle),
        (KeyCode::Esc, _) => EventOutcome::action(Action::Navigate(Screen::Browse)),
        (KeyCode::Char('a'), ComparisonMode::Duel) => {
            EventOutcome::action(Action::SlotActivate(SlotId::Duel(0)))
        }
        (KeyCode::Char('b'), ComparisonMode::Duel) => {
            EventOutcome::action(Action::SlotActivate(SlotId::Duel(1)))
        }
        (KeyCode::Char('A'), ComparisonMode::Duel) => {
            EventOutcome::action(Action::DuelSlotRemove(0))
        }
        (KeyCode::Char('B'), ComparisonMode::Duel) => {
            EventOutcome::action(Action::DuelSlotRemove(1))
        }
        (KeyCode::Char('a'), ComparisonMode::Team) => {
            EventOutcome::action(Action::SlotActivate(SlotId::Opponent))
        }
        (KeyCode::Char('r'), ComparisonMode::Team) => {
            let count = state.comparison.opponents.len();
            if count == 0 {
                EventOutcome::ignored()
            } else {
                EventOutcome::action(Action::OpponentRemove(count - 1))
            }
        }
        (KeyCode::Char('x'), ComparisonMode::Team) => {
            EventOutcome::action(Action::ConfirmRequest(ConfirmAction::ClearTeam))
        }
        _ => EventOutcome::ignored(),
    }
}
