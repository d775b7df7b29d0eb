mod action;
mod api;
mod effect;
mod metrics;
mod reducer;
mod state;
mod store;
mod ui;

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tui_dispatch::{
    EffectContext, EffectStoreLike, EffectStoreWithMiddleware, EventOutcome, RenderContext, TaskKey,
};
use tui_dispatch_debug::debug::DebugLayer;
use tui_dispatch_debug::{
    DebugCliArgs, DebugRunOutput, DebugSession, DebugSessionError, ReplayItem,
};

use crate::action::Action;
use crate::effect::Effect;
use crate::reducer::reducer;
use crate::state::AppState;

#[derive(Parser, Debug)]
#[command(name = "pokedex")]
#[command(about = "Terminal catalog manager for a Pokemon REST store")]
struct Args {
    #[command(flatten)]
    debug: DebugCliArgs,

    /// Base URL of the REST store.
    #[arg(long, default_value = "http://localhost:3000/api")]
    api_url: String,

    /// Directory for favorites, collection and team files.
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> io::Result<()> {
    let args = Args::parse();
    api::set_api_base(&args.api_url);
    if let Some(dir) = args.data_dir {
        store::set_data_dir(dir);
    }
    let debug = DebugSession::new(args.debug);

    let state = debug
        .load_state_or_else_async(|| async {
            let sets = store::load(&store::data_dir()).await;
            Ok::<AppState, io::Error>(AppState::with_sets(sets))
        })
        .await
        .map_err(debug_error)?;
    let replay_actions = debug.load_replay_items().map_err(debug_error)?;
    let (middleware, recorder) = debug.middleware_with_recorder();
    let store = EffectStoreWithMiddleware::new(state, reducer, middleware);

    let use_alt_screen = debug.use_alt_screen();
    let mut stdout = io::stdout();
    if use_alt_screen {
        enable_raw_mode()?;
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    }
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &debug, store, replay_actions).await;

    if use_alt_screen {
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        terminal.show_cursor()?;
    }

    let run_output = result?;
    run_output.write_render_output()?;
    debug.save_actions(recorder.as_ref()).map_err(debug_error)?;
    Ok(())
}

fn debug_error(error: DebugSessionError) -> io::Error {
    io::Error::other(format!("debug session error: {error}"))
}

async fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    debug: &DebugSession,
    store: impl EffectStoreLike<AppState, Action, Effect>,
    replay_actions: Vec<ReplayItem<Action>>,
) -> io::Result<DebugRunOutput<AppState>> {
    debug
        .run_effect_app(
            terminal,
            store,
            DebugLayer::simple(),
            replay_actions,
            Some(Action::Init),
            Some(Action::Quit),
            |runtime| {
                if debug.render_once() {
                    return;
                }
                runtime
                    .subscriptions()
                    .interval("tick", Duration::from_millis(200), || Action::Tick);
            },
            |frame, area, state, render_ctx: RenderContext| {
                ui::render(frame, area, state, render_ctx);
            },
            |event, state| -> EventOutcome<Action> { ui::handle_event(event, state) },
            |action| matches!(action, Action::Quit),
            handle_effect,
        )
        .await
}

fn handle_effect(effect: Effect, ctx: &mut EffectContext<Action>) {
    match effect {
        Effect::LoadPage {
            page,
            name,
            generation,
        } => {
            ctx.tasks().spawn(TaskKey::new("page"), async move {
                match api::list(page, name.as_deref()).await {
                    Ok(window) => Action::PageDidLoad { generation, window },
                    Err(error) => Action::PageDidError { generation, error },
                }
            });
        }
        Effect::LoadDetail { id } => {
            let key = format!("detail_{id}");
            ctx.tasks().spawn(TaskKey::new(key), async move {
                match api::get(&id).await {
                    Ok(pokemon) => Action::DetailDidLoad(pokemon),
                    Err(error) => Action::DetailDidError { id, error },
                }
            });
        }
        Effect::CreatePokemon { draft } => {
            ctx.tasks().spawn(TaskKey::new("create"), async move {
                match api::create(&draft).await {
                    Ok(pokemon) => Action::CreateDidComplete(pokemon),
                    Err(error) => Action::CreateDidError(error),
                }
            });
        }
        Effect::UpdatePokemon { id, pokemon } => {
            let key = format!("update_{id}");
            ctx.tasks().spawn(TaskKey::new(key), async move {
                match api::update(&id, &pokemon).await {
                    Ok(saved) => Action::UpdateDidSave(saved),
                    Err(error) => Action::UpdateDidError { id, error },
                }
            });
        }
        Effect::DeletePokemon { id } => {
            let key = format!("delete_{id}");
            ctx.tasks().spawn(TaskKey::new(key), async move {
                match api::delete(&id).await {
                    Ok(()) => Action::DeleteDidComplete { id },
                    Err(error) => Action::DeleteDidError { id, error },
                }
            });
        }
        Effect::HydrateRoster {
            kind,
            ids,
            generation,
        } => {
            let key = format!("roster_{}", kind.label());
            ctx.tasks().spawn(TaskKey::new(key), async move {
                let items = api::fetch_many(&ids).await;
                Action::RosterDidHydrate {
                    kind,
                    generation,
                    items,
                }
            });
        }
        Effect::LoadStats {
            scope,
            ids,
            generation,
        } => {
            ctx.tasks().spawn(TaskKey::new("stats"), async move {
                if ids.is_empty() {
                    match api::fetch_all(None).await {
                        Ok(items) => Action::StatsDidLoad {
                            generation,
                            scope,
                            items,
                        },
                        Err(error) => Action::StatsDidError { generation, error },
                    }
                } else {
                    let items = api::fetch_many(&ids).await;
                    Action::StatsDidLoad {
                        generation,
                        scope,
                        items,
                    }
                }
            });
        }
        Effect::LoadTrending { generation } => {
            ctx.tasks().spawn(TaskKey::new("trending"), async move {
                match api::fetch_all(None).await {
                    Ok(items) => Action::TrendingDidLoad { generation, items },
                    Err(error) => Action::TrendingDidError { generation, error },
                }
            });
        }
        Effect::LoadCandidates { generation } => {
            ctx.tasks().spawn(TaskKey::new("candidates"), async move {
                match api::fetch_all(None).await {
                    Ok(items) => Action::CandidatesDidLoad { generation, items },
                    Err(error) => Action::CandidatesDidError { generation, error },
                }
            });
        }
        Effect::HydrateTeam { ids, generation } => {
            ctx.tasks().spawn(TaskKey::new("team"), async move {
                let items = api::fetch_many(&ids).await;
                Action::TeamDidHydrate { generation, items }
            });
        }
        Effect::PersistSets { sets } => {
            ctx.tasks().spawn(TaskKey::new("persist_sets"), async move {
                match store::save(&store::data_dir(), &sets).await {
                    Ok(()) => Action::SetsDidPersist,
                    Err(error) => Action::SetsPersistError(error),
                }
            });
        }
    }
}
