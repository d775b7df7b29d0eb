use serde::{Deserialize, Serialize};

use crate::api::{ApiError, PageWindow};
use crate::state::{ConfirmAction, Pokemon, RosterKind, Screen, SlotId, StatsScope};

#[derive(tui_dispatch::Action, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[action(infer_categories)]
pub enum Action {
    Init,

    PageDidLoad { generation: u64, window: PageWindow },
    PageDidError { generation: u64, error: ApiError },
    PageNext,
    PagePrev,
    BrowseMove(i16),
    BrowseOpenSelected,

    SearchStart,
    SearchCancel,
    SearchSubmit,
    SearchInput(char),
    SearchBackspace,
    TypeFilterNext,
    TypeFilterPrev,
    TypeFilterClear,
    SortKeyNext,
    SortDirToggle,

    OpenDetail { id: String },
    DetailDidLoad(Pokemon),
    DetailDidError { id: String, error: ApiError },
    EditStart,
    EditCancel,
    EditFieldNext,
    EditFieldPrev,
    EditInput(char),
    EditBackspace,
    EditSave,
    UpdateDidSave(Pokemon),
    UpdateDidError { id: String, error: ApiError },
    DeleteDidComplete { id: String },
    DeleteDidError { id: String, error: ApiError },

    ToggleFavorite { id: String },
    ToggleCollection { id: String },
    ToggleTeam { id: String, name: String, image: String },
    SetsDidPersist,
    SetsPersistError(String),

    AddFieldNext,
    AddFieldPrev,
    AddInput(char),
    AddBackspace,
    AddTypeField,
    RemoveTypeField,
    AddSubmit,
    CreateDidComplete(Pokemon),
    CreateDidError(ApiError),

    RosterDidHydrate { kind: RosterKind, generation: u64, items: Vec<Pokemon> },
    RosterMove(i16),
    RosterRemoveSelected,

    StatsDidLoad { generation: u64, scope: StatsScope, items: Vec<Pokemon> },
    StatsDidError { generation: u64, error: ApiError },

    TrendingDidLoad { generation: u64, items: Vec<Pokemon> },
    TrendingDidError { generation: u64, error: ApiError },

    ComparisonModeToggle,
    CandidatesDidLoad { generation: u64, items: Vec<Pokemon> },
    CandidatesDidError { generation: u64, error: ApiError },
    TeamDidHydrate { generation: u64, items: Vec<Pokemon> },
    SlotActivate(SlotId),
    SlotQueryInput(char),
    SlotQueryBackspace,
    SlotSearchCancel,
    CandidateMove(i16),
    SlotPick,
    DuelSlotRemove(usize),
    OpponentRemove(usize),

    ConfirmRequest(ConfirmAction),
    ConfirmAccept,
    ConfirmCancel,

    Navigate(Screen),
    UiTerminalResize(u16, u16),
    Tick,
    Quit,
}
