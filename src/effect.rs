use crate::api::NewPokemon;
use crate::state::{Pokemon, RosterKind, StatsScope};
use crate::store::LocalSets;

#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    LoadPage { page: u32, name: Option<String>, generation: u64 },
    LoadDetail { id: String },
    CreatePokemon { draft: NewPokemon },
    UpdatePokemon { id: String, pokemon: Pokemon },
    DeletePokemon { id: String },
    HydrateRoster { kind: RosterKind, ids: Vec<String>, generation: u64 },
    LoadStats { scope: StatsScope, ids: Vec<String>, generation: u64 },
    LoadTrending { generation: u64 },
    LoadCandidates { generation: u64 },
    HydrateTeam { ids: Vec<String>, generation: u64 },
    PersistSets { sets: LocalSets },
}
