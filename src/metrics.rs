use serde::{Deserialize, Serialize};

use crate::state::{BaseStats, Pokemon};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Winner {
    Left,
    Right,
    Tie,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatDiff {
    pub left: u16,
    pub right: u16,
    pub winner: Winner,
    pub magnitude: u16,
}

pub fn stat_diff(left: u16, right: u16) -> StatDiff {
    let winner = match left.cmp(&right) {
        std::cmp::Ordering::Greater => Winner::Left,
        std::cmp::Ordering::Less => Winner::Right,
        std::cmp::Ordering::Equal => Winner::Tie,
    };
    StatDiff {
        left,
        right,
        winner,
        magnitude: left.abs_diff(right),
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectionStats {
    pub count: usize,
    pub average: BaseStats,
    pub total_power: u64,
    pub type_counts: Vec<(String, u64)>,
    pub distinct_types: usize,
}

/// Aggregate summary over a set of entities. Averages are rounded to
/// the nearest integer; an empty input yields all zeros.
pub fn collection_stats(pokemons: &[Pokemon]) -> CollectionStats {
    let count = pokemons.len();
    let type_counts = type_histogram(pokemons);
    CollectionStats {
        count,
        average: BaseStats {
            hp: rounded_mean(pokemons, |b| b.hp),
            attack: rounded_mean(pokemons, |b| b.attack),
            defense: rounded_mean(pokemons, |b| b.defense),
            sp_attack: rounded_mean(pokemons, |b| b.sp_attack),
            sp_defense: rounded_mean(pokemons, |b| b.sp_defense),
            speed: rounded_mean(pokemons, |b| b.speed),
        },
        total_power: total_power(pokemons),
        distinct_types: type_counts.len(),
        type_counts,
    }
}

fn rounded_mean(pokemons: &[Pokemon], stat: impl Fn(&BaseStats) -> u16) -> u16 {
    let count = pokemons.len() as u64;
    if count == 0 {
        return 0;
    }
    let sum: u64 = pokemons.iter().map(|p| u64::from(stat(&p.base))).sum();
    ((sum + count / 2) / count) as u16
}

/// Type frequency in descending order. Ties keep first-seen order, so
/// the same input always produces the same histogram.
pub fn type_histogram(pokemons: &[Pokemon]) -> Vec<(String, u64)> {
    let mut counts: Vec<(String, u64)> = Vec::new();
    for pokemon in pokemons {
        for type_name in &pokemon.types {
            match counts.iter_mut().find(|(name, _)| name == type_name) {
                Some((_, count)) => *count += 1,
                None => counts.push((type_name.clone(), 1)),
            }
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}

/// Top `n` by attack, descending; equal-attack entries keep their
/// input order.
pub fn top_by_attack(pokemons: &[Pokemon], n: usize) -> Vec<Pokemon> {
    let mut ranked: Vec<Pokemon> = pokemons.to_vec();
    ranked.sort_by(|a, b| b.base.attack.cmp(&a.base.attack));
    ranked.truncate(n);
    ranked
}

pub fn total_power(pokemons: &[Pokemon]) -> u64 {
    pokemons.iter().map(|p| p.base.total()).sum()
}

/// Head-to-head verdict by attack alone.
pub fn duel_winner(left: &Pokemon, right: &Pokemon) -> Winner {
    stat_diff(left.base.attack, right.base.attack).winner
}

/// Team verdict by summed power. Equal totals are a tie; the left side
/// never wins on equality.
pub fn team_winner(left: &[Pokemon], right: &[Pokemon]) -> Winner {
    let left_total = total_power(left);
    let right_total = total_power(right);
    match left_total.cmp(&right_total) {
        std::cmp::Ordering::Greater => Winner::Left,
        std::cmp::Ordering::Less => Winner::Right,
        std::cmp::Ordering::Equal => Winner::Tie,
    }
}

pub fn compare_pair(left: &BaseStats, right: &BaseStats) -> Vec<(&'static str, StatDiff)> {
    vec![
        ("HP", stat_diff(left.hp, right.hp)),
        ("Attack", stat_diff(left.attack, right.attack)),
        ("Defense", stat_diff(left.defense, right.defense)),
        ("Sp. Attack", stat_diff(left.sp_attack, right.sp_attack)),
        ("Sp. Defense", stat_diff(left.sp_defense, right.sp_defense)),
        ("Speed", stat_diff(left.speed, right.speed)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::NameSet;
    use pretty_assertions::assert_eq;

    fn pokemon(name: &str, attack: u16, hp: u16, types: &[&str]) -> Pokemon {
        Pokemon {
            id: name.to_lowercase(),
            name: NameSet::plain(name),
            types: types.iter().map(|t| t.to_string()).collect(),
            base: BaseStats {
                hp,
                attack,
                defense: 10,
                sp_attack: 10,
                sp_defense: 10,
                speed: 10,
            },
            image: String::new(),
        }
    }

    #[test]
    fn empty_collection_yields_zeroed_summary() {
        let stats = collection_stats(&[]);
        assert_eq!(stats.count, 0);
        assert_eq!(stats.average, BaseStats::default());
        assert_eq!(stats.total_power, 0);
        assert!(stats.type_counts.is_empty());
    }

    #[test]
    fn averages_round_to_nearest() {
        let stats = collection_stats(&[
            pokemon("A", 10, 35, &[]),
            pokemon("B", 11, 36, &[]),
        ]);
        // (10 + 11) / 2 = 10.5 rounds to 11, (35 + 36) / 2 = 35.5 to 36.
        assert_eq!(stats.average.attack, 11);
        assert_eq!(stats.average.hp, 36);
        assert_eq!(stats.count, 2);
        // 35+10+40 for A plus 36+11+40 for B.
        assert_eq!(stats.total_power, 172);
    }

    #[test]
    fn histogram_sorts_by_count_with_first_seen_ties() {
        let pokemons = [
            pokemon("A", 1, 1, &["Grass", "Poison"]),
            pokemon("B", 1, 1, &["Fire"]),
            pokemon("C", 1, 1, &["Grass"]),
            pokemon("D", 1, 1, &["Water"]),
        ];
        let histogram = type_histogram(&pokemons);
        assert_eq!(histogram[0], ("Grass".to_string(), 2));
        // Poison, Fire, Water all count 1 and keep first-seen order.
        assert_eq!(histogram[1].0, "Poison");
        assert_eq!(histogram[2].0, "Fire");
        assert_eq!(histogram[3].0, "Water");
    }

    #[test]
    fn top_by_attack_is_stable_for_ties() {
        let pokemons = [
            pokemon("A", 50, 1, &[]),
            pokemon("B", 80, 1, &[]),
            pokemon("C", 50, 1, &[]),
            pokemon("D", 90, 1, &[]),
        ];
        let top = top_by_attack(&pokemons, 3);
        let names: Vec<&str> = top.iter().map(|p| p.display_name()).collect();
        assert_eq!(names, vec!["D", "B", "A"]);
    }

    #[test]
    fn duel_winner_uses_attack_only() {
        let weak_but_tough = pokemon("A", 30, 200, &[]);
        let strong = pokemon("B", 90, 10, &[]);
        assert_eq!(duel_winner(&weak_but_tough, &strong), Winner::Right);
        assert_eq!(duel_winner(&strong, &weak_but_tough), Winner::Left);
        assert_eq!(duel_winner(&strong, &strong), Winner::Tie);
    }

    #[test]
    fn team_winner_requires_strictly_greater_total() {
        let left = [pokemon("A", 50, 50, &[])];
        let right = [pokemon("B", 50, 50, &[])];
        assert_eq!(team_winner(&left, &right), Winner::Tie);
        let stronger = [pokemon("C", 51, 50, &[])];
        assert_eq!(team_winner(&stronger, &right), Winner::Left);
    }

    #[test]
    fn team_power_sums_across_members() {
        // defense/sp_attack/sp_defense/speed are 10 each in the helper,
        // so total = hp + attack + 40.
        let left = [
            pokemon("A", 60, 200, &[]), // 300
            pokemon("B", 60, 150, &[]), // 250
        ];
        let right = [pokemon("C", 60, 300, &[])]; // 400
        assert_eq!(total_power(&left), 550);
        assert_eq!(total_power(&right), 400);
        assert_eq!(team_winner(&left, &right), Winner::Left);
    }

    #[test]
    fn compare_pair_reports_six_rows_with_magnitudes() {
        let left = BaseStats {
            hp: 35,
            attack: 55,
            defense: 40,
            sp_attack: 50,
            sp_defense: 50,
            speed: 90,
        };
        let right = BaseStats {
            hp: 45,
            attack: 49,
            defense: 49,
            sp_attack: 65,
            sp_defense: 65,
            speed: 45,
        };
        let rows = compare_pair(&left, &right);
        assert_eq!(rows.len(), 6);
        assert_eq!(rows[0].0, "HP");
        assert_eq!(rows[0].1.winner, Winner::Right);
        assert_eq!(rows[0].1.magnitude, 10);
        assert_eq!(rows[1].1.winner, Winner::Left);
        assert_eq!(rows[5].1.magnitude, 45);
    }
}
