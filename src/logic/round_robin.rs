//! Round-robin fixtures by the circle method.

/// One round of fixtures, each `(home, away)`.
pub type Round<T> = Vec<(T, T)>;

/// Single round-robin over `participants`.
///
/// With an odd count a bye is added; pairings against it are dropped. The
/// participant at index 0 stays fixed while the others rotate one position
/// per round, so `n'` participants (bye included) play `n' - 1` rounds and
/// every pair meets exactly once.
///
/// For a pair with indices `i < j`, `i` is at home when `i + j` is even and
/// away otherwise. That keeps every participant's home and away counts
/// within one of each other.
pub fn schedule<T: Clone>(participants: &[T]) -> Vec<Round<T>> {
    let n = participants.len();
    if n < 2 {
        return Vec::new();
    }
    let bye = n;
    let slots = if n % 2 == 0 { n } else { n + 1 };
    let half = slots / 2;
    let mut arrangement: Vec<usize> = (0..slots).collect();

    let mut rounds = Vec::with_capacity(slots - 1);
    for _ in 0..slots - 1 {
        let (first, second) = arrangement.split_at(half);
        let round: Round<T> = first
            .iter()
            .zip(second.iter().rev())
            .filter(|&(&a, &b)| a != bye && b != bye)
            .map(|(&a, &b)| {
                let (low, high) = if a < b { (a, b) } else { (b, a) };
                let (home, away) = if (low + high) % 2 == 0 {
                    (low, high)
                } else {
                    (high, low)
                };
                (participants[home].clone(), participants[away].clone())
            })
            .collect();
        rounds.push(round);

        if let Some(last) = arrangement.pop() {
            arrangement.insert(1, last);
        }
    }
    rounds
}

/// `repeats` concatenated cycles of [`schedule`]. Every second cycle swaps
/// home and away.
pub fn schedule_repeated<T: Clone>(participants: &[T], repeats: u32) -> Vec<Round<T>> {
    let cycle = schedule(participants);
    let mut rounds = Vec::with_capacity(cycle.len() * repeats as usize);
    for repeat in 0..repeats {
        if repeat % 2 == 0 {
            rounds.extend(cycle.iter().cloned());
        } else {
            rounds.extend(cycle.iter().map(|round| {
                round
                    .iter()
                    .map(|(home, away)| (away.clone(), home.clone()))
                    .collect::<Round<T>>()
            }));
        }
    }
    rounds
}

/// Number of matches a group plays: `rounds * C(teams, 2)`.
pub fn round_robin_match_count(teams: usize, rounds: u32) -> u32 {
    if teams < 2 {
        return 0;
    }
    (teams * (teams - 1) / 2) as u32 * rounds
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};

    fn pairs(rounds: &[Round<usize>]) -> Vec<(usize, usize)> {
        rounds
            .iter()
            .flatten()
            .map(|&(a, b)| if a < b { (a, b) } else { (b, a) })
            .collect()
    }

    #[test]
    fn fewer_than_two_participants_play_nothing() {
        assert!(schedule::<usize>(&[]).is_empty());
        assert!(schedule(&[7]).is_empty());
        assert!(schedule_repeated(&[7], 2).is_empty());
    }

    #[test]
    fn every_pair_meets_exactly_once() {
        for n in 2..=13 {
            let participants: Vec<usize> = (0..n).collect();
            let rounds = schedule(&participants);
            let slots = if n % 2 == 0 { n } else { n + 1 };
            assert_eq!(rounds.len(), slots - 1, "n={n}");

            let all = pairs(&rounds);
            let unique: HashSet<_> = all.iter().copied().collect();
            assert_eq!(all.len(), n * (n - 1) / 2, "n={n}");
            assert_eq!(unique.len(), all.len(), "n={n}");
            assert!(all.iter().all(|(a, b)| a != b));
        }
    }

    #[test]
    fn nobody_plays_twice_in_a_round() {
        for n in 2..=11 {
            let participants: Vec<usize> = (0..n).collect();
            for round in schedule(&participants) {
                let mut seen = HashSet::new();
                for (a, b) in round {
                    assert!(seen.insert(a));
                    assert!(seen.insert(b));
                }
            }
        }
    }

    #[test]
    fn home_and_away_are_balanced() {
        for n in 2..=14 {
            let participants: Vec<usize> = (0..n).collect();
            let mut home: HashMap<usize, i32> = HashMap::new();
            for (h, a) in schedule(&participants).into_iter().flatten() {
                *home.entry(h).or_default() += 1;
                *home.entry(a).or_default() -= 1;
            }
            for p in 0..n {
                let balance = home.get(&p).copied().unwrap_or(0);
                assert!(balance.abs() <= 1, "n={n} participant {p} balance {balance}");
            }
        }
    }

    #[test]
    fn six_teams_play_five_rounds_of_three() {
        let teams = ["A", "B", "C", "D", "E", "F"];
        let rounds = schedule(&teams);
        assert_eq!(rounds.len(), 5);
        assert!(rounds.iter().all(|r| r.len() == 3));
        assert_eq!(rounds.iter().map(Vec::len).sum::<usize>(), 15);
    }

    #[test]
    fn doubled_pair_plays_home_and_away() {
        let rounds = schedule_repeated(&["A", "B"], 2);
        let fixtures: Vec<_> = rounds.into_iter().flatten().collect();
        assert_eq!(fixtures.len(), 2);
        assert_eq!(fixtures[0], (fixtures[1].1, fixtures[1].0));
    }

    #[test]
    fn match_count_formula() {
        assert_eq!(round_robin_match_count(6, 1), 15);
        assert_eq!(round_robin_match_count(2, 2), 2);
        assert_eq!(round_robin_match_count(1, 2), 0);
    }
}
