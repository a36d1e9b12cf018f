use log::debug;
use serde::{Deserialize, Serialize};

use crate::modules::helpers::time::ParsedTime;

pub const DEFAULT_CUTOFF: f64 = 0.3;

/// A driver expected to appear in a session's results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub driver_id: i32,
    pub psn_id: String,
    pub car_class_id: Option<i32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchedToken {
    /// position of the token in the input
    pub index: usize,
    pub entry: RosterEntry,
    pub raw_name: String,
    pub time: ParsedTime,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MatchOutcome {
    /// matched tokens, in the order they were given
    pub matched: Vec<MatchedToken>,
    /// roster drivers that no token was matched to
    pub absent: Vec<RosterEntry>,
    /// raw names that matched nobody
    pub unmatched: Vec<String>,
}

pub fn normalize_name(name: &str) -> String {
    name.chars().filter(|c| !c.is_whitespace()).collect()
}

/// # similarity of two names
/// Ratcliff/Obershelp ratio (`2 * matching / total`) over the lowercased names
///
/// ## Returns
/// * `f64` - a value between 0 (nothing in common) and 1 (identical)
pub fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.to_lowercase().chars().collect();
    let b: Vec<char> = b.to_lowercase().chars().collect();

    if a.is_empty() && b.is_empty() {
        return 1.0;
    }

    2.0 * matching_characters(&a, &b) as f64 / (a.len() + b.len()) as f64
}

fn matching_characters(a: &[char], b: &[char]) -> usize {
    let (start_a, start_b, length) = longest_common_block(a, b);
    if length == 0 {
        return 0;
    }

    length
        + matching_characters(&a[..start_a], &b[..start_b])
        + matching_characters(&a[start_a + length..], &b[start_b + length..])
}

fn longest_common_block(a: &[char], b: &[char]) -> (usize, usize, usize) {
    let mut best = (0, 0, 0);
    let mut previous = vec![0usize; b.len() + 1];

    for i in 0..a.len() {
        let mut current = vec![0usize; b.len() + 1];
        for j in 0..b.len() {
            if a[i] == b[j] {
                current[j + 1] = previous[j] + 1;
                if current[j + 1] > best.2 {
                    best = (i + 1 - current[j + 1], j + 1 - current[j + 1], current[j + 1]);
                }
            }
        }
        previous = current;
    }

    best
}

pub struct DriverMatcher<'a> {
    roster: &'a [RosterEntry],
    cutoff: f64,
}

impl<'a> DriverMatcher<'a> {
    pub fn new(roster: &'a [RosterEntry]) -> DriverMatcher<'a> {
        DriverMatcher {
            roster,
            cutoff: DEFAULT_CUTOFF,
        }
    }

    pub fn with_cutoff(mut self, cutoff: f64) -> DriverMatcher<'a> {
        self.cutoff = cutoff;
        self
    }

    /// # match tokens to the roster
    /// exact matches (spaces ignored) are resolved first so a misspelt name can't
    /// take the slot of a driver that is spelt correctly further down. the
    /// remaining tokens take the most similar unclaimed driver above the cutoff.
    ///
    /// ## Arguments
    /// * `tokens` - raw names with their parsed times, in result order
    ///
    /// ## Returns
    /// * `MatchOutcome` - matched tokens, absent roster drivers and unmatched names
    pub fn match_tokens(&self, tokens: &[(String, ParsedTime)]) -> MatchOutcome {
        let mut claimed = vec![false; self.roster.len()];
        let mut assignment: Vec<Option<usize>> = vec![None; tokens.len()];

        for (token_index, (raw_name, _)) in tokens.iter().enumerate() {
            let normalized = normalize_name(raw_name);
            let exact = self
                .roster
                .iter()
                .enumerate()
                .find(|(index, entry)| !claimed[*index] && normalize_name(&entry.psn_id) == normalized);

            if let Some((index, _)) = exact {
                claimed[index] = true;
                assignment[token_index] = Some(index);
            }
        }

        for (token_index, (raw_name, _)) in tokens.iter().enumerate() {
            if assignment[token_index].is_some() {
                continue;
            }

            let normalized = normalize_name(raw_name);
            let mut best: Option<(usize, f64)> = None;
            for (index, entry) in self.roster.iter().enumerate() {
                if claimed[index] {
                    continue;
                }

                let score = similarity(&normalized, &normalize_name(&entry.psn_id));
                if score >= self.cutoff && best.map_or(true, |(_, best_score)| score > best_score) {
                    best = Some((index, score));
                }
            }

            if let Some((index, score)) = best {
                debug!(target:"helpers/matcher:match_tokens", "matched {} to {} (score {:.2})", raw_name, self.roster[index].psn_id, score);
                claimed[index] = true;
                assignment[token_index] = Some(index);
            }
        }

        let mut outcome = MatchOutcome::default();
        for (token_index, ((raw_name, time), slot)) in tokens.iter().zip(assignment).enumerate() {
            match slot {
                Some(index) => outcome.matched.push(MatchedToken {
                    index: token_index,
                    entry: self.roster[index].clone(),
                    raw_name: raw_name.clone(),
                    time: *time,
                }),
                None => outcome.unmatched.push(raw_name.clone()),
            }
        }

        outcome.absent = self
            .roster
            .iter()
            .zip(claimed)
            .filter(|(_, was_claimed)| !was_claimed)
            .map(|(entry, _)| entry.clone())
            .collect();

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::helpers::time::parse_time;

    fn roster() -> Vec<RosterEntry> {
        ["Speedy_Gonzales", "RedBaron", "lap_king", "Tortoise99"]
            .iter()
            .enumerate()
            .map(|(index, psn_id)| RosterEntry {
                driver_id: index as i32 + 1,
                psn_id: psn_id.to_string(),
                car_class_id: None,
            })
            .collect()
    }

    fn tokens(pairs: &[(&str, &str)]) -> Vec<(String, ParsedTime)> {
        pairs
            .iter()
            .map(|(name, time)| (name.to_string(), parse_time(time)))
            .collect()
    }

    #[test]
    fn similarity_behaves_like_ratcliff_obershelp() {
        assert_eq!(similarity("abcd", "abcd"), 1.0);
        assert_eq!(similarity("abc", "xyz"), 0.0);
        // "abcd" vs "bcde": 3 matching chars over 8
        assert!((similarity("abcd", "bcde") - 0.75).abs() < 1e-9);
        assert_eq!(similarity("RedBaron", "redbaron"), 1.0);
    }

    #[test]
    fn exact_match_wins_over_earlier_fuzzy_token() {
        let roster = roster();
        let outcome = DriverMatcher::new(&roster)
            .match_tokens(&tokens(&[("RedBaran", "1:20.000"), ("RedBaron", "1:21.000")]));

        // the exact token keeps RedBaron, the misspelt one has to settle for someone else or nobody
        let red = outcome
            .matched
            .iter()
            .find(|m| m.entry.psn_id == "RedBaron")
            .unwrap();
        assert_eq!(red.raw_name, "RedBaron");
    }

    #[test]
    fn fuzzy_matches_and_reports_absent_and_unmatched() {
        let roster = roster();
        let outcome = DriverMatcher::new(&roster).match_tokens(&tokens(&[
            ("speedy gonzales", "1:20.000"),
            ("lapking", "1:21.000"),
            ("QQQQQ", "1:22.000"),
        ]));

        let names: Vec<&str> = outcome.matched.iter().map(|m| m.entry.psn_id.as_str()).collect();
        assert_eq!(names, vec!["Speedy_Gonzales", "lap_king"]);
        assert_eq!(outcome.unmatched, vec!["QQQQQ".to_string()]);

        let absent: Vec<&str> = outcome.absent.iter().map(|e| e.psn_id.as_str()).collect();
        assert_eq!(absent, vec!["RedBaron", "Tortoise99"]);
    }

    #[test]
    fn a_driver_is_consumed_only_once() {
        let roster = roster();
        let outcome = DriverMatcher::new(&roster)
            .match_tokens(&tokens(&[("Tortoise99", "1:20.000"), ("Tortoise98", "1:21.000")]));

        assert_eq!(outcome.matched[0].entry.psn_id, "Tortoise99");
        assert!(outcome
            .matched
            .iter()
            .skip(1)
            .all(|m| m.entry.psn_id != "Tortoise99"));
    }
}
