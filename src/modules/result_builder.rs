use log::{debug, info, warn};
use serde::Serialize;

use crate::modules::helpers::matcher::{DriverMatcher, MatchedToken, RosterEntry, DEFAULT_CUTOFF};
use crate::modules::helpers::time::{format_time, parse_time, CompletionStatus, ParsedTime};

/// How the times of a result text are expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeBasis {
    /// every line carries the driver's own time
    #[default]
    Absolute,
    /// the first finisher of each class carries its time, the others their gap to it
    GapToLeader,
}

/// One driver's result, ready to be persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultDraft {
    pub driver_id: i32,
    pub psn_id: String,
    pub car_class_id: Option<i32>,
    pub time: ParsedTime,
    pub position: Option<i32>,
    pub gap_to_first: Option<i32>,
    pub fastest_lap: bool,
}

impl ResultDraft {
    pub fn participated(&self) -> bool {
        self.time.is_finished()
    }

    pub fn status(&self) -> CompletionStatus {
        self.time.status
    }

    fn from_roster(entry: &RosterEntry, time: ParsedTime) -> ResultDraft {
        ResultDraft {
            driver_id: entry.driver_id,
            psn_id: entry.psn_id.clone(),
            car_class_id: entry.car_class_id,
            time,
            position: None,
            gap_to_first: None,
            fastest_lap: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct BuiltResults {
    /// every roster driver, grouped by class and ordered by position
    pub results: Vec<ResultDraft>,
    /// names that could not be matched to the roster
    pub unmatched: Vec<String>,
    /// drivers whose gap could not be turned into a time because the leader of
    /// their class was not matched, they are left unclassified
    pub unresolved: Vec<String>,
}

impl BuiltResults {
    /// # flag the fastest lap
    /// only a classified driver can hold the fastest lap
    ///
    /// ## Returns
    /// * `bool` - false if the driver is not among the classified results
    pub fn set_fastest_lap(&mut self, driver_id: i32) -> bool {
        let eligible = self
            .results
            .iter()
            .any(|result| result.driver_id == driver_id && result.participated());
        if !eligible {
            return false;
        }

        for result in self.results.iter_mut() {
            result.fastest_lap = result.driver_id == driver_id;
        }
        true
    }

    pub fn finishers(&self) -> impl Iterator<Item = &ResultDraft> {
        self.results.iter().filter(|result| result.participated())
    }
}

/// Turns raw (name, time) tokens into ordered results for one session.
pub struct ResultBuilder<'a> {
    roster: &'a [RosterEntry],
    class_order: Vec<i32>,
    basis: TimeBasis,
    cutoff: f64,
}

impl<'a> ResultBuilder<'a> {
    /// ## Arguments
    /// * `roster` - the drivers expected in the session
    /// * `class_order` - ids of the category's car classes, in display order
    pub fn new(roster: &'a [RosterEntry], class_order: Vec<i32>) -> ResultBuilder<'a> {
        ResultBuilder {
            roster,
            class_order,
            basis: TimeBasis::Absolute,
            cutoff: DEFAULT_CUTOFF,
        }
    }

    pub fn with_basis(mut self, basis: TimeBasis) -> ResultBuilder<'a> {
        self.basis = basis;
        self
    }

    pub fn with_cutoff(mut self, cutoff: f64) -> ResultBuilder<'a> {
        self.cutoff = cutoff;
        self
    }

    /// # build results from text
    /// one driver per line, the last word of a line is the time or status
    pub fn from_text(&self, text: &str) -> BuiltResults {
        let pairs: Vec<(String, String)> = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| match line.rsplit_once(char::is_whitespace) {
                Some((name, time)) => (name.trim().to_string(), time.to_string()),
                None => (line.to_string(), String::new()),
            })
            .collect();

        self.from_pairs(&pairs)
    }

    /// # build results from name/time pairs
    ///
    /// ## Arguments
    /// * `pairs` - raw names with raw time tokens, in result order
    ///
    /// ## Returns
    /// * `BuiltResults` - the ordered results and the names nobody matched
    pub fn from_pairs(&self, pairs: &[(String, String)]) -> BuiltResults {
        let tokens: Vec<(String, ParsedTime)> = pairs
            .iter()
            .map(|(name, time)| (name.clone(), parse_time(time)))
            .collect();

        let outcome = DriverMatcher::new(self.roster)
            .with_cutoff(self.cutoff)
            .match_tokens(&tokens);

        let (matched, unresolved) = match self.basis {
            TimeBasis::Absolute => (outcome.matched, Vec::new()),
            TimeBasis::GapToLeader => self.gaps_to_totals(&tokens, outcome.matched),
        };

        let mut drafts: Vec<ResultDraft> = matched
            .iter()
            .map(|token| ResultDraft::from_roster(&token.entry, token.time))
            .collect();
        drafts.extend(
            outcome
                .absent
                .iter()
                .map(|entry| ResultDraft::from_roster(entry, ParsedTime::not_finished(CompletionStatus::Dns))),
        );

        if !outcome.unmatched.is_empty() {
            info!(target:"result_builder:from_pairs", "{} names could not be matched: {:?}", outcome.unmatched.len(), outcome.unmatched);
        }
        if !unresolved.is_empty() {
            warn!(target:"result_builder:from_pairs", "Gaps of {:?} have no class leader to add to", unresolved);
        }

        BuiltResults {
            results: separate_classes(drafts, &self.class_order),
            unmatched: outcome.unmatched,
            unresolved,
        }
    }

    /// # turn gaps into race times
    /// the first finishing line of a class carries the leader's time and the
    /// following lines of that class their gap to it. a class whose leader line
    /// matched nobody can't be converted when the roster has several classes,
    /// its finishers are returned by name and lose their time.
    fn gaps_to_totals(
        &self,
        tokens: &[(String, ParsedTime)],
        mut matched: Vec<MatchedToken>,
    ) -> (Vec<MatchedToken>, Vec<String>) {
        let mut classes: Vec<Option<i32>> = Vec::new();
        for entry in self.roster {
            if !classes.contains(&entry.car_class_id) {
                classes.push(entry.car_class_id);
            }
        }
        let single_class = classes.len() <= 1;

        let mut leaders: Vec<(Option<i32>, i32)> = Vec::new();
        let mut unanchored: Vec<Option<i32>> = Vec::new();
        let mut unresolved = Vec::new();

        for (index, (raw_name, time)) in tokens.iter().enumerate() {
            let gap = match time.millis {
                Some(millis) if time.is_finished() => millis,
                _ => continue,
            };

            let token = match matched.iter_mut().find(|token| token.index == index) {
                Some(token) => token,
                None => {
                    for class in &classes {
                        let has_leader = leaders.iter().any(|(leader_class, _)| leader_class == class);
                        if has_leader || unanchored.contains(class) {
                            continue;
                        }
                        if single_class {
                            leaders.push((*class, gap));
                        } else {
                            unanchored.push(*class);
                        }
                    }
                    debug!(target:"result_builder:gaps_to_totals", "unmatched finisher {} before a class leader", raw_name);
                    continue;
                }
            };

            let class = token.entry.car_class_id;
            if unanchored.contains(&class) {
                token.time = ParsedTime::not_finished(CompletionStatus::Dnf);
                unresolved.push(token.entry.psn_id.clone());
                continue;
            }

            let leader_time = leaders
                .iter()
                .find(|(leader_class, _)| *leader_class == class)
                .map(|(_, time)| *time);
            match leader_time {
                Some(leader_time) => token.time = ParsedTime::finished(leader_time.saturating_add(gap)),
                None => leaders.push((class, gap)),
            }
        }

        debug!(target:"result_builder:gaps_to_totals", "class leaders: {:?}", leaders);
        (matched, unresolved)
    }
}

/// # separate the classes
/// group results by car class and rank each class on its own. finishers are
/// ordered by time (ties keep their order), numbered from 1 and get their gap
/// to the class leader. non-finishers follow without position or gap.
///
/// ## Arguments
/// * `drafts` - the unordered results of one session
/// * `class_order` - the order classes are listed in, unknown classes go last
///
/// ## Returns
/// * `Vec<ResultDraft>` - the results, class by class
pub fn separate_classes(drafts: Vec<ResultDraft>, class_order: &[i32]) -> Vec<ResultDraft> {
    let mut classes: Vec<Option<i32>> = class_order.iter().map(|id| Some(*id)).collect();
    for draft in &drafts {
        if !classes.contains(&draft.car_class_id) {
            classes.push(draft.car_class_id);
        }
    }

    let mut separated = Vec::with_capacity(drafts.len());
    for class in classes {
        let (mut finishers, others): (Vec<ResultDraft>, Vec<ResultDraft>) = drafts
            .iter()
            .filter(|draft| draft.car_class_id == class)
            .cloned()
            .partition(|draft| draft.participated());

        finishers.sort_by_key(|draft| draft.time.millis.unwrap_or(i32::MAX));

        let leader_time = finishers.first().and_then(|draft| draft.time.millis);
        for (index, draft) in finishers.iter_mut().enumerate() {
            draft.position = Some(index as i32 + 1);
            draft.gap_to_first = match (draft.time.millis, leader_time) {
                (Some(millis), Some(leader)) => Some(millis - leader),
                _ => None,
            };
        }

        separated.extend(finishers);
        separated.extend(others.into_iter().map(|mut draft| {
            draft.position = None;
            draft.gap_to_first = None;
            draft
        }));
    }

    separated
}

/// # render results as text
/// the line format read by `ResultBuilder::from_text`, with absolute times
pub fn format_results(results: &[ResultDraft]) -> String {
    results
        .iter()
        .map(|result| format!("{} {}", result.psn_id, format_time(&result.time)))
        .collect::<Vec<String>>()
        .join("\n")
}
