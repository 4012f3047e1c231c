//! Episode grouping
//!
//! Results closer together than a pathogen's episode duration are taken to be
//! the same illness. The gap is measured from the last result seen, while an
//! episode keeps reporting the date it started on.

use chrono::NaiveDate;
use cohortspec_diagnostics::{CohortError, Result};
use cohortspec_model::{EpisodeDuration, PathogenTable, TestResult};

/// A run of events attributed to one illness
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Episode {
    /// Earliest date in the episode, which is the date reported for it
    pub start: NaiveDate,
    /// Every date folded into the episode, in order
    pub dates: Vec<NaiveDate>,
}

impl Episode {
    fn new(start: NaiveDate) -> Self {
        Self {
            start,
            dates: vec![start],
        }
    }

    pub fn last_seen(&self) -> NaiveDate {
        self.dates.last().copied().unwrap_or(self.start)
    }
}

/// Group chronologically ordered dates into episodes
///
/// A date starts a new episode when there is no current episode or when it
/// lies more than `duration` days after the previous date; otherwise it joins
/// the current one without moving its start.
pub fn group_into_episodes(dates: &[NaiveDate], duration: EpisodeDuration) -> Vec<Episode> {
    let mut episodes: Vec<Episode> = Vec::new();
    for &date in dates {
        match episodes.last_mut() {
            Some(current) if duration.joins((date - current.last_seen()).num_days()) => {
                current.dates.push(date);
            }
            _ => episodes.push(Episode::new(date)),
        }
    }
    episodes
}

/// One SGSS laboratory result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SgssRecord {
    pub pathogen: String,
    pub specimen_date: NaiveDate,
    pub positive: bool,
}

impl SgssRecord {
    pub fn positive(pathogen: impl Into<String>, specimen_date: NaiveDate) -> Self {
        Self {
            pathogen: pathogen.into(),
            specimen_date,
            positive: true,
        }
    }

    pub fn negative(pathogen: impl Into<String>, specimen_date: NaiveDate) -> Self {
        Self {
            pathogen: pathogen.into(),
            specimen_date,
            positive: false,
        }
    }
}

/// Specimen dates a patient's SGSS results contribute, in chronological order
///
/// Positive results are grouped into episodes using the pathogen's duration
/// and contribute each episode's start date. Negative results are never
/// grouped and each contributes its own date.
pub fn sgss_events(
    records: &[SgssRecord],
    pathogens: &PathogenTable,
    pathogen: &str,
    test_result: TestResult,
) -> Result<Vec<NaiveDate>> {
    let Some(duration) = pathogens.duration(pathogen) else {
        return Err(CohortError::unsupported_pathogen(Some(pathogen), pathogens.pathogens()));
    };

    let mut positives = Vec::new();
    let mut events = Vec::new();
    for record in records.iter().filter(|r| r.pathogen == pathogen) {
        if !test_result.admits(record.positive) {
            continue;
        }
        if record.positive {
            positives.push(record.specimen_date);
        } else {
            events.push(record.specimen_date);
        }
    }
    positives.sort_unstable();

    let episodes = group_into_episodes(&positives, duration);
    log::debug!(
        "{pathogen}: {} positive results in {} episodes, {} negative results",
        positives.len(),
        episodes.len(),
        events.len()
    );
    events.extend(episodes.into_iter().map(|e| e.start));
    events.sort_unstable();
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn day(n: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 1, 1).unwrap() + chrono::Duration::days(n - 1)
    }

    #[test]
    fn test_fourteen_day_episodes() {
        let episodes = group_into_episodes(&[day(1), day(10), day(40)], EpisodeDuration::Days(14));
        assert_eq!(
            episodes,
            vec![
                Episode {
                    start: day(1),
                    dates: vec![day(1), day(10)]
                },
                Episode {
                    start: day(40),
                    dates: vec![day(40)]
                },
            ]
        );
    }

    #[test]
    fn test_gap_is_measured_from_last_seen() {
        // each step is within 14 days even though the span is not
        let episodes = group_into_episodes(&[day(1), day(14), day(27), day(40)], EpisodeDuration::Days(14));
        assert_eq!(episodes.len(), 1);
        assert_eq!(episodes[0].start, day(1));
    }

    #[test]
    fn test_boundary_gap_joins() {
        let episodes = group_into_episodes(&[day(1), day(15), day(30)], EpisodeDuration::Days(14));
        assert_eq!(episodes.iter().map(|e| e.start).collect::<Vec<_>>(), vec![day(1), day(30)]);
    }

    #[test]
    fn test_infinite_duration() {
        let episodes = group_into_episodes(&[day(1), day(10), day(400)], EpisodeDuration::Infinite);
        assert_eq!(episodes.len(), 1);
        assert_eq!(episodes[0].start, day(1));
        assert_eq!(episodes[0].last_seen(), day(400));
    }

    #[test]
    fn test_sgss_keeps_negatives_distinct() {
        let records = vec![
            SgssRecord::positive("SARS-CoV-2", day(40)),
            SgssRecord::negative("SARS-CoV-2", day(3)),
            SgssRecord::positive("SARS-CoV-2", day(1)),
            SgssRecord::negative("SARS-CoV-2", day(4)),
            SgssRecord::positive("influenza", day(2)),
        ];
        let table = PathogenTable::default();
        let any = sgss_events(&records, &table, "SARS-CoV-2", TestResult::Any).unwrap();
        assert_eq!(any, vec![day(1), day(3), day(4)]);
        let negative = sgss_events(&records, &table, "SARS-CoV-2", TestResult::Negative).unwrap();
        assert_eq!(negative, vec![day(3), day(4)]);
        let positive = sgss_events(&records, &table, "SARS-CoV-2", TestResult::Positive).unwrap();
        assert_eq!(positive, vec![day(1)]);
    }

    #[test]
    fn test_sgss_unknown_pathogen() {
        let err = sgss_events(&[], &PathogenTable::default(), "influenza", TestResult::Any).unwrap_err();
        assert_eq!(err.code(), cohortspec_diagnostics::COH0005);
    }

    fn sorted_days() -> impl Strategy<Value = Vec<NaiveDate>> {
        prop::collection::vec(1i64..500, 0..40).prop_map(|mut days| {
            days.sort_unstable();
            days.into_iter().map(day).collect()
        })
    }

    proptest! {
        #[test]
        fn prop_episodes_partition_input(dates in sorted_days(), gap in 0u32..60) {
            let episodes = group_into_episodes(&dates, EpisodeDuration::Days(gap));
            let flattened: Vec<NaiveDate> = episodes.iter().flat_map(|e| e.dates.clone()).collect();
            prop_assert_eq!(flattened, dates);
        }

        #[test]
        fn prop_episode_start_is_earliest(dates in sorted_days(), gap in 0u32..60) {
            for episode in group_into_episodes(&dates, EpisodeDuration::Days(gap)) {
                prop_assert_eq!(Some(&episode.start), episode.dates.iter().min());
            }
        }

        #[test]
        fn prop_episodes_separated_by_more_than_gap(dates in sorted_days(), gap in 0u32..60) {
            let episodes = group_into_episodes(&dates, EpisodeDuration::Days(gap));
            for pair in episodes.windows(2) {
                prop_assert!((pair[1].start - pair[0].last_seen()).num_days() > i64::from(gap));
            }
        }

        #[test]
        fn prop_infinite_is_one_episode(dates in sorted_days()) {
            let episodes = group_into_episodes(&dates, EpisodeDuration::Infinite);
            prop_assert_eq!(episodes.len(), usize::from(!dates.is_empty()));
        }
    }
}
