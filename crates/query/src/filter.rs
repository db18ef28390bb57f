use std::collections::HashSet;

use karst_features::fold_text;
use karst_model::{AscentRecord, FilterCriteria, GradeScale, Status};

use crate::Listable;

/// Keep the records matching every active criterion, in input order.
///
/// `completed` answers whether a record counts as sent; it is only
/// consulted when a status criterion is active, since completion lives
/// in another collection (see [`ticked_problem_ids`]).
///
/// Grade bounds fail open: a record whose effective grade is missing or
/// off the scale passes the range check. Sorting does the opposite and
/// puts such records last. Bounds that are themselves off the scale are
/// ignored.
pub fn filter<T, F>(records: &[T], criteria: &FilterCriteria, completed: F) -> Vec<T>
where
    T: Listable + Clone,
    F: Fn(&T) -> bool,
{
    let matcher = Matcher::new(criteria);
    records
        .iter()
        .filter(|record| matcher.matches(*record, &completed))
        .cloned()
        .collect()
}

/// Problem ids the given ticks cover.
pub fn ticked_problem_ids(ticks: &[AscentRecord]) -> HashSet<&str> {
    ticks.iter().map(|tick| tick.problem.id.as_str()).collect()
}

struct Matcher<'a> {
    criteria: &'a FilterCriteria,
    scale: GradeScale,
    search: Option<String>,
    min_rank: Option<usize>,
    max_rank: Option<usize>,
}

impl<'a> Matcher<'a> {
    fn new(criteria: &'a FilterCriteria) -> Self {
        let scale = GradeScale::standard();
        let bound = |grade: &Option<String>| {
            grade
                .as_deref()
                .map(|g| scale.rank(g.trim()))
                .filter(|rank| *rank < scale.unranked())
        };

        Self {
            criteria,
            scale,
            search: criteria
                .search_text
                .as_deref()
                .map(fold_text)
                .filter(|s| !s.is_empty()),
            min_rank: bound(&criteria.min_grade),
            max_rank: bound(&criteria.max_grade),
        }
    }

    fn matches<T: Listable>(&self, record: &T, completed: &impl Fn(&T) -> bool) -> bool {
        self.matches_search(record)
            && self.matches_grade(record)
            && self.matches_rating(record)
            && self.matches_style(record)
            && self.matches_status(record, completed)
    }

    fn matches_search<T: Listable>(&self, record: &T) -> bool {
        let Some(needle) = &self.search else {
            return true;
        };
        std::iter::once(record.name())
            .chain(record.place_names())
            .any(|haystack| fold_text(haystack).contains(needle.as_str()))
    }

    fn matches_grade<T: Listable>(&self, record: &T) -> bool {
        if self.min_rank.is_none() && self.max_rank.is_none() {
            return true;
        }
        let rank = self.scale.rank_of(record.effective_grade());
        if rank == self.scale.unranked() {
            return true;
        }
        self.min_rank.map_or(true, |min| rank >= min) && self.max_rank.map_or(true, |max| rank <= max)
    }

    fn matches_rating<T: Listable>(&self, record: &T) -> bool {
        match self.criteria.min_rating {
            Some(threshold) => record.rating().is_some_and(|rating| rating >= threshold),
            None => true,
        }
    }

    fn matches_style<T: Listable>(&self, record: &T) -> bool {
        match self.criteria.style {
            Some(style) => record.style() == Some(style),
            None => true,
        }
    }

    fn matches_status<T: Listable>(&self, record: &T, completed: &impl Fn(&T) -> bool) -> bool {
        match self.criteria.status {
            Some(status) => completed(record) == (status == Status::Sent),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{ids, problem, tick};
    use karst_model::{AreaRef, ProblemRecord, Reference, Style};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn problem_ids(records: &[ProblemRecord]) -> Vec<String> {
        ids(records.iter().map(|r| r.id.as_str()))
    }

    #[test]
    fn test_empty_criteria_keeps_everything() {
        let records = vec![problem("1", "A", Some("6A")), problem("2", "B", None)];
        let kept = filter(&records, &FilterCriteria::default(), |_| false);
        assert_eq!(kept, records);
    }

    #[test]
    fn test_grade_range_fails_open() {
        let records = vec![
            problem("1", "A", Some("6A")),
            problem("2", "B", None),
            problem("3", "C", Some("8A")),
        ];
        let criteria = FilterCriteria::default().with_grade_range(Some("6A"), Some("7A"));
        let kept = filter(&records, &criteria, |_| false);
        assert_eq!(problem_ids(&kept), vec!["1", "2"]);
    }

    #[test]
    fn test_unknown_grade_bound_is_ignored() {
        let records = vec![problem("1", "A", Some("5")), problem("2", "B", Some("8A"))];
        let criteria = FilterCriteria::default().with_grade_range(Some("V2"), Some("7A"));
        let kept = filter(&records, &criteria, |_| false);
        assert_eq!(problem_ids(&kept), vec!["1"]);
    }

    #[test]
    fn test_search_matches_name_and_places_without_accents() {
        let mut holstejn = problem("1", "Dívčí válka", Some("7A"));
        holstejn.area = Some(Reference::Detailed(AreaRef {
            id: "10".into(),
            name: "Holštejn".into(),
            city_id: None,
            city_name: None,
        }));
        let mut sloup = problem("2", "Roof", Some("6B"));
        sloup.sector_name = Some("Sloup".into());
        let records = vec![holstejn, sloup];

        let by_name = filter(&records, &FilterCriteria::default().with_search("DIVCI"), |_| false);
        assert_eq!(problem_ids(&by_name), vec!["1"]);

        let by_area = filter(&records, &FilterCriteria::default().with_search("holstejn"), |_| false);
        assert_eq!(problem_ids(&by_area), vec!["1"]);

        let by_sector = filter(&records, &FilterCriteria::default().with_search("slo"), |_| false);
        assert_eq!(problem_ids(&by_sector), vec!["2"]);

        let blank = filter(&records, &FilterCriteria::default().with_search("   "), |_| false);
        assert_eq!(blank.len(), 2);
    }

    #[test]
    fn test_min_rating_excludes_unrated() {
        let mut rated = problem("1", "A", None);
        rated.rating = Some(4.0);
        let mut low = problem("2", "B", None);
        low.rating = Some(2.5);
        let unrated = problem("3", "C", None);

        let criteria = FilterCriteria::default().with_min_rating(3.0);
        let kept = filter(&[rated, low, unrated], &criteria, |_| false);
        assert_eq!(problem_ids(&kept), vec!["1"]);
    }

    #[test]
    fn test_style_filter_on_ticks() {
        let mut flash = tick("1", Some("6A"), None);
        flash.notes = "style: flash".into();
        let plain = tick("2", Some("6A"), None);

        let criteria = FilterCriteria::default().with_style(Style::Flash);
        let kept = filter(&[flash.clone(), plain.clone()], &criteria, |_| true);
        assert_eq!(kept, vec![flash]);

        let sends = filter(&[plain.clone()], &FilterCriteria::default().with_style(Style::Send), |_| true);
        assert_eq!(sends, vec![plain]);
    }

    #[test]
    fn test_status_uses_caller_lookup() {
        let ticks = vec![tick("t1", None, None)];
        let mut done = problem("p-done", "Done", None);
        done.id = ticks[0].problem.id.clone();
        let todo = problem("p-todo", "Todo", None);
        let records = vec![done, todo];

        let sent = ticked_problem_ids(&ticks);
        let is_sent = |p: &ProblemRecord| sent.contains(p.id.as_str());

        let todo_only = filter(&records, &FilterCriteria::default().with_status(Status::Todo), is_sent);
        assert_eq!(problem_ids(&todo_only), vec!["p-todo"]);

        let sent_only = filter(&records, &FilterCriteria::default().with_status(Status::Sent), is_sent);
        assert_eq!(problem_ids(&sent_only), vec!["pt1"]);
    }

    #[test]
    fn test_criteria_combine_with_and() {
        let mut a = problem("1", "Crimp", Some("7A"));
        a.rating = Some(5.0);
        let mut b = problem("2", "Crimp Left", Some("8A"));
        b.rating = Some(5.0);
        let mut c = problem("3", "Sloper", Some("7A"));
        c.rating = Some(5.0);

        let criteria = FilterCriteria::default()
            .with_search("crimp")
            .with_grade_range(None, Some("7B"))
            .with_min_rating(4.5);
        let kept = filter(&[a, b, c], &criteria, |_| false);
        assert_eq!(problem_ids(&kept), vec!["1"]);
    }

    fn grade_strategy() -> impl Strategy<Value = Option<String>> {
        prop_oneof![
            Just(None),
            prop::sample::select(karst_model::BOULDER_GRADES).prop_map(|g| Some(g.to_string())),
            Just(Some("V7".to_string())),
        ]
    }

    fn tick_strategy() -> impl Strategy<Value = AscentRecord> {
        (
            grade_strategy(),
            prop::sample::select(vec!["Roof", "Crimp Left", "Dívčí válka", "sloper"]),
            prop::option::of(prop::sample::select(vec![1.0_f32, 2.5, 3.0, 4.5, 5.0])),
            prop::sample::select(vec!["", "style: flash", "style: solo", "style: redpoint", "wet"]),
        )
            .prop_map(|(grade, name, rating, notes)| {
                let mut record = tick("0", grade.as_deref(), None);
                record.problem.name = name.to_string();
                record.rating = rating;
                record.notes = notes.to_string();
                record
            })
    }

    fn criteria_strategy() -> impl Strategy<Value = FilterCriteria> {
        (
            grade_strategy(),
            grade_strategy(),
            prop::option::of(prop::sample::select(vec!["crimp", "DIVCI", "o", "zzz"])),
            prop::option::of(prop::sample::select(vec![0.0_f32, 3.0, 4.5])),
            prop::option::of(prop::sample::select(vec![Style::Send, Style::Flash, Style::Solo])),
            prop::option::of(prop::sample::select(vec![Status::Todo, Status::Sent])),
        )
            .prop_map(|(min, max, search, min_rating, style, status)| FilterCriteria {
                search_text: search.map(str::to_string),
                min_grade: min,
                max_grade: max,
                min_rating,
                style,
                status,
            })
    }

    proptest! {
        /// Property: filtering is idempotent for any combination of criteria.
        #[test]
        fn filter_is_idempotent(
            records in prop::collection::vec(tick_strategy(), 0..40),
            criteria in criteria_strategy(),
        ) {
            let records: Vec<_> = records
                .into_iter()
                .enumerate()
                .map(|(i, mut record)| {
                    record.id = i.to_string();
                    record
                })
                .collect();
            let completed = |record: &AscentRecord| record.id.len() % 2 == 0 || record.id.ends_with('3');

            let once = filter(&records, &criteria, completed);
            let twice = filter(&once, &criteria, completed);
            prop_assert_eq!(once, twice);
        }
    }
}
