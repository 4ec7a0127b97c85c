use std::cmp::Ordering;

use super::{ResourceRecord, ResourceStatus};

pub const ALL_CATEGORIES: &str = "All";
pub const ALL_STATUSES: &str = "ALL";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    MostDownloads,
    MostViews,
    NewestFirst,
    OldestFirst,
    HighestRated,
}

impl SortKey {
    pub const ALL: [SortKey; 5] = [
        SortKey::MostDownloads,
        SortKey::MostViews,
        SortKey::NewestFirst,
        SortKey::OldestFirst,
        SortKey::HighestRated,
    ];

    pub fn as_param(&self) -> &'static str {
        match self {
            SortKey::MostDownloads => "downloads",
            SortKey::MostViews => "views",
            SortKey::NewestFirst => "newest",
            SortKey::OldestFirst => "oldest",
            SortKey::HighestRated => "rating",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SortKey::MostDownloads => "Most Downloads",
            SortKey::MostViews => "Most Views",
            SortKey::NewestFirst => "Newest First",
            SortKey::OldestFirst => "Oldest First",
            SortKey::HighestRated => "Highest Rated",
        }
    }

    /// Unknown or missing values fall back to most-downloads.
    pub fn from_param(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("views") => SortKey::MostViews,
            Some("newest") => SortKey::NewestFirst,
            Some("oldest") => SortKey::OldestFirst,
            Some("rating") => SortKey::HighestRated,
            _ => SortKey::MostDownloads,
        }
    }

    pub fn compare(&self, a: &ResourceRecord, b: &ResourceRecord) -> Ordering {
        match self {
            SortKey::MostDownloads => b.downloads().cmp(&a.downloads()),
            SortKey::MostViews => b.views().cmp(&a.views()),
            // `None < Some(_)`: undated records are the oldest possible.
            SortKey::NewestFirst => b.created_at().cmp(&a.created_at()),
            SortKey::OldestFirst => a.created_at().cmp(&b.created_at()),
            SortKey::HighestRated => compare_rating(b.rating(), a.rating()),
        }
    }
}

fn compare_rating(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(String),
}

impl CategoryFilter {
    pub fn from_param(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            None | Some("") | Some(ALL_CATEGORIES) => CategoryFilter::All,
            Some(category) => CategoryFilter::Only(category.to_string()),
        }
    }

    pub fn as_param(&self) -> &str {
        match self {
            CategoryFilter::All => ALL_CATEGORIES,
            CategoryFilter::Only(category) => category,
        }
    }

    fn admits(&self, record: &ResourceRecord) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(category) => record.category() == category,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusGate {
    /// Public listing: only approved resources are visible.
    #[default]
    ApprovedOnly,
    /// Moderation view with the `ALL` status selection.
    Any,
    Only(ResourceStatus),
}

impl StatusGate {
    /// Admin status selector; anything unrecognised shows everything.
    pub fn from_admin_param(value: Option<&str>) -> Self {
        match value.and_then(ResourceStatus::parse) {
            Some(status) => StatusGate::Only(status),
            None => StatusGate::Any,
        }
    }

    pub fn as_param(&self) -> &'static str {
        match self {
            StatusGate::ApprovedOnly => ResourceStatus::Approved.as_str(),
            StatusGate::Any => ALL_STATUSES,
            StatusGate::Only(status) => status.as_str(),
        }
    }

    fn admits(&self, record: &ResourceRecord) -> bool {
        match self {
            StatusGate::ApprovedOnly => record.status == ResourceStatus::Approved,
            StatusGate::Any => true,
            StatusGate::Only(status) => record.status == *status,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pub search: String,
    pub sort: SortKey,
    pub category: CategoryFilter,
    pub status: StatusGate,
}

impl QueryParams {
    pub fn is_filtered(&self) -> bool {
        !self.search.is_empty() || self.category != CategoryFilter::All
    }
}

/// Filter and order a snapshot of records for display.
///
/// Stages run in order: status gate, category, search, then a stable sort.
/// An empty result is a normal outcome, and nothing is truncated.
pub fn query<'a>(records: &'a [ResourceRecord], params: &QueryParams) -> Vec<&'a ResourceRecord> {
    let needle = params.search.to_lowercase();

    let mut result = records
        .iter()
        .filter(|record| params.status.admits(record))
        .filter(|record| params.category.admits(record))
        .filter(|record| needle.is_empty() || matches_search(record, &needle))
        .collect::<Vec<_>>();

    result.sort_by(|a, b| params.sort.compare(a, b));
    result
}

fn matches_search(record: &ResourceRecord, needle: &str) -> bool {
    record.title().to_lowercase().contains(needle)
        || record.description().to_lowercase().contains(needle)
        || record.category().to_lowercase().contains(needle)
}

/// Keep the first `count` of an already filtered list, ordered by `sort`
/// with download count breaking ties.
pub fn featured<'a>(
    mut ordered: Vec<&'a ResourceRecord>,
    sort: SortKey,
    count: usize,
) -> Vec<&'a ResourceRecord> {
    ordered.sort_by(|a, b| {
        sort.compare(a, b)
            .then_with(|| SortKey::MostDownloads.compare(a, b))
    });
    ordered.truncate(count);
    ordered
}

/// `All` followed by each derived category in first-seen order.
pub fn categories<'a, I>(records: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a ResourceRecord>,
{
    let mut seen = vec![ALL_CATEGORIES.to_string()];
    for record in records {
        let category = record.category();
        if !seen.iter().any(|known| known == category) {
            seen.push(category.to_string());
        }
    }
    seen
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub total: usize,
    pub approved: usize,
    pub pending: usize,
    pub declined: usize,
}

impl StatusCounts {
    pub fn tally(records: &[ResourceRecord]) -> Self {
        records.iter().fold(
            StatusCounts {
                total: records.len(),
                ..StatusCounts::default()
            },
            |mut counts, record| {
                match record.status {
                    ResourceStatus::Approved => counts.approved += 1,
                    ResourceStatus::Pending => counts.pending += 1,
                    ResourceStatus::Declined => counts.declined += 1,
                }
                counts
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::ResourceId;

    fn record(id: i64) -> ResourceRecord {
        ResourceRecord {
            id: ResourceId::Number(id),
            title: Some(format!("resource {id}")),
            status: ResourceStatus::Approved,
            ..ResourceRecord::default()
        }
    }

    fn ids(records: &[&ResourceRecord]) -> Vec<String> {
        records.iter().map(|r| r.id.to_string()).collect()
    }

    fn admin_params() -> QueryParams {
        QueryParams {
            status: StatusGate::Any,
            ..QueryParams::default()
        }
    }

    #[test]
    fn category_and_search_compose() {
        let mut a = record(1);
        a.category = Some("A".to_string());
        a.title = Some("foo".to_string());
        let mut b = record(2);
        b.category = Some("B".to_string());
        b.title = Some("foo".to_string());
        let records = vec![a, b];

        let mut params = QueryParams {
            search: "foo".to_string(),
            category: CategoryFilter::Only("A".to_string()),
            ..QueryParams::default()
        };
        assert_eq!(ids(&query(&records, &params)), vec!["1"]);

        params.search = "bar".to_string();
        assert!(query(&records, &params).is_empty());
    }

    #[test]
    fn missing_downloads_sort_as_zero() {
        let mut five = record(1);
        five.download_count = Some(5);
        let missing = record(2);
        let mut ten = record(3);
        ten.download_count = Some(10);
        let records = vec![five, missing, ten];

        let result = query(&records, &QueryParams::default());
        assert_eq!(ids(&result), vec!["3", "1", "2"]);
    }

    #[test]
    fn public_listing_only_shows_approved() {
        let mut pending = record(1);
        pending.status = ResourceStatus::Pending;
        let approved = record(2);
        let records = vec![pending, approved];

        assert_eq!(ids(&query(&records, &QueryParams::default())), vec!["2"]);

        let admin = QueryParams {
            status: StatusGate::from_admin_param(Some("ALL")),
            ..QueryParams::default()
        };
        assert_eq!(query(&records, &admin).len(), 2);
    }

    #[test]
    fn admin_status_filter_selects_one_status() {
        let mut declined = record(1);
        declined.status = ResourceStatus::Declined;
        let records = vec![declined, record(2)];
        let params = QueryParams {
            status: StatusGate::from_admin_param(Some("DECLINED")),
            ..QueryParams::default()
        };
        assert_eq!(ids(&query(&records, &params)), vec!["1"]);
    }

    #[test]
    fn search_is_case_insensitive_over_title_description_category() {
        let mut by_title = record(1);
        by_title.title = Some("Operating SYSTEMS".to_string());
        let mut by_description = record(2);
        by_description.description = Some("covers systems calls".to_string());
        let by_category = record(3);
        let mut unrelated = record(4);
        unrelated.title = Some("Graphs".to_string());
        let records = vec![by_title, by_description, by_category, unrelated];

        let params = QueryParams {
            search: "Systems".to_string(),
            ..admin_params()
        };
        let mut found = ids(&query(&records, &params));
        found.sort();
        assert_eq!(found, vec!["1", "2"]);

        let params = QueryParams {
            search: "uncategor".to_string(),
            ..admin_params()
        };
        assert_eq!(query(&records, &params).len(), 4);
    }

    #[test]
    fn missing_description_never_matches_everything() {
        let mut bare = record(1);
        bare.title = Some("Networks".to_string());
        let records = vec![bare];
        let params = QueryParams {
            search: "zzz".to_string(),
            ..admin_params()
        };
        assert!(query(&records, &params).is_empty());
    }

    #[test]
    fn category_filter_uses_uncategorized_fallback() {
        let mut tagged = record(1);
        tagged.category = Some("Projects".to_string());
        let untagged = record(2);
        let records = vec![tagged, untagged];
        let params = QueryParams {
            category: CategoryFilter::from_param(Some("Uncategorized")),
            ..admin_params()
        };
        assert_eq!(ids(&query(&records, &params)), vec!["2"]);
    }

    #[test]
    fn undated_records_are_oldest() {
        let mut old = record(1);
        old.created_at = Some("2023-01-01T00:00:00".to_string());
        let mut new = record(2);
        new.created_at = Some("2024-06-01T12:00:00Z".to_string());
        let mut broken = record(3);
        broken.created_at = Some("not a date".to_string());
        let undated = record(4);
        let records = vec![broken, old, undated, new];

        let newest = QueryParams {
            sort: SortKey::NewestFirst,
            ..QueryParams::default()
        };
        assert_eq!(ids(&query(&records, &newest)), vec!["2", "1", "3", "4"]);

        let oldest = QueryParams {
            sort: SortKey::OldestFirst,
            ..QueryParams::default()
        };
        assert_eq!(ids(&query(&records, &oldest)), vec!["3", "4", "1", "2"]);
    }

    #[test]
    fn unrated_records_sort_below_rated() {
        let mut low = record(1);
        low.rating = Some(0.5);
        let unrated = record(2);
        let mut high = record(3);
        high.rating = Some(4.8);
        let records = vec![low, unrated, high];
        let params = QueryParams {
            sort: SortKey::HighestRated,
            ..QueryParams::default()
        };
        assert_eq!(ids(&query(&records, &params)), vec!["3", "1", "2"]);
    }

    #[test]
    fn views_sort_descending() {
        let mut a = record(1);
        a.view_count = Some(3);
        let mut b = record(2);
        b.view_count = Some(30);
        let records = vec![a, b];
        let params = QueryParams {
            sort: SortKey::MostViews,
            ..QueryParams::default()
        };
        assert_eq!(ids(&query(&records, &params)), vec!["2", "1"]);
    }

    #[test]
    fn empty_input_is_fine() {
        assert!(query(&[], &QueryParams::default()).is_empty());
    }

    #[test]
    fn featured_truncates_with_download_tiebreak() {
        let mut a = record(1);
        a.rating = Some(4.0);
        a.download_count = Some(1);
        let mut b = record(2);
        b.rating = Some(4.0);
        b.download_count = Some(50);
        let mut c = record(3);
        c.rating = Some(3.0);
        let records = vec![a, b, c];

        let ordered = query(
            &records,
            &QueryParams {
                sort: SortKey::HighestRated,
                ..QueryParams::default()
            },
        );
        let top = featured(ordered, SortKey::HighestRated, 2);
        assert_eq!(ids(&top), vec!["2", "1"]);
    }

    #[test]
    fn categories_in_first_seen_order() {
        let mut a = record(1);
        a.category = Some("Projects".to_string());
        let b = record(2);
        let mut c = record(3);
        c.category = Some("Projects".to_string());
        let records = vec![a, b, c];
        assert_eq!(
            categories(&records),
            vec!["All", "Projects", "Uncategorized"]
        );
    }

    #[test]
    fn status_counts() {
        let mut pending = record(1);
        pending.status = ResourceStatus::Pending;
        let records = vec![pending, record(2), record(3)];
        assert_eq!(
            StatusCounts::tally(&records),
            StatusCounts {
                total: 3,
                approved: 2,
                pending: 1,
                declined: 0
            }
        );
    }

    #[test]
    fn sort_param_round_trip_and_fallback() {
        for key in SortKey::ALL {
            assert_eq!(SortKey::from_param(Some(key.as_param())), key);
        }
        assert_eq!(SortKey::from_param(Some("bogus")), SortKey::MostDownloads);
        assert_eq!(SortKey::from_param(None), SortKey::MostDownloads);
    }
}
