//! Catalog filtering and pagination. Everything here is a pure function of
//! its inputs.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::models::stone::StoneRecord;

/// Filter value meaning "no constraint", as sent by the catalog dropdowns.
pub const ALL_SENTINEL: &str = "all";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoneFilter {
    pub category: Option<String>,
    pub rock_type: Option<String>,
    pub base_color: Option<String>,
    pub search: Option<String>,
}

fn constraint(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case(ALL_SENTINEL))
}

impl StoneFilter {
    pub fn is_unconstrained(&self) -> bool {
        constraint(&self.category).is_none()
            && constraint(&self.rock_type).is_none()
            && constraint(&self.base_color).is_none()
            && constraint(&self.search).is_none()
    }

    pub fn matches(&self, record: &StoneRecord) -> bool {
        let data = &record.data;
        let exact = |wanted: &Option<String>, actual: &str| {
            constraint(wanted).map_or(true, |w| w == actual)
        };
        if !exact(&self.category, &data.category)
            || !exact(&self.rock_type, &data.rock_type)
            || !exact(&self.base_color, &data.base_color)
        {
            return false;
        }
        match constraint(&self.search) {
            None => true,
            Some(needle) => {
                let needle = needle.to_lowercase();
                data.name.to_lowercase().contains(&needle)
                    || data.characteristics.to_lowercase().contains(&needle)
            }
        }
    }
}

pub fn filter_stones(records: &[StoneRecord], filter: &StoneFilter) -> Vec<StoneRecord> {
    records
        .iter()
        .filter(|r| filter.matches(r))
        .cloned()
        .collect()
}

/// 1-indexed page of `items`. Page 0 reads as page 1; pages past the end
/// are empty.
pub fn paginate<T>(items: &[T], page: usize, page_size: usize) -> &[T] {
    let page_size = page_size.max(1);
    let start = (page.max(1) - 1).saturating_mul(page_size);
    if start >= items.len() {
        return &[];
    }
    let end = (start + page_size).min(items.len());
    &items[start..end]
}

pub fn page_count(len: usize, page_size: usize) -> usize {
    len.div_ceil(page_size.max(1))
}

/// Filter plus current page of a catalog view. The list endpoint builds one
/// per request from its query string; clients that keep view state use the
/// same rules (a filter change goes back to page 1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogQueryState {
    filter: StoneFilter,
    page: usize,
}

impl Default for CatalogQueryState {
    fn default() -> Self {
        Self {
            filter: StoneFilter::default(),
            page: 1,
        }
    }
}

impl CatalogQueryState {
    pub fn new(filter: StoneFilter, page: usize) -> Self {
        let mut state = Self::default();
        state.set_filter(filter);
        state.set_page(page);
        state
    }

    pub fn filter(&self) -> &StoneFilter {
        &self.filter
    }

    pub fn page(&self) -> usize {
        self.page
    }

    /// Any change to the filter sends the view back to the first page.
    pub fn set_filter(&mut self, filter: StoneFilter) {
        if filter != self.filter {
            self.filter = filter;
            self.page = 1;
        }
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = page.max(1);
    }
}

/// Distinct values offered by the catalog dropdowns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterOptions {
    pub categories: Vec<String>,
    pub rock_types: Vec<String>,
    pub base_colors: Vec<String>,
}

impl FilterOptions {
    pub fn from_records(records: &[StoneRecord]) -> Self {
        let collect = |pick: fn(&StoneRecord) -> &str| {
            records
                .iter()
                .map(pick)
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect::<Vec<_>>()
        };
        Self {
            categories: collect(|r| &r.data.category),
            rock_types: collect(|r| &r.data.rock_type),
            base_colors: collect(|r| &r.data.base_color),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::stone::StoneData;

    fn stone(id: i64, name: &str, category: &str, rock: &str, color: &str, chars: &str) -> StoneRecord {
        StoneRecord {
            id,
            data: StoneData {
                name: name.into(),
                category: category.into(),
                rock_type: rock.into(),
                base_color: color.into(),
                characteristics: chars.into(),
                ..Default::default()
            },
        }
    }

    fn catalog() -> Vec<StoneRecord> {
        vec![
            stone(1, "Marble A", "Marble", "Metamorphic", "White", "veined, polished"),
            stone(2, "Granite B", "Granite", "Igneous", "Grey", "speckled"),
            stone(3, "Nero Assoluto", "Granite", "Igneous", "Black", "uniform, dense"),
            stone(4, "Travertino", "Limestone", "Sedimentary", "Beige", "porous, RANDOM holes"),
            stone(5, "Calacatta", "Marble", "Metamorphic", "White", "bold veining"),
        ]
    }

    fn names(records: &[StoneRecord]) -> Vec<&str> {
        records.iter().map(|r| r.data.name.as_str()).collect()
    }

    #[test]
    fn category_and_search_examples() {
        let records = vec![
            stone(1, "Marble A", "Marble", "", "", ""),
            stone(2, "Granite B", "Granite", "", "", ""),
        ];
        let by_category = StoneFilter {
            category: Some("Marble".into()),
            ..Default::default()
        };
        assert_eq!(names(&filter_stones(&records, &by_category)), vec!["Marble A"]);

        let by_search = StoneFilter {
            search: Some("ran".into()),
            ..Default::default()
        };
        assert_eq!(names(&filter_stones(&records, &by_search)), vec!["Granite B"]);
    }

    #[test]
    fn unconstrained_filters_return_everything() {
        let records = catalog();
        let variants = [
            StoneFilter::default(),
            StoneFilter {
                category: Some("all".into()),
                rock_type: Some("ALL".into()),
                base_color: Some("".into()),
                search: Some("   ".into()),
            },
        ];
        for filter in variants {
            assert!(filter.is_unconstrained());
            assert_eq!(filter_stones(&records, &filter), records);
        }
    }

    #[test]
    fn each_field_predicate_holds_for_every_result() {
        let records = catalog();

        let f = StoneFilter { category: Some("Granite".into()), ..Default::default() };
        let out = filter_stones(&records, &f);
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|r| r.data.category == "Granite"));

        let f = StoneFilter { rock_type: Some("Metamorphic".into()), ..Default::default() };
        let out = filter_stones(&records, &f);
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|r| r.data.rock_type == "Metamorphic"));

        let f = StoneFilter { base_color: Some("White".into()), ..Default::default() };
        let out = filter_stones(&records, &f);
        assert!(out.iter().all(|r| r.data.base_color == "White"));

        let f = StoneFilter { search: Some("VEIN".into()), ..Default::default() };
        let out = filter_stones(&records, &f);
        assert_eq!(names(&out), vec!["Marble A", "Calacatta"]);
        assert!(out.iter().all(|r| {
            r.data.name.to_lowercase().contains("vein")
                || r.data.characteristics.to_lowercase().contains("vein")
        }));
    }

    #[test]
    fn exact_fields_are_case_sensitive_and_search_is_not() {
        let records = catalog();
        let f = StoneFilter { category: Some("marble".into()), ..Default::default() };
        assert!(filter_stones(&records, &f).is_empty());

        let f = StoneFilter { search: Some("random".into()), ..Default::default() };
        assert_eq!(names(&filter_stones(&records, &f)), vec!["Travertino"]);
    }

    #[test]
    fn combined_constraints_intersect() {
        let f = StoneFilter {
            category: Some("Granite".into()),
            base_color: Some("Black".into()),
            ..Default::default()
        };
        assert_eq!(names(&filter_stones(&catalog(), &f)), vec!["Nero Assoluto"]);
    }

    #[test]
    fn pages_concatenate_back_to_the_input() {
        let records = catalog();
        for size in 1..=7 {
            let pages = page_count(records.len(), size);
            assert_eq!(pages, (records.len() + size - 1) / size);
            let joined: Vec<StoneRecord> = (1..=pages)
                .flat_map(|p| paginate(&records, p, size).to_vec())
                .collect();
            assert_eq!(joined, records);
            assert!(paginate(&records, pages + 1, size).is_empty());
        }
    }

    #[test]
    fn pagination_edges() {
        let items = [1, 2, 3];
        assert_eq!(paginate(&items, 0, 2), &[1, 2]);
        assert_eq!(paginate(&items, 2, 2), &[3]);
        assert_eq!(paginate(&items, 1, 0), &[1]);
        assert_eq!(page_count(0, 12), 0);
        assert!(paginate::<i32>(&[], 1, 12).is_empty());
    }

    #[test]
    fn changing_a_filter_resets_to_page_one() {
        let mut state = CatalogQueryState::default();
        state.set_page(4);
        assert_eq!(state.page(), 4);

        state.set_filter(StoneFilter::default());
        assert_eq!(state.page(), 4, "same filter keeps the page");

        state.set_filter(StoneFilter { search: Some("nero".into()), ..Default::default() });
        assert_eq!(state.page(), 1);
        assert_eq!(state.filter().search.as_deref(), Some("nero"));
    }

    #[test]
    fn options_are_distinct_and_sorted() {
        let options = FilterOptions::from_records(&catalog());
        assert_eq!(options.categories, vec!["Granite", "Limestone", "Marble"]);
        assert_eq!(options.base_colors, vec!["Beige", "Black", "Grey", "White"]);
    }
}
