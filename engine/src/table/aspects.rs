//! The concrete aspect value objects.

use shared::{Filter, QueryDescriptor, SortCriterion};

use crate::table::aspect::{AspectValue, TableAspect};

/// Sorting by more than a few criteria stops being meaningful; the original
/// table caps the list.
const MAX_SORT_CRITERIA: usize = 3;

// ===== FILTERS =====

#[derive(Clone, Debug, PartialEq, Default)]
pub struct FilterSet {
    pub filters: Vec<Filter>,
}

impl AspectValue for FilterSet {
    const NAME: &'static str = "filters";
    const TRIGGERS_RELOAD: bool = true;

    fn from_query(query: &QueryDescriptor) -> Self {
        Self {
            filters: query.filters.clone(),
        }
    }

    fn is_changed(&self, query: &QueryDescriptor) -> bool {
        // Clause-by-clause, order included: filter order affects the
        // applied semantics.
        self.filters != query.filters
    }

    fn apply_to(&self, query: &mut QueryDescriptor) {
        query.filters = self.filters.clone();
    }
}

impl TableAspect<FilterSet> {
    pub fn replace(&self, filters: Vec<Filter>) {
        self.update(FilterSet { filters });
    }

    pub fn add(&self, filter: Filter) {
        self.update_with(|set| set.filters.push(filter));
    }

    pub fn remove(&self, name: &str) {
        self.update_with(|set| set.filters.retain(|filter| filter.name != name));
    }
}

// ===== SORT =====

#[derive(Clone, Debug, PartialEq, Default)]
pub struct SortOrder {
    pub criteria: Vec<SortCriterion>,
}

impl AspectValue for SortOrder {
    const NAME: &'static str = "sort_by";
    const TRIGGERS_RELOAD: bool = true;

    fn from_query(query: &QueryDescriptor) -> Self {
        Self {
            criteria: query.sort_by.clone(),
        }
    }

    fn is_changed(&self, query: &QueryDescriptor) -> bool {
        self.criteria != query.sort_by
    }

    fn apply_to(&self, query: &mut QueryDescriptor) {
        query.sort_by = self.criteria.clone();
    }
}

impl TableAspect<SortOrder> {
    pub fn sort_by(&self, criteria: Vec<SortCriterion>) {
        self.update(SortOrder { criteria });
    }

    /// Prepend a criterion, dropping an earlier one for the same attribute
    /// and capping the list.
    pub fn add_criterion(&self, criterion: SortCriterion) {
        self.update_with(|order| {
            order
                .criteria
                .retain(|existing| existing.attribute != criterion.attribute);
            order.criteria.insert(0, criterion);
            order.criteria.truncate(MAX_SORT_CRITERIA);
        });
    }
}

// ===== GROUPING =====

#[derive(Clone, Debug, PartialEq, Default)]
pub struct GroupByAspect {
    pub attribute: Option<String>,
}

impl AspectValue for GroupByAspect {
    const NAME: &'static str = "group_by";
    const TRIGGERS_RELOAD: bool = true;

    fn from_query(query: &QueryDescriptor) -> Self {
        Self {
            attribute: query.group_by.clone(),
        }
    }

    fn is_changed(&self, query: &QueryDescriptor) -> bool {
        self.attribute != query.group_by
    }

    fn apply_to(&self, query: &mut QueryDescriptor) {
        query.group_by = self.attribute.clone();
    }
}

impl TableAspect<GroupByAspect> {
    pub fn group_by(&self, attribute: Option<String>) {
        self.update(GroupByAspect { attribute });
    }
}

// ===== SUMS =====

#[derive(Clone, Debug, PartialEq, Default)]
pub struct DisplaySums {
    pub enabled: bool,
}

impl AspectValue for DisplaySums {
    const NAME: &'static str = "display_sums";
    const TRIGGERS_RELOAD: bool = true;

    fn from_query(query: &QueryDescriptor) -> Self {
        Self {
            enabled: query.display_sums,
        }
    }

    fn is_changed(&self, query: &QueryDescriptor) -> bool {
        self.enabled != query.display_sums
    }

    fn apply_to(&self, query: &mut QueryDescriptor) {
        query.display_sums = self.enabled;
    }
}

impl TableAspect<DisplaySums> {
    pub fn toggle(&self) {
        self.update_with(|sums| sums.enabled = !sums.enabled);
    }

    pub fn is_enabled(&self) -> bool {
        self.current().is_some_and(|sums| sums.enabled)
    }
}

// ===== TIMELINE =====

/// Render-only: toggling the timeline never invalidates the result set.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct TimelineVisibility {
    pub visible: bool,
}

impl AspectValue for TimelineVisibility {
    const NAME: &'static str = "timeline_visible";
    const TRIGGERS_RELOAD: bool = false;

    fn from_query(query: &QueryDescriptor) -> Self {
        Self {
            visible: query.timeline_visible,
        }
    }

    fn is_changed(&self, query: &QueryDescriptor) -> bool {
        self.visible != query.timeline_visible
    }

    fn apply_to(&self, query: &mut QueryDescriptor) {
        query.timeline_visible = self.visible;
    }
}

impl TableAspect<TimelineVisibility> {
    pub fn toggle(&self) {
        self.update_with(|timeline| timeline.visible = !timeline.visible);
    }

    pub fn is_visible(&self) -> bool {
        self.current().is_some_and(|timeline| timeline.visible)
    }
}

// ===== COLUMNS =====

/// Render-only: the column set changes what is built, not what is fetched.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct ColumnSet {
    pub columns: Vec<String>,
}

impl AspectValue for ColumnSet {
    const NAME: &'static str = "columns";
    const TRIGGERS_RELOAD: bool = false;

    fn from_query(query: &QueryDescriptor) -> Self {
        Self {
            columns: query.columns.clone(),
        }
    }

    fn is_changed(&self, query: &QueryDescriptor) -> bool {
        // Order-preserving: columns appear in strict order.
        self.columns != query.columns
    }

    fn apply_to(&self, query: &mut QueryDescriptor) {
        query.columns = self.columns.clone();
    }
}

impl TableAspect<ColumnSet> {
    pub fn replace_columns(&self, columns: Vec<String>) {
        self.update(ColumnSet { columns });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::SortDirection;

    fn query() -> QueryDescriptor {
        QueryDescriptor {
            id: Some(1),
            name: "all".to_string(),
            filters: vec![],
            sort_by: vec![],
            group_by: None,
            columns: vec!["id".to_string(), "subject".to_string()],
            display_sums: false,
            timeline_visible: false,
        }
    }

    fn criterion(attribute: &str) -> SortCriterion {
        SortCriterion {
            attribute: attribute.to_string(),
            direction: SortDirection::Asc,
        }
    }

    #[tokio::test]
    async fn initialize_seeds_from_the_descriptor() {
        let aspect: TableAspect<ColumnSet> = TableAspect::new();
        assert!(aspect.is_pristine());

        aspect.initialize(&query());
        let current = aspect.current().unwrap();
        assert_eq!(current.columns, vec!["id", "subject"]);
        assert!(!current.is_changed(&query()));
    }

    #[tokio::test]
    async fn column_order_is_a_material_change() {
        let aspect: TableAspect<ColumnSet> = TableAspect::new();
        aspect.initialize(&query());

        aspect.replace_columns(vec!["subject".to_string(), "id".to_string()]);
        assert!(aspect.current().unwrap().is_changed(&query()));
    }

    #[tokio::test]
    async fn toggling_sums_diverges_and_applies_back() {
        let aspect: TableAspect<DisplaySums> = TableAspect::new();
        aspect.initialize(&query());

        aspect.toggle();
        assert!(aspect.is_enabled());

        let mut descriptor = query();
        assert!(aspect.current().unwrap().is_changed(&descriptor));
        aspect.current().unwrap().apply_to(&mut descriptor);
        assert!(descriptor.display_sums);
        assert!(!aspect.current().unwrap().is_changed(&descriptor));
    }

    #[tokio::test]
    async fn add_criterion_prepends_dedupes_and_caps() {
        let aspect: TableAspect<SortOrder> = TableAspect::new();
        aspect.initialize(&query());

        aspect.add_criterion(criterion("id"));
        aspect.add_criterion(criterion("subject"));
        aspect.add_criterion(criterion("id"));
        aspect.add_criterion(criterion("status"));
        aspect.add_criterion(criterion("assignee"));

        let attributes: Vec<String> = aspect
            .current()
            .unwrap()
            .criteria
            .iter()
            .map(|c| c.attribute.clone())
            .collect();
        assert_eq!(attributes, vec!["assignee", "status", "id"]);
    }

    #[tokio::test]
    async fn mutators_are_noops_while_pristine() {
        let aspect: TableAspect<TimelineVisibility> = TableAspect::new();
        aspect.toggle();
        assert!(aspect.is_pristine());
    }
}
