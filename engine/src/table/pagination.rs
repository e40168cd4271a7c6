//! Pagination aspect service.

use shared::{CollectionMeta, Pagination};

use crate::dataflow::State;

/// Service over the shared pagination cell. Change detection compares page
/// and page size only; the server-supplied total is a result, not an input.
#[derive(Clone, Debug)]
pub struct TablePagination {
    state: State<Pagination>,
}

impl TablePagination {
    pub fn new(state: State<Pagination>) -> Self {
        Self { state }
    }

    pub fn initialize(&self, pagination: Pagination) {
        self.state.put(pagination);
    }

    pub fn current(&self) -> Option<Pagination> {
        self.state.get()
    }

    pub fn set_page(&self, page: u32) {
        if let Some(mut pagination) = self.state.get() {
            pagination.page = page.max(1);
            self.state.put(pagination);
        }
    }

    /// Changing the page size restarts at the first page.
    pub fn set_page_size(&self, page_size: u32) {
        if let Some(mut pagination) = self.state.get() {
            pagination.page_size = page_size.max(1);
            pagination.page = 1;
            self.state.put(pagination);
        }
    }

    /// Adopt the server-confirmed pagination of a fetched page.
    pub fn update_from_meta(&self, meta: &CollectionMeta) {
        self.state.put(Pagination {
            page: meta.page,
            page_size: meta.page_size,
            total: Some(meta.total),
        });
    }

    pub fn is_changed(&self, other: &Pagination) -> bool {
        self.state
            .get()
            .is_none_or(|current| !current.same_page(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TablePagination {
        let service = TablePagination::new(State::new());
        service.initialize(Pagination::first_page(20));
        service
    }

    #[tokio::test]
    async fn page_size_change_resets_to_the_first_page() {
        let pagination = service();
        pagination.set_page(3);
        assert_eq!(pagination.current().unwrap().page, 3);

        pagination.set_page_size(50);
        let current = pagination.current().unwrap();
        assert_eq!(current.page, 1);
        assert_eq!(current.page_size, 50);
    }

    #[tokio::test]
    async fn change_detection_ignores_the_total() {
        let pagination = service();
        let mut other = Pagination::first_page(20);
        other.total = Some(999);
        assert!(!pagination.is_changed(&other));

        other.page = 2;
        assert!(pagination.is_changed(&other));
    }

    #[tokio::test]
    async fn meta_updates_carry_the_server_total() {
        let pagination = service();
        pagination.update_from_meta(&CollectionMeta {
            total: 120,
            page: 2,
            page_size: 20,
            group_counts: Default::default(),
        });
        assert_eq!(pagination.current().unwrap().total, Some(120));
    }
}
