//! Page Controller
//!
//! Registry of pages keyed by [`PageId`] plus the single active page.

use std::collections::HashMap;

use super::{Page, PageArgs, PageId, ViewError};

pub struct PageController {
    pages: HashMap<PageId, Box<dyn Page>>,
    active: Option<PageId>,
    activations: HashMap<PageId, u64>,
}

impl PageController {
    pub fn new() -> Self {
        Self {
            pages: HashMap::new(),
            active: None,
            activations: HashMap::new(),
        }
    }

    /// Register `page`, replacing any page with the same id
    pub fn register(&mut self, page: Box<dyn Page>) {
        let id = page.id();
        if self.pages.insert(id, page).is_some() {
            tracing::warn!(page = %id, "Replaced registered page");
        }
    }

    pub fn with_page(mut self, page: Box<dyn Page>) -> Self {
        self.register(page);
        self
    }

    /// Show `page`. The current page is always deactivated first, even when
    /// navigating to the page that is already showing.
    pub async fn navigate(&mut self, page: PageId, args: PageArgs) -> Result<(), ViewError> {
        if !self.pages.contains_key(&page) {
            return Err(ViewError::UnknownPage(page));
        }

        if let Some(current) = self.active.take() {
            if let Some(leaving) = self.pages.get_mut(&current) {
                tracing::debug!(page = %current, "Deactivating page");
                leaving.deactivate().await;
            }
        }

        self.active = Some(page);
        *self.activations.entry(page).or_insert(0) += 1;
        tracing::info!(page = %page, "Showing page");

        let target = self
            .pages
            .get_mut(&page)
            .ok_or(ViewError::UnknownPage(page))?;
        target.activate(args).await.map_err(|e| {
            tracing::warn!(page = %page, error = %e, "Page initializer rejected input");
            ViewError::from(e)
        })
    }

    pub async fn activate(&mut self, page: PageId) -> Result<(), ViewError> {
        self.navigate(page, PageArgs::None).await
    }

    pub fn active(&self) -> Option<PageId> {
        self.active
    }

    pub fn is_visible(&self, page: PageId) -> bool {
        self.active == Some(page)
    }

    pub fn activation_count(&self, page: PageId) -> u64 {
        self.activations.get(&page).copied().unwrap_or(0)
    }

    pub fn registered(&self) -> Vec<PageId> {
        let mut ids: Vec<PageId> = self.pages.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Deactivate whatever is showing
    pub async fn shutdown(&mut self) {
        if let Some(current) = self.active.take() {
            if let Some(page) = self.pages.get_mut(&current) {
                page.deactivate().await;
            }
            tracing::info!(page = %current, "Page controller shut down");
        }
    }
}

impl Default for PageController {
    fn default() -> Self {
        Self::new()
    }
}
