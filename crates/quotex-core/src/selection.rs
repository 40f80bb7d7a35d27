//! Browsing state for the promise tree
//!
//! A front end walks the tree one level at a time:
//! no selection → category → title → subtitle → promises visible.
//! Picking a node at one level clears every level below it.

use serde::Serialize;

use crate::encoding::ValidationError;
use crate::models::{CategoryId, NodeKind, Promise, SubtitleId, TitleId};
use crate::storage::{StorageError, StorageResult};
use crate::store::Store;

/// How far down the tree the user has navigated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SelectionState {
    NoSelection,
    CategorySelected,
    TitleSelected,
    SubtitleSelected,
    PromisesVisible,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Selection {
    category: Option<CategoryId>,
    title: Option<TitleId>,
    subtitle: Option<SubtitleId>,
    promises: Option<Vec<Promise>>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SelectionState {
        match (self.category, self.title, self.subtitle, &self.promises) {
            (None, _, _, _) => SelectionState::NoSelection,
            (Some(_), None, _, _) => SelectionState::CategorySelected,
            (Some(_), Some(_), None, _) => SelectionState::TitleSelected,
            (Some(_), Some(_), Some(_), None) => SelectionState::SubtitleSelected,
            (Some(_), Some(_), Some(_), Some(_)) => SelectionState::PromisesVisible,
        }
    }

    pub fn category(&self) -> Option<CategoryId> {
        self.category
    }

    pub fn title(&self) -> Option<TitleId> {
        self.title
    }

    pub fn subtitle(&self) -> Option<SubtitleId> {
        self.subtitle
    }

    /// Visible promises; empty until loaded
    pub fn promises(&self) -> &[Promise] {
        self.promises.as_deref().unwrap_or_default()
    }

    /// Select a category that exists in the store
    pub fn select_category(&mut self, store: &Store, id: CategoryId) -> StorageResult<()> {
        if store.category(id)?.is_none() {
            return Err(StorageError::not_found(NodeKind::Category, id.0));
        }
        self.category = Some(id);
        self.title = None;
        self.subtitle = None;
        self.promises = None;
        Ok(())
    }

    /// Select a title under the selected category
    ///
    /// On error the selection is left unchanged.
    pub fn select_title(&mut self, store: &Store, id: TitleId) -> StorageResult<()> {
        let Some(category) = self.category else {
            return Err(ValidationError::MissingAncestor(NodeKind::Category).into());
        };
        let title = store
            .title(id)?
            .ok_or_else(|| StorageError::not_found(NodeKind::Title, id.0))?;
        if title.category_id != category {
            return Err(ValidationError::OutsideSelection(NodeKind::Title).into());
        }
        self.title = Some(id);
        self.subtitle = None;
        self.promises = None;
        Ok(())
    }

    /// Select a subtitle under the selected title
    ///
    /// On error the selection is left unchanged.
    pub fn select_subtitle(&mut self, store: &Store, id: SubtitleId) -> StorageResult<()> {
        self.require_title()?;
        let subtitle = store
            .subtitle(id)?
            .ok_or_else(|| StorageError::not_found(NodeKind::Subtitle, id.0))?;
        if Some(subtitle.title_id) != self.title {
            return Err(ValidationError::OutsideSelection(NodeKind::Subtitle).into());
        }
        self.subtitle = Some(id);
        self.promises = None;
        Ok(())
    }

    /// Show promises for the selected subtitle
    pub fn show_promises(&mut self, promises: Vec<Promise>) -> Result<(), ValidationError> {
        self.promise_target()?;
        self.promises = Some(promises);
        Ok(())
    }

    /// Reload the visible promises from the store
    pub fn refresh(&mut self, store: &Store) -> StorageResult<()> {
        let subtitle = self.promise_target()?;
        self.promises = Some(store.promises(subtitle)?);
        Ok(())
    }

    /// Subtitle a new promise would be filed under
    ///
    /// Errors with the first level that is not selected.
    pub fn promise_target(&self) -> Result<SubtitleId, ValidationError> {
        self.require_title()?;
        self.subtitle
            .ok_or(ValidationError::MissingAncestor(NodeKind::Subtitle))
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    fn require_title(&self) -> Result<(), ValidationError> {
        if self.category.is_none() {
            return Err(ValidationError::MissingAncestor(NodeKind::Category));
        }
        if self.title.is_none() {
            return Err(ValidationError::MissingAncestor(NodeKind::Title));
        }
        Ok(())
    }
}
