//! Drag and drop of document objects between rows.
//!
//! A [`DragDropManager`] is the context shared by every row adapter of a
//! view. It holds at most one [`DragSession`]: the dragged object, its
//! clipboard payload, the proposed drop action, and the current drop target.
//! The session is discarded when the drag ends or is cancelled.
//!
//! ```ignore
//! let mut drag = DragDropManager::new();
//! rows.on_drag_start(doc, &mut drag, item)?;
//! rows.on_drag_over(&mut drag, Some(target));
//! if rows.can_drop(doc, &drag, target, DropPosition::After, prev, next) {
//!     rows.on_drop(&mut store, &mut drag, DropPosition::After)?;
//! }
//! ```

use serde_json::Value;

use eez_outline_core::Signal;
use eez_outline_core::logging::targets;

use crate::clipboard::ClipboardData;
use crate::document::{Document, ObjectKey};
use crate::error::{DocumentError, Result};

/// Actions that can be performed on drop.
///
/// These flags indicate what the drag source allows and which action the
/// drop will perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DropAction(u8);

impl DropAction {
    /// No action (drop not allowed).
    pub const NONE: Self = Self(0);
    /// Insert a copy and keep the source.
    pub const COPY: Self = Self(1 << 0);
    /// Insert a copy and delete the source.
    pub const MOVE: Self = Self(1 << 1);
    /// Copy and move.
    pub const ALL: Self = Self(Self::COPY.0 | Self::MOVE.0);

    /// Returns true if this action set contains the Copy action.
    pub fn can_copy(self) -> bool {
        self.contains(Self::COPY)
    }

    /// Returns true if this action set contains the Move action.
    pub fn can_move(self) -> bool {
        self.contains(Self::MOVE)
    }

    /// Returns true if this action set contains another action.
    pub fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    /// Returns the preferred action from this set.
    ///
    /// Priority: Move > Copy > None. Reordering rows is the common case.
    pub fn preferred(self) -> Self {
        if self.can_move() {
            Self::MOVE
        } else if self.can_copy() {
            Self::COPY
        } else {
            Self::NONE
        }
    }
}

impl std::ops::BitOr for DropAction {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl std::ops::BitAnd for DropAction {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        Self(self.0 & rhs.0)
    }
}

impl std::ops::BitOrAssign for DropAction {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// State of the drag manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragState {
    /// No drag is active.
    Idle,
    /// A drag is in progress.
    Dragging,
}

/// One active drag.
#[derive(Debug, Clone)]
pub struct DragSession {
    object: ObjectKey,
    object_id: String,
    payload: ClipboardData,
    supported_actions: DropAction,
    proposed_action: DropAction,
    drop_object: Option<ObjectKey>,
}

impl DragSession {
    /// The dragged object.
    pub fn object(&self) -> ObjectKey {
        self.object
    }

    /// Id of the dragged object when the drag started.
    pub fn object_id(&self) -> &str {
        &self.object_id
    }

    /// Class of the dragged object.
    pub fn class_name(&self) -> &str {
        &self.payload.object_class_name
    }

    /// Clipboard payload of the dragged object.
    pub fn payload(&self) -> &ClipboardData {
        &self.payload
    }

    /// JSON of the dragged object, ready to be inserted.
    pub fn object_json(&self) -> Option<&Value> {
        self.payload.object.as_ref()
    }

    /// Actions the source allows.
    pub fn supported_actions(&self) -> DropAction {
        self.supported_actions
    }

    /// Action the drop will perform.
    pub fn proposed_action(&self) -> DropAction {
        self.proposed_action
    }

    /// The object currently under the drag.
    pub fn drop_object(&self) -> Option<ObjectKey> {
        self.drop_object
    }
}

/// Tracks the drag in progress, if any.
#[derive(Debug)]
pub struct DragDropManager {
    session: Option<DragSession>,
    /// Emitted when a drag starts and when it ends or is cancelled.
    pub drag_state: Signal<DragState>,
}

impl Default for DragDropManager {
    fn default() -> Self {
        Self::new()
    }
}

impl DragDropManager {
    /// Creates a new drag/drop manager.
    pub fn new() -> Self {
        Self {
            session: None,
            drag_state: Signal::new(),
        }
    }

    /// Returns the current drag state.
    pub fn state(&self) -> DragState {
        if self.session.is_some() {
            DragState::Dragging
        } else {
            DragState::Idle
        }
    }

    /// Returns true if a drag is currently active.
    pub fn is_dragging(&self) -> bool {
        self.session.is_some()
    }

    /// The active session.
    pub fn session(&self) -> Option<&DragSession> {
        self.session.as_ref()
    }

    /// The dragged object.
    pub fn drag_object(&self) -> Option<ObjectKey> {
        self.session.as_ref().map(DragSession::object)
    }

    /// Returns true if `object` is being dragged.
    pub fn is_drag_source(&self, object: ObjectKey) -> bool {
        self.drag_object() == Some(object)
    }

    /// Start dragging `object`. Any previous session is replaced.
    pub fn start(
        &mut self,
        doc: &Document,
        object: ObjectKey,
        supported_actions: DropAction,
    ) -> Result<()> {
        let payload = ClipboardData::from_object(doc, object).ok_or(DocumentError::ObjectNotFound)?;
        let object_id = doc.id(object).unwrap_or_default().to_string();
        tracing::debug!(
            target: targets::DRAG,
            object = %object_id,
            class = %payload.object_class_name,
            "drag started"
        );
        self.session = Some(DragSession {
            object,
            object_id,
            payload,
            supported_actions,
            proposed_action: supported_actions.preferred(),
            drop_object: None,
        });
        self.drag_state.emit(DragState::Dragging);
        Ok(())
    }

    /// Sets the proposed action. Only supported actions are kept.
    pub fn set_proposed_action(&mut self, action: DropAction) {
        if let Some(session) = &mut self.session {
            session.proposed_action = action & session.supported_actions;
        }
    }

    /// Returns the currently proposed action.
    pub fn proposed_action(&self) -> DropAction {
        self.session
            .as_ref()
            .map_or(DropAction::NONE, DragSession::proposed_action)
    }

    /// The object currently under the drag.
    pub fn drop_object(&self) -> Option<ObjectKey> {
        self.session.as_ref().and_then(DragSession::drop_object)
    }

    /// Record the object under the drag.
    pub fn set_drop_object(&mut self, object: ObjectKey) {
        if let Some(session) = &mut self.session {
            if session.drop_object != Some(object) {
                tracing::trace!(target: targets::DRAG, ?object, "drop target changed");
                session.drop_object = Some(object);
            }
        }
    }

    /// Forget the object under the drag.
    pub fn unset_drop_object(&mut self) {
        if let Some(session) = &mut self.session {
            session.drop_object = None;
        }
    }

    /// End the drag. Returns the session when it was dropped with an action.
    pub fn end(&mut self, dropped: bool) -> Option<DragSession> {
        let session = self.session.take()?;
        self.drag_state.emit(DragState::Idle);
        let accepted = dropped && session.proposed_action != DropAction::NONE;
        tracing::debug!(target: targets::DRAG, dropped = accepted, "drag ended");
        accepted.then_some(session)
    }

    /// Cancel the drag in progress.
    pub fn cancel(&mut self) {
        self.end(false);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::document::tests::sample;

    fn first_page(doc: &Document) -> ObjectKey {
        doc.elements(doc.property_object(doc.root(), "pages").unwrap())[0]
    }

    #[test]
    fn test_drop_action_flags() {
        let actions = DropAction::COPY | DropAction::MOVE;
        assert_eq!(actions, DropAction::ALL);
        assert!(actions.can_copy());
        assert!(actions.can_move());
        assert_eq!(actions.preferred(), DropAction::MOVE);
        assert_eq!(DropAction::COPY.preferred(), DropAction::COPY);
        assert_eq!(DropAction::NONE.preferred(), DropAction::NONE);
    }

    #[test]
    fn test_drag_drop_manager_lifecycle() {
        let doc = sample();
        let page = first_page(&doc);
        let mut manager = DragDropManager::new();
        assert_eq!(manager.state(), DragState::Idle);

        manager.start(&doc, page, DropAction::ALL).unwrap();
        assert!(manager.is_dragging());
        assert!(manager.is_drag_source(page));
        assert_eq!(manager.proposed_action(), DropAction::MOVE);

        let session = manager.session().unwrap();
        assert_eq!(session.class_name(), "Page");
        assert_eq!(session.object_id(), "1.1.1");
        assert_eq!(session.object_json().unwrap()["name"], "Main");

        manager.set_drop_object(doc.root());
        assert_eq!(manager.drop_object(), Some(doc.root()));
        manager.unset_drop_object();
        assert_eq!(manager.drop_object(), None);

        let session = manager.end(true).unwrap();
        assert_eq!(session.proposed_action(), DropAction::MOVE);
        assert_eq!(manager.state(), DragState::Idle);
    }

    #[test]
    fn test_proposed_action_is_limited_to_supported() {
        let doc = sample();
        let mut manager = DragDropManager::new();
        manager.start(&doc, first_page(&doc), DropAction::COPY).unwrap();
        manager.set_proposed_action(DropAction::MOVE);
        assert_eq!(manager.proposed_action(), DropAction::NONE);
        assert!(manager.end(true).is_none());
    }

    #[test]
    fn test_cancel_drag() {
        let doc = sample();
        let mut manager = DragDropManager::new();
        let states = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&states);
        manager.drag_state.connect(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        manager.start(&doc, first_page(&doc), DropAction::ALL).unwrap();
        manager.cancel();
        assert!(!manager.is_dragging());
        assert_eq!(manager.drag_object(), None);
        assert_eq!(states.load(Ordering::SeqCst), 2);

        // ending without a session emits nothing
        assert!(manager.end(true).is_none());
        assert_eq!(states.load(Ordering::SeqCst), 2);
    }
}
