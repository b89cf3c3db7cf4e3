//! Render model for a slot

use crate::fallback::FallbackNode;
use crate::state::SlotSnapshot;
use serde::Serialize;

/// Badge shown to editors
pub const ADMIN_BADGE: &str = "ADMIN";

/// Badge shown while a push is being applied
pub const SYNC_BADGE: &str = "SYNC";

/// What a slot should render
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum SlotView {
    /// Render the static fallback unchanged
    Fallback,
    /// Render stored text in place of the fallback
    Text {
        /// Text to show
        text: String,
    },
    /// Render the editor chrome
    Editor(EditorView),
}

/// Editor-facing view of a slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditorView {
    /// Shown value
    pub text: String,
    /// Open draft, while editing or saving
    pub draft: Option<String>,
    /// Save in flight
    pub saving: bool,
    /// Push just applied
    pub syncing: bool,
    /// Message from the last save
    pub advisory: Option<String>,
}

impl EditorView {
    /// Badges to display, in order
    #[must_use]
    pub fn badges(&self) -> Vec<&'static str> {
        let mut badges = vec![ADMIN_BADGE];
        if self.syncing {
            badges.push(SYNC_BADGE);
        }
        badges
    }
}

impl SlotView {
    /// Derive the view from slot state
    ///
    /// Viewers only see stored text when it actually differs from the
    /// fallback, so the fallback markup survives when nothing was edited.
    #[must_use]
    pub fn from_snapshot(state: &SlotSnapshot) -> Self {
        if !state.authorization.resolved {
            return Self::Fallback;
        }

        if !state.authorization.is_editor {
            let value = &state.resolved_value;
            if value.is_empty() || *value == state.default_value {
                return Self::Fallback;
            }
            return Self::Text {
                text: value.clone(),
            };
        }

        Self::Editor(EditorView {
            text: state.resolved_value.clone(),
            draft: state.draft().map(str::to_string),
            saving: state.edit.is_saving(),
            syncing: state.syncing,
            advisory: state.advisory.clone(),
        })
    }

    /// Plain text this view displays, given the slot's fallback
    #[must_use]
    pub fn display_text(&self, fallback: &FallbackNode) -> String {
        match self {
            Self::Fallback => fallback.flatten(),
            Self::Text { text } => text.clone(),
            Self::Editor(editor) => editor.draft.clone().unwrap_or_else(|| editor.text.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::ViewerAuthorization;
    use crate::key::ContentKey;
    use crate::session::EditState;

    fn state(resolved: &str, authorization: ViewerAuthorization) -> SlotSnapshot {
        let mut state = SlotSnapshot::new(ContentKey::new("k").unwrap(), "Default".to_string());
        state.resolved_value = resolved.to_string();
        state.authorization = authorization;
        state
    }

    #[test]
    fn unresolved_renders_fallback() {
        let view = SlotView::from_snapshot(&state("Stored", ViewerAuthorization::unresolved()));
        assert_eq!(view, SlotView::Fallback);
    }

    #[test]
    fn viewer_sees_stored_text_only_when_it_differs() {
        let viewer = ViewerAuthorization::viewer();
        assert_eq!(
            SlotView::from_snapshot(&state("Stored", viewer)),
            SlotView::Text {
                text: "Stored".to_string()
            }
        );
        assert_eq!(SlotView::from_snapshot(&state("Default", viewer)), SlotView::Fallback);
        assert_eq!(SlotView::from_snapshot(&state("", viewer)), SlotView::Fallback);
    }

    #[test]
    fn editor_view_carries_session_state() {
        let mut snapshot = state("Stored", ViewerAuthorization::editor());
        snapshot.edit = EditState::Saving {
            draft: "New".to_string(),
        };
        snapshot.syncing = true;

        let SlotView::Editor(editor) = SlotView::from_snapshot(&snapshot) else {
            panic!("expected editor view");
        };

        assert_eq!(editor.draft.as_deref(), Some("New"));
        assert!(editor.saving);
        assert_eq!(editor.badges(), vec![ADMIN_BADGE, SYNC_BADGE]);
    }

    #[test]
    fn display_text_prefers_draft() {
        let fallback = FallbackNode::text("Default");
        assert_eq!(SlotView::Fallback.display_text(&fallback), "Default");

        let editor = SlotView::Editor(EditorView {
            text: "Stored".to_string(),
            draft: Some("Draft".to_string()),
            saving: false,
            syncing: false,
            advisory: None,
        });
        assert_eq!(editor.display_text(&fallback), "Draft");
    }
}
