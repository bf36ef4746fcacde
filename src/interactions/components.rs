//! Persistent interactive controls
//!
//! Every control is declared here once, bound to a stable id. Messages carry
//! these definitions and the router dispatches on the same ids, so the
//! controls keep working across process restarts without re-binding any live
//! object. The ids are wire format: changing one orphans every message
//! already carrying it.

use crate::core::TicketType;
use crate::gateway::{Button, ButtonStyle, Component, SelectMenu, SelectOption};
use once_cell::sync::Lazy;

/// Id of the panel's "Open Ticket" button
pub const OPEN_BUTTON_ID: &str = "ticket_open_button";
/// Id of the ticket-type select menu
pub const TYPE_SELECT_ID: &str = "ticket_type_select";
/// Id of the per-ticket "Claim" button
pub const CLAIM_BUTTON_ID: &str = "ticket_claim_button";
/// Id of the per-ticket "Close" button
pub const CLOSE_BUTTON_ID: &str = "ticket_close_button";
/// Name of the setup slash command
pub const SETUP_COMMAND: &str = "ticket-setup";

/// A persistent control: its stable id plus the component it renders as
pub struct ComponentDef {
    pub id: &'static str,
    pub component: Component,
}

/// Every persistent control the ticket system registers
pub static PERSISTENT_COMPONENTS: Lazy<Vec<ComponentDef>> = Lazy::new(|| {
    vec![
        ComponentDef {
            id: OPEN_BUTTON_ID,
            component: Component::Button(Button {
                id: OPEN_BUTTON_ID.to_string(),
                label: "🎟️ Open Ticket".to_string(),
                style: ButtonStyle::Success,
            }),
        },
        ComponentDef {
            id: TYPE_SELECT_ID,
            component: Component::Select(SelectMenu {
                id: TYPE_SELECT_ID.to_string(),
                placeholder: "Select a ticket type...".to_string(),
                options: TicketType::ALL
                    .iter()
                    .map(|t| SelectOption {
                        label: t.label().to_string(),
                        value: t.label().to_string(),
                        description: t.description().to_string(),
                        emoji: Some(type_emoji(*t).to_string()),
                    })
                    .collect(),
            }),
        },
        ComponentDef {
            id: CLAIM_BUTTON_ID,
            component: Component::Button(Button {
                id: CLAIM_BUTTON_ID.to_string(),
                label: "🟢 Claim Ticket".to_string(),
                style: ButtonStyle::Primary,
            }),
        },
        ComponentDef {
            id: CLOSE_BUTTON_ID,
            component: Component::Button(Button {
                id: CLOSE_BUTTON_ID.to_string(),
                label: "🔒 Close Ticket".to_string(),
                style: ButtonStyle::Danger,
            }),
        },
    ]
});

/// Look up a persistent control by its stable id
#[must_use]
pub fn by_id(id: &str) -> Option<&'static Component> {
    PERSISTENT_COMPONENTS
        .iter()
        .find(|def| def.id == id)
        .map(|def| &def.component)
}

/// The menu emoji shown next to a ticket type
#[must_use]
pub const fn type_emoji(ticket_type: TicketType) -> &'static str {
    match ticket_type {
        TicketType::Support => "🛠️",
        TicketType::Report => "🚨",
        TicketType::Appeal => "⚖️",
    }
}

/// The "Open Ticket" button carried by the panel message
#[must_use]
pub fn open_button() -> Component {
    by_id(OPEN_BUTTON_ID).cloned().expect("open button is defined")
}

/// The ticket-type menu offered after pressing the panel button
#[must_use]
pub fn type_select() -> Component {
    by_id(TYPE_SELECT_ID).cloned().expect("type select is defined")
}

/// The claim/close controls carried by every intro message
#[must_use]
pub fn ticket_controls() -> Vec<Component> {
    vec![
        by_id(CLAIM_BUTTON_ID).cloned().expect("claim button is defined"),
        by_id(CLOSE_BUTTON_ID).cloned().expect("close button is defined"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_stable() {
        // These ids are referenced by messages already delivered; they must
        // never change.
        assert_eq!(OPEN_BUTTON_ID, "ticket_open_button");
        assert_eq!(TYPE_SELECT_ID, "ticket_type_select");
        assert_eq!(CLAIM_BUTTON_ID, "ticket_claim_button");
        assert_eq!(CLOSE_BUTTON_ID, "ticket_close_button");
    }

    #[test]
    fn test_type_select_covers_all_variants() {
        let Component::Select(menu) = type_select() else {
            panic!("type select is a menu");
        };
        assert_eq!(menu.options.len(), 3);
        let values: Vec<_> = menu.options.iter().map(|o| o.value.as_str()).collect();
        assert_eq!(values, ["Support", "Report", "Appeal"]);
    }

    #[test]
    fn test_lookup_by_id() {
        assert!(by_id(OPEN_BUTTON_ID).is_some());
        assert!(by_id("unknown_component").is_none());
    }
}
