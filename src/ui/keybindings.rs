// Keybindings for the folio lightbox
//
// Keybindings (only while the lightbox is open):
// - Right / l: Next image
// - Left / h: Previous image
// - Escape: Close the lightbox
//
// Navigation keys go to a focused text field instead; Escape always closes.

use gdk4::Key;
use gtk4::prelude::*;
use gtk4::{glib, Editable, EventControllerKey, PropagationPhase, TextView, Widget};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Current view mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    Gallery,
    Lightbox,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightboxAction {
    Next,
    Prev,
    Close,
}

/// Maps a key to a lightbox action.
pub fn lightbox_action(keyval: Key) -> Option<LightboxAction> {
    match keyval {
        Key::Right | Key::l => Some(LightboxAction::Next),
        Key::Left | Key::h => Some(LightboxAction::Prev),
        Key::Escape => Some(LightboxAction::Close),
        _ => None,
    }
}

/// Action for a key press, given the view mode and whether a text field
/// has keyboard focus.
pub fn key_action(mode: ViewMode, editing_text: bool, keyval: Key) -> Option<LightboxAction> {
    if mode != ViewMode::Lightbox {
        return None;
    }
    let action = lightbox_action(keyval)?;
    if editing_text && action != LightboxAction::Close {
        return None;
    }
    Some(action)
}

fn is_text_field(widget: &Widget) -> bool {
    widget.is::<Editable>() || widget.is::<TextView>()
}

/// Callback type for lightbox actions
pub type LightboxActionCallback = Box<dyn Fn(LightboxAction)>;

/// Keybinding manager for the gallery window
pub struct Keybindings {
    controller: EventControllerKey,
    view_mode: Rc<Cell<ViewMode>>,
    /// Widget the controller is attached to; its root reports the focus.
    attached: Rc<RefCell<Option<glib::WeakRef<Widget>>>>,
    on_lightbox_action: Rc<RefCell<Option<LightboxActionCallback>>>,
}

impl Keybindings {
    pub fn new() -> Self {
        let controller = EventControllerKey::new();
        controller.set_propagation_phase(PropagationPhase::Capture);

        let view_mode = Rc::new(Cell::new(ViewMode::Gallery));
        let on_lightbox_action: Rc<RefCell<Option<LightboxActionCallback>>> =
            Rc::new(RefCell::new(None));

        let attached: Rc<RefCell<Option<glib::WeakRef<Widget>>>> = Rc::new(RefCell::new(None));

        let view_mode_clone = view_mode.clone();
        let attached_clone = attached.clone();
        let on_lightbox_action_clone = on_lightbox_action.clone();
        controller.connect_key_pressed(move |_controller, keyval, _keycode, _state| {
            let editing_text = attached_clone
                .borrow()
                .as_ref()
                .and_then(|widget| widget.upgrade())
                .and_then(|widget| widget.root())
                .and_then(|root| root.focus())
                .is_some_and(|focus| is_text_field(&focus));
            let Some(action) = key_action(view_mode_clone.get(), editing_text, keyval) else {
                return glib::Propagation::Proceed;
            };
            if let Some(ref callback) = *on_lightbox_action_clone.borrow() {
                callback(action);
            }
            glib::Propagation::Stop
        });

        Self {
            controller,
            view_mode,
            attached,
            on_lightbox_action,
        }
    }

    /// Attach keybindings to a widget (typically the main window)
    pub fn attach(&self, widget: &impl IsA<Widget>) {
        *self.attached.borrow_mut() = Some(widget.upcast_ref::<Widget>().downgrade());
        widget.add_controller(self.controller.clone());
    }

    pub fn set_view_mode(&self, mode: ViewMode) {
        self.view_mode.set(mode);
    }

    /// Connect callback for next/prev/close while the lightbox is open
    pub fn connect_lightbox_action<F>(&self, callback: F)
    where
        F: Fn(LightboxAction) + 'static,
    {
        *self.on_lightbox_action.borrow_mut() = Some(Box::new(callback));
    }
}

impl Default for Keybindings {
    fn default() -> Self {
        Self::new()
    }
}
