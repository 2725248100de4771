// Lightbox view: full-window image overlay with caption, navigation and story
// Covers the gallery while open; clicking outside the content closes it

use gtk4::prelude::*;
use gtk4::{
    Align, Box as GtkBox, Button, ContentFit, GestureClick, Label, Orientation, Picture,
};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::gallery_view::apply_story_text;
use crate::gallery::{LightboxSurface, PageLocation, StoryPanel};
use crate::models::RenderedImageRecord;
use crate::source::GallerySource;
use crate::thumbnails::{DecodeKey, ThumbnailLoader};

type Callback = Rc<RefCell<Option<Box<dyn Fn()>>>>;

fn new_callback() -> Callback {
    Rc::new(RefCell::new(None))
}

fn emit(callback: &Callback) {
    if let Some(ref callback) = *callback.borrow() {
        callback();
    }
}

/// Widgets that exist only while the open image has a story.
struct StoryWidgets {
    button: Button,
    panel: GtkBox,
    text: Label,
}

pub struct LightboxView {
    root: GtkBox,
    picture: Picture,
    title_label: Label,
    controls: GtkBox,
    caption: GtkBox,
    share_button: Button,
    story: RefCell<Option<StoryWidgets>>,
    source: GallerySource,
    loader: Rc<ThumbnailLoader>,
    image_edge: u32,
    /// Bumped per shown image so late decodes for a previous image are ignored.
    load_token: Rc<Cell<u64>>,
    location: RefCell<PageLocation>,
    on_next: Callback,
    on_prev: Callback,
    on_close: Callback,
    on_share: Callback,
    on_story_toggle: Callback,
    on_story_dismiss: Callback,
    on_location_changed: Rc<RefCell<Option<Box<dyn Fn(&str)>>>>,
}

impl LightboxView {
    pub fn new(
        source: GallerySource,
        loader: Rc<ThumbnailLoader>,
        image_edge: u32,
        page_url: &str,
    ) -> Rc<Self> {
        let root = GtkBox::new(Orientation::Vertical, 12);
        root.add_css_class("lightbox");
        root.set_hexpand(true);
        root.set_vexpand(true);
        root.set_visible(false);

        let content = GtkBox::new(Orientation::Vertical, 8);
        content.add_css_class("lightbox-content");
        content.set_halign(Align::Center);
        content.set_valign(Align::Center);
        content.set_vexpand(true);
        content.set_margin_start(48);
        content.set_margin_end(48);
        content.set_margin_top(24);
        content.set_margin_bottom(24);

        let picture = Picture::new();
        picture.set_can_shrink(true);
        picture.set_content_fit(ContentFit::Contain);
        picture.set_vexpand(true);
        picture.add_css_class("lightbox-image");
        content.append(&picture);

        let caption = GtkBox::new(Orientation::Vertical, 6);
        caption.add_css_class("caption");

        let title_label = Label::new(None);
        title_label.add_css_class("lightbox-title");
        title_label.set_wrap(true);
        caption.append(&title_label);

        let controls = GtkBox::new(Orientation::Horizontal, 8);
        controls.set_halign(Align::Center);
        controls.add_css_class("lightbox-controls");

        let prev_button = Button::with_label("‹ Prev");
        prev_button.set_tooltip_text(Some("Previous image (Left)"));
        let next_button = Button::with_label("Next ›");
        next_button.set_tooltip_text(Some("Next image (Right)"));
        let share_button = Button::with_label("Share");
        share_button.add_css_class("share-button");
        share_button.set_tooltip_text(Some("Copy a link to this image"));
        let close_button = Button::with_label("×");
        close_button.add_css_class("close-button");
        close_button.set_tooltip_text(Some("Close (Escape)"));

        controls.append(&prev_button);
        controls.append(&next_button);
        controls.append(&share_button);
        controls.append(&close_button);
        caption.append(&controls);
        content.append(&caption);

        // The backdrop only receives clicks that miss the content.
        let backdrop_top = GtkBox::new(Orientation::Vertical, 0);
        backdrop_top.set_vexpand(true);
        let backdrop_bottom = GtkBox::new(Orientation::Vertical, 0);
        backdrop_bottom.set_vexpand(true);
        let row = GtkBox::new(Orientation::Horizontal, 0);
        let backdrop_start = GtkBox::new(Orientation::Horizontal, 0);
        backdrop_start.set_hexpand(true);
        let backdrop_end = GtkBox::new(Orientation::Horizontal, 0);
        backdrop_end.set_hexpand(true);
        row.append(&backdrop_start);
        row.append(&content);
        row.append(&backdrop_end);
        root.append(&backdrop_top);
        root.append(&row);
        root.append(&backdrop_bottom);

        let view = Rc::new(Self {
            root,
            picture,
            title_label,
            controls,
            caption,
            share_button: share_button.clone(),
            story: RefCell::new(None),
            source,
            loader,
            image_edge,
            load_token: Rc::new(Cell::new(0)),
            location: RefCell::new(PageLocation::new(page_url)),
            on_next: new_callback(),
            on_prev: new_callback(),
            on_close: new_callback(),
            on_share: new_callback(),
            on_story_toggle: new_callback(),
            on_story_dismiss: new_callback(),
            on_location_changed: Rc::new(RefCell::new(None)),
        });

        for backdrop in [&backdrop_top, &backdrop_bottom, &backdrop_start, &backdrop_end] {
            let click = GestureClick::new();
            let on_close = view.on_close.clone();
            click.connect_released(move |_, _n, _x, _y| emit(&on_close));
            backdrop.add_controller(click);
        }

        let on_prev = view.on_prev.clone();
        prev_button.connect_clicked(move |_| emit(&on_prev));
        let on_next = view.on_next.clone();
        next_button.connect_clicked(move |_| emit(&on_next));
        let on_share = view.on_share.clone();
        share_button.connect_clicked(move |_| emit(&on_share));
        let on_close = view.on_close.clone();
        close_button.connect_clicked(move |_| emit(&on_close));

        view
    }

    pub fn widget(&self) -> &GtkBox {
        &self.root
    }

    /// Current page address including the fragment.
    pub fn href(&self) -> String {
        self.location.borrow().href()
    }

    pub fn page_url(&self) -> String {
        self.location.borrow().page_url().to_string()
    }

    pub fn connect_next<F: Fn() + 'static>(&self, callback: F) {
        *self.on_next.borrow_mut() = Some(Box::new(callback));
    }

    pub fn connect_prev<F: Fn() + 'static>(&self, callback: F) {
        *self.on_prev.borrow_mut() = Some(Box::new(callback));
    }

    pub fn connect_close<F: Fn() + 'static>(&self, callback: F) {
        *self.on_close.borrow_mut() = Some(Box::new(callback));
    }

    pub fn connect_share<F: Fn() + 'static>(&self, callback: F) {
        *self.on_share.borrow_mut() = Some(Box::new(callback));
    }

    pub fn connect_story_toggle<F: Fn() + 'static>(&self, callback: F) {
        *self.on_story_toggle.borrow_mut() = Some(Box::new(callback));
    }

    pub fn connect_story_dismiss<F: Fn() + 'static>(&self, callback: F) {
        *self.on_story_dismiss.borrow_mut() = Some(Box::new(callback));
    }

    /// Called with the full address whenever the fragment changes.
    pub fn connect_location_changed<F: Fn(&str) + 'static>(&self, callback: F) {
        *self.on_location_changed.borrow_mut() = Some(Box::new(callback));
    }

    fn load_image(&self, record: &RenderedImageRecord) {
        let token = self.load_token.get().wrapping_add(1);
        self.load_token.set(token);
        self.picture.set_paintable(None::<&gdk4::Paintable>);
        self.picture.remove_css_class("broken");

        let path = match self.source.resolve(&record.image_path()) {
            Ok(path) => path,
            Err(err) => {
                tracing::warn!(error = %err, "Cannot show lightbox image");
                self.picture.add_css_class("broken");
                return;
            }
        };

        let picture_weak = self.picture.downgrade();
        let load_token = self.load_token.clone();
        self.loader
            .request(DecodeKey::new(path, self.image_edge), move |texture| {
                if load_token.get() != token {
                    return;
                }
                let Some(picture) = picture_weak.upgrade() else {
                    return;
                };
                match texture {
                    Some(texture) => picture.set_paintable(Some(texture)),
                    None => picture.add_css_class("broken"),
                }
            });
    }

    fn notify_location(&self) {
        let href = self.href();
        if let Some(ref callback) = *self.on_location_changed.borrow() {
            callback(&href);
        }
    }
}

impl LightboxSurface for LightboxView {
    fn show_image(&self, record: &RenderedImageRecord) {
        self.title_label.set_text(&record.title);
        self.title_label.set_visible(!record.title.is_empty());
        if record.title.is_empty() {
            self.picture.set_alternative_text(None);
        } else {
            self.picture.set_alternative_text(Some(&record.title));
        }
        self.load_image(record);
    }

    fn set_visible(&self, visible: bool) {
        self.root.set_visible(visible);
        if !visible {
            self.load_token.set(self.load_token.get().wrapping_add(1));
        }
    }

    fn replace_location_hash(&self, hash: Option<&str>) {
        {
            let mut location = self.location.borrow_mut();
            match hash {
                Some(hash) => location.replace_hash(hash),
                None => location.clear_hash(),
            }
        }
        self.notify_location();
    }

    fn remove_story(&self) {
        if let Some(story) = self.story.borrow_mut().take() {
            self.controls.remove(&story.button);
            self.caption.remove(&story.panel);
        }
    }

    fn install_story(&self, panel: &StoryPanel) {
        self.remove_story();

        let button = Button::with_label(panel.button_label());
        button.add_css_class("story-toggle");
        let on_story_toggle = self.on_story_toggle.clone();
        button.connect_clicked(move |_| emit(&on_story_toggle));
        self.controls
            .insert_child_after(&button, Some(&self.share_button));

        let story_panel = GtkBox::new(Orientation::Horizontal, 8);
        story_panel.add_css_class("story-panel");
        let text = Label::new(None);
        text.add_css_class("story-text");
        text.set_wrap(true);
        text.set_xalign(0.0);
        text.set_hexpand(true);
        text.set_max_width_chars(60);
        let dismiss_button = Button::with_label("×");
        dismiss_button.add_css_class("story-close");
        dismiss_button.set_valign(Align::Start);
        let on_dismiss = self.on_story_dismiss.clone();
        dismiss_button.connect_clicked(move |_| emit(&on_dismiss));
        story_panel.append(&text);
        story_panel.append(&dismiss_button);

        // A click anywhere in the panel dismisses it.
        let click = GestureClick::new();
        let on_dismiss = self.on_story_dismiss.clone();
        click.connect_released(move |_, _n, _x, _y| emit(&on_dismiss));
        story_panel.add_controller(click);

        story_panel.set_visible(false);
        self.caption.append(&story_panel);

        *self.story.borrow_mut() = Some(StoryWidgets {
            button,
            panel: story_panel,
            text,
        });
        self.update_story(panel);
    }

    fn update_story(&self, panel: &StoryPanel) {
        let story = self.story.borrow();
        let Some(story) = story.as_ref() else {
            return;
        };
        story.button.set_label(panel.button_label());
        story.button.set_sensitive(!panel.is_loading());
        apply_story_text(&story.text, panel);
        story.panel.set_visible(story.text.is_visible());
    }
}
