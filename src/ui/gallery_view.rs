// Gallery view: category sections with image grids inside a ScrolledWindow
// Thumbnails are requested lazily as figures scroll into view

use gtk4::{glib, graphene};
use gtk4::prelude::*;
use gtk4::{
    Align, Box as GtkBox, Button, ContentFit, FlowBox, Label, Orientation, Picture, PolicyType,
    ScrolledWindow, SelectionMode, Widget,
};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::path::PathBuf;
use std::rc::{Rc, Weak};

use crate::gallery::{RenderedGallery, RenderedSection, SectionNavigator, StoryContent, StoryPanel};
use crate::gallery::story::SHOW_STORY_LABEL;
use crate::source::GallerySource;
use crate::thumbnails::{DecodeKey, ThumbnailLoader};

/// Displayed edge of a grid figure, in pixels.
const FIGURE_SIZE: i32 = 240;
/// Extra distance beyond the viewport within which thumbnails are requested.
const PREFETCH_MARGIN_PX: f32 = 600.0;
/// Indentation of subcategory sections.
const SUBCATEGORY_INDENT: i32 = 20;

struct FigureWidgets {
    story_button: Button,
    story_text: Label,
}

struct PendingThumbnail {
    picture: Picture,
    path: PathBuf,
}

pub struct GalleryView {
    self_weak: RefCell<Weak<GalleryView>>,
    scrolled_window: ScrolledWindow,
    content: GtkBox,
    loader: Rc<ThumbnailLoader>,
    thumbnail_edge: u32,
    sections: RefCell<HashMap<String, Widget>>,
    figures: RefCell<HashMap<usize, FigureWidgets>>,
    pending_thumbnails: RefCell<Vec<PendingThumbnail>>,
    refresh_scheduled: Cell<bool>,
    on_image_activated: Rc<RefCell<Option<Box<dyn Fn(usize)>>>>,
    on_story_toggled: Rc<RefCell<Option<Box<dyn Fn(usize)>>>>,
}

impl GalleryView {
    pub fn new(loader: Rc<ThumbnailLoader>, thumbnail_edge: u32) -> Rc<Self> {
        let content = GtkBox::new(Orientation::Vertical, 24);
        content.add_css_class("gallery");
        content.set_margin_start(16);
        content.set_margin_end(16);
        content.set_margin_top(12);
        content.set_margin_bottom(24);

        let scrolled_window = ScrolledWindow::builder()
            .hscrollbar_policy(PolicyType::Never)
            .vscrollbar_policy(PolicyType::Automatic)
            .kinetic_scrolling(true)
            .child(&content)
            .build();
        scrolled_window.set_vexpand(true);
        scrolled_window.set_hexpand(true);

        let view = Rc::new(Self {
            self_weak: RefCell::new(Weak::new()),
            scrolled_window,
            content,
            loader,
            thumbnail_edge,
            sections: RefCell::new(HashMap::new()),
            figures: RefCell::new(HashMap::new()),
            pending_thumbnails: RefCell::new(Vec::new()),
            refresh_scheduled: Cell::new(false),
            on_image_activated: Rc::new(RefCell::new(None)),
            on_story_toggled: Rc::new(RefCell::new(None)),
        });

        *view.self_weak.borrow_mut() = Rc::downgrade(&view);

        // Scrolling and relayout both change what is on screen.
        let vadj = view.scrolled_window.vadjustment();
        let view_weak = Rc::downgrade(&view);
        vadj.connect_value_changed(move |_| {
            if let Some(view) = view_weak.upgrade() {
                view.schedule_thumbnail_refresh();
            }
        });
        let view_weak = Rc::downgrade(&view);
        vadj.connect_changed(move |_| {
            if let Some(view) = view_weak.upgrade() {
                view.schedule_thumbnail_refresh();
            }
        });

        view
    }

    pub fn widget(&self) -> &ScrolledWindow {
        &self.scrolled_window
    }

    /// Replaces the displayed sections with a freshly rendered gallery.
    pub fn build(&self, gallery: &RenderedGallery, source: &GallerySource) {
        while let Some(child) = self.content.first_child() {
            self.content.remove(&child);
        }
        self.sections.borrow_mut().clear();
        self.figures.borrow_mut().clear();
        self.pending_thumbnails.borrow_mut().clear();

        for section in &gallery.sections {
            let widget = self.build_section(section, gallery, source);
            self.content.append(&widget);
        }

        tracing::debug!(
            sections = self.sections.borrow().len(),
            figures = self.figures.borrow().len(),
            "Built gallery view"
        );
        self.schedule_thumbnail_refresh();
    }

    /// Coalesces thumbnail requests into one pass after layout.
    fn schedule_thumbnail_refresh(&self) {
        if self.refresh_scheduled.replace(true) {
            return;
        }
        let view_weak = self.self_weak.borrow().clone();
        glib::idle_add_local_once(move || {
            if let Some(view) = view_weak.upgrade() {
                view.refresh_scheduled.set(false);
                view.request_visible_thumbnails();
            }
        });
    }

    fn build_section(
        &self,
        section: &RenderedSection,
        gallery: &RenderedGallery,
        source: &GallerySource,
    ) -> GtkBox {
        let section_box = GtkBox::new(Orientation::Vertical, 12);
        section_box.add_css_class("category");

        let heading = Label::new(Some(&section.heading));
        heading.set_halign(Align::Start);
        heading.set_wrap(true);
        if section.is_subcategory() {
            section_box.add_css_class("subcategory");
            section_box.set_margin_start(SUBCATEGORY_INDENT);
            heading.add_css_class("subcategory-heading");
        } else {
            heading.add_css_class("category-heading");
        }
        section_box.append(&heading);

        // Duplicate ids: the first section keeps the anchor.
        self.sections
            .borrow_mut()
            .entry(section.id.clone())
            .or_insert_with(|| section_box.clone().upcast());

        for child in &section.children {
            let child_box = self.build_section(child, gallery, source);
            section_box.append(&child_box);
        }

        if !section.images.is_empty() {
            let grid = FlowBox::new();
            grid.add_css_class("grid");
            grid.set_selection_mode(SelectionMode::None);
            grid.set_homogeneous(true);
            grid.set_max_children_per_line(12);
            grid.set_column_spacing(12);
            grid.set_row_spacing(12);
            grid.set_valign(Align::Start);

            for &global_index in &section.images {
                let Some(record) = gallery.index.record_at(global_index) else {
                    continue;
                };
                let path = match source.resolve(&record.image_path()) {
                    Ok(path) => path,
                    Err(err) => {
                        tracing::warn!(error = %err, "Skipping image outside the gallery root");
                        continue;
                    }
                };
                let figure = self.build_figure(global_index, &record.title, path);
                grid.insert(&figure, -1);
            }
            section_box.append(&grid);
        }

        section_box
    }

    fn build_figure(&self, global_index: usize, title: &str, path: PathBuf) -> GtkBox {
        let figure = GtkBox::new(Orientation::Vertical, 6);
        figure.add_css_class("figure");
        figure.set_size_request(FIGURE_SIZE, -1);

        let picture = Picture::new();
        picture.set_content_fit(ContentFit::Cover);
        picture.set_size_request(FIGURE_SIZE, FIGURE_SIZE);
        picture.set_can_shrink(true);
        if !title.is_empty() {
            picture.set_alternative_text(Some(title));
        }

        let image_button = Button::new();
        image_button.add_css_class("figure-image");
        image_button.set_child(Some(&picture));
        if !title.is_empty() {
            image_button.set_tooltip_text(Some(title));
        }
        let on_image_activated = self.on_image_activated.clone();
        image_button.connect_clicked(move |_| {
            if let Some(ref callback) = *on_image_activated.borrow() {
                callback(global_index);
            }
        });
        figure.append(&image_button);

        let story_button = Button::with_label(SHOW_STORY_LABEL);
        story_button.add_css_class("story-toggle");
        story_button.set_halign(Align::Start);
        let on_story_toggled = self.on_story_toggled.clone();
        story_button.connect_clicked(move |_| {
            if let Some(ref callback) = *on_story_toggled.borrow() {
                callback(global_index);
            }
        });
        figure.append(&story_button);

        let story_text = Label::new(None);
        story_text.add_css_class("story-text");
        story_text.set_wrap(true);
        story_text.set_xalign(0.0);
        story_text.set_max_width_chars(32);
        story_text.set_selectable(true);
        story_text.set_visible(false);
        figure.append(&story_text);

        self.figures.borrow_mut().insert(
            global_index,
            FigureWidgets {
                story_button,
                story_text,
            },
        );
        self.pending_thumbnails
            .borrow_mut()
            .push(PendingThumbnail { picture, path });

        figure
    }

    /// Requests thumbnails for figures inside (or near) the viewport.
    fn request_visible_thumbnails(&self) {
        let viewport_height = self.scrolled_window.height() as f32;
        if viewport_height <= 0.0 {
            return;
        }

        let mut ready = Vec::new();
        self.pending_thumbnails.borrow_mut().retain(|pending| {
            let height = pending.picture.height() as f32;
            if height <= 0.0 {
                return true;
            }
            let Some(point) = pending
                .picture
                .compute_point(&self.scrolled_window, &graphene::Point::new(0.0, 0.0))
            else {
                return true;
            };
            let near = point.y() + height >= -PREFETCH_MARGIN_PX
                && point.y() <= viewport_height + PREFETCH_MARGIN_PX;
            if near {
                ready.push((pending.picture.clone(), pending.path.clone()));
            }
            !near
        });

        for (picture, path) in ready {
            let picture_weak = picture.downgrade();
            self.loader
                .request(DecodeKey::new(path, self.thumbnail_edge), move |texture| {
                    let Some(picture) = picture_weak.upgrade() else {
                        return;
                    };
                    match texture {
                        Some(texture) => picture.set_paintable(Some(texture)),
                        None => picture.add_css_class("broken"),
                    }
                });
        }
    }

    /// Reflects a grid story panel in its figure.
    pub fn update_story(&self, global_index: usize, panel: &StoryPanel) {
        let figures = self.figures.borrow();
        let Some(widgets) = figures.get(&global_index) else {
            return;
        };
        widgets.story_button.set_label(panel.button_label());
        widgets.story_button.set_sensitive(!panel.is_loading());
        apply_story_text(&widgets.story_text, panel);
    }

    pub fn connect_image_activated<F>(&self, callback: F)
    where
        F: Fn(usize) + 'static,
    {
        *self.on_image_activated.borrow_mut() = Some(Box::new(callback));
    }

    pub fn connect_story_toggled<F>(&self, callback: F)
    where
        F: Fn(usize) + 'static,
    {
        *self.on_story_toggled.borrow_mut() = Some(Box::new(callback));
    }
}

impl SectionNavigator for GalleryView {
    fn reveal_all_sections(&self) {
        for section in self.sections.borrow().values() {
            section.set_visible(true);
        }
    }

    fn scroll_to_top(&self) {
        self.scrolled_window.vadjustment().set_value(0.0);
    }

    fn scroll_to_section(&self, section_id: &str) -> bool {
        let sections = self.sections.borrow();
        let Some(section) = sections.get(section_id) else {
            return false;
        };
        let Some(point) = section.compute_point(&self.content, &graphene::Point::new(0.0, 0.0)) else {
            return false;
        };
        let vadj = self.scrolled_window.vadjustment();
        let target = (point.y() as f64).min(vadj.upper() - vadj.page_size()).max(0.0);
        vadj.set_value(target);
        true
    }
}

/// Shows or hides a story label according to the panel state.
pub fn apply_story_text(label: &Label, panel: &StoryPanel) {
    label.remove_css_class("no-text");
    label.remove_css_class("error-text");
    match panel.content() {
        Some(content) if panel.is_visible() => {
            label.set_text(content.message());
            match content {
                StoryContent::Unavailable => label.add_css_class("no-text"),
                StoryContent::Failed => label.add_css_class("error-text"),
                StoryContent::Text(_) => {}
            }
            label.set_visible(true);
        }
        _ => label.set_visible(false),
    }
}
