// Main window for the folio gallery
// GTK4 ApplicationWindow with a header (count, link, filters), the gallery
// view, the lightbox overlay and a toast for share confirmations

use anyhow::Context;
use gdk4::Display;
use gtk4::prelude::*;
use gtk4::{
    glib, Align, Application, ApplicationWindow, Box as GtkBox, Button, CssProvider, Entry, Label,
    Orientation, Overlay, Revealer, RevealerTransitionType, Settings,
    STYLE_PROVIDER_PRIORITY_APPLICATION,
};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};
use std::time::Duration;
use tokio::runtime::{Builder as TokioRuntimeBuilder, Runtime};
use tracing::{debug, info, warn};

use super::gallery_view::GalleryView;
use super::keybindings::{Keybindings, LightboxAction, ViewMode};
use super::lightbox_view::LightboxView;
use crate::config::GalleryConfig;
use crate::error::GalleryError;
use crate::gallery::{
    load_manifest, load_story, probe_story, render_gallery, render_signal, DeepLink, FilterController,
    FilterKey, FilterOutcome, LightboxController, ReadySignal, RenderNotifier, RenderedGallery,
    SectionNavigator, StoryContent, StoryFetch, StoryPanel, StoryProbe, StoryToggle,
};
use crate::models::Manifest;
use crate::source::GallerySource;
use crate::thumbnails::ThumbnailLoader;

const WINDOW_TITLE: &str = "Gallery";
const SHARE_CONFIRMATION: &str = "Link copied to clipboard";
const TOAST_DURATION: Duration = Duration::from_secs(2);
const IO_WORKER_THREADS: usize = 2;

/// Stylesheet for the gallery
const GALLERY_CSS: &str = r#"
window {
    background-color: #101014;
    color: #e8e6e3;
}

.header {
    padding: 8px 16px;
    border-bottom: 1px solid #2a2a30;
}

.site-title {
    font-size: 20px;
    font-weight: bold;
}

.artwork-count {
    color: #9a9aa2;
}

.link-entry {
    font-family: monospace;
    font-size: 11px;
}

.filter-button {
    background: transparent;
    border: 1px solid #3a3a42;
    border-radius: 4px;
    padding: 2px 10px;
}

.filter-button.active {
    background-color: #e8e6e3;
    color: #101014;
}

.category-heading {
    font-size: 18px;
    font-weight: bold;
    letter-spacing: 2px;
}

.subcategory-heading {
    font-size: 15px;
    font-weight: bold;
    letter-spacing: 1px;
}

.figure-image {
    padding: 0;
    border: none;
    background: #1a1a20;
}

.figure-image picture.broken {
    opacity: 0.3;
}

.story-toggle {
    font-size: 11px;
}

.story-text {
    font-size: 12px;
}

.story-text.no-text,
.story-text.error-text {
    font-style: italic;
    color: #9a9aa2;
}

.lightbox {
    background-color: rgba(0, 0, 0, 0.92);
}

.lightbox-title {
    font-size: 16px;
}

.story-panel {
    background-color: rgba(255, 255, 255, 0.06);
    border-radius: 4px;
    padding: 8px;
}

.toast {
    background-color: #e8e6e3;
    color: #101014;
    border-radius: 4px;
    padding: 6px 14px;
    margin-bottom: 24px;
}
"#;

/// Load and apply the gallery stylesheet
fn load_css() {
    let provider = CssProvider::new();
    provider.load_from_string(GALLERY_CSS);

    if let Some(display) = Display::default() {
        gtk4::style_context_add_provider_for_display(
            &display,
            &provider,
            STYLE_PROVIDER_PRIORITY_APPLICATION,
        );
    }
}

/// Results of background I/O, delivered to the GTK main loop.
#[derive(Debug)]
enum WorkerMessage {
    Manifest(Result<Manifest, GalleryError>),
    GridStory {
        global_index: usize,
        content: StoryContent,
    },
    LightboxProbe {
        generation: u64,
        story_path: String,
        exists: bool,
    },
    LightboxStory {
        generation: u64,
        content: StoryContent,
    },
}

/// Main window for the gallery
pub struct MainWindow {
    self_weak: RefCell<Weak<MainWindow>>,
    window: ApplicationWindow,
    runtime: Runtime,
    config: GalleryConfig,
    source: GallerySource,
    worker_tx: async_channel::Sender<WorkerMessage>,
    gallery_view: Rc<GalleryView>,
    lightbox_view: Rc<LightboxView>,
    keybindings: Rc<Keybindings>,
    count_label: Label,
    link_entry: Entry,
    filter_bar: GtkBox,
    filter_buttons: RefCell<Vec<(FilterKey, Button)>>,
    toast: Revealer,
    toast_label: Label,
    toast_generation: Cell<u64>,
    gallery: RefCell<RenderedGallery>,
    filter: RefCell<FilterController>,
    lightbox: RefCell<LightboxController>,
    grid_stories: RefCell<HashMap<usize, StoryPanel>>,
    notifier: RenderNotifier,
    ready: ReadySignal,
}

impl MainWindow {
    pub fn new(app: &Application, config: GalleryConfig) -> anyhow::Result<Rc<Self>> {
        // Load CSS before creating widgets
        load_css();
        if let Some(settings) = Settings::default() {
            settings.set_gtk_application_prefer_dark_theme(true);
        }

        let runtime = TokioRuntimeBuilder::new_multi_thread()
            .worker_threads(IO_WORKER_THREADS)
            .thread_name("folio-io")
            .enable_all()
            .build()
            .context("failed to start the I/O runtime")?;

        let window = ApplicationWindow::builder()
            .application(app)
            .title(WINDOW_TITLE)
            .default_width(1200)
            .default_height(800)
            .build();

        let source = GallerySource::new(config.root.clone());
        let loader = ThumbnailLoader::new(config.decode_workers, config.texture_cache_bytes());
        let page_url = config.page_url();
        info!(root = ?config.root, %page_url, "Opening gallery");

        // Header: title, artwork count, link entry, filters
        let header = GtkBox::new(Orientation::Vertical, 6);
        header.add_css_class("header");

        let title_row = GtkBox::new(Orientation::Horizontal, 12);
        let title_label = Label::new(Some(WINDOW_TITLE));
        title_label.add_css_class("site-title");
        let count_label = Label::new(None);
        count_label.add_css_class("artwork-count");
        let link_entry = Entry::new();
        link_entry.add_css_class("link-entry");
        link_entry.set_hexpand(true);
        link_entry.set_text(&page_url);
        link_entry.set_tooltip_text(Some("Paste a gallery link and press Enter"));
        title_row.append(&title_label);
        title_row.append(&count_label);
        title_row.append(&link_entry);

        let filter_bar = GtkBox::new(Orientation::Horizontal, 6);
        filter_bar.add_css_class("filter-bar");

        header.append(&title_row);
        header.append(&filter_bar);

        let gallery_view = GalleryView::new(loader.clone(), config.thumbnail_edge);
        let lightbox_view =
            LightboxView::new(source.clone(), loader, config.lightbox_edge, &page_url);

        let toast_label = Label::new(None);
        toast_label.add_css_class("toast");
        let toast = Revealer::builder()
            .transition_type(RevealerTransitionType::Crossfade)
            .transition_duration(150)
            .halign(Align::Center)
            .valign(Align::End)
            .can_target(false)
            .child(&toast_label)
            .build();

        let overlay = Overlay::new();
        overlay.set_child(Some(gallery_view.widget()));
        overlay.add_overlay(lightbox_view.widget());
        overlay.add_overlay(&toast);

        let main_box = GtkBox::new(Orientation::Vertical, 0);
        main_box.append(&header);
        main_box.append(&overlay);
        window.set_child(Some(&main_box));

        let keybindings = Rc::new(Keybindings::new());
        keybindings.attach(&window);

        let (worker_tx, worker_rx) = async_channel::unbounded::<WorkerMessage>();
        let (notifier, ready) = render_signal();

        let main_window = Rc::new(Self {
            self_weak: RefCell::new(Weak::new()),
            window,
            runtime,
            config,
            source,
            worker_tx,
            gallery_view,
            lightbox_view,
            keybindings,
            count_label,
            link_entry,
            filter_bar,
            filter_buttons: RefCell::new(Vec::new()),
            toast,
            toast_label,
            toast_generation: Cell::new(0),
            gallery: RefCell::new(RenderedGallery::default()),
            filter: RefCell::new(FilterController::new()),
            lightbox: RefCell::new(LightboxController::new()),
            grid_stories: RefCell::new(HashMap::new()),
            notifier,
            ready,
        });
        *main_window.self_weak.borrow_mut() = Rc::downgrade(&main_window);

        main_window.setup_callbacks();

        let window_weak = Rc::downgrade(&main_window);
        glib::spawn_future_local(async move {
            while let Ok(message) = worker_rx.recv().await {
                let Some(window) = window_weak.upgrade() else {
                    break;
                };
                window.handle_worker_message(message);
            }
        });

        main_window.load_gallery();
        if let Some(link) = main_window.config.initial_link.clone() {
            main_window.activate_link(&link);
        }

        Ok(main_window)
    }

    fn setup_callbacks(self: &Rc<Self>) {
        let window_weak = Rc::downgrade(self);
        self.keybindings.connect_lightbox_action(move |action| {
            if let Some(window) = window_weak.upgrade() {
                match action {
                    LightboxAction::Next => window.show_next(),
                    LightboxAction::Prev => window.show_prev(),
                    LightboxAction::Close => window.close_lightbox(),
                }
            }
        });

        let window_weak = Rc::downgrade(self);
        self.gallery_view.connect_image_activated(move |global_index| {
            if let Some(window) = window_weak.upgrade() {
                window.open_lightbox(global_index);
            }
        });

        let window_weak = Rc::downgrade(self);
        self.gallery_view.connect_story_toggled(move |global_index| {
            if let Some(window) = window_weak.upgrade() {
                window.toggle_grid_story(global_index);
            }
        });

        let window_weak = Rc::downgrade(self);
        self.lightbox_view.connect_next(move || {
            if let Some(window) = window_weak.upgrade() {
                window.show_next();
            }
        });

        let window_weak = Rc::downgrade(self);
        self.lightbox_view.connect_prev(move || {
            if let Some(window) = window_weak.upgrade() {
                window.show_prev();
            }
        });

        let window_weak = Rc::downgrade(self);
        self.lightbox_view.connect_close(move || {
            if let Some(window) = window_weak.upgrade() {
                window.close_lightbox();
            }
        });

        let window_weak = Rc::downgrade(self);
        self.lightbox_view.connect_share(move || {
            if let Some(window) = window_weak.upgrade() {
                window.share_current();
            }
        });

        let window_weak = Rc::downgrade(self);
        self.lightbox_view.connect_story_toggle(move || {
            if let Some(window) = window_weak.upgrade() {
                window.toggle_lightbox_story();
            }
        });

        let window_weak = Rc::downgrade(self);
        self.lightbox_view.connect_story_dismiss(move || {
            if let Some(window) = window_weak.upgrade() {
                window
                    .lightbox
                    .borrow_mut()
                    .dismiss_story(&*window.lightbox_view);
            }
        });

        let link_entry = self.link_entry.downgrade();
        self.lightbox_view.connect_location_changed(move |href| {
            if let Some(entry) = link_entry.upgrade() {
                entry.set_text(href);
            }
        });

        let window_weak = Rc::downgrade(self);
        self.link_entry.connect_activate(move |entry| {
            if let Some(window) = window_weak.upgrade() {
                window.activate_link(&entry.text());
            }
        });
    }

    /// Present the window
    pub fn present(&self) {
        self.window.present();
    }

    pub fn connect_close_request<F>(&self, callback: F)
    where
        F: Fn() + 'static,
    {
        self.window.connect_close_request(move |_| {
            callback();
            glib::Propagation::Proceed
        });
    }

    fn load_gallery(&self) {
        let source = self.source.clone();
        let manifest_path = self.config.manifest.clone();
        let tx = self.worker_tx.clone();
        self.runtime.spawn(async move {
            let result = load_manifest(&source, &manifest_path).await;
            let _ = tx.send(WorkerMessage::Manifest(result)).await;
        });
    }

    fn handle_worker_message(&self, message: WorkerMessage) {
        match message {
            WorkerMessage::Manifest(Ok(manifest)) => {
                let count = self.apply_manifest(manifest);
                self.count_label
                    .set_text(&self.gallery.borrow().artwork_count_label());
                self.notifier.rendered(count);
            }
            WorkerMessage::Manifest(Err(err)) => {
                warn!(manifest = %self.config.manifest, error = %err, "Error loading gallery data");
                self.apply_manifest(Manifest::default());
                self.notifier.failed();
            }
            WorkerMessage::GridStory {
                global_index,
                content,
            } => {
                let mut stories = self.grid_stories.borrow_mut();
                if let Some(panel) = stories.get_mut(&global_index) {
                    panel.finish_loading(content);
                    self.gallery_view.update_story(global_index, panel);
                }
            }
            WorkerMessage::LightboxProbe {
                generation,
                story_path,
                exists,
            } => {
                self.lightbox.borrow_mut().story_probe_finished(
                    generation,
                    &story_path,
                    exists,
                    &*self.lightbox_view,
                );
            }
            WorkerMessage::LightboxStory {
                generation,
                content,
            } => {
                self.lightbox
                    .borrow_mut()
                    .story_loaded(generation, content, &*self.lightbox_view);
            }
        }
    }

    /// Renders a manifest into the view; returns the number of images shown.
    fn apply_manifest(&self, mut manifest: Manifest) -> usize {
        let gallery = render_gallery(&mut manifest);
        self.gallery_view.build(&gallery, &self.source);
        self.rebuild_filter_bar(&gallery);
        self.grid_stories.borrow_mut().clear();

        let count = gallery.index.count();
        *self.gallery.borrow_mut() = gallery;
        debug!(images = count, "Gallery rendered");
        count
    }

    fn rebuild_filter_bar(&self, gallery: &RenderedGallery) {
        while let Some(child) = self.filter_bar.first_child() {
            self.filter_bar.remove(&child);
        }
        let mut buttons = self.filter_buttons.borrow_mut();
        buttons.clear();

        for entry in &gallery.filters {
            let button = Button::with_label(&entry.label);
            button.add_css_class("filter-button");
            let key = entry.key.clone();
            let window_weak = self.self_weak.borrow().clone();
            button.connect_clicked(move |_| {
                if let Some(window) = window_weak.upgrade() {
                    window.apply_filter(key.clone());
                }
            });
            self.filter_bar.append(&button);
            buttons.push((entry.key.clone(), button));
        }
        drop(buttons);
        self.update_filter_buttons();
    }

    fn apply_filter(&self, key: FilterKey) {
        let outcome = self.filter.borrow_mut().filter(key, &*self.gallery_view);
        if let FilterOutcome::UnknownSection(id) = outcome {
            debug!(section = %id, "Filter target has no section");
        }
        self.update_filter_buttons();
    }

    fn update_filter_buttons(&self) {
        let filter = self.filter.borrow();
        for (key, button) in self.filter_buttons.borrow().iter() {
            if key == filter.active() {
                button.add_css_class("active");
            } else {
                button.remove_css_class("active");
            }
        }
    }

    fn open_lightbox(&self, global_index: usize) {
        let probe = {
            let gallery = self.gallery.borrow();
            self.lightbox
                .borrow_mut()
                .open(global_index, &gallery.index, &*self.lightbox_view)
        };
        self.after_navigation(probe);
    }

    fn show_next(&self) {
        let probe = {
            let gallery = self.gallery.borrow();
            self.lightbox
                .borrow_mut()
                .next(&gallery.index, &*self.lightbox_view)
        };
        self.after_navigation(probe);
    }

    fn show_prev(&self) {
        let probe = {
            let gallery = self.gallery.borrow();
            self.lightbox
                .borrow_mut()
                .prev(&gallery.index, &*self.lightbox_view)
        };
        self.after_navigation(probe);
    }

    fn after_navigation(&self, probe: Option<StoryProbe>) {
        if self.lightbox.borrow().is_open() {
            self.keybindings.set_view_mode(ViewMode::Lightbox);
        }
        if let Some(probe) = probe {
            self.spawn_story_probe(probe);
        }
    }

    fn close_lightbox(&self) {
        self.lightbox.borrow_mut().close(&*self.lightbox_view);
        self.keybindings.set_view_mode(ViewMode::Gallery);
    }

    fn spawn_story_probe(&self, probe: StoryProbe) {
        let source = self.source.clone();
        let tx = self.worker_tx.clone();
        self.runtime.spawn(async move {
            let exists = probe_story(&source, &probe.story_path).await;
            let _ = tx
                .send(WorkerMessage::LightboxProbe {
                    generation: probe.generation,
                    story_path: probe.story_path,
                    exists,
                })
                .await;
        });
    }

    fn toggle_lightbox_story(&self) {
        let fetch = self
            .lightbox
            .borrow_mut()
            .toggle_story(&*self.lightbox_view);
        if let Some(StoryFetch {
            generation,
            story_path,
        }) = fetch
        {
            let source = self.source.clone();
            let tx = self.worker_tx.clone();
            self.runtime.spawn(async move {
                let content = load_story(&source, &story_path).await;
                let _ = tx
                    .send(WorkerMessage::LightboxStory {
                        generation,
                        content,
                    })
                    .await;
            });
        }
    }

    fn toggle_grid_story(&self, global_index: usize) {
        let Some(story_path) = self
            .gallery
            .borrow()
            .index
            .record_at(global_index)
            .map(|record| record.story_path())
        else {
            return;
        };

        let toggle = {
            let mut stories = self.grid_stories.borrow_mut();
            let panel = stories
                .entry(global_index)
                .or_insert_with(|| StoryPanel::new(story_path.clone()));
            let toggle = panel.toggle();
            self.gallery_view.update_story(global_index, panel);
            toggle
        };

        if toggle == StoryToggle::FetchNeeded {
            let source = self.source.clone();
            let tx = self.worker_tx.clone();
            self.runtime.spawn(async move {
                let content = load_story(&source, &story_path).await;
                let _ = tx
                    .send(WorkerMessage::GridStory {
                        global_index,
                        content,
                    })
                    .await;
            });
        }
    }

    fn share_current(&self) {
        let url = {
            let gallery = self.gallery.borrow();
            self.lightbox
                .borrow()
                .share_url(&gallery.index, &self.lightbox_view.page_url())
        };
        self.window.clipboard().set_text(&url);
        info!(%url, "Copied share link");
        self.show_toast(SHARE_CONFIRMATION);
    }

    fn show_toast(&self, message: &str) {
        self.toast_label.set_text(message);
        self.toast.set_reveal_child(true);

        let generation = self.toast_generation.get().wrapping_add(1);
        self.toast_generation.set(generation);
        let window_weak = self.self_weak.borrow().clone();
        glib::timeout_add_local_once(TOAST_DURATION, move || {
            if let Some(window) = window_weak.upgrade() {
                if window.toast_generation.get() == generation {
                    window.toast.set_reveal_child(false);
                }
            }
        });
    }

    /// Opens the image a link points at once the gallery has rendered.
    pub fn activate_link(&self, input: &str) {
        let Some(link) = DeepLink::parse(input) else {
            debug!(input, "Ignoring malformed gallery link");
            return;
        };

        let window_weak = self.self_weak.borrow().clone();
        let mut ready = self.ready.clone();
        glib::spawn_future_local(async move {
            if ready.wait().await.is_none() {
                debug!(category = %link.category, "Gallery failed to render; dropping link");
                return;
            }

            let (target, delay) = {
                let Some(window) = window_weak.upgrade() else {
                    return;
                };
                let target = link.target(&window.gallery.borrow());
                let Some(target) = target else {
                    debug!(category = %link.category, "Link matches no section");
                    return;
                };
                let delay = window
                    .config
                    .settle_policy()
                    .delay_for(window.window.width());
                (target, delay)
            };
            // Let the grid lay out before scrolling to the section.
            glib::timeout_future(delay).await;

            let Some(window) = window_weak.upgrade() else {
                return;
            };
            window.gallery_view.scroll_to_section(&target.section);
            match target.image {
                Some(global_index) => window.open_lightbox(global_index),
                None => debug!(category = %link.category, "Linked category has no own images"),
            }
        });
    }
}
