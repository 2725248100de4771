use gio::ApplicationFlags;
use gtk4::prelude::*;
use gtk4::Application;
use std::cell::RefCell;
use std::rc::Rc;

use crate::config::GalleryConfig;
use crate::ui::MainWindow;

const APP_ID: &str = "io.github.folio.Gallery";

pub struct FolioApp {
    app: Application,
}

impl FolioApp {
    pub fn new(config: GalleryConfig) -> Self {
        let app = Application::builder()
            .application_id(APP_ID)
            .flags(ApplicationFlags::NON_UNIQUE)
            .build();

        // Windows are kept alive here until they close.
        let windows: Rc<RefCell<Vec<Rc<MainWindow>>>> = Rc::new(RefCell::new(Vec::new()));
        app.connect_activate(move |app| Self::on_activate(app, &config, &windows));

        Self { app }
    }

    /// Runs the GTK main loop. Only the program name is passed on, the
    /// gallery flags were parsed already.
    pub fn run(&self) -> i32 {
        let program = std::env::args().next().unwrap_or_else(|| "folio".to_string());
        self.app.run_with_args(&[program]).into()
    }

    fn on_activate(
        app: &Application,
        config: &GalleryConfig,
        windows: &Rc<RefCell<Vec<Rc<MainWindow>>>>,
    ) {
        let window = match MainWindow::new(app, config.clone()) {
            Ok(window) => window,
            Err(err) => {
                tracing::error!(error = ?err, "Failed to create the gallery window");
                app.quit();
                return;
            }
        };

        let windows_weak = Rc::downgrade(windows);
        let window_weak = Rc::downgrade(&window);
        window.connect_close_request(move || {
            let (Some(windows), Some(window)) = (windows_weak.upgrade(), window_weak.upgrade())
            else {
                return;
            };
            windows.borrow_mut().retain(|open| !Rc::ptr_eq(open, &window));
        });

        window.present();
        windows.borrow_mut().push(window);
    }
}
