//! Browser bindings.
//!
//! Built with `wasm-pack build --target web --features wasm`. The page scripts
//! own the DOM; this module owns the session and the task list and persists
//! both to `window.localStorage`.
//!
//! ```javascript
//! import init, { TodoApp } from './taskgate.js';
//!
//! await init();
//! const app = new TodoApp();
//! if (!app.initialize()) return;          // redirected to login.html
//! await app.login('demo', 'demo123');
//! app.addTask('Buy milk');
//! const tasks = JSON.parse(app.tasks('active'));
//! ```

mod bindings;

pub use bindings::*;

use crate::auth::Navigator;
use crate::models::Page;

/// Initialize the panic hook so Rust panics show up in the browser console.
pub fn init_panic_hook() {
    console_error_panic_hook::set_once();
}

/// Version information for the wasm module
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Navigates by assigning `window.location.href`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocationNavigator;

impl Navigator for LocationNavigator {
    fn navigate(&self, page: &Page) {
        let Some(window) = web_sys::window() else {
            return;
        };
        if let Err(e) = window.location().set_href(&page.path()) {
            web_sys::console::warn_1(&e);
        }
    }
}

/// The page the browser is showing.
pub fn current_page() -> Page {
    web_sys::window()
        .and_then(|w| w.location().pathname().ok())
        .map(|path| Page::from_path(&path))
        .unwrap_or(Page::Other(String::new()))
}
