/// History Recall - Chrome extension for chatting with your browsing history
/// Built with Rust + WASM + Yew

mod api;
mod background;
mod bridge;
mod chat;
mod clock;
mod collector;
mod content;
mod domain;
mod extractor;
mod history_data;
mod operations;
mod relay;
mod storage;
mod sync;
pub mod ui;

#[cfg(test)]
mod testing;

use wasm_bindgen::prelude::*;

// Set up panic hook for better error messages in the browser console
#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::default());
}

// Re-export core domain functions for JavaScript access
#[wasm_bindgen]
pub fn extract_domain(url: &str) -> String {
    domain::extract_domain(url)
}

// Start the Yew app for the popup
#[wasm_bindgen]
pub fn start_popup() {
    yew::Renderer::<ui::popup::App>::new().render();
}

// Service worker: keeps the metadata relay and answers its messages
#[wasm_bindgen]
pub fn start_background() {
    background::run_background();
}

// Content script: scrapes media pages and reports to the background
#[wasm_bindgen]
pub fn start_content_script() {
    if let Err(e) = content::run_content_script() {
        log::error!("Content script failed to start: {:?}", e);
    }
}
