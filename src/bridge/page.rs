/// Page, timer and clock access for the content script and popup
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::Document;

use crate::clock::Clock;
use crate::extractor::PageDom;
use crate::extractor::debounce::Scheduler;

pub struct DocumentPage {
    document: Document,
}

impl DocumentPage {
    pub fn new(document: Document) -> Self {
        DocumentPage { document }
    }
}

impl PageDom for DocumentPage {
    fn url(&self) -> String {
        self.document
            .location()
            .and_then(|location| location.href().ok())
            .unwrap_or_default()
    }

    fn title(&self) -> String {
        self.document.title()
    }

    fn text(&self, selector: &str) -> Option<String> {
        // An invalid selector is treated like a missing element.
        self.document
            .query_selector(selector)
            .ok()
            .flatten()
            .and_then(|element| element.text_content())
    }

    fn attribute(&self, selector: &str, name: &str) -> Option<String> {
        self.document
            .query_selector(selector)
            .ok()
            .flatten()
            .and_then(|element| element.get_attribute(name))
    }
}

/// `setTimeout` / `clearTimeout` on the window
#[derive(Clone, Copy, Default)]
pub struct TimeoutScheduler;

impl Scheduler for TimeoutScheduler {
    type Handle = i32;

    fn schedule(&self, delay_ms: u32, task: Box<dyn FnOnce()>) -> Result<i32, String> {
        let window = web_sys::window().ok_or("No window")?;
        let callback = Closure::once_into_js(move || task());
        window
            .set_timeout_with_callback_and_timeout_and_arguments_0(
                callback.unchecked_ref(),
                delay_ms.min(i32::MAX as u32) as i32,
            )
            .map_err(|e| format!("setTimeout failed: {:?}", e))
    }

    fn cancel(&self, handle: i32) {
        if let Some(window) = web_sys::window() {
            window.clear_timeout_with_handle(handle);
        }
    }
}

pub struct BrowserClock;

impl Clock for BrowserClock {
    fn now_ms(&self) -> f64 {
        js_sys::Date::now()
    }

    fn utc_offset_minutes(&self, at_ms: f64) -> i32 {
        // getTimezoneOffset is minutes *behind* UTC.
        let date = js_sys::Date::new(&JsValue::from_f64(at_ms));
        -(date.get_timezone_offset() as i32)
    }
}
