/// Content script: extract page metadata after load and on DOM changes
use std::rc::Rc;

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::{MutationObserver, MutationObserverInit};

use crate::bridge::{DocumentPage, RuntimeRelay, TimeoutScheduler};
use crate::extractor::debounce::{Debouncer, Scheduler};
use crate::extractor::{ContentExtractor, MUTATION_QUIET_MS, SETTLE_DELAY_MS, detect_platform};

pub fn run_content_script() -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("No window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("No document"))?;

    let page = Rc::new(DocumentPage::new(document.clone()));
    let extractor = Rc::new(ContentExtractor::new(Rc::new(RuntimeRelay)));
    let extract = move || {
        let page = page.clone();
        let extractor = extractor.clone();
        spawn_local(async move {
            extractor.run_once(page.as_ref()).await;
        });
    };

    // Unsupported pages are still observed: single-page apps can navigate
    // onto a supported URL without reloading the script.
    if let Some(href) = document.location().and_then(|l| l.href().ok()) {
        log::debug!("Content script on {} ({:?})", href, detect_platform(&href));
    }

    TimeoutScheduler
        .schedule(SETTLE_DELAY_MS, Box::new(extract.clone()))
        .map_err(|e| JsValue::from_str(&e))?;

    let debouncer = Debouncer::new(TimeoutScheduler, MUTATION_QUIET_MS, extract);
    let on_mutation = Closure::<dyn FnMut(js_sys::Array, MutationObserver)>::new(
        move |_records: js_sys::Array, _observer: MutationObserver| debouncer.trigger(),
    );

    let observer = MutationObserver::new(on_mutation.as_ref().unchecked_ref())?;
    let options = MutationObserverInit::new();
    options.set_child_list(true);
    options.set_subtree(true);
    if let Some(root) = document.document_element() {
        observer.observe_with_options(&root, &options)?;
    }
    on_mutation.forget();
    Ok(())
}
