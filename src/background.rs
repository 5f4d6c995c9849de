/// Background context: owns the metadata relay and answers relay messages
use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::prelude::*;

use crate::bridge::{add_message_listener, from_js, to_js};
use crate::relay::{MetadataRelay, handle_raw_message};

/// Register the message listener. The relay lives as long as the listener,
/// which is the lifetime of the background context.
pub fn run_background() {
    let relay = Rc::new(RefCell::new(MetadataRelay::new()));

    let listener = Closure::<dyn FnMut(JsValue, JsValue, js_sys::Function) -> bool>::new(
        move |message: JsValue, _sender: JsValue, send_response: js_sys::Function| {
            let raw = match from_js::<serde_json::Value>(message) {
                Ok(raw) => raw,
                Err(e) => {
                    log::debug!("Ignoring message: {}", e);
                    return false;
                }
            };

            let reply = handle_raw_message(&mut relay.borrow_mut(), raw);
            match to_js(&reply) {
                Ok(reply_js) => {
                    if let Err(e) = send_response.call1(&JsValue::NULL, &reply_js) {
                        log::warn!("Failed to answer relay message: {:?}", e);
                    }
                }
                Err(e) => log::error!("{}", e),
            }
            // Answered synchronously; the channel can close.
            false
        },
    );

    add_message_listener(&listener);
    listener.forget();
    log::info!("Metadata relay listening");
}
