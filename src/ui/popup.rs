/// Popup UI: sync controls, settings and the history chat

use std::rc::Rc;

use patternfly_yew::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::{HtmlInputElement, KeyboardEvent};
use yew::prelude::*;

use crate::bridge::{BrowserClock, ChromeHistory, ChromeStorage, FetchBackend, RuntimeRelay};
use crate::chat::{ChatEntry, ChatSession, Role, Transcript};
use crate::storage::Settings;
use crate::sync::{SyncMode, SyncObserver, SyncOrchestrator, SyncPorts};
use crate::ui::components::{ChatBubble, LastSync};

#[derive(Clone, PartialEq)]
enum AppState {
    Idle,
    Loading(String),
    Notice(String),
    Error(String),
}

/// Routes sync status into the popup's state hooks.
struct PopupObserver {
    state: UseStateHandle<AppState>,
    busy: UseStateHandle<bool>,
}

impl SyncObserver for PopupObserver {
    fn set_busy(&self, busy: bool) {
        self.busy.set(busy);
    }

    fn progress(&self, message: &str) {
        self.state.set(AppState::Loading(message.to_string()));
    }

    fn notice(&self, message: &str) {
        self.state.set(AppState::Notice(message.to_string()));
    }

    fn failure(&self, message: &str) {
        self.state.set(AppState::Error(message.to_string()));
    }
}

#[derive(Clone, Copy, PartialEq)]
enum SettingsField {
    ApiBase,
    SyncDays,
    MaxItems,
}

#[function_component(App)]
pub fn app() -> Html {
    let state = use_state(|| AppState::Idle);
    let busy = use_state(|| false);
    let last_sync = use_state(|| None::<f64>);
    let transcript = use_state(Vec::<ChatEntry>::new);
    let question = use_state(String::new);
    let asking = use_state(|| false);
    let settings = use_state(Settings::default);
    let show_settings = use_state(|| false);

    let orchestrator = {
        let state = state.clone();
        let busy = busy.clone();
        use_memo((), move |_| {
            SyncOrchestrator::new(SyncPorts {
                history: Rc::new(ChromeHistory),
                relay: Rc::new(RuntimeRelay),
                backend: Rc::new(FetchBackend),
                store: Rc::new(ChromeStorage),
                clock: Rc::new(BrowserClock),
                observer: Rc::new(PopupObserver { state, busy }),
            })
        })
    };
    let chat = use_memo((), |_| {
        ChatSession::new(Rc::new(FetchBackend), Rc::new(ChromeStorage), Rc::new(BrowserClock))
    });

    // Load persisted state, then refresh quietly in the background
    {
        let orchestrator = orchestrator.clone();
        let last_sync = last_sync.clone();
        let transcript = transcript.clone();
        let settings = settings.clone();
        use_effect_with((), move |_| {
            spawn_local(async move {
                settings.set(Settings::load(&ChromeStorage).await);
                transcript.set(Transcript::load(&ChromeStorage).await.entries().to_vec());
                last_sync.set(orchestrator.last_sync().await);

                orchestrator.sync_on_startup().await;
                last_sync.set(orchestrator.last_sync().await);
            });
            || ()
        });
    }

    let on_sync = {
        let orchestrator = orchestrator.clone();
        let last_sync = last_sync.clone();
        Callback::from(move |_| {
            let orchestrator = orchestrator.clone();
            let last_sync = last_sync.clone();
            spawn_local(async move {
                orchestrator.sync(SyncMode::Interactive).await;
                last_sync.set(orchestrator.last_sync().await);
            });
        })
    };

    let ask = {
        let chat = chat.clone();
        let question = question.clone();
        let asking = asking.clone();
        let transcript = transcript.clone();
        let state = state.clone();
        Callback::from(move |_: ()| {
            let message = (*question).trim().to_string();
            if message.is_empty() || *asking {
                return;
            }
            question.set(String::new());
            asking.set(true);

            // Show the question right away; the stored transcript replaces it.
            let mut pending = (*transcript).clone();
            pending.push(ChatEntry {
                role: Role::User,
                text: message.clone(),
                sources: Vec::new(),
                timestamp: js_sys::Date::now(),
            });
            transcript.set(pending);

            let chat = chat.clone();
            let asking = asking.clone();
            let transcript = transcript.clone();
            let state = state.clone();
            spawn_local(async move {
                if let Err(e) = chat.ask(&message).await {
                    log::error!("Chat failed: {}", e);
                    state.set(AppState::Error(format!("Chat failed: {}", e)));
                }
                transcript.set(Transcript::load(&ChromeStorage).await.entries().to_vec());
                asking.set(false);
            });
        })
    };

    let on_question_input = {
        let question = question.clone();
        Callback::from(move |e: InputEvent| {
            if let Some(input) = e.target_dyn_into::<HtmlInputElement>() {
                question.set(input.value());
            }
        })
    };

    let on_question_key = {
        let ask = ask.clone();
        Callback::from(move |e: KeyboardEvent| {
            if e.key() == "Enter" {
                ask.emit(());
            }
        })
    };

    let on_ask_click = {
        let ask = ask.clone();
        Callback::from(move |_| ask.emit(()))
    };

    let on_toggle_settings = {
        let show_settings = show_settings.clone();
        Callback::from(move |_| show_settings.set(!*show_settings))
    };

    let on_settings_input = {
        let settings = settings.clone();
        move |field: SettingsField| {
            let settings = settings.clone();
            Callback::from(move |e: InputEvent| {
                let Some(input) = e.target_dyn_into::<HtmlInputElement>() else {
                    return;
                };
                let value = input.value();
                let mut updated = (*settings).clone();
                match field {
                    SettingsField::ApiBase => updated.api_base = value,
                    SettingsField::SyncDays => {
                        updated.sync_days = value.trim().parse().unwrap_or(updated.sync_days)
                    }
                    SettingsField::MaxItems => {
                        updated.max_items = value.trim().parse().unwrap_or(updated.max_items)
                    }
                }
                settings.set(updated);
            })
        }
    };

    let on_save_settings = {
        let settings = settings.clone();
        let state = state.clone();
        let show_settings = show_settings.clone();
        Callback::from(move |_| {
            let normalized = settings.normalized();
            settings.set(normalized.clone());
            show_settings.set(false);

            let state = state.clone();
            spawn_local(async move {
                match normalized.save(&ChromeStorage).await {
                    Ok(()) => state.set(AppState::Notice("Settings saved".to_string())),
                    Err(e) => state.set(AppState::Error(format!("Failed to save settings: {}", e))),
                }
            });
        })
    };

    html! {
        <div class="padding-20">
            <h1 class="popup-title">{"History Recall"}</h1>

            <div class="flex-column-gap">
                <Button onclick={on_sync} disabled={*busy} variant={ButtonVariant::Primary} block={true}>
                    {if *busy { "Syncing..." } else { "Sync History" }}
                </Button>
                <LastSync timestamp={*last_sync} />
            </div>

            // Status display
            {match &*state {
                AppState::Loading(msg) => html! {
                    <div class="loading-text-center">
                        <Spinner />
                        <p class="loading-text">{msg}</p>
                    </div>
                },
                AppState::Notice(msg) => html! {
                    <div class="message-top-margin">
                        <Alert r#type={AlertType::Success} title={msg.clone()} inline={true}>
                        </Alert>
                    </div>
                },
                AppState::Error(err) => html! {
                    <div class="message-top-margin">
                        <Alert r#type={AlertType::Danger} title={"Error"} inline={true}>
                            {err.clone()}
                        </Alert>
                    </div>
                },
                AppState::Idle => html! {}
            }}

            <div class="chat-transcript">
                {for transcript.iter().map(|entry| html! {
                    <ChatBubble entry={entry.clone()} />
                })}
                if *asking {
                    <Spinner />
                }
            </div>

            <div class="chat-input-row">
                <input
                    type="text"
                    placeholder="Ask about your browsing history..."
                    value={(*question).clone()}
                    oninput={on_question_input}
                    onkeydown={on_question_key}
                    class="chat-input"
                />
                <Button onclick={on_ask_click} disabled={*asking} variant={ButtonVariant::Secondary}>
                    {"Ask"}
                </Button>
            </div>

            <Button onclick={on_toggle_settings} variant={ButtonVariant::Link}>
                {"Settings"}
            </Button>
            if *show_settings {
                <div class="settings-panel flex-column-gap">
                    <label class="settings-label">{"Backend URL"}
                        <input
                            type="text"
                            value={settings.api_base.clone()}
                            oninput={on_settings_input(SettingsField::ApiBase)}
                            class="settings-input"
                        />
                    </label>
                    <label class="settings-label">{"Days of history (1-365)"}
                        <input
                            type="number"
                            value={settings.sync_days.to_string()}
                            oninput={on_settings_input(SettingsField::SyncDays)}
                            class="settings-input"
                        />
                    </label>
                    <label class="settings-label">{"Max items per sync (100-10000)"}
                        <input
                            type="number"
                            value={settings.max_items.to_string()}
                            oninput={on_settings_input(SettingsField::MaxItems)}
                            class="settings-input"
                        />
                    </label>
                    <Button onclick={on_save_settings} variant={ButtonVariant::Secondary} block={true}>
                        {"Save Settings"}
                    </Button>
                </div>
            }

            <p class="footer-popup">
                {"History Recall v0.1.0"}
            </p>
        </div>
    }
}
