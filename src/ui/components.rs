/// Reusable UI components

use yew::prelude::*;

use crate::api::Source;
use crate::chat::{AnswerSegment, ChatEntry, Role, cite_segments};

#[derive(Properties, PartialEq)]
pub struct ChatBubbleProps {
    pub entry: ChatEntry,
}

/// One transcript entry. Assistant answers get clickable `[n]` citations
/// and a numbered source list.
#[function_component(ChatBubble)]
pub fn chat_bubble(props: &ChatBubbleProps) -> Html {
    let entry = &props.entry;

    match entry.role {
        Role::User => html! {
            <div class="chat-bubble chat-bubble-user">
                <p class="chat-text">{&entry.text}</p>
            </div>
        },
        Role::Assistant => html! {
            <div class="chat-bubble chat-bubble-assistant">
                <p class="chat-text">
                    {for cite_segments(&entry.text, &entry.sources).into_iter().map(render_segment)}
                </p>
                if !entry.sources.is_empty() {
                    <SourceList sources={entry.sources.clone()} />
                }
            </div>
        },
    }
}

fn render_segment(segment: AnswerSegment) -> Html {
    match segment {
        AnswerSegment::Text(text) => html! { {text} },
        AnswerSegment::Citation { number, source } => html! {
            <a
                class="citation"
                href={source.url.clone()}
                target="_blank"
                title={source.title.clone().unwrap_or_else(|| source.url.clone())}
            >
                {format!("[{}]", number)}
            </a>
        },
    }
}

#[derive(Properties, PartialEq)]
pub struct SourceListProps {
    pub sources: Vec<Source>,
}

#[function_component(SourceList)]
pub fn source_list(props: &SourceListProps) -> Html {
    html! {
        <ol class="source-list">
            {for props.sources.iter().map(|source| html! {
                <li class="source-item">
                    <a href={source.url.clone()} target="_blank">
                        {source.title.clone().filter(|t| !t.is_empty()).unwrap_or_else(|| source.url.clone())}
                    </a>
                    if let Some(meta) = source.meta.clone().filter(|m| !m.is_empty()) {
                        <span class="source-meta">{meta}</span>
                    }
                </li>
            })}
        </ol>
    }
}

#[derive(Properties, PartialEq)]
pub struct LastSyncProps {
    pub timestamp: Option<f64>,
}

#[function_component(LastSync)]
pub fn last_sync(props: &LastSyncProps) -> Html {
    let text = match props.timestamp {
        Some(timestamp) => {
            let date = js_sys::Date::new(&wasm_bindgen::JsValue::from_f64(timestamp));
            format!(
                "Last synced {:04}-{:02}-{:02} {:02}:{:02}",
                date.get_full_year(),
                date.get_month() + 1,
                date.get_date(),
                date.get_hours(),
                date.get_minutes()
            )
        }
        None => "Never synced".to_string(),
    };

    html! { <p class="last-sync">{text}</p> }
}
