//! Server-side HTML for the landing page
//!
//! The page is rendered from a `PageSnapshot` with maud, which escapes every
//! interpolated value. A small inline script posts widget actions to the
//! session API and swaps in a fresh fragment, polling while any widget is
//! still animating.

use crate::domain::content::{CHAT_PROMPTS, LECTURE_VIDEOS, SUBSCRIBE_THANKS};
use crate::domain::types::{ActiveTab, ChatRole, ScreenMode, TagCard};
use crate::services::page::{FormSnapshot, PageSnapshot};
use crate::services::voice_demo::VoicePhase;
use chrono::{DateTime, Local};
use maud::{html, Markup, PreEscaped, DOCTYPE};
use uuid::Uuid;

/// Fragment refresh interval while something is animating (ms)
const POLL_INTERVAL_MS: u64 = 100;

/// Status-bar clock in the phone mockup
fn clock_label(now: &DateTime<Local>) -> String {
    now.format("%H:%M").to_string()
}

fn card_label(card: TagCard) -> &'static str {
    match card {
        TagCard::Feeding => "수유",
        TagCard::Diaper => "기저귀",
    }
}

fn voice_status(phase: VoicePhase) -> &'static str {
    match phase {
        VoicePhase::Idle => "버튼을 눌러 말해 보세요",
        VoicePhase::Recording => "듣고 있어요...",
        VoicePhase::Typing => "받아쓰는 중...",
        VoicePhase::Response => "기록했어요",
        VoicePhase::Syncing => "가족과 동기화 중...",
        VoicePhase::Synced => "동기화 완료",
    }
}

/// Full HTML document for one session
pub fn render_page(session: Uuid, snap: &PageSnapshot) -> String {
    let markup = html! {
        (DOCTYPE)
        html lang="ko" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { "V.O.M - 아기 돌봄 기록" }
                style { (PreEscaped(STYLE)) }
            }
            body {
                main id="app" data-session=(session.to_string()) {
                    (fragment(session, snap, &Local::now()))
                }
                script {
                    (PreEscaped(format!("const POLL_MS = {POLL_INTERVAL_MS};")))
                    (PreEscaped(SCRIPT))
                }
            }
        }
    };
    markup.into_string()
}

/// App body, swapped in place by the page script
pub fn render_fragment(session: Uuid, snap: &PageSnapshot, now: &DateTime<Local>) -> String {
    fragment(session, snap, now).into_string()
}

fn fragment(session: Uuid, snap: &PageSnapshot, now: &DateTime<Local>) -> Markup {
    html! {
        div class="landing" data-session=(session.to_string()) data-animating=(if snap.animating { "true" } else { "false" }) {
            header class="hero" {
                h1 { "V.O.M" }
                p { "말하고, 태그하면 기록 끝. 온 가족이 함께 보는 육아 기록" }
            }
            (mockup(snap, now))
            (voice(snap))
            (chat(snap))
            (videos(snap))
            (subscribe(&snap.form))
        }
    }
}

fn mockup(snap: &PageSnapshot, now: &DateTime<Local>) -> Markup {
    html! {
        section class="tagging" {
            @for card in TagCard::ALL {
                @let class = if snap.tagging == Some(card) {
                    format!("tag-card {} tagging", card.as_str())
                } else {
                    format!("tag-card {}", card.as_str())
                };
                @let bloom = match card {
                    TagCard::Feeding => snap.bloom_feeding,
                    TagCard::Diaper => snap.bloom_diaper,
                };
                button class=(class) data-action={ "tag/" (card.as_str()) } data-bloom=(bloom)
                    disabled[snap.tagging.is_some()] {
                    (card_label(card)) " 카드 태그"
                }
            }
            div class={ "phone screen-" (snap.screen_mode.as_str()) } {
                div class="status-bar" { (clock_label(now)) }
                @if snap.screen_mode.is_on() {
                    div class="record" {
                        h2 {
                            @if snap.screen_mode == ScreenMode::Feeding { "수유 기록" } @else { "기저귀 기록" }
                        }
                        nav class="tabs" {
                            @for tab in ActiveTab::ALL {
                                button class=(if tab == snap.active_tab { "tab active" } else { "tab" })
                                    data-action={ "tab/" (tab.as_str()) } {
                                    (tab.label())
                                }
                            }
                        }
                        button class="save" data-action="screen/off" { "저장" }
                    }
                } @else {
                    div class="screen-off" { "카드를 태그해 보세요" }
                }
            }
        }
    }
}

fn voice(snap: &PageSnapshot) -> Markup {
    let voice = &snap.voice;
    html! {
        section class={ "voice phase-" (voice.phase.as_str()) } {
            h2 { "음성으로 기록" }
            button class="mic" data-action="voice" disabled[voice.phase != VoicePhase::Idle] { "🎙" }
            p class="voice-status" { (voice_status(voice.phase)) }
            @if !voice.transcript.is_empty() {
                p class="transcript" { "\u{201c}" (voice.transcript) "\u{201d}" }
            }
            @if let Some(response) = &voice.response {
                p class="voice-response" { (response) }
            }
        }
    }
}

fn chat(snap: &PageSnapshot) -> Markup {
    html! {
        section class="chat" {
            h2 { "AI 육아 상담" }
            ul class="messages" {
                @for message in &snap.chat.messages {
                    @let role = match message.role {
                        ChatRole::User => "user",
                        ChatRole::Ai => "ai",
                    };
                    @if message.is_typing {
                        li class={ (role) " typing" } { span {} span {} span {} }
                    } @else {
                        li class=(role) { (message.text) }
                    }
                }
            }
            div class="prompts" {
                @for prompt in &CHAT_PROMPTS {
                    button class="prompt" data-chat=(prompt.question) { (prompt.question) }
                }
            }
            form class="chat-form" {
                input name="text" maxlength="500" placeholder="메시지를 입력하세요" autocomplete="off";
                button type="submit" { "보내기" }
            }
        }
    }
}

fn videos(snap: &PageSnapshot) -> Markup {
    let video = &snap.video;
    let toggle_action = if video.is_playing {
        "video/pause".to_string()
    } else {
        format!("video/{}/play", video.current_video)
    };

    html! {
        section class="lectures" {
            h2 { "1분 육아 강의" }
            div class="carousel" {
                @for (i, lecture) in LECTURE_VIDEOS.iter().enumerate().take(video.video_count) {
                    @let current = i == video.current_video;
                    div class=(if current { "video current" } else { "video" })
                        style={ "background:" (lecture.color) }
                        data-action={ "video/" (i) "/play" } {
                        strong { (lecture.title) }
                        span { (lecture.duration) }
                        @if current {
                            div class="progress" {
                                div class="bar" style={ "width:" (video.progress) "%" } {}
                            }
                        }
                    }
                }
            }
            div class="controls" {
                button data-action="video/prev" disabled[video.current_video == 0] { "이전" }
                button data-action=(toggle_action) {
                    @if video.is_playing { "일시정지" } @else { "재생" }
                }
                button data-action="video/next" disabled[video.current_video + 1 >= video.video_count] { "다음" }
            }
        }
    }
}

fn subscribe(form: &FormSnapshot) -> Markup {
    html! {
        section class="subscribe" {
            h2 { "출시 소식 받기" }
            form class="subscribe-form" {
                input type="email" name="email" required placeholder="이메일 주소";
                button type="submit" disabled[form.is_loading] {
                    @if form.is_loading { "전송 중..." } @else { "구독하기" }
                }
            }
            @if form.submitted {
                p class="notice ok" { (SUBSCRIBE_THANKS) }
            } @else if let Some(error) = &form.error {
                p class="notice error" { (error) }
            }
        }
    }
}

const STYLE: &str = r#"
body{margin:0;font-family:system-ui,sans-serif;background:#FFF8F3;color:#3D2C24}
.landing{max-width:720px;margin:0 auto;padding:24px}
section{margin:32px 0;padding:20px;border-radius:20px;background:#fff}
.phone{margin-top:16px;border-radius:28px;min-height:220px;background:#222;color:#fff;padding:16px;transition:background .4s}
.phone.screen-feeding{background:#FFE4D6;color:#3D2C24}
.phone.screen-diaper{background:#E6F0FF;color:#3D2C24}
.tag-card.tagging{transform:scale(1.08);box-shadow:0 0 24px #FFB38A}
.tab.active{font-weight:700;border-bottom:2px solid currentColor}
.messages{list-style:none;padding:0}
.messages .user{text-align:right}
.messages .typing span{display:inline-block;width:6px;height:6px;margin:0 2px;border-radius:50%;background:#bbb}
.carousel{display:flex;gap:8px;overflow-x:auto}
.video{min-width:140px;padding:12px;border-radius:12px;cursor:pointer}
.video.current{outline:2px solid #FF8A5B}
.progress{height:4px;background:#eee;margin-top:8px}
.progress .bar{height:100%;background:#FF8A5B}
.notice.error{color:#C0392B}
"#;

const SCRIPT: &str = r#"
const app = document.getElementById('app');
const base = '/api/s/' + app.dataset.session + '/';
let timer = null;
async function refresh() {
  const res = await fetch('/s/' + app.dataset.session + '/fragment');
  if (res.status === 404) { location.href = '/'; return; }
  app.innerHTML = await res.text();
  schedule();
}
function schedule() {
  clearTimeout(timer);
  const root = app.firstElementChild;
  if (root && root.dataset.animating === 'true') timer = setTimeout(refresh, POLL_MS);
}
async function post(path, body) {
  await fetch(base + path, {
    method: 'POST',
    headers: body ? {'Content-Type': 'application/json'} : {},
    body: body ? JSON.stringify(body) : undefined,
  });
  refresh();
}
app.addEventListener('click', (e) => {
  const el = e.target.closest('[data-action],[data-chat]');
  if (!el || el.disabled) return;
  if (el.dataset.chat) post('chat', {text: el.dataset.chat});
  else post(el.dataset.action);
});
app.addEventListener('submit', (e) => {
  e.preventDefault();
  const form = e.target;
  if (form.classList.contains('chat-form')) {
    const text = form.text.value;
    form.text.value = '';
    post('chat', {text});
  } else if (form.classList.contains('subscribe-form')) {
    post('subscribe', {email: form.email.value});
  }
});
window.addEventListener('pagehide', () => {
  fetch(base.slice(0, -1), {method: 'DELETE', keepalive: true});
});
schedule();
"#;
