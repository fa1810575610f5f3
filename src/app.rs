use anyhow::Result;
use chrono::{DateTime, Local};
use ratatui::layout::Rect;
use tokio::task::JoinHandle;

use crate::api::{
    ChatRequest, ChatResponse, DocubotClient, HealthResponse, Level, MAX_TOP_K, MIN_TOP_K,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Input,
    Level,
    TopK,
    Chat,
}

/// Backend status shown in the header, mirroring the request lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ready,
    Thinking,
    Error,
    KeyMissing,
}

#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    pub timestamp: DateTime<Local>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Bot,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub focus: Focus,
    pub status: Status,

    // Input state
    pub query_input: String,
    pub query_cursor: usize, // char position in query_input

    // Conversation state
    pub chat_messages: Vec<ChatMessage>,
    pub message_count: u64,
    pub query_loading: bool,
    pub chat_scroll: u16,
    pub chat_height: u16, // Height of chat area for scroll calculations
    pub chat_width: u16,  // Width of chat area for wrap calculations
    pub chat_area: Option<Rect>, // For mouse hit-testing (updated during render)

    // Request settings
    pub level: Level,
    pub top_k: u8,

    // Popups
    pub notice: Option<String>,
    pub show_clear_confirm: bool,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // In-flight work
    pub query_task: Option<JoinHandle<Result<ChatResponse>>>,
    pub health_task: Option<JoinHandle<Result<HealthResponse>>>,

    pub client: DocubotClient,
}

impl App {
    pub fn new(client: DocubotClient, level: Level, top_k: u8) -> Self {
        Self {
            should_quit: false,
            focus: Focus::Input,
            status: Status::Ready,

            query_input: String::new(),
            query_cursor: 0,

            chat_messages: Vec::new(),
            message_count: 0,
            query_loading: false,
            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            chat_area: None,

            level,
            top_k,

            notice: None,
            show_clear_confirm: false,

            animation_frame: 0,

            query_task: None,
            health_task: None,

            client,
        }
    }

    /// Fire the startup health check. The result lands via `poll_tasks`.
    pub fn start_health_check(&mut self) {
        let client = self.client.clone();
        self.health_task = Some(tokio::spawn(async move { client.health().await }));
    }

    /// Validate the input and move into the loading state. Returns the
    /// request to send, or None when the input is empty (a notice popup is
    /// raised) or another request is still in flight (silent no-op).
    pub fn accept_query(&mut self) -> Option<ChatRequest> {
        if self.query_loading || self.query_task.is_some() {
            return None;
        }

        let query = self.query_input.trim().to_string();
        if query.is_empty() {
            self.notice = Some("Please enter a question.".to_string());
            return None;
        }

        self.push_message(ChatRole::User, query.clone());
        self.query_input.clear();
        self.query_cursor = 0;
        self.focus = Focus::Input;
        self.query_loading = true;
        self.status = Status::Thinking;
        self.scroll_chat_to_bottom();

        Some(ChatRequest {
            query,
            level: self.level,
            top_k: self.top_k,
        })
    }

    pub fn push_message(&mut self, role: ChatRole, content: String) {
        self.chat_messages.push(ChatMessage {
            role,
            content,
            timestamp: Local::now(),
        });
        self.message_count += 1;
    }

    /// Reap finished background tasks. Called from the Tick event so a reply
    /// lands without waiting for user input.
    pub async fn poll_tasks(&mut self) {
        let query_done = self
            .query_task
            .as_ref()
            .map(|task| task.is_finished())
            .unwrap_or(false);
        if query_done {
            if let Some(task) = self.query_task.take() {
                let result = match task.await {
                    Ok(result) => result,
                    Err(e) => Err(anyhow::anyhow!("query task failed: {}", e)),
                };
                self.apply_chat_result(result);
            }
        }

        let health_done = self
            .health_task
            .as_ref()
            .map(|task| task.is_finished())
            .unwrap_or(false);
        if health_done {
            if let Some(task) = self.health_task.take() {
                let result = match task.await {
                    Ok(result) => result,
                    Err(e) => Err(anyhow::anyhow!("health task failed: {}", e)),
                };
                self.apply_health_result(result);
            }
        }
    }

    /// Classify a finished chat call and append the outcome to the
    /// transcript. Loading is cleared on every path before anything else.
    pub fn apply_chat_result(&mut self, result: Result<ChatResponse>) {
        self.query_loading = false;

        match result {
            Ok(reply) => {
                if let Some(error) = reply.error {
                    tracing::warn!("backend reported an error: {}", error);
                    self.push_message(ChatRole::Bot, format!("Error: {}", error));
                    self.status = Status::Error;
                } else if let Some(text) = reply.response {
                    tracing::info!("received answer ({} chars)", text.len());
                    self.push_message(ChatRole::Bot, text);
                    self.status = Status::Ready;
                } else {
                    tracing::warn!("reply carried neither response nor error");
                    self.push_message(ChatRole::Bot, "Unexpected response from server".to_string());
                    self.status = Status::Error;
                }
            }
            Err(e) => {
                tracing::error!("chat request failed: {}", e);
                self.push_message(ChatRole::Bot, format!("Connection error: {}", e));
                self.status = Status::Error;
            }
        }

        self.scroll_chat_to_bottom();
    }

    pub fn apply_health_result(&mut self, result: Result<HealthResponse>) {
        match result {
            Ok(health) => {
                if health.gemini_api_key_set {
                    self.status = Status::Ready;
                } else {
                    tracing::warn!("backend reports its API key is not set");
                    self.status = Status::KeyMissing;
                }
            }
            Err(e) => {
                tracing::error!("health check failed: {}", e);
                self.status = Status::Error;
            }
        }
    }

    /// Drop the transcript and restore the welcome panel. An in-flight
    /// request is not cancelled; its reply appends afterwards.
    pub fn clear_history(&mut self) {
        tracing::info!("clearing {} messages", self.chat_messages.len());
        self.chat_messages.clear();
        self.message_count = 0;
        self.chat_scroll = 0;
        self.status = Status::Ready;
        self.show_clear_confirm = false;
    }

    pub fn cycle_level_next(&mut self) {
        self.level = self.level.next();
    }

    pub fn cycle_level_prev(&mut self) {
        self.level = self.level.prev();
    }

    pub fn top_k_up(&mut self) {
        if self.top_k < MAX_TOP_K {
            self.top_k += 1;
        }
    }

    pub fn top_k_down(&mut self) {
        if self.top_k > MIN_TOP_K {
            self.top_k -= 1;
        }
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.query_loading {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn scroll_chat_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    pub fn scroll_chat_down(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_add(lines);
    }

    /// Scroll so the newest message (or the "Thinking..." line) is visible.
    pub fn scroll_chat_to_bottom(&mut self) {
        // Use actual chat width for wrap calculation, default to 60 if not set
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            60
        };

        let mut total_lines: u16 = 0;

        for msg in &self.chat_messages {
            total_lines += 1; // Role line ("You:" or "Docubot:")
            for line in msg.content.lines() {
                // Use character count, not byte length, for proper UTF-8 handling
                let char_count = line.chars().count();
                if char_count == 0 {
                    total_lines += 1;
                } else {
                    total_lines += ((char_count / wrap_width) + 1) as u16;
                }
            }
            total_lines += 2; // Timestamp line + blank line after message
        }

        if self.query_loading {
            total_lines += 2; // "Docubot:" + "Thinking..."
        }

        let visible_height = if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        };

        self.chat_scroll = total_lines.saturating_sub(visible_height);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    fn test_app() -> App {
        App::new(
            DocubotClient::new("http://127.0.0.1:5000"),
            Level::Beginner,
            3,
        )
    }

    #[test]
    fn test_blank_input_is_rejected_with_notice() {
        let mut app = test_app();
        app.query_input = "   \t ".to_string();

        assert!(app.accept_query().is_none());
        assert!(app.chat_messages.is_empty());
        assert!(!app.query_loading);
        assert!(app.notice.is_some());
    }

    #[test]
    fn test_accept_query_trims_and_enters_loading() {
        let mut app = test_app();
        app.query_input = "  What is Ceph?  ".to_string();
        app.query_cursor = 5;

        let request = app.accept_query().expect("query accepted");
        assert_eq!(request.query, "What is Ceph?");
        assert_eq!(request.top_k, 3);

        assert_eq!(app.chat_messages.len(), 1);
        assert_eq!(app.chat_messages[0].role, ChatRole::User);
        assert_eq!(app.chat_messages[0].content, "What is Ceph?");
        assert!(app.query_loading);
        assert_eq!(app.status, Status::Thinking);
        assert!(app.query_input.is_empty());
        assert_eq!(app.query_cursor, 0);
    }

    #[test]
    fn test_submit_while_loading_is_silent_noop() {
        let mut app = test_app();
        app.query_input = "first".to_string();
        assert!(app.accept_query().is_some());

        app.query_input = "second".to_string();
        assert!(app.accept_query().is_none());
        assert_eq!(app.chat_messages.len(), 1);
        assert!(app.notice.is_none());
    }

    #[tokio::test]
    async fn test_submit_with_task_in_flight_is_noop() {
        let mut app = test_app();
        app.query_task = Some(tokio::spawn(async {
            std::future::pending::<()>().await;
            Ok(ChatResponse::default())
        }));

        app.query_input = "hello".to_string();
        assert!(app.accept_query().is_none());
        assert!(app.chat_messages.is_empty());

        app.query_task.take().unwrap().abort();
    }

    #[test]
    fn test_response_text_appends_bot_message() {
        let mut app = test_app();
        app.query_loading = true;

        app.apply_chat_result(Ok(ChatResponse {
            response: Some("hi".to_string()),
            error: None,
        }));

        assert_eq!(app.chat_messages.len(), 1);
        assert_eq!(app.chat_messages[0].role, ChatRole::Bot);
        assert_eq!(app.chat_messages[0].content, "hi");
        assert_eq!(app.status, Status::Ready);
        assert!(!app.query_loading);
    }

    #[test]
    fn test_error_field_wins_even_with_response_text() {
        let mut app = test_app();
        app.query_loading = true;

        app.apply_chat_result(Ok(ChatResponse {
            response: Some("partial".to_string()),
            error: Some("bad".to_string()),
        }));

        assert_eq!(app.chat_messages.len(), 1);
        assert!(app.chat_messages[0].content.contains("bad"));
        assert_eq!(app.status, Status::Error);
        assert!(!app.query_loading);
    }

    #[test]
    fn test_empty_body_renders_unexpected_response() {
        let mut app = test_app();
        app.query_loading = true;

        app.apply_chat_result(Ok(ChatResponse::default()));

        assert_eq!(app.chat_messages.len(), 1);
        assert!(app.chat_messages[0].content.contains("Unexpected response"));
        assert_eq!(app.status, Status::Error);
    }

    #[test]
    fn test_transport_failure_renders_connection_error() {
        let mut app = test_app();
        app.query_loading = true;

        app.apply_chat_result(Err(anyhow!("connection refused")));

        assert_eq!(app.chat_messages.len(), 1);
        assert!(app.chat_messages[0].content.contains("connection refused"));
        assert!(app.chat_messages[0].content.starts_with("Connection error"));
        assert_eq!(app.status, Status::Error);
        assert!(!app.query_loading);
    }

    #[test]
    fn test_clear_history_restores_welcome_state() {
        let mut app = test_app();
        for i in 0..4 {
            app.push_message(ChatRole::User, format!("message {}", i));
        }
        app.chat_scroll = 12;
        app.status = Status::Error;

        app.clear_history();

        assert!(app.chat_messages.is_empty());
        assert_eq!(app.message_count, 0);
        assert_eq!(app.chat_scroll, 0);
        assert_eq!(app.status, Status::Ready);
    }

    #[test]
    fn test_top_k_stays_within_bounds() {
        let mut app = test_app();
        app.top_k = MAX_TOP_K;
        app.top_k_up();
        assert_eq!(app.top_k, MAX_TOP_K);

        app.top_k = MIN_TOP_K;
        app.top_k_down();
        assert_eq!(app.top_k, MIN_TOP_K);
    }

    #[test]
    fn test_health_reply_drives_status() {
        let mut app = test_app();

        app.apply_health_result(Ok(HealthResponse {
            gemini_api_key_set: false,
        }));
        assert_eq!(app.status, Status::KeyMissing);

        app.apply_health_result(Ok(HealthResponse {
            gemini_api_key_set: true,
        }));
        assert_eq!(app.status, Status::Ready);

        app.apply_health_result(Err(anyhow!("no route to host")));
        assert_eq!(app.status, Status::Error);
    }

    #[test]
    fn test_animation_only_advances_while_loading() {
        let mut app = test_app();
        app.tick_animation();
        assert_eq!(app.animation_frame, 0);

        app.query_loading = true;
        app.tick_animation();
        assert_eq!(app.animation_frame, 1);
    }
}
