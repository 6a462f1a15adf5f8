use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use crate::models::RequestType;

/// Facts the confirmation message is rendered from.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderReceivedNotice {
    pub order_id: Uuid,
    pub order_code: String,
    pub customer_email: String,
    pub customer_name: Option<String>,
    pub request_type: RequestType,
    pub filenames: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedEmail {
    pub to: String,
    pub from: String,
    pub subject: String,
    pub html_body: String,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn order_received(&self, notice: &OrderReceivedNotice) -> anyhow::Result<()>;
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn render_order_received(notice: &OrderReceivedNotice, from: &str) -> RenderedEmail {
    let subject = format!(
        "{} Request Received - {}",
        notice.request_type, notice.order_code
    );
    let greeting = notice
        .customer_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or("Valued Customer");

    let mut html_body = format!(
        "<h1>Thank you, {}!</h1>\
         <p>We received your {} request. Your order reference is <strong>{}</strong>.</p>",
        escape_html(greeting),
        notice.request_type.as_str().to_lowercase(),
        escape_html(&notice.order_code),
    );
    if !notice.filenames.is_empty() {
        html_body.push_str("<p>Files received:</p><ul>");
        for name in &notice.filenames {
            html_body.push_str(&format!("<li>{}</li>", escape_html(name)));
        }
        html_body.push_str("</ul>");
    }
    html_body.push_str("<p>Use your order reference to check status at any time.</p>");

    RenderedEmail {
        to: notice.customer_email.clone(),
        from: from.to_string(),
        subject,
        html_body,
    }
}

/// Writes the rendered confirmation to the log instead of a mail provider.
pub struct LogNotifier {
    from: String,
}

impl LogNotifier {
    pub fn new(from: impl Into<String>) -> Self {
        Self { from: from.into() }
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn order_received(&self, notice: &OrderReceivedNotice) -> anyhow::Result<()> {
        let email = render_order_received(notice, &self.from);
        let message_id = format!("log_email_{}", Uuid::new_v4());
        info!(
            to = %email.to,
            from = %email.from,
            subject = %email.subject,
            message_id = %message_id,
            "order confirmation email"
        );
        Ok(())
    }
}

/// Keeps every notice it is given; can be told to fail.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<OrderReceivedNotice>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub async fn sent(&self) -> Vec<OrderReceivedNotice> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn order_received(&self, notice: &OrderReceivedNotice) -> anyhow::Result<()> {
        if self.fail {
            anyhow::bail!("mail provider unavailable");
        }
        self.sent.lock().await.push(notice.clone());
        Ok(())
    }
}
