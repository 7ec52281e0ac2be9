//! Minimal TwiML rendering for call setup.
//!
//! Twilio fetches instructions for an incoming call from our webhook; the
//! only instruction this gateway ever issues is "open a media stream back to
//! us". There is no Twilio SDK to lean on here, so the document is rendered
//! directly.

/// Renders the TwiML that connects an incoming call to the media-stream
/// WebSocket endpoint on `host`.
pub fn connect_stream(host: &str) -> String {
    let url = format!("wss://{}/media-stream", host);
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><Response><Connect><Stream url="{}" /></Connect></Response>"#,
        escape(&url)
    )
}

/// Escapes the five XML-significant characters in an attribute value.
fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
