//! Record body processing

/// Decode HTML entities in the stored body (`&amp;` → `&`, `&#8217;` → `’`).
///
/// Markup itself is kept; Hugo renders inline HTML in Markdown content.
pub fn process_body(raw: &str) -> String {
    html_escape::decode_html_entities(raw).into_owned()
}

/// Full artifact text: header, blank line, body
pub fn compose_artifact(header: &str, body: &str) -> String {
    let mut artifact = String::with_capacity(header.len() + body.len() + 1);
    artifact.push_str(header);
    artifact.push('\n');
    artifact.push_str(body);
    artifact
}
