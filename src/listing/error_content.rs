use std::sync::OnceLock;

use regex::{NoExpand, Regex};

fn page_content_open() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?is)<([a-z][a-z0-9]*)\b[^>]*\bid\s*=\s*["']page-content["'][^>]*>"#).ok()
    })
    .as_ref()
}

fn back_url_param() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"back-url=[^&"'\s<>]*"#).ok())
        .as_ref()
}

pub(crate) fn percent_encode_component(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for b in input.as_bytes() {
        match *b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(*b as char)
            }
            _ => out.push_str(&format!("%{:02X}", b)),
        }
    }
    out
}

/// Inner HTML of the element with `id="page-content"`, if the page has one.
pub fn extract_page_content(html: &str) -> Option<String> {
    let open = page_content_open()?.captures(html)?;
    let whole = open.get(0)?;
    let tag = open.get(1)?.as_str();
    let content_start = whole.end();

    let nested = Regex::new(&format!(r"(?i)<(/?){}\b[^>]*?(/?)>", regex::escape(tag))).ok()?;
    let mut depth = 1usize;
    for m in nested.captures_iter(&html[content_start..]) {
        let closing = m.get(1).is_some_and(|c| !c.as_str().is_empty());
        let self_closing = m.get(2).is_some_and(|c| !c.as_str().is_empty());
        if closing {
            depth -= 1;
            if depth == 0 {
                let end = content_start + m.get(0)?.start();
                return Some(html[content_start..end].trim().to_string());
            }
        } else if !self_closing {
            depth += 1;
        }
    }
    Some(html[content_start..].trim().to_string())
}

/// Points every embedded `back-url` parameter at `current_url`.
pub fn rewrite_back_url(html: &str, current_url: &str) -> String {
    let Some(re) = back_url_param() else {
        return html.to_string();
    };
    let replacement = format!("back-url={}", percent_encode_component(current_url));
    re.replace_all(html, NoExpand(&replacement)).into_owned()
}

/// Error fragment shown in place of a listing after a server error.
pub fn error_content(body: &str, current_url: Option<&str>) -> String {
    let content = extract_page_content(body).unwrap_or_else(|| body.trim().to_string());
    match current_url {
        Some(url) => rewrite_back_url(&content, url),
        None => content,
    }
}
