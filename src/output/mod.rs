use colored::Colorize;
use serde::Serialize;
use serde_json::Value;

use crate::binder::{ViewPhase, ViewState};
use crate::pages::{PageDescriptor, PageSize};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "text" | "txt" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct PageRecord {
    pub view: String,
    pub page_index: usize,
    pub page_count: usize,
    pub page_size: PageSize,
    pub total_count: u64,
    pub sort: Option<String>,
    pub sort_desc: Option<bool>,
    pub pages: Vec<PageDescriptor>,
    pub items: Vec<Value>,
}

pub fn build_record(
    view: &str,
    state: &ViewState,
    page_size: PageSize,
    sort: Option<&str>,
    sort_desc: Option<bool>,
) -> PageRecord {
    PageRecord {
        view: view.to_string(),
        page_index: state.current_page_index.unwrap_or(0),
        page_count: state.pages.len(),
        page_size,
        total_count: state.total_count,
        sort: sort.map(str::to_string),
        sort_desc,
        pages: state.pages.clone(),
        items: state.items.clone(),
    }
}

fn page_strip(pages: &[PageDescriptor]) -> String {
    pages
        .iter()
        .enumerate()
        .map(|(i, p)| {
            if p.active {
                format!("[{}]", i + 1)
            } else {
                format!("{}", i + 1)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn render_text(record: &PageRecord) -> Vec<u8> {
    let mut out = String::new();
    let first = record.pages.get(record.page_index).map(|p| p.start).unwrap_or(0);
    let shown = record.items.len() as u64;
    let range = if shown == 0 {
        "no items".to_string()
    } else {
        format!("items {}-{} of {}", first + 1, first + shown, record.total_count)
    };
    out.push_str(&format!(
        ":: {} :: page {}/{} :: {} :: size {}",
        record.view.bold(),
        record.page_index + 1,
        record.page_count,
        range,
        record.page_size
    ));
    if let Some(sort) = record.sort.as_deref() {
        let direction = if record.sort_desc.unwrap_or(false) {
            "desc"
        } else {
            "asc"
        };
        out.push_str(&format!(" :: sort {sort} {direction}"));
    }
    out.push('\n');
    if record.page_count > 1 {
        out.push_str(&format!(":: pages {}\n", page_strip(&record.pages)));
    }
    for item in record.items.iter() {
        out.push_str(&item.to_string());
        out.push('\n');
    }
    out.into_bytes()
}

pub fn render_json(record: &PageRecord) -> Vec<u8> {
    serde_json::to_vec_pretty(record).unwrap_or_else(|_| b"{}\n".to_vec())
}

pub fn render(record: &PageRecord, format: OutputFormat) -> Vec<u8> {
    match format {
        OutputFormat::Text => render_text(record),
        OutputFormat::Json => render_json(record),
    }
}

/// Message for a view that could not show its listing.
pub fn render_failure(phase: ViewPhase, state: &ViewState) -> String {
    match phase {
        ViewPhase::SessionExpired => format!(
            "{} the session has expired, sign in again",
            "session expired:".red().bold()
        ),
        _ => match state.error_detail.as_deref() {
            Some(detail) => format!("{}\n{}", "server error:".red().bold(), detail),
            None => format!("{} the listing could not be loaded", "error:".red().bold()),
        },
    }
}
