use forum_view_core::{Notice, View, ViewItem, ViewState};
use std::fmt::Write;

pub fn render_view(view: &View<'_>, notice: Option<&Notice>) -> String {
    let mut out = String::new();

    if let Some(notice) = notice {
        let _ = writeln!(
            out,
            "! {} failed at {}: {}",
            notice.operation,
            notice.at.format("%H:%M:%S"),
            notice.message
        );
    }

    if !view.summary.is_empty() {
        let _ = writeln!(out, "AI Response:\n{}\n", view.summary);
    }

    let heading = match view.state {
        ViewState::AllDocuments => "Documents",
        ViewState::SearchResults => "Search results",
    };
    let _ = writeln!(out, "{heading}:");

    if view.is_empty() {
        let _ = writeln!(out, "  No uploads yet.");
        return out;
    }

    let mut document_index = 0usize;
    for item in view.items() {
        match item {
            ViewItem::Text(entry) => {
                let _ = writeln!(out, "  - {}", entry.as_str());
            }
            ViewItem::Document(document) => {
                let name = if document.file_name.is_empty() {
                    "(unnamed)"
                } else {
                    document.file_name.as_str()
                };
                let _ = writeln!(out, "  [{document_index}] {name}");
                document_index += 1;
            }
        }
    }

    out
}
