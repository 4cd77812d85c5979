use std::fmt::Write as _;

use core_session::{AnalysisState, ContentStatus, WorkspaceSnapshot};
use core_types::{ChatMessage, Document, ModelInfo, SearchResult, format_file_size};
use i18n::I18n;

pub fn document_line(i18n: &I18n, index: usize, doc: &Document) -> String {
    format!(
        "{index:>3}. {}  [{}]  {}  {}  {}",
        doc.file_name,
        doc.id,
        format_file_size(doc.file_size),
        i18n.indexing_status(doc.indexing_status),
        doc.uploaded_at.format("%Y-%m-%d %H:%M"),
    )
}

pub fn documents(i18n: &I18n, docs: &[Document], query: &str) -> String {
    let mut out = String::new();
    if query.trim().is_empty() {
        let _ = writeln!(out, "{} ({})", i18n.t("label.documents"), docs.len());
    } else {
        let _ = writeln!(
            out,
            "{} ({}) {}: {query}",
            i18n.t("label.documents"),
            docs.len(),
            i18n.t("label.query")
        );
    }
    for (i, doc) in docs.iter().enumerate() {
        let _ = writeln!(out, "{}", document_line(i18n, i + 1, doc));
    }
    out
}

pub fn message(i18n: &I18n, message: &ChatMessage) -> String {
    match message {
        ChatMessage::Question { text, .. } => format!("{}: {text}", i18n.t("label.question")),
        ChatMessage::Answer { text, .. } => match message.confidence() {
            Some(confidence) => format!(
                "{}: {text}  ({} {confidence})",
                i18n.t("label.answer"),
                i18n.t("label.confidence")
            ),
            None => format!("{}: {text}  (!)", i18n.t("label.answer")),
        },
    }
}

pub fn transcript(i18n: &I18n, messages: &[ChatMessage], pending: usize) -> String {
    let mut out = format!("{}\n", i18n.t("label.history"));
    if messages.is_empty() {
        let _ = writeln!(out, "  {}", i18n.t("msg.history_empty"));
    }
    for msg in messages {
        let _ = writeln!(out, "  {}", message(i18n, msg));
    }
    if pending > 0 {
        let _ = writeln!(out, "  {}: {pending}", i18n.t("label.pending"));
    }
    out
}

pub fn models(i18n: &I18n, models: &[ModelInfo], selected: Option<&str>) -> String {
    let mut out = format!("{}\n", i18n.t("label.models"));
    for model in models {
        let marker = if Some(model.id.as_str()) == selected { '*' } else { ' ' };
        let _ = write!(out, " {marker} {} ({})", model.id, model.name);
        if model.is_default {
            let _ = write!(out, " [{}]", i18n.t("label.default"));
        }
        if !model.description.is_empty() {
            let _ = write!(out, " - {}", model.description);
        }
        out.push('\n');
    }
    out
}

pub fn analysis(i18n: &I18n, state: &AnalysisState) -> String {
    let analysis = match state {
        AnalysisState::Idle => return format!("{}\n", i18n.t("msg.no_document")),
        AnalysisState::Loading { .. } => return format!("{}...\n", i18n.t("msg.loading")),
        AnalysisState::Failed { message, .. } => return format!("{message}\n"),
        AnalysisState::Ready { analysis, .. } => analysis,
    };

    let mut out = format!("{}\n", i18n.t("label.analysis"));
    let classification = &analysis.classification;
    let _ = writeln!(
        out,
        "  {}: {} ({})",
        i18n.t("label.category"),
        classification.category,
        classification.confidence
    );
    for (category, score) in classification.all_categories.iter().skip(1).take(3) {
        let _ = writeln!(out, "      {category} ({score})");
    }

    let _ = writeln!(out, "  {}: {}", i18n.t("label.summary"), analysis.summary.summary);

    let _ = writeln!(out, "  {}: {}", i18n.t("label.entities"), analysis.entity_count());
    for (label, entities) in &analysis.entities {
        let texts: Vec<&str> = entities.iter().map(|e| e.text.as_str()).collect();
        let _ = writeln!(out, "    {label}: {}", texts.join(", "));
    }

    let _ = writeln!(out, "  {}: {}", i18n.t("label.tables"), analysis.tables.len());
    for table in &analysis.tables {
        let _ = writeln!(
            out,
            "    {} ({}x{})",
            table.id,
            table.row_count,
            table.columns_count.max(table.columns.len())
        );
        let _ = writeln!(out, "      {}", table.columns.join(" | "));
        for row in (0..table.rows.len()).filter_map(|i| table.row_values(i)) {
            let _ = writeln!(out, "      {}", row.join(" | "));
        }
    }
    out
}

pub fn search_result(i18n: &I18n, result: &SearchResult) -> String {
    let mut out = format!(
        "{}  ({} {})\n",
        result.answer,
        i18n.t("label.confidence"),
        result.confidence
    );
    if !result.sources.is_empty() {
        let _ = writeln!(out, "{}", i18n.t("label.sources"));
    }
    for (i, source) in result.sources.iter().enumerate() {
        let _ = writeln!(
            out,
            "{:>3}. {}  {} {}",
            i + 1,
            source.file_name,
            source.similarity,
            i18n.t("label.relevance")
        );
    }
    out
}

pub fn status(i18n: &I18n, snapshot: &WorkspaceSnapshot) -> String {
    let none = i18n.t("label.none");
    let mut out = String::new();
    match &snapshot.selected {
        Some(doc) => {
            let _ = writeln!(out, "{}: {} [{}]", i18n.t("label.selected"), doc.file_name, doc.id);
            let _ = writeln!(
                out,
                "  {}: {}  {}: {}  {}: {}",
                i18n.t("label.size"),
                format_file_size(doc.file_size),
                i18n.t("label.indexing"),
                i18n.indexing_status(doc.indexing_status),
                i18n.t("label.uploaded"),
                doc.uploaded_at.format("%Y-%m-%d %H:%M"),
            );
            let content = match (snapshot.content_status, &snapshot.content_locator) {
                (ContentStatus::Ready, Some(locator)) => {
                    format!("{} ({})", locator.url, locator.content_type)
                }
                (ContentStatus::Loading, _) => format!("{}...", i18n.t("msg.loading")),
                _ => i18n.t("msg.content_unavailable").to_owned(),
            };
            let _ = writeln!(out, "  {}: {content}", i18n.t("label.content"));
        }
        None => {
            let _ = writeln!(out, "{}: {none}", i18n.t("label.selected"));
        }
    }
    let _ = writeln!(
        out,
        "{}: {}",
        i18n.t("label.model"),
        snapshot.selected_model.as_deref().unwrap_or(none)
    );
    if snapshot.pending_questions > 0 {
        let _ = writeln!(out, "{}: {}", i18n.t("label.pending"), snapshot.pending_questions);
    }
    if snapshot.list_loading {
        let _ = writeln!(out, "{}: {}...", i18n.t("label.documents"), i18n.t("msg.loading"));
    }
    if let Some(err) = &snapshot.list_error {
        let _ = writeln!(out, "{}: {err}", i18n.t("msg.request_failed"));
    }
    out
}

pub fn help(i18n: &I18n) -> String {
    let mut out = format!("{}\n", i18n.t("app.title"));
    for key in [
        "help.list",
        "help.search",
        "help.select",
        "help.ask",
        "help.history",
        "help.models",
        "help.model",
        "help.analysis",
        "help.rag",
        "help.upload",
        "help.drop",
        "help.status",
        "help.lang",
        "help.quit",
    ] {
        let _ = writeln!(out, "  {}", i18n.t(key));
    }
    out
}
