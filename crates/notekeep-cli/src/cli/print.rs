use chrono::{DateTime, Utc};
use colored::Colorize;
use notekeep::{LabelCount, Note, StorageStats};
use timeago::Formatter;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const LINE_WIDTH: usize = 100;
const TIME_WIDTH: usize = 14;
const FOLDER_WIDTH: usize = 12;
const ID_WIDTH: usize = 36;

#[derive(Debug, Clone, Copy)]
pub(super) enum MessageLevel {
    Info,
    Success,
    Warning,
}

pub(super) fn print_message(level: MessageLevel, content: &str) {
    match level {
        MessageLevel::Info => println!("{}", content.dimmed()),
        MessageLevel::Success => println!("{}", content.green()),
        MessageLevel::Warning => println!("{}", content.yellow()),
    }
}

/// Informational text that must not mix with machine-readable stdout.
pub(super) fn print_notice(content: &str) {
    eprintln!("{}", content.cyan());
}

pub(super) fn print_note(note: &Note) {
    println!("{}", note.title.bold());
    println!(
        "{} {}  {} {}",
        "id:".dimmed(),
        note.id,
        "folder:".dimmed(),
        note.folder.yellow()
    );
    if !note.tags.is_empty() {
        let tags: Vec<String> = note.tags.iter().map(|t| format!("#{t}")).collect();
        println!("{} {}", "tags:".dimmed(), tags.join(" ").cyan());
    }
    println!(
        "{} {}  {} {}",
        "created:".dimmed(),
        note.created_at.to_rfc3339(),
        "updated:".dimmed(),
        format_time_ago(note.updated_at).trim()
    );
    println!("--------------------------------");
    println!("{}", note.content);
}

pub(super) fn print_notes(notes: &[Note]) {
    if notes.is_empty() {
        println!("No notes found.");
        return;
    }

    for note in notes {
        let folder = truncate_to_width(&note.folder, FOLDER_WIDTH);
        let folder_padding = FOLDER_WIDTH.saturating_sub(folder.width());

        let preview: String = note
            .content
            .chars()
            .take(50)
            .map(|c| if c == '\n' { ' ' } else { c })
            .collect();
        let title_content = if preview.is_empty() {
            note.title.clone()
        } else {
            format!("{} {}", note.title, preview)
        };

        // id, two gaps of two spaces, folder, time
        let fixed_width = ID_WIDTH + 2 + FOLDER_WIDTH + 2 + TIME_WIDTH;
        let available = LINE_WIDTH.saturating_sub(fixed_width);
        let title_display = truncate_to_width(&title_content, available);
        let padding = available.saturating_sub(title_display.width());

        println!(
            "{}  {}{}  {}{}{}",
            note.id.dimmed(),
            folder.yellow(),
            " ".repeat(folder_padding),
            title_display,
            " ".repeat(padding),
            format_time_ago(note.updated_at).dimmed()
        );
    }
}

pub(super) fn print_labels(labels: &[LabelCount], prefix: &str, empty: &str) {
    if labels.is_empty() {
        println!("{empty}");
        return;
    }
    let width = labels
        .iter()
        .map(|l| l.name.width() + prefix.width())
        .max()
        .unwrap_or(0);
    for label in labels {
        let name = format!("{prefix}{}", label.name);
        let padding = width.saturating_sub(name.width());
        println!(
            "{}{}  {}",
            name.yellow(),
            " ".repeat(padding),
            label.count.to_string().dimmed()
        );
    }
}

pub(super) fn print_stats(stats: &StorageStats) {
    let last = stats
        .last_updated
        .map(|t| format_time_ago(t).trim().to_string())
        .unwrap_or_else(|| "never".to_string());
    println!("{:<14}{}", "backend", stats.backend_name.green());
    println!("{:<14}{}", "notes", stats.total_notes);
    println!("{:<14}{}", "size", format_size(stats.total_size));
    println!("{:<14}{}", "last updated", last);
}

fn format_size(bytes: usize) -> String {
    const KIB: usize = 1024;
    if bytes < KIB {
        format!("{bytes} B")
    } else if bytes < KIB * KIB {
        format!("{:.1} KiB", bytes as f64 / KIB as f64)
    } else {
        format!("{:.1} MiB", bytes as f64 / (KIB * KIB) as f64)
    }
}

fn truncate_to_width(s: &str, max_width: usize) -> String {
    if s.width() <= max_width {
        return s.to_string();
    }

    let mut result = String::new();
    let mut current_width = 0;
    for c in s.chars() {
        let char_width = c.width().unwrap_or(0);
        if current_width + char_width > max_width.saturating_sub(1) {
            result.push('…');
            return result;
        }
        result.push(c);
        current_width += char_width;
    }
    result
}

fn format_time_ago(timestamp: DateTime<Utc>) -> String {
    let duration = Utc::now().signed_duration_since(timestamp);
    let time_str = Formatter::new().convert(duration.to_std().unwrap_or_default());
    format!("{:>width$}", time_str, width = TIME_WIDTH)
}
