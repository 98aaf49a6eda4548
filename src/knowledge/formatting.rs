use colored::Colorize;

use crate::conversation::{ConversationTurn, Role};
use crate::knowledge::types::VideoEntry;
use crate::session::{Notice, NoticeLevel};

pub fn format_video_list(entries: &[VideoEntry]) -> String {
    if entries.is_empty() {
        return "No videos available. Add one with `tubechat video add <url>`".to_string();
    }

    let mut output = String::new();

    // Header
    output.push_str(
        &format!(
            "{:<4} {:<42} {:<8} {}\n",
            "#", "Title", "Tokens", "Added"
        )
        .bold()
        .to_string(),
    );
    output.push_str(&"─".repeat(80));
    output.push('\n');

    for (i, entry) in entries.iter().enumerate() {
        let title = if entry.title.chars().count() > 40 {
            format!("{}...", truncate_chars(&entry.title, 37))
        } else {
            entry.title.clone()
        };

        output.push_str(&format!(
            "{:<4} {:<42} {:<8} {}\n",
            i + 1,
            title,
            entry.token_count,
            entry.added_at_display()
        ));
    }

    output
}

pub fn format_video_details(number: usize, entry: &VideoEntry) -> String {
    let mut output = String::new();

    output.push_str(&format!("{}. {}", number, entry.title).blue().bold().to_string());
    output.push('\n');
    output.push_str(&format!("URL: {}", entry.url.bright_black()));
    output.push('\n');
    output.push_str(&format!("Added: {}", entry.added_at_display()));
    output.push('\n');
    output.push_str(&format!("Tokens: {}", entry.token_count));
    output.push('\n');

    if let Some(summary) = &entry.summary {
        output.push_str(&"Summary".cyan().to_string());
        output.push('\n');
        output.push_str(summary);
        output.push('\n');
    }

    // Transcript preview (first 100 chars)
    let preview = if entry.transcript.chars().count() > 100 {
        format!("{}...", truncate_chars(&entry.transcript, 100))
    } else {
        entry.transcript.clone()
    };
    output.push_str(&format!("Preview: {}", preview));
    output.push('\n');

    output
}

pub fn format_turn(turn: &ConversationTurn) -> String {
    let speaker = match turn.role {
        Role::User => "You".green().bold(),
        Role::Assistant => "AI Assistant".blue().bold(),
    };
    format!("{} ({}): {}", speaker, turn.timestamp, turn.content)
}

pub fn format_history(turns: &[ConversationTurn]) -> String {
    if turns.is_empty() {
        return "No messages yet".to_string();
    }

    let mut output = String::new();
    for turn in turns {
        output.push_str(&format_turn(turn));
        output.push('\n');
        output.push_str(&"─".repeat(40).bright_black().to_string());
        output.push('\n');
    }
    output
}

pub fn format_notice(notice: &Notice) -> String {
    match notice.level {
        NoticeLevel::Info => notice.message.clone(),
        NoticeLevel::Success => format!("{} {}", "✓".green(), notice.message),
        NoticeLevel::Warning => format!("{} {}", "!".yellow().bold(), notice.message.yellow()),
        NoticeLevel::Error => format!("{} {}", "✗".red().bold(), notice.message.red()),
    }
}

pub(crate) fn truncate_chars(input: &str, max_chars: usize) -> String {
    input.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_chars_is_char_safe() {
        assert_eq!(truncate_chars("字幕字幕字幕", 2), "字幕");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }

    #[test]
    fn test_empty_list_message() {
        assert!(format_video_list(&[]).starts_with("No videos available"));
    }

    #[test]
    fn test_list_numbers_from_one() {
        colored::control::set_override(false);
        let entry = VideoEntry::new(
            "A very long title that certainly exceeds the forty character column".to_string(),
            "https://youtu.be/abc".to_string(),
            "a b c".to_string(),
            None,
        );
        let output = format_video_list(&[entry]);
        let row = output.lines().nth(2).unwrap();
        assert!(row.starts_with("1 "));
        assert!(row.contains("..."));
        assert!(row.contains(" 3 "));
    }

    #[test]
    fn test_notice_keeps_message() {
        colored::control::set_override(false);
        assert_eq!(format_notice(&Notice::info("Video Title: x")), "Video Title: x");
        assert!(format_notice(&Notice::error("Error saving JSON file")).ends_with("Error saving JSON file"));
    }
}
