use memdemo_core::Dialogue;

/// Parses free-form context text into dialogues for engine bootstrap.
///
/// Each non-empty line becomes one dialogue. Lines shaped like
/// `Speaker: content` keep their speaker; anything else is attributed
/// to a generic `Context` speaker. Dialogue IDs are 1-based line
/// numbers of the trimmed text: surrounding whitespace is stripped
/// first, so leading blank lines never shift the ids, while interior
/// blank lines leave gaps rather than renumbering.
pub fn parse_context(text: &str) -> Vec<Dialogue> {
    let mut dialogues = Vec::new();
    for (i, line) in text.trim().lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let id = i as u32 + 1;
        let dialogue = match line.split_once(':') {
            Some((speaker, content)) => Dialogue::new(id, speaker.trim(), content.trim()),
            None => Dialogue::new(id, "Context", line),
        };
        dialogues.push(dialogue);
    }
    dialogues
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_speaker_lines() {
        let dialogues = parse_context("Alice: hi there\nBob: hello Alice");
        assert_eq!(dialogues.len(), 2);
        assert_eq!(dialogues[0].speaker, "Alice");
        assert_eq!(dialogues[0].content, "hi there");
        assert_eq!(dialogues[1].dialogue_id, 2);
        assert_eq!(dialogues[1].speaker, "Bob");
    }

    #[test]
    fn test_parse_plain_line_gets_context_speaker() {
        let dialogues = parse_context("just a bare fact");
        assert_eq!(dialogues.len(), 1);
        assert_eq!(dialogues[0].speaker, "Context");
        assert_eq!(dialogues[0].content, "just a bare fact");
    }

    #[test]
    fn test_parse_skips_blank_lines_but_keeps_line_ids() {
        let dialogues = parse_context("Alice: one\n\n\nBob: two");
        assert_eq!(dialogues.len(), 2);
        assert_eq!(dialogues[0].dialogue_id, 1);
        assert_eq!(dialogues[1].dialogue_id, 4);
    }

    #[test]
    fn test_leading_blank_lines_do_not_shift_ids() {
        let dialogues = parse_context("\n\n   \nAlice: hi\n\nBob: hey\n\n");
        assert_eq!(dialogues.len(), 2);
        assert_eq!(dialogues[0].dialogue_id, 1);
        assert_eq!(dialogues[1].dialogue_id, 3);
    }

    #[test]
    fn test_parse_empty_text() {
        assert!(parse_context("").is_empty());
        assert!(parse_context("   \n  \n").is_empty());
    }

    #[test]
    fn test_parse_splits_on_first_colon_only() {
        let dialogues = parse_context("Alice: note: remember this");
        assert_eq!(dialogues[0].speaker, "Alice");
        assert_eq!(dialogues[0].content, "note: remember this");
    }
}
