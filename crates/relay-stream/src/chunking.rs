use relay_types::ChunkMode;

/// Characters that close a sentence for paragraph-mode flushing
pub const SENTENCE_TERMINATORS: [char; 7] = ['.', '!', '?', '…', '。', '！', '？'];

/// Default flush threshold for paragraph mode
pub const PARAGRAPH_THRESHOLD: usize = 200;

/// Whether buffered text ends at a natural break.
///
/// Blank-line separators anywhere count, as does a trailing newline or a sentence terminator
/// after trailing whitespace is ignored. Whitespace-only text never counts.
pub fn is_paragraph_boundary(text: &str) -> bool {
    if text.contains("\n\n") {
        return true;
    }

    let stripped = text.trim_end();
    if stripped.is_empty() {
        return false;
    }

    text.ends_with('\n') || stripped.ends_with(SENTENCE_TERMINATORS.as_slice())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPolicy {
    pub mode: ChunkMode,
    pub chunk_size: usize,
    /// Paragraph mode flushes here even without a boundary
    pub flush_threshold: usize,
}

impl ChunkPolicy {
    pub fn new(mode: ChunkMode, chunk_size: usize) -> Self {
        Self::with_paragraph_threshold(mode, chunk_size, PARAGRAPH_THRESHOLD)
    }

    pub fn with_paragraph_threshold(
        mode: ChunkMode,
        chunk_size: usize,
        paragraph_threshold: usize,
    ) -> Self {
        Self {
            mode,
            chunk_size: chunk_size.max(1),
            flush_threshold: chunk_size.max(paragraph_threshold),
        }
    }
}

/// Re-batches completion deltas according to a [`ChunkPolicy`]
///
/// Lengths are counted in characters, not bytes.
#[derive(Debug)]
pub struct Chunker {
    policy: ChunkPolicy,
    buffer: String,
    buffered_chars: usize,
}

impl Chunker {
    pub fn new(policy: ChunkPolicy) -> Self {
        Self {
            policy,
            buffer: String::new(),
            buffered_chars: 0,
        }
    }

    pub fn policy(&self) -> &ChunkPolicy {
        &self.policy
    }

    pub fn buffered(&self) -> &str {
        &self.buffer
    }

    /// Feed one delta; returns a chunk when the policy says to flush
    pub fn push(&mut self, delta: &str) -> Option<String> {
        if delta.is_empty() {
            return None;
        }

        match self.policy.mode {
            ChunkMode::Token => Some(delta.to_string()),
            ChunkMode::Chars => {
                self.append(delta);
                (self.buffered_chars >= self.policy.chunk_size).then(|| self.take())
            }
            ChunkMode::Paragraph => {
                self.append(delta);
                let flush = is_paragraph_boundary(&self.buffer)
                    || self.buffered_chars >= self.policy.flush_threshold;
                flush.then(|| self.take())
            }
        }
    }

    /// Whatever is still buffered, once the upstream has ended
    pub fn finish(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            None
        } else {
            Some(self.take())
        }
    }

    fn append(&mut self, delta: &str) {
        self.buffer.push_str(delta);
        self.buffered_chars += delta.chars().count();
    }

    fn take(&mut self) -> String {
        self.buffered_chars = 0;
        std::mem::take(&mut self.buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(chunker: &mut Chunker, deltas: &[&str]) -> Vec<String> {
        let mut out: Vec<String> = deltas.iter().filter_map(|d| chunker.push(d)).collect();
        out.extend(chunker.finish());
        out
    }

    #[test]
    fn test_boundary_detection() {
        assert!(is_paragraph_boundary("Hello world."));
        assert!(is_paragraph_boundary("Really?  "));
        assert!(is_paragraph_boundary("first\n\nsecond"));
        assert!(is_paragraph_boundary("line\n"));
        assert!(is_paragraph_boundary("終わり。"));
        assert!(is_paragraph_boundary("wait…"));
        assert!(!is_paragraph_boundary("Hello world"));
        assert!(!is_paragraph_boundary("   "));
        assert!(!is_paragraph_boundary("\n"));
        assert!(!is_paragraph_boundary(""));
    }

    #[test]
    fn test_token_mode_relays_non_empty_deltas() {
        let mut chunker = Chunker::new(ChunkPolicy::new(ChunkMode::Token, 80));
        let out = run(&mut chunker, &["Hel", "", "lo"]);
        assert_eq!(out, vec!["Hel", "lo"]);
    }

    #[test]
    fn test_chars_mode() {
        let mut chunker = Chunker::new(ChunkPolicy::new(ChunkMode::Chars, 5));
        let out = run(&mut chunker, &["ab", "cd", "efg", "h", "ij"]);

        assert_eq!(out, vec!["abcdefg", "hij"]);
        assert_eq!(out.concat(), "abcdefghij");
    }

    #[test]
    fn test_chars_mode_counts_characters() {
        let mut chunker = Chunker::new(ChunkPolicy::new(ChunkMode::Chars, 3));
        assert_eq!(chunker.push("éé"), None);
        assert_eq!(chunker.push("é"), Some("ééé".to_string()));
    }

    #[test]
    fn test_chars_mode_chunks_never_short_except_last() {
        let deltas = ["The ", "quick ", "brown", " fox ", "jumps ", "over ", "the ", "lazy dog"];
        let mut chunker = Chunker::new(ChunkPolicy::new(ChunkMode::Chars, 7));
        let out = run(&mut chunker, &deltas);

        let (last, rest) = out.split_last().unwrap();
        assert!(rest.iter().all(|c| c.chars().count() >= 7));
        assert!(!last.is_empty());
        assert_eq!(out.concat(), deltas.concat());
    }

    #[test]
    fn test_paragraph_mode_flushes_on_sentence_end() {
        let mut chunker = Chunker::new(ChunkPolicy::new(ChunkMode::Paragraph, 80));
        let out = run(&mut chunker, &["Hello", " there.", " How", " are", " you"]);

        assert_eq!(out, vec!["Hello there.", " How are you"]);
    }

    #[test]
    fn test_paragraph_mode_flushes_at_threshold() {
        let policy = ChunkPolicy::with_paragraph_threshold(ChunkMode::Paragraph, 4, 10);
        assert_eq!(policy.flush_threshold, 10);

        let mut chunker = Chunker::new(policy);
        let out = run(&mut chunker, &["abcdef", "ghijkl", "mn"]);
        assert_eq!(out, vec!["abcdefghijkl", "mn"]);
    }

    #[test]
    fn test_paragraph_chunks_end_at_boundary_or_threshold() {
        let sequences: Vec<Vec<&str>> = vec![
            vec!["Hello", " world", ".", " Next", " sentence", "!", " tail"],
            vec!["line one\n", "line", " two\n", "\n", "para two"],
            vec!["これは", "テスト", "です。", "次の", "文！", "残り"],
            vec!["aaaaaaaa", "bbbbbbbb", "cccccccc", "dd", "ee"],
            vec!["  ", "\n", "Spaced out?  ", " ", "yes"],
            vec!["Wait", "…", " really", "\n\nok", " then"],
            vec!["no boundary here at all"],
        ];

        for deltas in sequences {
            let policy = ChunkPolicy::with_paragraph_threshold(ChunkMode::Paragraph, 4, 12);
            let mut chunker = Chunker::new(policy);
            let out = run(&mut chunker, &deltas);

            assert_eq!(out.concat(), deltas.concat(), "content lost for {:?}", deltas);
            assert!(out.iter().all(|c| !c.is_empty()));

            if let Some((_, flushed)) = out.split_last() {
                for chunk in flushed {
                    assert!(
                        is_paragraph_boundary(chunk)
                            || chunk.chars().count() >= policy.flush_threshold,
                        "early flush {:?} in {:?}",
                        chunk,
                        deltas
                    );
                }
            }
        }
    }

    #[test]
    fn test_paragraph_threshold_never_below_chunk_size() {
        let policy = ChunkPolicy::new(ChunkMode::Paragraph, 500);
        assert_eq!(policy.flush_threshold, 500);
    }

    #[test]
    fn test_finish_on_empty_buffer() {
        let mut chunker = Chunker::new(ChunkPolicy::new(ChunkMode::Chars, 5));
        assert_eq!(chunker.finish(), None);
        assert_eq!(chunker.push("12345"), Some("12345".to_string()));
        assert_eq!(chunker.finish(), None);
    }
}
