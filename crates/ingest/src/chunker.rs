//! Hierarchical-then-semantic text chunker, generalized from
//! paragraph/sentence splitting into heading-aware (H1/H2/H3) splitting with
//! a word/mid-word fallback, plus a timestamp-aware variant for transcripts.

#[derive(Debug, Clone)]
pub struct ChunkerConfig {
  pub max_chunk_size: usize,
  pub overlap: usize,
}

impl Default for ChunkerConfig {
  fn default() -> Self {
    Self {
      max_chunk_size: 1000,
      overlap: 200,
    }
  }
}

impl From<&amelia_core::config::ChunkConfig> for ChunkerConfig {
  fn from(c: &amelia_core::config::ChunkConfig) -> Self {
    Self {
      max_chunk_size: c.default_chunk_size,
      overlap: c.chunk_overlap,
    }
  }
}

/// One emitted chunk before it is wrapped into an `amelia_core::Chunk`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkDraft {
  pub content: String,
  pub headers: Option<String>,
}

/// Splits markdown-like text by `# ` / `## ` / `### ` headings, falling back
/// to paragraph/sentence/word/mid-word splitting for oversized leaves.
pub fn chunk_markdown(text: &str, config: &ChunkerConfig) -> Vec<ChunkDraft> {
  let mut out = Vec::new();
  process_section(&[], text, config, 1, &mut out);
  out
}

fn process_section(heading_path: &[String], content: &str, config: &ChunkerConfig, level: usize, out: &mut Vec<ChunkDraft>) {
  let headers = if heading_path.is_empty() {
    None
  } else {
    Some(heading_path.join(" > "))
  };

  if content.chars().count() <= config.max_chunk_size {
    if !content.trim().is_empty() {
      out.push(ChunkDraft {
        content: content.trim().to_string(),
        headers,
      });
    }
    return;
  }

  if level <= 3 {
    let subsections = split_by_heading_level(content, level + 1);
    if subsections.len() > 1 {
      for (title, section_content) in subsections {
        let mut path = heading_path.to_vec();
        if let Some(t) = title {
          path.push(t);
        }
        process_section(&path, &section_content, config, level + 1, out);
      }
      return;
    }
  }

  for fragment in semantic_split(content, config.max_chunk_size, config.overlap) {
    if !fragment.trim().is_empty() {
      out.push(ChunkDraft {
        content: fragment,
        headers: headers.clone(),
      });
    }
  }
}

/// Returns `(title, content)` sections split at heading lines of exactly
/// `level` (e.g. `level=1` splits on `# `). Content before the first heading
/// of this level, if any, is emitted with `title = None`. A single-element
/// result means no heading of this level was found.
fn split_by_heading_level(text: &str, level: usize) -> Vec<(Option<String>, String)> {
  let mut sections: Vec<(Option<String>, String)> = Vec::new();
  let mut current_title: Option<String> = None;
  let mut current_lines: Vec<&str> = Vec::new();

  for line in text.lines() {
    if let Some((found_level, title)) = heading_level(line) {
      if found_level == level {
        if !current_lines.is_empty() || current_title.is_some() {
          sections.push((current_title.take(), current_lines.join("\n")));
        }
        current_title = Some(title.to_string());
        current_lines = vec![line];
        continue;
      }
    }
    current_lines.push(line);
  }
  if !current_lines.is_empty() || current_title.is_some() {
    sections.push((current_title, current_lines.join("\n")));
  }

  if sections.len() == 1 && sections[0].0.is_none() {
    return sections;
  }
  sections
}

fn heading_level(line: &str) -> Option<(usize, &str)> {
  let hashes = line.chars().take_while(|&c| c == '#').count();
  if hashes == 0 || hashes > 6 {
    return None;
  }
  let rest = &line[hashes..];
  rest.strip_prefix(' ').map(|title| (hashes, title.trim()))
}

fn semantic_split(content: &str, max: usize, overlap: usize) -> Vec<String> {
  if content.chars().count() <= max {
    return vec![content.trim().to_string()];
  }
  let paragraphs = split_paragraphs(content);
  if paragraphs.len() > 1 {
    return fill_with_overlap(&paragraphs, "\n\n", max, overlap, &|p| split_sentences_or_below(p, max, overlap));
  }
  split_sentences_or_below(content, max, overlap)
}

fn split_sentences_or_below(content: &str, max: usize, overlap: usize) -> Vec<String> {
  let sentences = split_sentences(content);
  if sentences.len() > 1 {
    return fill_with_overlap(&sentences, " ", max, overlap, &|s| split_words_or_below(s, max, overlap));
  }
  split_words_or_below(content, max, overlap)
}

fn split_words_or_below(content: &str, max: usize, overlap: usize) -> Vec<String> {
  let words: Vec<&str> = content.split_whitespace().collect();
  if words.len() > 1 {
    return fill_with_overlap(&words, " ", max, overlap, &|w| split_mid_word(w, max));
  }
  split_mid_word(content, max)
}

fn split_mid_word(content: &str, max: usize) -> Vec<String> {
  let chars: Vec<char> = content.chars().collect();
  if chars.is_empty() {
    return Vec::new();
  }
  chars.chunks(max.max(1)).map(|c| c.iter().collect()).collect()
}

/// Accumulates `units` joined by `sep` into chunks of at most `max`
/// characters, carrying `overlap` characters of tail context into the next
/// chunk. Units larger than `max` are recursively split by `overflow`.
fn fill_with_overlap(units: &[&str], sep: &str, max: usize, overlap: usize, overflow: &dyn Fn(&str) -> Vec<String>) -> Vec<String> {
  let mut result = Vec::new();
  let mut current = String::new();

  for unit in units {
    if unit.chars().count() > max {
      if !current.trim().is_empty() {
        result.push(current.trim().to_string());
      }
      let pieces = overflow(unit);
      result.extend(pieces);
      current = result.last().map(|last| tail_overlap(last, overlap)).unwrap_or_default();
      continue;
    }

    let candidate_len = if current.is_empty() {
      unit.chars().count()
    } else {
      current.chars().count() + sep.chars().count() + unit.chars().count()
    };

    if candidate_len > max && !current.trim().is_empty() {
      result.push(current.trim().to_string());
      current = tail_overlap(&current, overlap);
    }

    if !current.is_empty() {
      current.push_str(sep);
    }
    current.push_str(unit);
  }

  if !current.trim().is_empty() {
    result.push(current.trim().to_string());
  }
  result
}

fn tail_overlap(s: &str, overlap: usize) -> String {
  if overlap == 0 {
    return String::new();
  }
  let chars: Vec<char> = s.chars().collect();
  let start = chars.len().saturating_sub(overlap);
  chars[start..].iter().collect()
}

fn split_paragraphs(text: &str) -> Vec<&str> {
  text
    .split("\n\n")
    .flat_map(|p| p.split("\r\n\r\n"))
    .map(|p| p.trim())
    .filter(|p| !p.is_empty())
    .collect()
}

fn split_sentences(text: &str) -> Vec<&str> {
  let mut sentences = Vec::new();
  let mut current_start = 0;
  let chars: Vec<char> = text.chars().collect();

  let mut i = 0;
  while i < chars.len() {
    if matches!(chars[i], '.' | '!' | '?') {
      let next_idx = i + 1;
      if next_idx >= chars.len() || chars[next_idx].is_whitespace() {
        let is_abbreviation = chars[i] == '.' && i > 0 && {
          let prev = chars[i - 1];
          let next_after_space = chars.get(i + 2);
          (prev.is_uppercase() && (i < 2 || !chars[i - 2].is_alphabetic())) || next_after_space.is_some_and(|&c| c.is_lowercase())
        };

        if !is_abbreviation {
          let byte_pos = text.char_indices().nth(next_idx).map(|(b, _)| b).unwrap_or(text.len());
          let start_byte = text.char_indices().nth(current_start).map(|(b, _)| b).unwrap_or(0);

          let sentence = &text[start_byte..byte_pos];
          if !sentence.trim().is_empty() {
            sentences.push(sentence.trim());
          }
          current_start = next_idx;
          while current_start < chars.len() && chars[current_start].is_whitespace() {
            current_start += 1;
          }
        }
      }
    }
    i += 1;
  }

  if current_start < chars.len() {
    let start_byte = text.char_indices().nth(current_start).map(|(b, _)| b).unwrap_or(0);
    let remainder = &text[start_byte..];
    if !remainder.trim().is_empty() {
      sentences.push(remainder.trim());
    }
  }

  sentences
}

/// One timestamp-bearing audio segment: `(start_s, end_s, text)`.
#[derive(Debug, Clone)]
pub struct TimestampedSegment {
  pub start: f64,
  pub end: f64,
  pub text: String,
}

#[derive(Debug, Clone)]
pub struct TimestampedChunkDraft {
  pub content: String,
  pub start_timestamp: f64,
  pub end_timestamp: f64,
}

/// Accumulates segments until the running text reaches `max_chunk_size`,
/// then emits a chunk. Overlap is implemented by re-including trailing
/// segments whose combined length is at most `overlap`.
pub fn chunk_timestamped(segments: &[TimestampedSegment], config: &ChunkerConfig) -> Vec<TimestampedChunkDraft> {
  let mut out = Vec::new();
  let mut buf: Vec<&TimestampedSegment> = Vec::new();
  let mut buf_len = 0usize;

  for seg in segments {
    let seg_len = seg.text.chars().count();
    if buf_len + seg_len > config.max_chunk_size && !buf.is_empty() {
      out.push(emit_timestamped(&buf));
      let (tail, tail_len) = overlap_tail(&buf, config.overlap);
      buf = tail;
      buf_len = tail_len;
    }
    buf.push(seg);
    buf_len += seg_len;
  }

  if !buf.is_empty() {
    out.push(emit_timestamped(&buf));
  }

  out
}

fn emit_timestamped(buf: &[&TimestampedSegment]) -> TimestampedChunkDraft {
  let content = buf.iter().map(|s| s.text.as_str()).collect::<Vec<_>>().join(" ");
  TimestampedChunkDraft {
    content,
    start_timestamp: buf.first().map(|s| s.start).unwrap_or(0.0),
    end_timestamp: buf.last().map(|s| s.end).unwrap_or(0.0),
  }
}

fn overlap_tail<'a>(buf: &[&'a TimestampedSegment], overlap: usize) -> (Vec<&'a TimestampedSegment>, usize) {
  let mut tail = Vec::new();
  let mut tail_len = 0;
  for seg in buf.iter().rev() {
    let len = seg.text.chars().count();
    if tail_len + len > overlap {
      break;
    }
    tail.push(*seg);
    tail_len += len;
  }
  tail.reverse();
  (tail, tail_len)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn small_document_is_a_single_chunk() {
    let drafts = chunk_markdown("# Title\n\nShort body.", &ChunkerConfig::default());
    assert_eq!(drafts.len(), 1);
    assert_eq!(drafts[0].headers.as_deref(), Some("Title"));
  }

  #[test]
  fn splits_by_h1_when_oversized() {
    let config = ChunkerConfig {
      max_chunk_size: 40,
      overlap: 5,
    };
    let a = "word ".repeat(20);
    let b = "other ".repeat(20);
    let text = format!("# Alpha\n{a}\n# Beta\n{b}");
    let drafts = chunk_markdown(&text, &config);
    assert!(drafts.iter().any(|d| d.headers.as_deref() == Some("Alpha")));
    assert!(drafts.iter().any(|d| d.headers.as_deref() == Some("Beta")));
  }

  #[test]
  fn nested_headings_build_a_path() {
    let config = ChunkerConfig {
      max_chunk_size: 20,
      overlap: 0,
    };
    let text = "# One\n## Two\nshort text here that is long enough to overflow twenty chars";
    let drafts = chunk_markdown(text, &config);
    assert!(drafts.iter().any(|d| d.headers.as_deref() == Some("One > Two")));
  }

  #[test]
  fn falls_back_to_sentence_splitting_without_headings() {
    let config = ChunkerConfig {
      max_chunk_size: 50,
      overlap: 10,
    };
    let text = "First sentence here. Second sentence here. Third sentence here. Fourth sentence here.";
    let drafts = chunk_markdown(text, &config);
    assert!(drafts.len() > 1);
    for d in &drafts {
      assert!(!d.content.is_empty());
    }
  }

  #[test]
  fn oversized_single_word_splits_mid_word() {
    let config = ChunkerConfig {
      max_chunk_size: 5,
      overlap: 0,
    };
    let text = "supercalifragilisticexpialidocious";
    let drafts = chunk_markdown(text, &config);
    assert!(drafts.len() > 1);
    for d in &drafts {
      assert!(d.content.chars().count() <= 5);
    }
  }

  #[test]
  fn chunks_are_never_empty() {
    let drafts = chunk_markdown("", &ChunkerConfig::default());
    assert!(drafts.is_empty());
  }

  #[test]
  fn timestamped_chunks_cover_contiguous_ranges() {
    let segments = vec![
      TimestampedSegment {
        start: 0.0,
        end: 2.0,
        text: "hello there".to_string(),
      },
      TimestampedSegment {
        start: 2.0,
        end: 4.0,
        text: "general kenobi".to_string(),
      },
    ];
    let config = ChunkerConfig {
      max_chunk_size: 1000,
      overlap: 0,
    };
    let chunks = chunk_timestamped(&segments, &config);
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].start_timestamp, 0.0);
    assert_eq!(chunks[0].end_timestamp, 4.0);
  }

  #[test]
  fn timestamped_chunks_split_when_oversized_and_keep_overlap() {
    let segments: Vec<TimestampedSegment> = (0..10)
      .map(|i| TimestampedSegment {
        start: i as f64,
        end: i as f64 + 1.0,
        text: "word ".repeat(3),
      })
      .collect();
    let config = ChunkerConfig {
      max_chunk_size: 20,
      overlap: 5,
    };
    let chunks = chunk_timestamped(&segments, &config);
    assert!(chunks.len() > 1);
    assert!(chunks.windows(2).all(|w| w[0].end_timestamp <= w[1].end_timestamp));
  }
}
