//! Delimiter detection for incoming tabular files

/// Bytes inspected when guessing the delimiter
pub const SAMPLE_SIZE: usize = 1024;

/// Used whenever detection is inconclusive
pub const DEFAULT_DELIMITER: u8 = b';';

/// Candidates, in order of preference when several fit equally well
const CANDIDATES: [u8; 4] = [b',', b';', b'\t', b'|'];

/// Guess the delimiter from the leading bytes of a file.
///
/// A candidate qualifies when every complete line in the sample contains it
/// the same, non-zero number of times outside quoted sections. Among the
/// qualifying candidates the most frequent one wins. Returns `None` when no
/// candidate qualifies.
pub fn sniff_delimiter(sample: &[u8], truncated: bool) -> Option<u8> {
    let text = String::from_utf8_lossy(sample);
    let mut lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();

    // The last line of a cut-off sample is partial
    if truncated && lines.len() > 1 {
        lines.pop();
    }
    if lines.is_empty() {
        return None;
    }

    let mut best: Option<(u8, usize)> = None;
    for &candidate in &CANDIDATES {
        let first = count_unquoted(lines[0], candidate);
        if first == 0 {
            continue;
        }
        if lines.iter().all(|line| count_unquoted(line, candidate) == first) {
            match best {
                Some((_, count)) if count >= first => {}
                _ => best = Some((candidate, first)),
            }
        }
    }

    best.map(|(delimiter, _)| delimiter)
}

/// Same as [`sniff_delimiter`] but never fails
pub fn detect_delimiter(content: &[u8]) -> u8 {
    let truncated = content.len() > SAMPLE_SIZE;
    let sample = &content[..content.len().min(SAMPLE_SIZE)];
    sniff_delimiter(sample, truncated).unwrap_or_else(|| {
        log::debug!(
            "Could not detect delimiter, falling back to '{}'",
            DEFAULT_DELIMITER as char
        );
        DEFAULT_DELIMITER
    })
}

fn count_unquoted(line: &str, delimiter: u8) -> usize {
    let mut in_quotes = false;
    let mut count = 0;
    for byte in line.bytes() {
        if byte == b'"' {
            in_quotes = !in_quotes;
        } else if byte == delimiter && !in_quotes {
            count += 1;
        }
    }
    count
}
