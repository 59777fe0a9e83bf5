/// Normalize raw OCR output.
///
/// Collapses every whitespace run (including line breaks) to one space,
/// maps full-width question marks and parentheses to ASCII and drops
/// stray control characters.
pub fn clean_extracted_text(raw: &str) -> String {
    let normalized: String = raw
        .chars()
        .map(|c| match c {
            '？' => '?',
            '（' => '(',
            '）' => ')',
            other => other,
        })
        .filter(|c| !c.is_control() || c.is_whitespace())
        .collect();
    normalized.split_whitespace().collect::<Vec<_>>().join(" ")
}
