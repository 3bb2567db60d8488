use serde::de::DeserializeOwned;

/// Locate the JSON document inside a completion.
///
/// Models often wrap structured output in markdown fences or add a sentence
/// before it. The document is taken to span from the first `{` or `[` to the
/// last matching closer.
#[must_use]
pub fn extract_json(raw: &str) -> Option<&str> {
    candidates(raw).into_iter().next()
}

/// Parse a structured completion into `T`, trying every plausible JSON slice
/// of `raw` before giving up.
pub fn parse_structured<T: DeserializeOwned>(raw: &str) -> Result<T, serde_json::Error> {
    let trimmed = raw.trim();
    let mut last_error = match serde_json::from_str(trimmed) {
        Ok(value) => return Ok(value),
        Err(err) => err,
    };
    for candidate in candidates(trimmed) {
        match serde_json::from_str(candidate) {
            Ok(value) => return Ok(value),
            Err(err) => last_error = err,
        }
    }
    Err(last_error)
}

fn candidates(raw: &str) -> Vec<&str> {
    let mut spans: Vec<(usize, &str)> = [('{', '}'), ('[', ']')]
        .into_iter()
        .filter_map(|(open, close)| {
            let start = raw.find(open)?;
            let end = raw.rfind(close)?;
            (start < end).then(|| (start, &raw[start..=end]))
        })
        .collect();
    spans.sort_by_key(|(start, _)| *start);
    spans.into_iter().map(|(_, slice)| slice).collect()
}
