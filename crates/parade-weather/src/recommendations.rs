/// Split newline-delimited bullet text into items.
///
/// A leading run of `-` and any whitespace after it is stripped from each
/// line, then empty lines are dropped.
pub fn parse_recommendations(text: &str) -> Vec<String> {
    text.split('\n')
        .map(|line| match line.strip_prefix('-') {
            Some(rest) => rest.trim_start_matches('-').trim_start(),
            None => line,
        })
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
