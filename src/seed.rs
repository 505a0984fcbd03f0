//! Seed-file loading: newline-delimited URLs read once at startup and
//! handed to the frontier at depth 0.

use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("io error reading seed file: {0}")]
    Io(#[from] std::io::Error),
}

pub fn parse_seed_file(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

pub async fn load_seed_file(path: &Path) -> Result<Vec<String>, SeedError> {
    let contents = tokio::fs::read_to_string(path).await?;
    Ok(parse_seed_file(&contents))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_one_url_per_line() {
        let contents = "http://a.com/\nhttp://b.com/\n";
        assert_eq!(
            parse_seed_file(contents),
            vec!["http://a.com/", "http://b.com/"]
        );
    }

    #[test]
    fn skips_blank_and_comment_lines() {
        let contents = "\n# seed list\nhttp://a.com/\n\n";
        assert_eq!(parse_seed_file(contents), vec!["http://a.com/"]);
    }
}
