use serde::Deserialize;

use crate::types::Author;

/// An author as written in front matter: either a key into `authors.toml` or an inline author.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum AuthorRef {
    Key(String),
    Inline(Author),
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FrontMatter {
    pub title: Option<String>,
    pub description: Option<String>,
    pub slug: Option<String>,
    /// `yyyy-mm-dd` or `yyyy-mm-ddThhmmss`. Must be quoted in TOML front matter.
    pub date: Option<String>,
    pub authors: Vec<AuthorRef>,
    pub tags: Vec<String>,
    pub draft: bool,
}

fn parse_block<T>(block: &str, parse: impl FnOnce(&str) -> anyhow::Result<T>) -> anyhow::Result<Option<T>> {
    if block.trim().is_empty() {
        Ok(None)
    } else {
        parse(block).map(Some)
    }
}

/// Parses front matter from the content string. Returns the front matter and the rest of the
/// content.
pub fn parse_front_matter(content: &str) -> anyhow::Result<(FrontMatter, &str)> {
    let mut parsed: Option<FrontMatter> = None;
    let mut rest = content;

    if content.starts_with("+++") {
        if let Some(end) = content[3..].find("\n+++").map(|idx| idx + 3) {
            parsed = parse_block(&content[3..end + 1], |block| Ok(toml::from_str(block)?))?;
            rest = &content[end + 4..];
        }
    } else if content.starts_with("---") {
        if let Some(end) = content[3..].find("\n---").map(|idx| idx + 3) {
            parsed = parse_block(&content[3..end + 1], |block| {
                Ok(serde_yaml::from_str(block)?)
            })?;
            rest = &content[end + 4..];
        }
    }

    Ok((parsed.unwrap_or_default(), rest))
}
