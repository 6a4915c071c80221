use anyhow::anyhow;
use std::path::{Path, PathBuf};

use crate::{front_matter::FrontMatter, Ctx};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, serde::Serialize)]
pub struct Date {
    pub year: u16,
    pub month: u8,
    pub day: u8,
}

impl Date {
    pub fn new(year: u16, month: u8, day: u8) -> Self {
        Date { year, month, day }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, serde::Serialize)]
pub struct Time {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl Time {
    pub fn new(hour: u8, minute: u8, second: u8) -> Self {
        Time {
            hour,
            minute,
            second,
        }
    }
}

/// Combine a date and optional time into a UTC timestamp. Returns `None` for dates or times that
/// do not exist, like February 30th.
pub fn to_date_time(date: Date, time: Option<Time>) -> Option<chrono::NaiveDateTime> {
    let time = time.unwrap_or(Time::new(0, 0, 0));
    chrono::NaiveDate::from_ymd_opt(date.year.into(), date.month.into(), date.day.into())?
        .and_hms_opt(time.hour.into(), time.minute.into(), time.second.into())
}

pub fn parse_date_time(value: &str) -> Result<(Date, Option<Time>), ()> {
    // formats:
    // 2024-04-26
    // or
    // 2024-04-26T123456
    if !(value.len() == 10 || value.len() == 17) {
        return Err(());
    }

    let mut date_values = value.get(..10).ok_or(())?.split('-');

    let year = date_values.next().ok_or(())?.parse().map_err(|_| ())?;
    let month = date_values.next().ok_or(())?.parse().map_err(|_| ())?;
    let day = date_values.next().ok_or(())?.parse().map_err(|_| ())?;

    let date = Date::new(year, month, day);

    let time = if value.len() == 17 {
        if !matches!(value.get(10..11), Some("T" | "t")) {
            return Err(());
        }

        let time: u32 = value.get(11..).ok_or(())?.parse().map_err(|_| ())?;
        let hour = time / 1_00_00;
        let minute = (time - hour * 1_00_00) / 1_00;
        let second = time - hour * 1_00_00 - minute * 1_00;

        Some(Time::new(hour as u8, minute as u8, second as u8))
    } else {
        None
    };

    to_date_time(date, time).ok_or(())?;
    Ok((date, time))
}

/// Splits a file name on the first underscore. If the part before the underscore is a datetime, it
/// is returned. The slug is the part after the underscore. If there is no underscore, the slug is
/// the entire file name.
fn file_name_into_date_and_slug(file_name: &str) -> (Option<(Date, Option<Time>)>, &str) {
    if let Some(idx) = file_name.find('_') {
        let key = &file_name[..idx];
        let slug = &file_name[idx + 1..];
        (parse_date_time(key).ok(), slug)
    } else {
        (None, file_name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all(deserialize = "kebab-case"))]
pub struct Author {
    pub name: String,
    pub title: Option<String>,
    pub url: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct Tag {
    pub label: String,
    pub description: Option<String>,
    pub slug: String,
    /// e.g., `/blog/tags/rust`
    pub route: String,
}

#[derive(Debug, serde::Serialize)]
pub struct PostMeta {
    #[serde(skip)]
    pub sort_key: String,
    pub date: Date,
    pub time: Option<Time>,
    pub slug: String,
    /// e.g., `blog/2024-10-02_foo-bar.md` or `blog/2024-10-02_foo-bar/index.md`
    #[serde(skip)]
    pub file_path: PathBuf,
    /// e.g., `blog/2024/10/02/foo-bar/index.html`
    #[serde(skip)]
    pub out_file: PathBuf,
    /// e.g., `/blog/2024/10/02/foo-bar`
    pub route: String,
    /// e.g., `https://example.com/blog/2024/10/02/foo-bar`
    pub permalink: String,
}

/// A rendered blog post, as handed to templates.
#[derive(Debug, serde::Serialize)]
pub struct Post {
    #[serde(flatten)]
    pub meta: PostMeta,
    pub title: String,
    pub description: Option<String>,
    pub authors: Vec<Author>,
    pub tags: Vec<Tag>,
    pub summary: String,
    pub content: String,
    pub truncated: bool,
    /// Estimated reading time in minutes.
    pub reading_time: u32,
    pub date_rfc2822: String,
    pub date_rfc3339: String,
    /// Files next to the post that it links to, relative to the post's directory.
    #[serde(skip)]
    pub assets: Vec<PathBuf>,
}

impl PostMeta {
    /// Derive a post's date, slug and output location from its file path. The front matter `date`
    /// and `slug` take precedence over the file name.
    pub fn from_path(
        ctx: &Ctx,
        blog_dir: &Path,
        blog_route: &Path,
        path: &Path,
        front_matter: &FrontMatter,
    ) -> anyhow::Result<Self> {
        // For posts in their own directory, take the directory name. For posts directly in the
        // blog directory, strip the file suffix.
        let file_name = {
            let relative = path.strip_prefix(blog_dir)?;
            let name = if relative.ends_with("index.md") {
                relative
                    .parent()
                    .and_then(Path::file_name)
                    .ok_or(anyhow!("post index file must be inside a directory"))?
            } else {
                relative
                    .file_stem()
                    .ok_or(anyhow!("path has no file name"))?
            };
            name.to_str()
                .ok_or(anyhow!("expected UTF-8 file name"))?
                .to_owned()
        };

        let (date_time, slug) = file_name_into_date_and_slug(&file_name);
        let date_time = match &front_matter.date {
            Some(date) => Some(parse_date_time(date).map_err(|_| {
                anyhow!("invalid front matter date {date:?}, expected yyyy-mm-dd or yyyy-mm-ddThhmmss")
            })?),
            None => date_time,
        };
        let (date, time) = date_time.ok_or_else(|| {
            anyhow!("blog post has no date, name it yyyy-mm-dd_slug.md or set `date` in its front matter")
        })?;

        let slug = front_matter.slug.as_deref().unwrap_or(slug);
        if slug.is_empty() || slug.contains('/') {
            anyhow::bail!("invalid blog post slug {slug:?}");
        }

        let out_dir = blog_route
            .join(format!("{:04}", date.year))
            .join(format!("{:02}", date.month))
            .join(format!("{:02}", date.day))
            .join(slug);
        let out_file = out_dir.join("index.html");

        Ok(PostMeta {
            sort_key: file_name.clone(),
            date,
            time,
            slug: slug.to_owned(),
            file_path: path.to_owned(),
            route: ctx.path_to_route(&out_file)?,
            permalink: ctx.path_to_absolute_url(&out_file)?,
            out_file,
        })
    }
}

#[cfg(test)]
mod test {
    #[test]
    fn parse_file_name() {
        use super::{file_name_into_date_and_slug, Date};

        assert_eq!(
            file_name_into_date_and_slug("2024-04-16_a-test_!"),
            (Some((Date::new(2024, 04, 16), None)), "a-test_!")
        );
        assert_eq!(
            file_name_into_date_and_slug("2024-04-16-a-test-!"),
            (None, "2024-04-16-a-test-!")
        );
        assert_eq!(
            file_name_into_date_and_slug("2024-04-26é12345_slug"),
            (None, "slug")
        );
        assert_eq!(file_name_into_date_and_slug("_"), (None, ""));
        assert_eq!(file_name_into_date_and_slug(""), (None, ""));
    }

    #[test]
    fn parse_date_time() {
        use super::{parse_date_time, Date, Time};

        let (date, time) = parse_date_time("2024-04-16").unwrap();
        assert!(time.is_none());
        assert_eq!(date, Date::new(2024, 4, 16));

        let (date, time) = parse_date_time("2024-04-16T094032").unwrap();
        assert_eq!(date, Date::new(2024, 4, 16));
        assert_eq!(time, Some(Time::new(9, 40, 32)));

        assert!(parse_date_time("2024-02-30").is_err());
        assert!(parse_date_time("2024-04-16T256032").is_err());
        assert!(parse_date_time("2024-04-16T0940320").is_err());
        assert!(parse_date_time("2024-04-16T").is_err());
        assert!(parse_date_time("202-04-16").is_err());
        assert!(parse_date_time("20240416").is_err());

        // Multibyte characters around the date and time boundaries.
        assert!(parse_date_time("2024-04-26é12345").is_err());
        assert!(parse_date_time("2024-04-2é123456").is_err());
        assert!(parse_date_time("2024-04-é1234567").is_err());
        assert!(parse_date_time("2024-04-26T1234é").is_err());
    }

    #[test]
    fn post_meta_from_path() {
        use super::PostMeta;
        use crate::front_matter::FrontMatter;
        use std::path::Path;

        let ctx = crate::tests::ctx();
        let blog_dir = Path::new("site").join("blog");

        let meta = PostMeta::from_path(
            &ctx,
            &blog_dir,
            Path::new("blog"),
            &blog_dir.join("2024-10-02_premier-article.md"),
            &FrontMatter::default(),
        )
        .unwrap();
        assert_eq!(meta.slug, "premier-article");
        assert_eq!(
            meta.out_file,
            Path::new("blog/2024/10/02/premier-article/index.html")
        );
        assert_eq!(meta.route, "/blog/2024/10/02/premier-article");
        assert_eq!(
            meta.permalink,
            "https://mickaelcrl.github.io/test-github-pages/blog/2024/10/02/premier-article"
        );

        let front_matter = FrontMatter {
            slug: Some("renamed".to_owned()),
            date: Some("2025-01-05".to_owned()),
            ..FrontMatter::default()
        };
        let meta = PostMeta::from_path(
            &ctx,
            &blog_dir,
            Path::new("blog"),
            &blog_dir.join("2024-10-02_in-a-dir").join("index.md"),
            &front_matter,
        )
        .unwrap();
        assert_eq!(meta.route, "/blog/2025/01/05/renamed");

        assert!(PostMeta::from_path(
            &ctx,
            &blog_dir,
            Path::new("blog"),
            &blog_dir.join("undated.md"),
            &FrontMatter::default(),
        )
        .is_err());
    }
}
