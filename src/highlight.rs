use std::{cell::RefCell, sync::OnceLock};
use tree_sitter_highlight::{HighlightConfiguration, HighlightEvent, Highlighter as Highlighter_};

type Configurations = dyn (Fn(&str) -> Option<&'static HighlightConfiguration>) + Send + Sync;
static CONFIGURATIONS: OnceLock<Box<Configurations>> = OnceLock::new();

thread_local!(static HIGHLIGHTER: RefCell<Highlighter> = RefCell::new(Highlighter::new()));

/// Tree-sitter highlight names. These are emitted as classes, with dots replaced by spaces, and
/// are given colors by `palette::Palette`.
pub static HIGHLIGHT_NAMES: &[&str] = &[
    "attribute",
    "constant",
    "comment",
    "function.builtin",
    "function",
    "keyword",
    "operator",
    "property",
    "punctuation",
    "string",
    "string.special",
    "tag",
    "type",
    "variable",
];

/// Languages highlighted without being listed in `prism.additional-languages`.
static DEFAULT_LANGUAGES: &[&str] = &["c", "cpp", "javascript", "typescript", "python", "rust"];

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("no grammar for this language")]
    InvalidLanguage,
    #[error("highlighting failed")]
    Other,
}

impl From<tree_sitter_highlight::Error> for Error {
    fn from(value: tree_sitter_highlight::Error) -> Self {
        match value {
            tree_sitter_highlight::Error::InvalidLanguage => Error::InvalidLanguage,
            _ => Error::Other,
        }
    }
}

/// Highlight query for the C# grammar.
const CSHARP_HIGHLIGHT_QUERY: &str = include_str!("queries/csharp-highlights.scm");

/// Map a code block language (or one of its aliases) to the name of its grammar.
fn canonical_language(language: &str) -> Option<&'static str> {
    Some(match language {
        "bash" | "sh" | "shell" => "bash",
        "c" => "c",
        "cpp" | "c++" => "cpp",
        "csharp" | "cs" | "c#" => "csharp",
        "nix" => "nix",
        "python" | "py" => "python",
        "rust" | "rs" => "rust",
        "toml" => "toml",
        "javascript" | "js" => "javascript",
        "typescript" | "ts" => "typescript",
        _ => return None,
    })
}

fn leak_configured(config: HighlightConfiguration) -> &'static HighlightConfiguration {
    let config = Box::leak::<'static>(Box::new(config));
    config.configure(HIGHLIGHT_NAMES);
    config
}

macro_rules! configuration {
    ($language:expr, $highlights:expr, $injections:expr, $locals:expr $(,)?) => {
        leak_configured(
            HighlightConfiguration::new($language, $highlights, $injections, $locals)
                .expect("bundled highlight queries are valid"),
        )
    };
}

fn init_configurations() -> Box<Configurations> {
    let bash_config = configuration!(
        tree_sitter_bash::language(),
        tree_sitter_bash::HIGHLIGHT_QUERY,
        "",
        "",
    );
    let c_config = configuration!(
        tree_sitter_c::language(),
        tree_sitter_c::HIGHLIGHT_QUERY,
        "",
        "",
    );
    let cpp_config = configuration!(
        tree_sitter_cpp::language(),
        tree_sitter_cpp::HIGHLIGHT_QUERY,
        "",
        "",
    );
    let csharp_config = match HighlightConfiguration::new(
        tree_sitter_c_sharp::language(),
        CSHARP_HIGHLIGHT_QUERY,
        "",
        "",
    ) {
        Ok(config) => Some(leak_configured(config)),
        Err(err) => {
            log::warn!("Invalid C# highlight query: {err:?}");
            None
        }
    };
    let nix_config = configuration!(
        tree_sitter_nix::language(),
        tree_sitter_nix::HIGHLIGHTS_QUERY,
        "",
        "",
    );
    let python_config = configuration!(
        tree_sitter_python::language(),
        tree_sitter_python::HIGHLIGHT_QUERY,
        "",
        "",
    );
    let rust_config = configuration!(
        tree_sitter_rust::language(),
        tree_sitter_rust::HIGHLIGHT_QUERY,
        tree_sitter_rust::INJECTIONS_QUERY,
        "",
    );
    let toml_config = configuration!(
        tree_sitter_toml::language(),
        tree_sitter_toml::HIGHLIGHT_QUERY,
        "",
        "",
    );
    let javascript_config = configuration!(
        tree_sitter_javascript::language(),
        tree_sitter_javascript::HIGHLIGHT_QUERY,
        "",
        tree_sitter_javascript::LOCALS_QUERY,
    );
    let typescript_config = {
        let highlights: String = [
            tree_sitter_javascript::HIGHLIGHT_QUERY,
            tree_sitter_typescript::HIGHLIGHT_QUERY,
        ]
        .into_iter()
        .collect();
        let locals: String = [
            tree_sitter_javascript::LOCALS_QUERY,
            tree_sitter_typescript::LOCALS_QUERY,
        ]
        .into_iter()
        .collect();
        configuration!(
            tree_sitter_typescript::language_typescript(),
            &highlights,
            "",
            &locals,
        )
    };

    let highlight_configurations = move |language: &'_ str| match canonical_language(language)? {
        "bash" => Some(bash_config),
        "c" => Some(c_config),
        "cpp" => Some(cpp_config),
        "csharp" => csharp_config,
        "nix" => Some(nix_config),
        "python" => Some(python_config),
        "rust" => Some(rust_config),
        "toml" => Some(toml_config),
        "javascript" => Some(javascript_config),
        "typescript" => Some(typescript_config),
        _ => None,
    };

    Box::new(highlight_configurations)
}

struct Highlighter {
    highlighter: Highlighter_,
    configurations: &'static Configurations,
}

impl Highlighter {
    pub fn new() -> Self {
        let configurations = CONFIGURATIONS.get_or_init(init_configurations);

        Highlighter {
            highlighter: Highlighter_::new(),
            configurations,
        }
    }
}

/// The set of code block languages that get highlighted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Languages {
    enabled: Vec<&'static str>,
}

impl Languages {
    /// The default languages plus `additional`. Additional languages without a bundled grammar are
    /// reported and skipped; their code blocks render as plain text.
    pub fn new(additional: &[String]) -> Self {
        let mut enabled = DEFAULT_LANGUAGES.to_vec();
        for language in additional {
            let configurations = CONFIGURATIONS.get_or_init(init_configurations);
            let canonical = canonical_language(language)
                .filter(|canonical| (*configurations)(*canonical).is_some());
            match canonical {
                Some(language) => {
                    if !enabled.contains(&language) {
                        enabled.push(language);
                    }
                }
                None => log::warn!(
                    "No grammar available for \"{language}\", its code blocks will not be highlighted"
                ),
            }
        }

        Languages { enabled }
    }

    pub fn is_enabled(&self, language: &str) -> bool {
        canonical_language(language).is_some_and(|language| self.enabled.contains(&language))
    }
}

pub enum Highlighted {
    /// The language is not highlighted. Contains the HTML-escaped code.
    Plain(String),
    Highlighted {
        language: &'static str,
        highlighted: String,
    },
}

fn escape(code: &str) -> String {
    let mut escaped = String::with_capacity(code.len());
    let _ = pulldown_cmark_escape::escape_html(&mut escaped, code);
    escaped
}

pub fn highlight(code: &str, language: &str, languages: &Languages) -> Result<Highlighted, Error> {
    let canonical = match canonical_language(language) {
        Some(canonical) if languages.is_enabled(canonical) => canonical,
        _ => return Ok(Highlighted::Plain(escape(code))),
    };
    let code = code.as_bytes();

    HIGHLIGHTER.with_borrow_mut(|this| {
        let config = (*this.configurations)(canonical).ok_or(Error::InvalidLanguage)?;
        let highlights = this
            .highlighter
            .highlight(config, code, None, |lang| (*this.configurations)(lang))?;

        let mut buf = Vec::with_capacity(code.len());
        for event in highlights {
            let event = event?;
            match event {
                HighlightEvent::Source { start, end } => {
                    for &char in code[start..end].iter() {
                        match tree_sitter_highlight::util::html_escape(char) {
                            Some(esc) => buf.extend_from_slice(esc),
                            None => buf.extend_from_slice(&[char]),
                        };
                    }
                }
                HighlightEvent::HighlightStart(s) => {
                    let mut class = std::borrow::Cow::Borrowed(HIGHLIGHT_NAMES[s.0]);
                    if class.contains('.') {
                        class = std::borrow::Cow::Owned(class.replace('.', " "));
                    }
                    buf.extend_from_slice(format!(r#"<span class="{class}">"#).as_bytes());
                }
                HighlightEvent::HighlightEnd => {
                    buf.extend_from_slice("</span>".as_bytes());
                }
            }
        }

        let highlighted = String::from_utf8(buf).map_err(|_| Error::Other)?;
        Ok(Highlighted::Highlighted {
            language: canonical,
            highlighted,
        })
    })
}

#[cfg(test)]
mod test {
    use super::{highlight, Highlighted, Languages};

    #[test]
    fn additional_languages() {
        let languages = Languages::new(&[
            "bash".to_owned(),
            "csharp".to_owned(),
            "powershell".to_owned(),
        ]);

        assert!(languages.is_enabled("rust"));
        assert!(languages.is_enabled("sh"));
        assert!(languages.is_enabled("csharp"));
        assert!(languages.is_enabled("cs"));
        assert!(languages.is_enabled("c#"));
        assert!(!languages.is_enabled("powershell"));
        assert!(!languages.is_enabled("toml"));
    }

    #[test]
    fn plain_code_is_escaped() {
        let languages = Languages::new(&[]);
        match highlight("<b>&</b>", "powershell", &languages).unwrap() {
            Highlighted::Plain(code) => assert_eq!(code, "&lt;b&gt;&amp;&lt;/b&gt;"),
            Highlighted::Highlighted { .. } => panic!("powershell has no grammar"),
        }
        match highlight("<b>&</b>", "csharp", &languages).unwrap() {
            Highlighted::Plain(_) => {}
            Highlighted::Highlighted { .. } => panic!("csharp is not enabled by default"),
        }
    }

    #[test]
    fn csharp_is_highlighted() {
        let languages = Languages::new(&["csharp".to_owned()]);
        let code = "class Programme\n{\n    // Bonjour\n    static void Main() => System.Console.WriteLine(\"C#\");\n}\n";
        match highlight(code, "cs", &languages).unwrap() {
            Highlighted::Highlighted {
                language,
                highlighted,
            } => {
                assert_eq!(language, "csharp");
                assert!(highlighted.contains(r#"<span class="keyword">class</span>"#));
                assert!(highlighted.contains(r#"<span class="comment">// Bonjour</span>"#));
                assert!(highlighted.contains(r#"<span class="string">&quot;C#&quot;</span>"#));
            }
            Highlighted::Plain(_) => panic!("csharp was enabled"),
        }
    }

    #[test]
    fn rust_is_highlighted() {
        let languages = Languages::new(&[]);
        match highlight("fn main() {}", "rs", &languages).unwrap() {
            Highlighted::Highlighted {
                language,
                highlighted,
            } => {
                assert_eq!(language, "rust");
                assert!(highlighted.contains(r#"<span class="keyword">fn</span>"#));
            }
            Highlighted::Plain(_) => panic!("rust is enabled by default"),
        }
    }
}
