//! Console log handling: HTML console pages and line limits.

use crate::error::{JenkinsError, Result};

const CONSOLE_MARKER: &str = "console-output";

const ENTITIES: [(&str, &str); 6] = [
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&amp;", "&"),
    ("&quot;", "\""),
    ("&#39;", "'"),
    ("&nbsp;", " "),
];

/// Plain text of the `<pre class="console-output">` block of a console page.
///
/// Markup inside the block (colour spans, links) is dropped, `<br>` becomes a newline and
/// the common entities are decoded.
pub fn extract_console_text(html: &str) -> Result<String> {
    let marker = html.find(CONSOLE_MARKER).ok_or_else(|| {
        JenkinsError::ConsoleMarkup(format!(
            "failed to find <pre class=\"{CONSOLE_MARKER}\"> in response"
        ))
    })?;
    let open = html[..marker]
        .rfind("<pre")
        .ok_or_else(|| JenkinsError::ConsoleMarkup("failed to locate opening <pre> tag".into()))?;
    let start = html[open..]
        .find('>')
        .map(|end| open + end + 1)
        .ok_or_else(|| {
            JenkinsError::ConsoleMarkup("failed to locate end of <pre> opening tag".into())
        })?;
    let end = html[start..]
        .find("</pre>")
        .map(|close| start + close)
        .ok_or_else(|| JenkinsError::ConsoleMarkup("failed to locate closing </pre> tag".into()))?;

    Ok(unescape(&strip_tags(&html[start..end])))
}

fn strip_tags(markup: &str) -> String {
    let mut text = String::with_capacity(markup.len());
    let mut tag: Option<String> = None;

    for c in markup.chars() {
        if let Some(name) = tag.as_mut() {
            if c == '>' {
                let name = name.trim().to_ascii_lowercase();
                if name.starts_with("br") || name.starts_with("/br") {
                    text.push('\n');
                }
                tag = None;
            } else {
                name.push(c);
            }
            continue;
        }

        if c == '<' {
            tag = Some(String::new());
        } else {
            text.push(c);
        }
    }

    text
}

// Single pass, so "&amp;lt;" decodes to "&lt;" rather than "<".
fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(at) = rest.find('&') {
        out.push_str(&rest[..at]);
        let tail = &rest[at..];
        match ENTITIES.iter().find(|(entity, _)| tail.starts_with(entity)) {
            Some((entity, decoded)) => {
                out.push_str(decoded);
                rest = &tail[entity.len()..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

/// Which part of a log to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineLimit {
    All,
    Head(usize),
    Tail(usize),
}

impl LineLimit {
    /// `--tail` wins over `--head`; zero means unset.
    pub fn from_flags(head: usize, tail: usize) -> Self {
        if tail > 0 {
            Self::Tail(tail)
        } else if head > 0 {
            Self::Head(head)
        } else {
            Self::All
        }
    }

    /// The selected lines, and whether anything was cut.
    pub fn apply(self, text: &str) -> (Vec<&str>, bool) {
        let lines: Vec<&str> = text.lines().collect();
        match self {
            Self::Tail(n) if n < lines.len() => (lines[lines.len() - n..].to_vec(), true),
            Self::Head(n) if n < lines.len() => (lines[..n].to_vec(), true),
            _ => (lines, false),
        }
    }
}

/// A long log cut down to its first and last lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Excerpt<'a> {
    pub head: Vec<&'a str>,
    /// Lines dropped between `head` and `tail`
    pub omitted: usize,
    pub tail: Vec<&'a str>,
}

/// Keep `max_lines / 2` lines from each end of `text`. Zero keeps everything.
pub fn excerpt(text: &str, max_lines: usize) -> Excerpt<'_> {
    let lines: Vec<&str> = text.lines().collect();
    if max_lines == 0 || lines.len() <= max_lines {
        return Excerpt {
            head: lines,
            omitted: 0,
            tail: Vec::new(),
        };
    }

    let half = max_lines / 2;
    Excerpt {
        head: lines[..half].to_vec(),
        omitted: lines.len() - 2 * half,
        tail: lines[lines.len() - half..].to_vec(),
    }
}
