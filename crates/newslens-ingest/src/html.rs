//! Minimal HTML scanning: story links from a front page and visible text
//! from an article page.
//!
//! This is a forgiving tag scanner, not a conforming parser. It copes with
//! unquoted attributes, mixed-case tags and unterminated markup, which is
//! all a crawl of arbitrary pages needs.

use reqwest::Url;

use newslens_core::error::NewslensError;

/// Elements whose content is never shown and never contains links we want.
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Elements that do not break a line when rendered.
const INLINE_ELEMENTS: &[&str] = &[
    "a", "abbr", "b", "bdi", "bdo", "cite", "code", "data", "dfn", "em", "font", "i", "kbd",
    "mark", "q", "s", "samp", "small", "span", "strong", "sub", "sup", "time", "u", "var", "wbr",
];

#[derive(Debug, PartialEq)]
enum Token<'a> {
    Text(&'a str),
    Open { name: String, attrs: &'a str },
    Close { name: String },
}

fn tokenize(html: &str) -> Vec<Token<'_>> {
    let lower = html.to_ascii_lowercase();
    let bytes = lower.as_bytes();
    let mut tokens = Vec::new();
    let mut text_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'<' {
            i += 1;
            continue;
        }

        let rest = &lower[i..];
        let next = bytes.get(i + 1).copied().unwrap_or(b' ');

        let (token, end) = if rest.starts_with("<!--") {
            let end = rest[4..].find("-->").map(|p| i + 4 + p + 3).unwrap_or(bytes.len());
            (None, end)
        } else if next == b'!' || next == b'?' {
            (None, skip_to_gt(&lower, i))
        } else if next == b'/' {
            let name = tag_name(&lower[i + 2..]);
            if name.is_empty() {
                i += 1;
                continue;
            }
            (Some(Token::Close { name }), skip_to_gt(&lower, i))
        } else if next.is_ascii_alphabetic() {
            let name = tag_name(&lower[i + 1..]);
            let attrs_start = i + 1 + name.len();
            let attrs_end = lower[attrs_start..]
                .find('>')
                .map(|p| attrs_start + p)
                .unwrap_or(bytes.len());
            let attrs = &html[attrs_start..attrs_end];
            let end = (attrs_end + 1).min(bytes.len());
            if HIDDEN_ELEMENTS.contains(&name.as_str()) {
                let closing = format!("</{}", name);
                let end = lower[end..]
                    .find(&closing)
                    .map(|p| skip_to_gt(&lower, end + p))
                    .unwrap_or(bytes.len());
                (None, end)
            } else {
                (Some(Token::Open { name, attrs }), end)
            }
        } else {
            // A stray '<' in text.
            i += 1;
            continue;
        };

        if text_start < i {
            tokens.push(Token::Text(&html[text_start..i]));
        }
        if let Some(token) = token {
            tokens.push(token);
        }
        i = end;
        text_start = end;
    }

    if text_start < html.len() {
        tokens.push(Token::Text(&html[text_start..]));
    }
    tokens
}

/// Byte offset just past the next '>' at or after `from`, or the end.
fn skip_to_gt(lower: &str, from: usize) -> usize {
    lower[from..]
        .find('>')
        .map(|p| from + p + 1)
        .unwrap_or(lower.len())
}

fn tag_name(s: &str) -> String {
    s.chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect()
}

/// Value of attribute `name` inside a tag's attribute text.
fn attr_value(attrs: &str, name: &str) -> Option<String> {
    let lower = attrs.to_ascii_lowercase();
    let bytes = lower.as_bytes();
    let mut from = 0;

    while let Some(rel) = lower[from..].find(name) {
        let at = from + rel;
        from = at + name.len();
        if at > 0 && !bytes[at - 1].is_ascii_whitespace() {
            continue;
        }

        let mut j = at + name.len();
        while j < bytes.len() && bytes[j].is_ascii_whitespace() {
            j += 1;
        }
        if bytes.get(j) != Some(&b'=') {
            continue;
        }
        j += 1;
        while j < bytes.len() && bytes[j].is_ascii_whitespace() {
            j += 1;
        }

        let value = match bytes.get(j) {
            Some(&q) if q == b'"' || q == b'\'' => {
                let start = j + 1;
                let end = lower[start..]
                    .find(q as char)
                    .map(|p| start + p)
                    .unwrap_or(bytes.len());
                &attrs[start..end]
            }
            Some(_) => {
                let end = lower[j..]
                    .find(|c: char| c.is_ascii_whitespace())
                    .map(|p| j + p)
                    .unwrap_or(bytes.len());
                &attrs[j..end]
            }
            None => "",
        };
        return Some(decode_entities(value));
    }
    None
}

fn has_class(attrs: &str, classes: &[String]) -> bool {
    attr_value(attrs, "class")
        .map(|v| v.split_whitespace().any(|c| classes.iter().any(|k| k == c)))
        .unwrap_or(false)
}

/// Extract up to `n` story links from a front page, in page order.
///
/// An anchor is a story link if it carries one of `link_classes`, or if it
/// is the first anchor after an element carrying one. Relative links are
/// resolved against `base_url`; anything that does not resolve to http(s)
/// is dropped, as are duplicates.
pub fn extract_story_links(
    html: &str,
    base_url: &str,
    link_classes: &[String],
    n: usize,
) -> Result<Vec<String>, NewslensError> {
    let base = Url::parse(base_url)
        .map_err(|e| NewslensError::Parse(format!("Invalid base URL {}: {}", base_url, e)))?;

    let mut links: Vec<String> = Vec::new();
    let mut marker_open = false;

    for token in tokenize(html) {
        if links.len() >= n {
            break;
        }
        let Token::Open { name, attrs } = token else {
            continue;
        };

        let classed = has_class(attrs, link_classes);
        if name != "a" {
            marker_open |= classed;
            continue;
        }
        if !(classed || marker_open) {
            continue;
        }
        marker_open = false;

        let Some(href) = attr_value(attrs, "href") else {
            continue;
        };
        let Ok(resolved) = base.join(href.trim()) else {
            continue;
        };
        if !matches!(resolved.scheme(), "http" | "https") {
            continue;
        }
        let resolved = resolved.to_string();
        if !links.contains(&resolved) {
            links.push(resolved);
        }
    }

    Ok(links)
}

/// All human-visible text of a page, entities decoded and whitespace runs
/// collapsed to single spaces.
pub fn extract_visible_text(html: &str) -> String {
    let mut raw = String::with_capacity(html.len() / 2);
    for token in tokenize(html) {
        match token {
            Token::Text(t) => raw.push_str(&decode_entities(t)),
            Token::Open { name, .. } | Token::Close { name } => {
                if !INLINE_ELEMENTS.contains(&name.as_str()) {
                    raw.push(' ');
                }
            }
        }
    }
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }

    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];

        let decoded = rest[1..]
            .find(';')
            .filter(|&semi| semi > 0 && semi <= 10)
            .and_then(|semi| decode_entity(&rest[1..1 + semi]).map(|c| (c, semi + 2)));

        match decoded {
            Some((c, len)) => {
                out.push(c);
                rest = &rest[len..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(entity: &str) -> Option<char> {
    if let Some(num) = entity.strip_prefix('#') {
        let code = match num.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse::<u32>().ok()?,
        };
        return char::from_u32(code);
    }
    Some(match entity {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => ' ',
        "mdash" => '\u{2014}',
        "ndash" => '\u{2013}',
        "hellip" => '\u{2026}',
        "rsquo" => '\u{2019}',
        "lsquo" => '\u{2018}',
        "rdquo" => '\u{201D}',
        "ldquo" => '\u{201C}',
        "copy" => '\u{00A9}',
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classes() -> Vec<String> {
        vec!["titleline".to_string(), "storylink".to_string()]
    }

    const FRONT_PAGE: &str = r#"
        <html><body><table>
        <tr class="athing"><td class="title">
          <span class="titleline"><a href="https://one.example/post">One</a>
            <span class="sitebit comhead"> (<a href="from?site=one.example">one.example</a>)</span>
          </span></td></tr>
        <tr class="athing"><td class="title">
          <span class="titleline"><a href="item?id=42">Ask: two</a></span></td></tr>
        <tr class="athing"><td class="title">
          <a class="storylink" href='https://three.example/?a=1&amp;b=2'>Three</a></td></tr>
        <tr><td><a href="https://not-a-story.example/">login</a></td></tr>
        <tr class="athing"><td class="title">
          <span class="titleline"><a href="https://one.example/post">One again</a></span></td></tr>
        </table></body></html>
    "#;

    #[test]
    fn test_story_links_in_page_order() {
        let links =
            extract_story_links(FRONT_PAGE, "https://news.example", &classes(), 10).unwrap();
        assert_eq!(
            links,
            vec![
                "https://one.example/post",
                "https://news.example/item?id=42",
                "https://three.example/?a=1&b=2",
            ]
        );
    }

    #[test]
    fn test_story_links_limited_to_n() {
        let links = extract_story_links(FRONT_PAGE, "https://news.example", &classes(), 2).unwrap();
        assert_eq!(links.len(), 2);
        assert_eq!(links[0], "https://one.example/post");
    }

    #[test]
    fn test_story_links_none_found() {
        let links =
            extract_story_links("<p>nothing here</p>", "https://news.example", &classes(), 5)
                .unwrap();
        assert!(links.is_empty());
    }

    #[test]
    fn test_story_links_skip_non_http() {
        let html = r#"<span class="titleline"><a href="javascript:void(0)">x</a></span>
                      <span class="titleline"><a href="mailto:a@b.c">y</a></span>"#;
        let links = extract_story_links(html, "https://news.example", &classes(), 5).unwrap();
        assert!(links.is_empty());
    }

    #[test]
    fn test_story_links_bad_base_url() {
        assert!(matches!(
            extract_story_links("", "not a url", &classes(), 5),
            Err(NewslensError::Parse(_))
        ));
    }

    #[test]
    fn test_visible_text_drops_scripts_and_markup() {
        let html = r#"<html><head><title>T</title><style>p { color: red }</style>
            <script>var x = "<p>hidden</p>";</script></head>
            <body><!-- comment --><h1>Hello</h1><p>Rust &amp; <b>friends</b>&#33;</p>
            <noscript>enable js</noscript><p>Second&nbsp;para</p></body></html>"#;
        assert_eq!(
            extract_visible_text(html),
            "T Hello Rust & friends! Second para"
        );
    }

    #[test]
    fn test_visible_text_inline_tags_do_not_split_words() {
        assert_eq!(extract_visible_text("<p>un<em>break</em>able</p>"), "unbreakable");
    }

    #[test]
    fn test_visible_text_of_plain_text() {
        assert_eq!(extract_visible_text("  just   text \n here "), "just text here");
        assert_eq!(extract_visible_text(""), "");
    }

    #[test]
    fn test_visible_text_tolerates_broken_markup() {
        assert_eq!(extract_visible_text("a < b and <p>c"), "a < b and c");
        assert_eq!(extract_visible_text("<div>open <script>never closed"), "open");
    }

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("a &lt;b&gt; &#x41;&#66;"), "a <b> AB");
        assert_eq!(decode_entities("AT&T &unknown; &"), "AT&T &unknown; &");
    }

    #[test]
    fn test_attr_value_variants() {
        assert_eq!(attr_value(r#" href="x" "#, "href").as_deref(), Some("x"));
        assert_eq!(attr_value(" HREF = 'y'", "href").as_deref(), Some("y"));
        assert_eq!(attr_value(" href=z class=c", "href").as_deref(), Some("z"));
        assert_eq!(attr_value(r#" data-href="no""#, "href"), None);
    }
}
