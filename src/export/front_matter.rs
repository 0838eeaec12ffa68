//! YAML front matter rendering
//!
//! The header is written by hand rather than through a YAML serializer so
//! that key order, list style and quoting stay exactly what Hugo themes
//! built for the WordPress export expect. Every string that is not provably
//! safe as a plain scalar is double-quoted and escaped so that a YAML parser
//! reads back the same value.

use std::fmt::Write as _;

use chrono::NaiveDateTime;

use super::images::LocalImages;
use crate::content::ProductMeta;
use crate::models::WP_DATE_FORMAT;

/// How a header value is rendered
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Plain when YAML-safe, double-quoted otherwise
    Scalar(String),
    /// Always double-quoted
    Quoted(String),
    /// `YYYY-MM-DD HH:MM:SS`, unquoted
    Date(NaiveDateTime),
    /// Block sequence; `[]` when empty
    List(Vec<String>),
    /// Flow sequence of quoted items; `[]` when empty
    FlowList(Vec<String>),
    /// Literal block scalar for multi-line free text
    Text(String),
}

/// Ordered header fields
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrontMatter {
    fields: Vec<(String, FieldValue)>,
}

impl FrontMatter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`push`](Self::push)
    pub fn field(mut self, key: &str, value: FieldValue) -> Self {
        self.push(key, value);
        self
    }

    pub fn push(&mut self, key: &str, value: FieldValue) {
        self.fields.push((key.to_string(), value));
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    /// Render the header block, delimiters included
    pub fn render(&self) -> String {
        let mut out = String::from("---\n");
        for (key, value) in &self.fields {
            render_field(&mut out, key, value);
        }
        out.push_str("---\n");
        out
    }
}

/// Header fields of one exported record
#[derive(Debug, Clone, PartialEq)]
pub struct PageHeader {
    pub layout: String,
    pub title: String,
    pub slug: String,
    pub permalink: String,
    pub date: NaiveDateTime,
    pub categories: Vec<String>,
    pub featured_image: String,
    pub tags: Vec<String>,
    pub product: Option<ProductMeta>,
    /// Images saved into the page bundle, written as `images` for
    /// non-product records
    pub resources: Vec<String>,
}

impl PageHeader {
    /// Every image source the record references: the featured image, then
    /// product images not already listed
    pub fn image_sources(&self) -> Vec<String> {
        let mut sources = Vec::new();
        if !self.featured_image.is_empty() {
            sources.push(self.featured_image.clone());
        }
        if let Some(product) = &self.product {
            for image in &product.images {
                if !sources.contains(image) {
                    sources.push(image.clone());
                }
            }
        }
        sources
    }

    /// Point image keys at the bundle's local copies. Images that were not
    /// downloaded keep their remote URL.
    pub fn use_local_images(&mut self, images: &LocalImages) {
        self.featured_image = images.resolve(&self.featured_image);
        match &mut self.product {
            Some(product) => {
                for image in &mut product.images {
                    *image = images.resolve(image);
                }
            }
            None => self.resources = images.names(),
        }
    }

    /// Fixed key order: layout, title, slug, permalink, date, categories,
    /// featureImage, image, tags, then `images` for bundle resources or the
    /// product keys
    pub fn to_front_matter(&self) -> FrontMatter {
        let mut fm = FrontMatter::new()
            .field("layout", FieldValue::Scalar(self.layout.clone()))
            .field("title", FieldValue::Quoted(self.title.clone()))
            .field("slug", FieldValue::Quoted(self.slug.clone()))
            .field("permalink", FieldValue::Quoted(self.permalink.clone()))
            .field("date", FieldValue::Date(self.date))
            .field("categories", FieldValue::List(self.categories.clone()))
            .field("featureImage", FieldValue::Scalar(self.featured_image.clone()))
            .field("image", FieldValue::Scalar(self.featured_image.clone()))
            .field("tags", FieldValue::FlowList(self.tags.clone()));

        if self.product.is_none() && !self.resources.is_empty() {
            fm.push("images", FieldValue::List(self.resources.clone()));
        }
        if let Some(product) = &self.product {
            fm.push("sku", FieldValue::Quoted(product.sku.clone()));
            fm.push(
                "product_categories",
                FieldValue::List(product.categories.clone()),
            );
            fm.push("product_tags", FieldValue::List(product.tags.clone()));
            if let Some(link) = &product.buy_link {
                fm.push("buy_link", FieldValue::Scalar(link.clone()));
            }
            fm.push("images", FieldValue::List(product.images.clone()));
            if let Some(description) = &product.short_description {
                fm.push("description", FieldValue::Text(description.clone()));
            }
        }

        fm
    }
}

fn render_field(out: &mut String, key: &str, value: &FieldValue) {
    match value {
        FieldValue::Scalar(s) => {
            let _ = writeln!(out, "{}: {}", key, scalar(s));
        }
        FieldValue::Quoted(s) => {
            let _ = writeln!(out, "{}: {}", key, quote(s));
        }
        FieldValue::Date(dt) => {
            let _ = writeln!(out, "{}: {}", key, dt.format(WP_DATE_FORMAT));
        }
        FieldValue::List(items) if items.is_empty() => {
            let _ = writeln!(out, "{}: []", key);
        }
        FieldValue::List(items) => {
            let _ = writeln!(out, "{}:", key);
            for item in items {
                let _ = writeln!(out, "- {}", scalar(item));
            }
        }
        FieldValue::FlowList(items) => {
            let quoted: Vec<String> = items.iter().map(|item| quote(item)).collect();
            let _ = writeln!(out, "{}: [{}]", key, quoted.join(", "));
        }
        FieldValue::Text(text) => render_literal_block(out, key, text),
    }
}

/// Escape a string for use inside a YAML double-quoted scalar
///
/// Each newline becomes `\n` followed by an escaped line break and two spaces
/// of continuation indentation, so long values stay readable while parsing
/// back to the input string.
pub fn escape_yaml_string(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 8);
    let mut line_start = false;

    for ch in value.chars() {
        match ch {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n\\\n  "),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            // Leading blanks of a continuation line would be folded away
            ' ' if line_start => escaped.push_str("\\ "),
            '\u{2028}' => escaped.push_str("\\L"),
            '\u{2029}' => escaped.push_str("\\P"),
            c if c.is_control() || c == '\u{FEFF}' => {
                let _ = write!(escaped, "\\u{:04X}", c as u32);
            }
            c => escaped.push(c),
        }
        line_start = ch == '\n';
    }

    escaped
}

fn quote(value: &str) -> String {
    format!("\"{}\"", escape_yaml_string(value))
}

fn scalar(value: &str) -> String {
    if is_plain_safe(value) {
        value.to_string()
    } else {
        quote(value)
    }
}

fn is_special_char(c: char) -> bool {
    c.is_control() || matches!(c, '\u{2028}' | '\u{2029}' | '\u{FEFF}')
}

/// Whether `value` reads back as the same string when written unquoted
fn is_plain_safe(value: &str) -> bool {
    let Some(first) = value.chars().next() else {
        return false;
    };
    if value.trim() != value {
        return false;
    }
    if matches!(
        first,
        '-' | '?' | ':' | ',' | '[' | ']' | '{' | '}' | '#' | '&' | '*' | '!' | '|' | '>' | '\''
            | '"' | '%' | '@' | '`'
    ) {
        return false;
    }
    if value.contains(": ") || value.contains(" #") || value.ends_with(':') {
        return false;
    }
    if value.chars().any(is_special_char) {
        return false;
    }
    !resolves_to_non_string(value)
}

/// Values a YAML 1.1 or 1.2 parser would type as bool, null, number or date
fn resolves_to_non_string(value: &str) -> bool {
    let lower = value.to_ascii_lowercase();
    if matches!(
        lower.as_str(),
        "true" | "false" | "yes" | "no" | "on" | "off" | "y" | "n" | "null" | "~"
    ) {
        return true;
    }
    if ["0x", "0o", "0b", ".", "+.", "-."]
        .iter()
        .any(|prefix| lower.starts_with(prefix))
    {
        return true;
    }
    if value.parse::<f64>().is_ok() {
        return true;
    }
    value.starts_with(|c: char| c.is_ascii_digit())
        && value
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '-' | ':' | '.' | '_' | '+' | ' ' | 'T' | 't' | 'Z' | 'z'))
}

/// `key: |` literal block, two-space indented. Falls back to a quoted scalar
/// for text a block scalar cannot hold (carriage returns, control characters).
fn render_literal_block(out: &mut String, key: &str, text: &str) {
    let body = text.trim_end_matches('\n');
    let representable = !body.is_empty()
        && !text
            .chars()
            .any(|c| c != '\n' && c != '\t' && is_special_char(c));
    if !representable {
        let _ = writeln!(out, "{}: {}", key, quote(text));
        return;
    }

    let trailing_newlines = text.len() - body.len();
    let chomping = match trailing_newlines {
        0 => "-",
        1 => "",
        _ => "+",
    };

    // Auto-detected indentation would swallow leading spaces of the content,
    // and a leading tab cannot be told apart from indentation at all
    let needs_indicator = body
        .split('\n')
        .find(|line| !line.trim_start_matches(' ').is_empty())
        .is_some_and(|line| line.starts_with([' ', '\t']))
        || body
            .split('\n')
            .take_while(|line| line.trim_start_matches(' ').is_empty())
            .any(|line| !line.is_empty());
    let indicator = if needs_indicator { "2" } else { "" };

    let _ = writeln!(out, "{}: |{}{}", key, indicator, chomping);
    for line in body.split('\n') {
        if line.is_empty() {
            out.push('\n');
        } else {
            let _ = writeln!(out, "  {}", line);
        }
    }
    for _ in 1..trailing_newlines {
        out.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::images::ImageLocalizer;
    use crate::export::images::fake::StaticFetcher;
    use chrono::NaiveDate;

    fn date() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    /// Parse a rendered header back with a real YAML parser
    fn parse(rendered: &str) -> serde_yaml::Mapping {
        let inner = rendered
            .strip_prefix("---\n")
            .and_then(|s| s.strip_suffix("---\n"))
            .expect("header delimiters");
        serde_yaml::from_str(inner).expect("header is valid YAML")
    }

    fn header(title: &str) -> PageHeader {
        PageHeader {
            layout: "post".to_string(),
            title: title.to_string(),
            slug: "hello".to_string(),
            permalink: "/hello/".to_string(),
            date: date(),
            categories: vec!["News".to_string()],
            featured_image: String::new(),
            tags: Vec::new(),
            product: None,
            resources: Vec::new(),
        }
    }

    #[test]
    fn test_post_header_layout() {
        let rendered = header("A \"Quote\"").to_front_matter().render();
        assert_eq!(
            rendered,
            "---\n\
             layout: post\n\
             title: \"A \\\"Quote\\\"\"\n\
             slug: \"hello\"\n\
             permalink: \"/hello/\"\n\
             date: 2024-01-02 10:00:00\n\
             categories:\n\
             - News\n\
             featureImage: \"\"\n\
             image: \"\"\n\
             tags: []\n\
             ---\n"
        );
    }

    #[test]
    fn test_local_images_replace_remote_urls() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = StaticFetcher::new()
            .serve("https://img/feature.jpg", b"f")
            .serve("https://img/inline.png", b"i");
        let mut post = header("Hello");
        post.featured_image = "https://img/feature.jpg".to_string();
        let mut sources = post.image_sources();
        sources.push("https://img/inline.png".to_string());
        let local = ImageLocalizer::new(&fetcher, None).localize(&sources, dir.path());

        post.use_local_images(&local);
        let rendered = post.to_front_matter().render();
        assert!(rendered.contains(
            "featureImage: feature.jpg\nimage: feature.jpg\ntags: []\nimages:\n- feature.jpg\n- inline.png\n---\n"
        ));
    }

    #[test]
    fn test_local_images_map_product_gallery() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = StaticFetcher::new().serve("https://img/1.jpg", b"1");
        let mut widget = header("Widget");
        widget.featured_image = "https://img/1.jpg".to_string();
        widget.product = Some(ProductMeta {
            sku: String::new(),
            categories: Vec::new(),
            tags: Vec::new(),
            buy_link: None,
            images: vec!["https://img/1.jpg".to_string(), "https://img/2.jpg".to_string()],
            short_description: None,
        });
        assert_eq!(
            widget.image_sources(),
            vec!["https://img/1.jpg".to_string(), "https://img/2.jpg".to_string()]
        );

        let local = ImageLocalizer::new(&fetcher, None).localize(&widget.image_sources(), dir.path());
        widget.use_local_images(&local);
        let fm = widget.to_front_matter();
        assert_eq!(fm.keys().filter(|k| *k == "images").count(), 1);
        assert_eq!(
            fm.get("images"),
            Some(&FieldValue::List(vec![
                "1.jpg".to_string(),
                "https://img/2.jpg".to_string()
            ]))
        );
        assert!(widget.resources.is_empty());
    }

    #[test]
    fn test_escape_quotes_and_newlines() {
        assert_eq!(escape_yaml_string("A \"Quote\""), "A \\\"Quote\\\"");
        assert_eq!(escape_yaml_string("a\nb"), "a\\n\\\n  b");
        assert_eq!(escape_yaml_string("back\\slash"), "back\\\\slash");
        assert_eq!(escape_yaml_string("tab\there"), "tab\\there");
        assert_eq!(escape_yaml_string("a\n b"), "a\\n\\\n  \\ b");
        assert_eq!(escape_yaml_string(""), "");
    }

    #[test]
    fn test_title_round_trips_through_yaml() {
        let titles = [
            "A \"Quote\"\nwith a second line",
            "trailing newline\n",
            "\nleading newline",
            "indented\n   continuation",
            "windows\r\nline",
            "C:\\path\\to",
            "tab\tand bell\u{7}",
            "line\u{2028}separator",
            "emoji 🎉 and 中文",
            "key: value # not a comment",
        ];
        for title in titles {
            let mapping = parse(&header(title).to_front_matter().render());
            assert_eq!(
                mapping.get("title").and_then(|v| v.as_str()),
                Some(title),
                "title {:?} did not round-trip",
                title
            );
        }
    }

    #[test]
    fn test_empty_lists_are_explicit() {
        let rendered = FrontMatter::new()
            .field("categories", FieldValue::List(Vec::new()))
            .field("tags", FieldValue::FlowList(Vec::new()))
            .render();
        assert!(rendered.contains("categories: []\n"));
        assert!(rendered.contains("tags: []\n"));

        let mapping = parse(&rendered);
        let categories = mapping.get("categories").unwrap().as_sequence().unwrap();
        assert!(categories.is_empty());
    }

    #[test]
    fn test_flow_tags_quoted() {
        let rendered = FrontMatter::new()
            .field(
                "tags",
                FieldValue::FlowList(vec!["rust".to_string(), "say \"hi\"".to_string()]),
            )
            .render();
        assert!(rendered.contains("tags: [\"rust\", \"say \\\"hi\\\"\"]\n"));
        let mapping = parse(&rendered);
        let tags: Vec<&str> = mapping
            .get("tags")
            .unwrap()
            .as_sequence()
            .unwrap()
            .iter()
            .filter_map(|v| v.as_str())
            .collect();
        assert_eq!(tags, vec!["rust", "say \"hi\""]);
    }

    #[test]
    fn test_list_items_quoted_when_needed() {
        let items = vec![
            "News".to_string(),
            "2024".to_string(),
            "yes".to_string(),
            "- dash".to_string(),
            "a: b".to_string(),
            " padded".to_string(),
            "https://example.com/a.jpg?x=1#frag".to_string(),
            "0b101".to_string(),
            "+.inf".to_string(),
            "-.nan".to_string(),
        ];
        let rendered = FrontMatter::new()
            .field("categories", FieldValue::List(items.clone()))
            .render();
        assert!(rendered.contains("- News\n"));
        assert!(rendered.contains("- \"2024\"\n"));
        assert!(rendered.contains("- \"yes\"\n"));
        assert!(rendered.contains("- https://example.com/a.jpg?x=1#frag\n"));
        assert!(rendered.contains("- \"0b101\"\n"));
        assert!(rendered.contains("- \"+.inf\"\n"));

        let mapping = parse(&rendered);
        let parsed: Vec<String> = mapping
            .get("categories")
            .unwrap()
            .as_sequence()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap().to_string())
            .collect();
        assert_eq!(parsed, items);
    }

    #[test]
    fn test_description_literal_block() {
        let cases = [
            ("Line one\nLine two", "description: |-\n  Line one\n  Line two\n"),
            ("Single line\n", "description: |\n  Single line\n"),
            ("Ends with blanks\n\n", "description: |+\n  Ends with blanks\n\n"),
            ("  indented start", "description: |2-\n    indented start\n"),
            ("\tlead tab\nnext", "description: |2-\n  \tlead tab\n  next\n"),
        ];
        for (text, expected) in cases {
            let rendered = FrontMatter::new()
                .field("description", FieldValue::Text(text.to_string()))
                .render();
            assert!(
                rendered.contains(expected),
                "unexpected rendering for {:?}:\n{}",
                text,
                rendered
            );
            let mapping = parse(&rendered);
            assert_eq!(
                mapping.get("description").and_then(|v| v.as_str()),
                Some(text)
            );
        }
    }

    #[test]
    fn test_description_round_trips() {
        let texts = [
            "Paragraph one.\n\nParagraph two with \"quotes\" and a \\ backslash.",
            "<p>HTML <strong>markup</strong></p>\n<ul>\n  <li>item</li>\n</ul>",
            "   \n  starts with blank-ish line",
            "has\r\ncarriage returns",
            "# not a comment\n- not a list",
            "\tlead tab\nnext",
            "\n\tlead",
        ];
        for text in texts {
            let rendered = FrontMatter::new()
                .field("description", FieldValue::Text(text.to_string()))
                .field("after", FieldValue::Scalar("kept".to_string()))
                .render();
            let mapping = parse(&rendered);
            assert_eq!(
                mapping.get("description").and_then(|v| v.as_str()),
                Some(text),
                "description {:?} did not round-trip:\n{}",
                text,
                rendered
            );
            assert_eq!(mapping.get("after").and_then(|v| v.as_str()), Some("kept"));
        }
    }

    #[test]
    fn test_product_keys_follow_post_keys() {
        let mut header = header("Widget");
        header.featured_image = "https://img/1.jpg".to_string();
        header.product = Some(ProductMeta {
            sku: "W-1".to_string(),
            categories: vec!["Tools".to_string()],
            tags: Vec::new(),
            buy_link: Some("https://shop/buy?id=1".to_string()),
            images: vec!["https://img/1.jpg".to_string(), "https://img/2.jpg".to_string()],
            short_description: Some("Short".to_string()),
        });

        let fm = header.to_front_matter();
        let keys: Vec<&str> = fm.keys().collect();
        assert_eq!(
            keys,
            vec![
                "layout",
                "title",
                "slug",
                "permalink",
                "date",
                "categories",
                "featureImage",
                "image",
                "tags",
                "sku",
                "product_categories",
                "product_tags",
                "buy_link",
                "images",
                "description",
            ]
        );

        let rendered = fm.render();
        assert!(rendered.contains("featureImage: https://img/1.jpg\n"));
        assert!(rendered.contains("product_tags: []\n"));
        assert!(rendered.contains("images:\n- https://img/1.jpg\n- https://img/2.jpg\n"));
        let mapping = parse(&rendered);
        assert_eq!(mapping.get("sku").and_then(|v| v.as_str()), Some("W-1"));
    }

    #[test]
    fn test_optional_product_keys_omitted() {
        let mut header = header("Widget");
        header.product = Some(ProductMeta::default());
        let fm = header.to_front_matter();
        assert!(fm.get("buy_link").is_none());
        assert!(fm.get("description").is_none());
        assert_eq!(fm.get("images"), Some(&FieldValue::List(Vec::new())));
    }
}
