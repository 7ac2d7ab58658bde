use mirror_core::Content;
use mirror_engine::{ContentParser, ContentSelectors};
use pretty_assertions::assert_eq;

const POST: &str = r#"<html><body>
  <div class="POST_TTL">
    Agile and you
  </div>
  <div class="POST_INFO"><a class="time" href="/1"> 2009/01/01 10:00 </a></div>
  <div class="POST_BODY"><p>First <b>paragraph</b></p></div>
</body></html>"#;

#[test]
fn extracts_all_three_markers() {
    let content = ContentParser::default().parse(POST).expect("post markers present");
    assert_eq!(
        content,
        Content {
            title: "Agile and you".to_string(),
            body: "<p>First <b>paragraph</b></p>".to_string(),
            created_at: Some("2009/01/01 10:00".to_string()),
        }
    );
}

#[test]
fn missing_time_is_not_fatal() {
    let html = r#"<div class="POST_TTL">T</div><div class="POST_BODY">B</div>"#;
    let content = ContentParser::default().parse(html).unwrap();
    assert_eq!(content.title, "T");
    assert_eq!(content.body, "B");
    assert_eq!(content.created_at, None);
}

#[test]
fn empty_time_counts_as_missing() {
    let html = r#"<div class="POST_TTL">T</div><div class="POST_BODY">B</div><a class="time">  </a>"#;
    let content = ContentParser::default().parse(html).unwrap();
    assert_eq!(content.created_at, None);
}

#[test]
fn page_without_title_or_body_has_no_content() {
    let parser = ContentParser::default();
    assert_eq!(parser.parse(r#"<div class="POST_BODY">B</div>"#), None);
    assert_eq!(parser.parse(r#"<div class="POST_TTL">T</div>"#), None);
    assert_eq!(parser.parse("<html><body>Page not found</body></html>"), None);
}

#[test]
fn first_match_wins() {
    let html = r#"<div class="POST_TTL">One</div><div class="POST_TTL">Two</div><div class="POST_BODY">B</div>"#;
    assert_eq!(ContentParser::default().parse(html).unwrap().title, "One");
}

#[test]
fn custom_selectors_are_used() {
    let parser = ContentParser::new(ContentSelectors {
        title: "h1".to_string(),
        body: "article".to_string(),
        created_at: "time".to_string(),
    })
    .unwrap();
    let content = parser
        .parse("<h1>Hi</h1><article>Text</article><time>today</time>")
        .unwrap();
    assert_eq!(content.title, "Hi");
    assert_eq!(content.body, "Text");
    assert_eq!(content.created_at.as_deref(), Some("today"));
}

#[test]
fn invalid_selector_is_rejected_up_front() {
    let err = ContentParser::new(ContentSelectors {
        title: "div[".to_string(),
        ..ContentSelectors::default()
    })
    .unwrap_err();
    assert_eq!(err.selector, "div[");
}

#[test]
fn invalid_time_selector_is_rejected_up_front() {
    let err = ContentParser::new(ContentSelectors {
        created_at: "a..time".to_string(),
        ..ContentSelectors::default()
    })
    .unwrap_err();
    assert_eq!(err.selector, "a..time");
}

#[test]
fn one_parser_serves_many_pages() {
    let parser = ContentParser::default();
    let shared = parser.clone();
    for title in ["First", "Second"] {
        let html = format!(
            r#"<div class="POST_TTL">{title}</div><div class="POST_BODY">x</div>"#
        );
        assert_eq!(shared.parse(&html).unwrap().title, title);
    }
    assert_eq!(parser.selectors(), &ContentSelectors::default());
}
