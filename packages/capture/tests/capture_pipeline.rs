//! End-to-end captures against recorded pages

use domshot_capture::extract::extract_subtree;
use domshot_capture::snapshot::{PageSnapshot, SnapshotHost};
use domshot_capture::{
    CaptureConfig, CaptureError, CaptureOutput, CapturePhase, Capturer, ComputedStyle,
    LiveDocument, PreviewSink, Rect, Stage, StagedFragment, StagingArea,
};
use domshot_dom::{Document, NodeId, SelectionRange};
use serde_json::{json, Value};
use std::cell::RefCell;
use std::collections::HashSet;
use std::future::Future;

/// The entity preamble is a DTD, which roxmltree rejects unless asked
fn parse_svg(document: &str) -> roxmltree::Document<'_> {
    let options = roxmltree::ParsingOptions {
        allow_dtd: true,
        ..Default::default()
    };
    roxmltree::Document::parse_with_options(document, options).unwrap()
}

fn rect(x: f64, y: f64, width: f64, height: f64) -> Value {
    json!({ "x": x, "y": y, "width": width, "height": height })
}

/// body > section(-10px top margin) > [div(-4px), div], plus a sibling div
/// outside the selection. The selection runs from the first div's text to
/// the second's.
fn article_page() -> Value {
    json!({
        "url": "https://example.com/articles/1",
        "body": {
            "tag": "body",
            "rect": rect(0.0, 0.0, 800.0, 600.0),
            "children": [
                {
                    "tag": "section",
                    "attributes": { "id": "story", "class": "story wide", "data-id": "7" },
                    "style": { "display": "block", "marginTop": "-10px", "webkitTextSizeAdjust": "100%", "0": "display" },
                    "rect": rect(0.0, 100.0, 400.0, 200.0),
                    "children": [
                        {
                            "tag": "div",
                            "style": { "margin-top": "-4px", "color": "rgb(0, 0, 0)" },
                            "rect": rect(0.0, 100.0, 400.0, 50.0),
                            "children": [ { "text": "First\u{a0}para" } ]
                        },
                        {
                            "tag": "div",
                            "style": { "visibility": "visible" },
                            "rect": rect(0.0, 150.0, 400.0, 50.0),
                            "children": [
                                { "text": "Second " },
                                {
                                    "tag": "a",
                                    "attributes": { "href": "javascript:alert(1)" },
                                    "rect": rect(60.0, 150.0, 30.0, 20.0),
                                    "children": [ { "text": "run" } ]
                                },
                                { "text": " " },
                                {
                                    "tag": "a",
                                    "attributes": { "href": "../about" },
                                    "rect": rect(100.0, 150.0, 30.0, 20.0),
                                    "children": [ { "text": "about" } ]
                                },
                                { "tag": "br", "rect": rect(130.0, 150.0, 0.0, 20.0) },
                                { "tag": "script", "children": [ { "text": "track()" } ] }
                            ]
                        }
                    ]
                },
                {
                    "tag": "div",
                    "style": { "color": "blue" },
                    "rect": rect(0.0, 400.0, 400.0, 50.0),
                    "children": [ { "text": "Elsewhere" } ]
                }
            ]
        },
        "selection": {
            "start": { "path": [0, 0, 0], "offset": 0 },
            "end": { "path": [0, 1, 0], "offset": 6 },
            "rect": rect(0.0, 100.0, 400.0, 100.0)
        }
    })
}

fn host(page: Value) -> SnapshotHost {
    let snapshot: PageSnapshot = serde_json::from_value(page).unwrap();
    SnapshotHost::new(snapshot).unwrap()
}

fn crop() -> Rect {
    Rect::new(0.0, 100.0, 400.0, 100.0)
}

#[tokio::test]
async fn test_capture_article_selection() {
    let mut host = host(article_page());
    let mut capturer = Capturer::new(CaptureConfig::default());

    let output = capturer.capture(&mut host, crop()).await.unwrap();

    assert_eq!(capturer.phase(), CapturePhase::Composed);
    assert_eq!(host.frames(), 1);
    assert_eq!(output.mime_type, "image/svg+xml");
    assert!(output.file_name.starts_with("svgscreenshot3g_"));
    assert!(output.file_name.ends_with(".svg"));

    // Selected content survives, the sibling and the script do not
    assert!(output.markup.contains("First&nbsp;para"));
    assert!(output.markup.contains("Second "));
    assert!(!output.markup.contains("Elsewhere"));
    assert!(!output.markup.contains("track()"));
    assert!(output.markup.contains("<br class=\"__domshot_5\" />"));

    // Identifying attributes and foreign classes are gone
    assert!(!output.markup.contains("story"));
    assert!(!output.markup.contains("data-id"));
}

#[tokio::test]
async fn test_negative_margins_shift_root() {
    let mut host = host(article_page());
    let mut capturer = Capturer::new(CaptureConfig::default());

    let output = capturer.capture(&mut host, crop()).await.unwrap();

    // min(-10, -4) = -10, shifted by 10 + 2 * 8
    assert!(output
        .markup
        .contains("<style>.__domshot_0 { margin-top: 26px; }</style>"));
    // Container: folded 400 x 96, grown by twice the padding
    assert!(output
        .markup
        .contains(".__domshot_container { width: 416px; height: 112px;"));

    // Staged root expected at (9, 35); selection starts at the section origin
    assert_eq!(output.viewport, Rect::new(8.0, 27.0, 416.0, 116.0));
    assert!(output
        .markup
        .starts_with(r#"<svg width="416" height="116" viewBox="8 27 416 116""#));
}

#[tokio::test]
async fn test_single_paragraph_with_negative_margin() {
    let page = json!({
        "body": {
            "tag": "body",
            "children": [
                {
                    "tag": "p",
                    "style": { "marginTop": "-10px" },
                    "rect": rect(0.0, 20.0, 300.0, 18.0),
                    "children": [ { "text": "Just this line" } ]
                }
            ]
        },
        "selection": {
            "start": { "path": [0, 0], "offset": 0 },
            "end": { "path": [0, 0], "offset": 14 },
            "rect": rect(0.0, 20.0, 120.0, 18.0)
        }
    });
    let mut host = host(page);
    let mut capturer = Capturer::new(CaptureConfig::default());

    let output = capturer
        .capture(&mut host, Rect::new(0.0, 20.0, 120.0, 18.0))
        .await
        .unwrap();

    assert!(output
        .markup
        .contains("<style>.__domshot_0 { margin-top: 26px; }</style>"));
    // Nothing but the root was marked, so the selection box sizes the container
    assert!(output
        .markup
        .contains(".__domshot_container { width: 136px; height: 34px;"));
}

#[test]
fn test_marked_nodes_have_marked_ancestors() {
    let host = host(article_page());
    let document = host.document();
    let range = host.selection().unwrap();
    let common = range.common_ancestor_element(document).unwrap();

    let extraction = extract_subtree(document, common, "__domshot_").unwrap();
    let clone = &extraction.clone;

    assert_eq!(extraction.root.live, common);
    assert_eq!(
        extraction
            .marked
            .iter()
            .filter(|node| node.marker.index() == extraction.root_index)
            .count(),
        1
    );

    for node in &extraction.marked {
        assert!(clone.contains(extraction.wrapper, node.clone));
        for ancestor in clone.ancestors(node.clone) {
            if ancestor == extraction.wrapper {
                break;
            }
            let element = clone.element(ancestor).unwrap();
            assert!(
                element.classes().any(|c| c.starts_with("__domshot_")),
                "{} has an unmarked ancestor",
                node.marker
            );
        }
    }
}

#[tokio::test]
async fn test_style_rules_follow_document_order() {
    let mut host = host(article_page());
    let mut capturer = Capturer::new(CaptureConfig::default());

    let output = capturer.capture(&mut host, crop()).await.unwrap();
    let markup = &output.markup;

    let section = markup
        .find(".__domshot_0 { display: block; margin-top: -10px; }")
        .unwrap();
    let first = markup
        .find(".__domshot_1 { color: rgb(0, 0, 0); margin-top: -4px; }")
        .unwrap();
    assert!(section < first);

    // Index keys, webkit properties and visible visibility are dropped
    assert!(!markup.contains("webkit"));
    assert!(!markup.contains("visibility"));
    assert!(!markup.contains(".__domshot_2 {"));
}

#[tokio::test]
async fn test_links_are_neutralized() {
    let mut host = host(article_page());
    let mut capturer = Capturer::new(CaptureConfig::default());

    let output = capturer.capture(&mut host, crop()).await.unwrap();

    assert!(output
        .markup
        .contains(r##"<a href="#" class="__domshot_3">run</a>"##));
    assert!(output.markup.contains(
        r#"<a href="https://example.com/about" class="__domshot_4" target="_blank" rel="noreferrer noopener">about</a>"#
    ));
    assert!(output
        .markup
        .contains(r#"<base href="https://example.com/articles/1" />"#));
}

#[tokio::test]
async fn test_root_marker_is_unique_and_rules_have_targets() {
    let mut host = host(article_page());
    let config = CaptureConfig::default();
    let mut capturer = Capturer::new(config.clone());

    let output = capturer.capture(&mut host, crop()).await.unwrap();
    let document = parse_svg(&output.document);

    let classes: Vec<&str> = document
        .descendants()
        .filter_map(|node| node.attribute("class"))
        .collect();
    assert_eq!(
        classes.iter().filter(|class| **class == "__domshot_0").count(),
        1
    );

    for style in document
        .descendants()
        .filter(|node| node.has_tag_name("style"))
    {
        let css = style.text().unwrap_or_default();
        let Some(selector) = css.trim_start().strip_prefix('.') else {
            continue;
        };
        let class = selector.split_whitespace().next().unwrap();
        if class == "__domshot_container" {
            continue;
        }
        assert!(
            classes.iter().any(|c| c.split_whitespace().any(|c| c == class)),
            "rule for {} has no element",
            class
        );
    }
}

#[tokio::test]
async fn test_output_is_well_formed_xml() {
    let mut host = host(article_page());
    let mut capturer = Capturer::new(CaptureConfig::default());

    let output = capturer.capture(&mut host, crop()).await.unwrap();

    assert!(output
        .document
        .starts_with("<!DOCTYPE svg [\n<!ENTITY nbsp \"&#x00A0;\" >\n]>\n<svg "));
    let document = parse_svg(&output.document);
    let root = document.root_element();
    assert_eq!(root.tag_name().name(), "svg");
    assert!(document
        .descendants()
        .any(|node| node.text().map_or(false, |t| t.contains("First\u{a0}para"))));
}

#[tokio::test]
async fn test_framework_markup_stays_well_formed() {
    let page = json!({
        "url": "https://example.com/app",
        "body": {
            "tag": "body",
            "rect": rect(0.0, 0.0, 800.0, 600.0),
            "children": [
                {
                    "tag": "div",
                    "attributes": { "x-data": "{ open: false }" },
                    "rect": rect(0.0, 0.0, 200.0, 40.0),
                    "children": [
                        {
                            "tag": "button",
                            "attributes": {
                                "@click": "open = !open",
                                "x-on:keyup": "close()",
                                ":class": "{ active: open }",
                                "title": "Open\u{c}menu"
                            },
                            "rect": rect(10.0, 10.0, 80.0, 20.0),
                            "children": [ { "text": "Open\u{c}menu" } ]
                        }
                    ]
                }
            ]
        },
        "selection": {
            "start": { "path": [0, 0, 0], "offset": 0 },
            "end": { "path": [0, 0, 0], "offset": 4 },
            "rect": rect(10.0, 10.0, 40.0, 20.0)
        }
    });
    let mut host = host(page);
    let mut capturer = Capturer::new(CaptureConfig::default());

    let output = capturer
        .capture(&mut host, Rect::new(10.0, 10.0, 40.0, 20.0))
        .await
        .unwrap();

    assert!(!output.markup.contains("@click"));
    assert!(!output.markup.contains("x-on:"));
    assert!(!output.markup.contains(":class"));
    assert!(!output.markup.contains('\u{c}'));

    let document = parse_svg(&output.document);
    let button = document
        .descendants()
        .find(|node| node.has_tag_name("button"))
        .unwrap();
    assert_eq!(button.attribute("title"), Some("Openmenu"));
    assert_eq!(button.text(), Some("Openmenu"));
}

#[tokio::test]
async fn test_recorded_staging_geometry_is_used() {
    let mut page = article_page();
    page["staging"] = json!({
        "container": rect(-1000.0, 0.0, 0.0, 0.0),
        "root": rect(-970.0, 60.0, 400.0, 200.0)
    });
    let mut host = host(page);
    let mut capturer = Capturer::new(CaptureConfig::default());

    let output = capturer.capture(&mut host, crop()).await.unwrap();

    // 30 - 8 and 60 - 8
    assert_eq!(output.viewport, Rect::new(22.0, 52.0, 416.0, 116.0));
}

#[tokio::test]
async fn test_collapsed_selection_is_empty() {
    let mut page = article_page();
    page["selection"]["end"] = json!({ "path": [0, 0, 0], "offset": 0 });
    let mut host = host(page);
    let mut capturer = Capturer::new(CaptureConfig::default());

    let err = capturer.capture(&mut host, crop()).await.unwrap_err();

    assert_eq!(err, CaptureError::EmptySelection);
    assert_eq!(capturer.phase(), CapturePhase::Idle);
    assert!(host.mounted().is_none());
    assert_eq!(host.frames(), 0);
}

#[tokio::test]
async fn test_missing_selection_is_empty() {
    let mut page = article_page();
    page.as_object_mut().unwrap().remove("selection");
    let mut host = host(page);

    let err = Capturer::new(CaptureConfig::default())
        .capture(&mut host, crop())
        .await
        .unwrap_err();
    assert_eq!(err, CaptureError::EmptySelection);
}

#[tokio::test]
async fn test_missing_geometry_is_a_reconciliation_failure() {
    let mut page = article_page();
    page["body"]["children"][0]["children"][1]
        .as_object_mut()
        .unwrap()
        .remove("rect");
    let mut host = host(page);

    let err = Capturer::new(CaptureConfig::default())
        .capture(&mut host, crop())
        .await
        .unwrap_err();
    assert_eq!(err.stage(), Some(Stage::Reconciliation));
    assert!(host.mounted().is_none());
}

/// Snapshot host whose layout pass never produces the staged root
struct DetachedStaging(SnapshotHost);

impl LiveDocument for DetachedStaging {
    fn document(&self) -> &Document {
        self.0.document()
    }

    fn selection(&self) -> Option<SelectionRange> {
        self.0.selection()
    }

    fn computed_style(&self, node: NodeId) -> Option<ComputedStyle> {
        self.0.computed_style(node)
    }

    fn bounding_rect(&self, node: NodeId) -> Option<Rect> {
        self.0.bounding_rect(node)
    }

    fn range_rect(&self, range: &SelectionRange) -> Option<Rect> {
        self.0.range_rect(range)
    }
}

impl StagingArea for DetachedStaging {
    fn mount(&mut self, fragment: &StagedFragment) -> domshot_capture::Result<()> {
        self.0.mount(fragment)
    }

    fn next_frame(&mut self) -> impl Future<Output = ()> {
        self.0.next_frame()
    }

    fn staged_rect(&self, _marker: &str) -> Option<Rect> {
        None
    }

    fn staging_rect(&self) -> Option<Rect> {
        self.0.staging_rect()
    }

    fn unmount(&mut self) {
        self.0.unmount()
    }
}

#[tokio::test]
async fn test_measurement_failure_unmounts_staging() {
    let mut host = DetachedStaging(host(article_page()));
    let mut capturer = Capturer::new(CaptureConfig::default());

    let staged = capturer.stage(&mut host, crop()).unwrap();
    assert!(host.0.mounted().is_some());
    assert_eq!(host.0.mounted().unwrap().root_marker, "__domshot_0");

    host.next_frame().await;
    let err = capturer.finish(&mut host, &staged).unwrap_err();

    assert_eq!(err.stage(), Some(Stage::Measurement));
    assert!(host.0.mounted().is_none());
    assert_eq!(capturer.phase(), CapturePhase::Idle);
}

/// Hands out each node's computed style once, as if the page re-rendered
/// between the styling and reconciliation passes.
struct StaleStyles {
    inner: SnapshotHost,
    served: RefCell<HashSet<NodeId>>,
}

impl LiveDocument for StaleStyles {
    fn document(&self) -> &Document {
        self.inner.document()
    }

    fn selection(&self) -> Option<SelectionRange> {
        self.inner.selection()
    }

    fn computed_style(&self, node: NodeId) -> Option<ComputedStyle> {
        if self.served.borrow_mut().insert(node) {
            self.inner.computed_style(node)
        } else {
            None
        }
    }

    fn bounding_rect(&self, node: NodeId) -> Option<Rect> {
        self.inner.bounding_rect(node)
    }

    fn range_rect(&self, range: &SelectionRange) -> Option<Rect> {
        self.inner.range_rect(range)
    }
}

impl StagingArea for StaleStyles {
    fn mount(&mut self, fragment: &StagedFragment) -> domshot_capture::Result<()> {
        self.inner.mount(fragment)
    }

    fn next_frame(&mut self) -> impl Future<Output = ()> {
        self.inner.next_frame()
    }

    fn staged_rect(&self, marker: &str) -> Option<Rect> {
        self.inner.staged_rect(marker)
    }

    fn staging_rect(&self) -> Option<Rect> {
        self.inner.staging_rect()
    }

    fn unmount(&mut self) {
        self.inner.unmount()
    }
}

#[tokio::test]
async fn test_missing_style_fails_reconciliation() {
    let mut host = StaleStyles {
        inner: host(article_page()),
        served: RefCell::new(HashSet::new()),
    };
    let mut capturer = Capturer::new(CaptureConfig::default());

    let err = capturer.capture(&mut host, crop()).await.unwrap_err();

    assert_eq!(err.stage(), Some(Stage::Reconciliation));
    assert!(host.inner.mounted().is_none());
    assert_eq!(capturer.phase(), CapturePhase::Idle);
}

#[derive(Default)]
struct CollectingSink {
    presented: Vec<CaptureOutput>,
}

impl PreviewSink for CollectingSink {
    fn present(&mut self, output: &CaptureOutput) -> domshot_capture::Result<()> {
        self.presented.push(output.clone());
        Ok(())
    }
}

#[tokio::test]
async fn test_run_presents_and_keeps_staging_mounted() {
    let mut host = host(article_page());
    let mut sink = CollectingSink::default();
    let mut capturer = Capturer::new(CaptureConfig::default());

    let output = capturer.run(&mut host, &mut sink, crop()).await.unwrap();

    assert_eq!(capturer.phase(), CapturePhase::Cleaned);
    assert_eq!(sink.presented, vec![output]);
    assert!(host.mounted().is_some());

    // A second capture replaces the staged fragment instead of adding one
    let first = host.mounted().cloned();
    capturer.run(&mut host, &mut sink, crop()).await.unwrap();
    assert_eq!(host.mounted().cloned(), first);
    assert_eq!(sink.presented.len(), 2);
}
