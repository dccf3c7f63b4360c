//! Live-page host: reads the page through web-sys and stages fragments in
//! a hidden shadow root.

use domshot_capture::{
    CaptureError, ComputedStyle, LiveDocument, Rect, StagedFragment, StagingArea,
};
use domshot_dom::{is_serializable_attribute, Boundary, Document, NodeId, SelectionRange};
use futures::channel::oneshot;
use std::collections::HashMap;
use std::future::Future;
use tracing::debug;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Element, HtmlElement, Node, ShadowRootInit, ShadowRootMode, Window};

const STAGING_STYLE: &str = "height: 1px; overflow: auto; visibility: hidden; position: absolute;";

pub fn staging_id(prefix: &str) -> String {
    format!("{}_tmp", prefix)
}

pub fn dom_rect(rect: &web_sys::DomRect) -> Rect {
    Rect::new(rect.x(), rect.y(), rect.width(), rect.height())
}

/// Current selection's first range, if there is one
pub fn current_range(window: &Window) -> Option<web_sys::Range> {
    let selection = window.get_selection().ok()??;
    if selection.range_count() == 0 {
        return None;
    }
    selection.get_range_at(0).ok()
}

pub fn clear_selection(window: &Window) {
    if let Ok(Some(selection)) = window.get_selection() {
        let _ = selection.remove_all_ranges();
    }
}

/// Arena copy of `document.body` with a handle back to every live node.
pub struct WebHost {
    window: Window,
    page: web_sys::Document,
    document: Document,
    live: HashMap<NodeId, Node>,
    staging_id: String,
    staging: Option<HtmlElement>,
}

impl WebHost {
    /// Copies the current body. The staging root of an earlier capture is
    /// left out.
    pub fn snapshot(window: Window, prefix: &str) -> Result<Self, JsValue> {
        let page = window
            .document()
            .ok_or_else(|| JsValue::from_str("document unavailable"))?;
        let body = page
            .body()
            .ok_or_else(|| JsValue::from_str("document has no body"))?;

        let mut host = Self {
            window,
            page,
            document: Document::new(),
            live: HashMap::new(),
            staging_id: staging_id(prefix),
            staging: None,
        };

        let root = host.document.body();
        copy_attributes(&mut host.document, root, &body)?;
        host.live.insert(root, body.clone().into());

        let mut stack: Vec<(Node, NodeId)> = vec![(body.into(), root)];
        while let Some((node, id)) = stack.pop() {
            let children = node.child_nodes();
            for index in 0..children.length() {
                let Some(child) = children.item(index) else {
                    continue;
                };
                let Some(child_id) = host.import_node(&child)? else {
                    continue;
                };
                host.document
                    .append_child(id, child_id)
                    .map_err(|e| JsValue::from_str(&e.to_string()))?;
                host.live.insert(child_id, child.clone());
                if host.document.is_element(child_id) {
                    stack.push((child, child_id));
                }
            }
        }

        debug!(nodes = host.document.len(), "Snapshotted live body");
        Ok(host)
    }

    fn import_node(&mut self, node: &Node) -> Result<Option<NodeId>, JsValue> {
        match node.node_type() {
            Node::ELEMENT_NODE => {
                let element: &Element = node.unchecked_ref();
                if element.id() == self.staging_id {
                    return Ok(None);
                }
                let id = self.document.create_element(element.local_name());
                copy_attributes(&mut self.document, id, element)?;
                Ok(Some(id))
            }
            Node::TEXT_NODE => Ok(Some(
                self.document.create_text(node.node_value().unwrap_or_default()),
            )),
            Node::COMMENT_NODE => Ok(Some(
                self.document
                    .create_comment(node.node_value().unwrap_or_default()),
            )),
            _ => Ok(None),
        }
    }

    fn lookup(&self, node: &Node) -> Option<NodeId> {
        self.live
            .iter()
            .find(|(_, live)| live.is_same_node(Some(node)))
            .map(|(id, _)| *id)
    }

    fn live_element(&self, id: NodeId) -> Option<&Element> {
        self.live.get(&id)?.dyn_ref::<Element>()
    }

    fn staging_root(&self) -> Option<HtmlElement> {
        self.page
            .get_element_by_id(&self.staging_id)?
            .dyn_into::<HtmlElement>()
            .ok()
    }
}

/// Framework attributes such as `@click` or `x-on:click` have no XML form
/// and are left behind.
fn copy_attributes(doc: &mut Document, id: NodeId, element: &Element) -> Result<(), JsValue> {
    let data = doc
        .element_mut(id)
        .map_err(|e| JsValue::from_str(&e.to_string()))?;
    let attributes = element.attributes();
    for index in 0..attributes.length() {
        let Some(attr) = attributes.item(index) else {
            continue;
        };
        let name = attr.name();
        if is_serializable_attribute(&name) {
            data.set_attribute(name, attr.value());
        }
    }
    Ok(())
}

impl LiveDocument for WebHost {
    fn document(&self) -> &Document {
        &self.document
    }

    fn selection(&self) -> Option<SelectionRange> {
        let range = current_range(&self.window)?;
        let start = self.lookup(&range.start_container().ok()?)?;
        let end = self.lookup(&range.end_container().ok()?)?;
        Some(SelectionRange::new(
            Boundary::new(start, range.start_offset().ok()? as usize),
            Boundary::new(end, range.end_offset().ok()? as usize),
        ))
    }

    fn computed_style(&self, node: NodeId) -> Option<ComputedStyle> {
        let element = self.live_element(node)?;
        let declaration = self.window.get_computed_style(element).ok()??;
        let mut style = ComputedStyle::new();
        for index in 0..declaration.length() {
            let property = declaration.item(index);
            if property.is_empty() {
                continue;
            }
            let value = declaration
                .get_property_value(&property)
                .unwrap_or_default();
            style.push(property, value);
        }
        Some(style)
    }

    fn bounding_rect(&self, node: NodeId) -> Option<Rect> {
        let element = self.live_element(node)?;
        Some(dom_rect(&element.get_bounding_client_rect()))
    }

    fn range_rect(&self, _range: &SelectionRange) -> Option<Rect> {
        let range = current_range(&self.window)?;
        Some(dom_rect(&range.get_bounding_client_rect()))
    }

    fn page_url(&self) -> Option<String> {
        self.page.url().ok()
    }
}

impl StagingArea for WebHost {
    fn mount(&mut self, fragment: &StagedFragment) -> domshot_capture::Result<()> {
        let host_error = |e: JsValue| CaptureError::Host(format!("{:?}", e));

        self.unmount();
        let body = self
            .page
            .body()
            .ok_or_else(|| CaptureError::Host("document has no body".to_string()))?;

        let staging: HtmlElement = self
            .page
            .create_element("div")
            .map_err(host_error)?
            .unchecked_into();
        staging.set_id(&self.staging_id);
        staging
            .set_attribute("style", STAGING_STYLE)
            .map_err(host_error)?;
        body.append_child(&staging).map_err(host_error)?;

        let shadow = staging
            .attach_shadow(&ShadowRootInit::new(ShadowRootMode::Open))
            .map_err(host_error)?;
        shadow.set_inner_html(&fragment.markup);

        debug!(root = %fragment.root_marker, "Mounted staging root");
        self.staging = Some(staging);
        Ok(())
    }

    fn next_frame(&mut self) -> impl Future<Output = ()> {
        let (tx, rx) = oneshot::channel::<()>();
        let callback = Closure::once_into_js(move || {
            let _ = tx.send(());
        });
        // If scheduling fails the sender is dropped and the wait ends at once
        let _ = self
            .window
            .request_animation_frame(callback.unchecked_ref());
        async move {
            let _ = rx.await;
        }
    }

    fn staged_rect(&self, marker: &str) -> Option<Rect> {
        let shadow = self.staging.as_ref()?.shadow_root()?;
        let element = shadow.query_selector(&format!(".{}", marker)).ok()??;
        Some(dom_rect(&element.get_bounding_client_rect()))
    }

    fn staging_rect(&self) -> Option<Rect> {
        let staging = self.staging.as_ref()?;
        Some(dom_rect(&staging.get_bounding_client_rect()))
    }

    fn unmount(&mut self) {
        if let Some(previous) = self.staging.take().or_else(|| self.staging_root()) {
            previous.remove();
        }
    }
}
