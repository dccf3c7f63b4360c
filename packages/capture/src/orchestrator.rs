//! Capture coordination: stage, wait one frame, measure, compose.

use crate::compose::{self, ViewportInputs};
use crate::config::CaptureConfig;
use crate::extract::{self, Extraction, MarkerTag};
use crate::geometry::Rect;
use crate::host::{LiveDocument, PreviewSink, StagedFragment, StagingArea};
use crate::reconcile::{Reconciler, Reconciliation};
use crate::sanitize::sanitize;
use crate::style::{snapshot_style, StyleRule};
use crate::{CaptureError, Result, Stage};
use domshot_dom::{outer_html, NodeId};
use std::fmt;
use tracing::{debug, info, instrument, warn};
use url::Url;

pub const SVG_MIME_TYPE: &str = "image/svg+xml";

/// Where a [`Capturer`] is in its most recent capture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CapturePhase {
    #[default]
    Idle,
    Staging,
    /// Staged and waiting for the host's layout pass
    Measuring,
    Composed,
    /// Output handed to the preview sink
    Cleaned,
}

impl fmt::Display for CapturePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CapturePhase::Idle => "idle",
            CapturePhase::Staging => "staging",
            CapturePhase::Measuring => "measuring",
            CapturePhase::Composed => "composed",
            CapturePhase::Cleaned => "cleaned",
        };
        f.write_str(name)
    }
}

/// Per-capture working state. Built fresh by every [`Capturer::stage`] call.
struct CaptureContext<'a> {
    config: &'a CaptureConfig,
    reconciler: Reconciler,
    rules: Vec<StyleRule>,
}

impl<'a> CaptureContext<'a> {
    fn new(config: &'a CaptureConfig) -> Self {
        Self {
            config,
            reconciler: Reconciler::new(),
            rules: Vec::new(),
        }
    }

    fn prefix(&self) -> &str {
        &self.config.prefix
    }

    fn padding(&self) -> f64 {
        self.config.padding
    }
}

/// A composed capture mounted in the staging area, waiting to be measured
#[derive(Debug, Clone, PartialEq)]
pub struct StagedCapture {
    /// Serialized container as it was mounted
    pub markup: String,
    pub root_marker: MarkerTag,
    pub crop: Rect,
    /// Live selection box at staging time
    pub range_rect: Rect,
    /// Live common-ancestor box at staging time
    pub common_rect: Rect,
    pub page_url: Option<String>,
    pub reconciliation: Reconciliation,
}

/// Finished capture
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureOutput {
    /// `<svg>` element, no DTD
    pub markup: String,
    /// Entity preamble followed by `markup`; what gets saved to disk
    pub document: String,
    pub file_name: String,
    pub mime_type: &'static str,
    pub viewport: Rect,
}

pub struct Capturer {
    config: CaptureConfig,
    phase: CapturePhase,
}

impl Capturer {
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            phase: CapturePhase::Idle,
        }
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    pub fn phase(&self) -> CapturePhase {
        self.phase
    }

    /// Synchronous half: extracts the selection, composes the container and
    /// mounts it. Nothing is mounted when this fails.
    #[instrument(skip(self, host), fields(crop_width = crop.width, crop_height = crop.height))]
    pub fn stage<H>(&mut self, host: &mut H, crop: Rect) -> Result<StagedCapture>
    where
        H: LiveDocument + StagingArea,
    {
        self.phase = CapturePhase::Staging;
        let result = self.stage_inner(host, crop);
        if let Err(e) = &result {
            warn!(error = %e, "Staging failed");
            self.phase = CapturePhase::Idle;
        }
        result
    }

    fn stage_inner<H>(&self, host: &mut H, crop: Rect) -> Result<StagedCapture>
    where
        H: LiveDocument + StagingArea,
    {
        let mut cx = CaptureContext::new(&self.config);

        let range = host
            .selection()
            .filter(|range| !range.is_collapsed())
            .ok_or(CaptureError::EmptySelection)?;

        let common = range
            .common_ancestor_element(host.document())
            .ok_or_else(|| {
                CaptureError::failure(Stage::Extraction, "selection has no common ancestor element")
            })?;

        let common_rect = host.bounding_rect(common).ok_or_else(|| {
            CaptureError::failure(Stage::Measurement, format!("no box for common ancestor {}", common))
        })?;
        let range_rect = host
            .range_rect(&range)
            .ok_or_else(|| CaptureError::failure(Stage::Measurement, "no box for selection"))?;

        info!(common = %common, "Staging capture");

        let mut extraction = extract::extract_subtree(host.document(), common, cx.prefix())?;

        let page_url = host.page_url();
        let base = page_url.as_deref().and_then(|url| Url::parse(url).ok());
        let markers = sanitize(
            &mut extraction.clone,
            extraction.wrapper,
            cx.prefix(),
            base.as_ref(),
        );

        snapshot_styles(&mut cx, host, &extraction, &markers)?;
        reconcile(&mut cx, host, &extraction)?;
        let reconciliation = cx.reconciler.finish(range_rect, cx.padding());

        debug!(
            rules = cx.rules.len(),
            width = reconciliation.container.width,
            height = reconciliation.container.height,
            margin_shift = reconciliation.margin_shift,
            "Reconciled layout"
        );

        let root_marker = extraction.root_marker().clone();
        let container = compose::build_container(
            &mut extraction.clone,
            extraction.wrapper,
            &cx.rules,
            &root_marker,
            &reconciliation,
            cx.config,
        )?;
        let markup = outer_html(&extraction.clone, container);

        let inset = cx.padding() + 1.0;
        let fragment = StagedFragment {
            markup: markup.clone(),
            root_marker: root_marker.name().to_string(),
            expected_root: Rect::new(
                inset,
                inset + reconciliation.margin_shift,
                common_rect.width,
                common_rect.height,
            ),
        };
        host.mount(&fragment)?;

        Ok(StagedCapture {
            markup,
            root_marker,
            crop,
            range_rect,
            common_rect,
            page_url,
            reconciliation,
        })
    }

    /// Second half, run after the host's layout pass. Unmounts the staging
    /// area on failure.
    #[instrument(skip(self, host, staged), fields(root = %staged.root_marker))]
    pub fn finish<H>(&mut self, host: &mut H, staged: &StagedCapture) -> Result<CaptureOutput>
    where
        H: StagingArea,
    {
        match self.compose_output(host, staged) {
            Ok(output) => {
                self.phase = CapturePhase::Composed;
                info!(
                    file = %output.file_name,
                    bytes = output.document.len(),
                    "Capture composed"
                );
                Ok(output)
            }
            Err(e) => {
                warn!(error = %e, "Capture failed after staging");
                host.unmount();
                self.phase = CapturePhase::Idle;
                Err(e)
            }
        }
    }

    fn compose_output<H>(&self, host: &H, staged: &StagedCapture) -> Result<CaptureOutput>
    where
        H: StagingArea,
    {
        let staged_root = host.staged_rect(staged.root_marker.name()).ok_or_else(|| {
            CaptureError::failure(
                Stage::Measurement,
                format!("staged root .{} not found", staged.root_marker),
            )
        })?;
        let staging = host
            .staging_rect()
            .ok_or_else(|| CaptureError::failure(Stage::Measurement, "staging root not mounted"))?;

        let viewport = compose::viewport_for(
            &ViewportInputs {
                staged_root,
                staging,
                selection: staged.range_rect,
                common_ancestor: staged.common_rect,
                crop: staged.crop,
            },
            &self.config,
        )?;

        let markup = compose::render_svg(
            &staged.markup,
            &viewport,
            &self.config,
            staged.page_url.as_deref(),
        );
        let document = format!("{}\n{}", compose::entity_preamble(), markup);
        let file_name = format!(
            "{}{}.svg",
            self.config.file_name_prefix,
            chrono::Utc::now().timestamp_millis()
        );

        Ok(CaptureOutput {
            markup,
            document,
            file_name,
            mime_type: SVG_MIME_TYPE,
            viewport,
        })
    }

    /// `stage`, one layout pass, `finish`
    pub async fn capture<H>(&mut self, host: &mut H, crop: Rect) -> Result<CaptureOutput>
    where
        H: LiveDocument + StagingArea,
    {
        let staged = self.stage(host, crop)?;
        self.phase = CapturePhase::Measuring;
        host.next_frame().await;
        self.finish(host, &staged)
    }

    /// Captures and hands the result to `sink`. The staging root stays
    /// mounted until the next capture replaces it.
    pub async fn run<H, S>(&mut self, host: &mut H, sink: &mut S, crop: Rect) -> Result<CaptureOutput>
    where
        H: LiveDocument + StagingArea,
        S: PreviewSink,
    {
        let output = self.capture(host, crop).await?;
        sink.present(&output)?;
        self.phase = CapturePhase::Cleaned;
        Ok(output)
    }
}

/// One rule per sanitized marker, in document order
fn snapshot_styles<H: LiveDocument>(
    cx: &mut CaptureContext<'_>,
    host: &H,
    extraction: &Extraction,
    markers: &[MarkerTag],
) -> Result<()> {
    for marker in markers {
        let node = extraction.find(marker).ok_or_else(|| {
            CaptureError::failure(Stage::Styling, format!("marker {} has no node", marker))
        })?;
        let style = host.computed_style(node.live).ok_or_else(|| {
            CaptureError::failure(Stage::Styling, format!("no computed style for {}", node.live))
        })?;
        let tag = tag_of(host, node.live)?;
        cx.rules.push(snapshot_style(tag, marker, &style));
    }
    Ok(())
}

fn reconcile<H: LiveDocument>(
    cx: &mut CaptureContext<'_>,
    host: &H,
    extraction: &Extraction,
) -> Result<()> {
    for node in &extraction.marked {
        let margins = host
            .computed_style(node.live)
            .map(|style| style.margins())
            .ok_or_else(|| {
                CaptureError::failure(
                    Stage::Reconciliation,
                    format!("no computed style for {}", node.live),
                )
            })?;

        if node.marker == *extraction.root_marker() {
            cx.reconciler.record_root(margins);
            continue;
        }
        let rect = host.bounding_rect(node.live).ok_or_else(|| {
            CaptureError::failure(Stage::Reconciliation, format!("no box for {}", node.live))
        })?;
        cx.reconciler.fold(rect, margins);
    }
    Ok(())
}

fn tag_of<H: LiveDocument>(host: &H, node: NodeId) -> Result<&str> {
    host.document()
        .tag_name(node)
        .ok_or_else(|| CaptureError::failure(Stage::Styling, format!("{} is not an element", node)))
}
