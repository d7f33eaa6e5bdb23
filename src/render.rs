use std::borrow::Cow;
use std::io::{self, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use geo_types::Rect;

use crate::clip::clip_to_area;
use crate::crs::Reprojector;
use crate::encode::{ShapeStyle, encode_geometry};
use crate::error::{EncodeError, Error, Result};
use crate::feature::Feature;
use crate::filter::Filter;
use crate::mapper::{CoordinateMapper, scale_denominator};
use crate::output::{ImageMapWriter, format_area};
use crate::query::build_query;
use crate::request::{LayerRequest, MapRequest};
use crate::style::{FeatureTypeStyle, match_rules};

/// Shared cancellation flag. Aborting does not interrupt work by itself; it
/// turns the next stream or cursor failure into a clean stop.
#[derive(Debug, Clone, Default)]
pub struct AbortHandle(Arc<AtomicBool>);

impl AbortHandle {
    pub fn abort(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Renders every layer of a request as an image map.
pub struct ImageMapEncoder<'a> {
    request: &'a MapRequest,
    abort: AbortHandle,
}

impl<'a> ImageMapEncoder<'a> {
    pub fn new(request: &'a MapRequest) -> Self {
        Self {
            request,
            abort: AbortHandle::default(),
        }
    }

    pub fn with_abort_handle(mut self, abort: AbortHandle) -> Self {
        self.abort = abort;
        self
    }

    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    pub fn abort(&self) {
        self.abort.abort();
    }

    /// Write one `<map>` block per layer, in request order.
    ///
    /// After an abort, I/O failures end the call successfully with whatever
    /// output was already written.
    pub fn encode<W: Write>(&self, stream: W) -> Result<()> {
        let mapper =
            CoordinateMapper::new(self.request.bbox, self.request.width, self.request.height);
        let mut writer = ImageMapWriter::new(stream);
        for layer in &self.request.layers {
            let renderer = LayerRenderer::new(self.request, layer, &mapper);
            match renderer.render(&mut writer) {
                Ok(()) => {}
                Err(LayerFailure::Io(err)) if self.abort.is_aborted() => {
                    tracing::info!(
                        layer = %layer.name,
                        error = %err,
                        "image map encoding aborted"
                    );
                    return Ok(());
                }
                Err(LayerFailure::Io(err)) => return Err(Error::Io(err)),
                Err(LayerFailure::Setup(err)) => {
                    tracing::warn!(layer = %layer.name, error = %err, "layer setup failed");
                    return Err(Error::Io(io::Error::other(err)));
                }
                Err(LayerFailure::Unexpected(err)) => {
                    let err = err.context(format!("failed to render layer {}", layer.name));
                    return Err(Error::Io(io::Error::other(err)));
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug)]
enum LayerFailure {
    Io(io::Error),
    Setup(Error),
    Unexpected(anyhow::Error),
}

impl From<io::Error> for LayerFailure {
    fn from(err: io::Error) -> Self {
        LayerFailure::Io(err)
    }
}

impl From<anyhow::Error> for LayerFailure {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<io::Error>() {
            Ok(io) => LayerFailure::Io(io),
            Err(other) => LayerFailure::Unexpected(other),
        }
    }
}

/// Per-layer pipeline: query, fetch, match, clip, encode, write.
pub struct LayerRenderer<'a> {
    request: &'a MapRequest,
    layer: &'a LayerRequest,
    mapper: &'a CoordinateMapper,
    groups: Vec<&'a FeatureTypeStyle>,
    scale: f64,
}

impl<'a> LayerRenderer<'a> {
    pub fn new(
        request: &'a MapRequest,
        layer: &'a LayerRequest,
        mapper: &'a CoordinateMapper,
    ) -> Self {
        Self {
            request,
            layer,
            mapper,
            groups: layer.style.groups_for(&layer.name, &layer.super_types),
            scale: scale_denominator(&request.bbox, &request.crs, request.width),
        }
    }

    pub fn scale_denominator(&self) -> f64 {
        self.scale
    }

    /// Style groups that apply to this layer, super-types included.
    pub fn groups(&self) -> &[&'a FeatureTypeStyle] {
        &self.groups
    }

    /// Request bbox expressed in the layer's CRS.
    pub fn query_area(&self) -> Result<Rect<f64>> {
        if self.layer.crs.same_as(&self.request.crs) {
            return Ok(self.request.bbox);
        }
        let to_native = Reprojector::new(&self.request.crs, &self.layer.crs)?;
        to_native.rect(&self.request.bbox).map_err(|reason| Error::Crs {
            code: self.layer.crs.code.clone(),
            reason: format!("reproject query area: {reason}"),
        })
    }

    /// Source query for this layer: query area, style filters and the layer
    /// definition.
    pub fn query(&self) -> Result<Filter> {
        let area = self.query_area()?;
        Ok(build_query(&self.groups, area, self.layer.definition.as_ref()))
    }

    fn render<W: Write>(
        &self,
        writer: &mut ImageMapWriter<W>,
    ) -> std::result::Result<(), LayerFailure> {
        let query = self.query().map_err(LayerFailure::Setup)?;
        let reprojector = if self.layer.crs.same_as(&self.request.crs) {
            None
        } else {
            Some(Reprojector::new(&self.layer.crs, &self.request.crs).map_err(LayerFailure::Setup)?)
        };
        tracing::debug!(
            layer = %self.layer.name,
            scale = self.scale,
            query = %query,
            "rendering layer"
        );

        writer.begin_layer(&self.layer.name)?;
        let cursor = self.layer.source.features(&query)?;
        for item in cursor {
            let feature = item?;
            self.render_feature(&feature, reprojector.as_ref(), writer)?;
        }
        writer.end_layer()?;
        Ok(())
    }

    fn render_feature<W: Write>(
        &self,
        feature: &Feature,
        reprojector: Option<&Reprojector>,
        writer: &mut ImageMapWriter<W>,
    ) -> io::Result<()> {
        let rules = match_rules(&self.groups, feature, self.scale);
        if rules.is_empty() {
            return Ok(());
        }

        let geometry = match reprojector {
            None => Cow::Borrowed(&feature.geometry),
            Some(reprojector) => match reprojector.geometry(&feature.geometry) {
                Ok(geometry) => Cow::Owned(geometry),
                Err(reason) => {
                    let err = EncodeError::Reproject(reason);
                    tracing::warn!(feature = %feature.id, error = %err, "skipping feature");
                    return Ok(());
                }
            },
        };
        let Some(clipped) = clip_to_area(&geometry, self.mapper.world()) else {
            tracing::debug!(feature = %feature.id, "feature outside visible area");
            return Ok(());
        };

        let style = ShapeStyle::from_rules(&rules, feature);
        for (id, encoded) in encode_geometry(&feature.id, &clipped, &style, self.mapper) {
            let buffer = encoded.and_then(|shape| format_area(&shape).map_err(EncodeError::from));
            match buffer {
                Ok(buffer) => writer.commit(&buffer)?,
                Err(err) => tracing::warn!(shape = %id, error = %err, "skipping shape"),
            }
        }
        Ok(())
    }
}
