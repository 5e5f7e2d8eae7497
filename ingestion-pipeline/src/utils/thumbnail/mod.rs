mod chrome;
mod svg;

pub use chrome::ChromeThumbnailRenderer;
pub use svg::SvgThumbnailRenderer;

use std::sync::Arc;

use common::{
    error::AppError,
    utils::config::{AppConfig, ThumbnailRendererKind},
};

/// Produces a preview of the first page of a PDF as a self-contained
/// `data:image/...` URI.
///
/// Implementations are blocking and are driven from the blocking pool.
pub trait ThumbnailRenderer: Send + Sync {
    fn name(&self) -> &'static str;

    fn render(&self, content: &[u8]) -> Result<String, AppError>;
}

/// The renderer selected by `thumbnail_renderer`.
pub fn renderer_from_config(config: &AppConfig) -> Arc<dyn ThumbnailRenderer> {
    match config.thumbnail_renderer {
        ThumbnailRendererKind::Svg => Arc::new(SvgThumbnailRenderer::new(config.thumbnail_width)),
        ThumbnailRendererKind::Chrome => {
            Arc::new(ChromeThumbnailRenderer::new(config.thumbnail_width))
        }
    }
}
