use std::{io::Write as _, thread::sleep, time::Duration};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use common::error::AppError;
use headless_chrome::{
    protocol::cdp::{Emulation, Page, DOM},
    Browser, Tab,
};
use tracing::{debug, warn};

use super::ThumbnailRenderer;
use crate::utils::pdf::first_page_size;

const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(10);
const PDF_SETTLE_DELAY: Duration = Duration::from_millis(350);
const MIN_PAGE_IMAGE_BYTES: usize = 1_024;

/// Screenshots page one in headless Chrome's built-in PDF viewer.
///
/// Requires a Chrome or Chromium binary on the host.
pub struct ChromeThumbnailRenderer {
    width: u32,
}

impl ChromeThumbnailRenderer {
    pub fn new(width: u32) -> Self {
        Self { width }
    }

    fn viewport_height(&self, aspect_ratio: f64) -> u32 {
        // Saturating float-to-int cast; page sizes are far below u32::MAX.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let height = (f64::from(self.width) * aspect_ratio).round() as u32;
        height.max(1)
    }
}

impl ThumbnailRenderer for ChromeThumbnailRenderer {
    fn name(&self) -> &'static str {
        "chrome"
    }

    fn render(&self, content: &[u8]) -> Result<String, AppError> {
        let height = self.viewport_height(first_page_size(content)?.aspect_ratio());

        let mut file = tempfile::Builder::new().suffix(".pdf").tempfile()?;
        file.write_all(content)?;
        file.flush()?;

        let file_url = url::Url::from_file_path(file.path())
            .map_err(|()| AppError::Processing("Unable to construct PDF file URL".into()))?;

        let browser = create_browser()?;
        let tab = browser
            .new_tab()
            .map_err(|err| AppError::Processing(format!("Failed to create Chrome tab: {err}")))?;
        tab.set_default_timeout(NAVIGATION_TIMEOUT);
        configure_tab(&tab, self.width, height)?;

        let target = format!("{file_url}#page=1&toolbar=0&statusbar=0&view=FitH");
        tab.navigate_to(&target)
            .map_err(|err| AppError::Processing(format!("Failed to open PDF in Chrome: {err}")))?
            .wait_until_navigated()
            .map_err(|err| AppError::Processing(format!("Navigation to PDF failed: {err}")))?;

        if let Err(err) = tab.wait_for_element("embed") {
            debug!(error = %err, "PDF embed not found; capturing page as is");
        }
        sleep(PDF_SETTLE_DELAY);

        let png = capture_png(&tab)?;
        if png.len() < MIN_PAGE_IMAGE_BYTES {
            warn!(bytes = png.len(), "Thumbnail screenshot unusually small");
        }

        Ok(format!("data:image/png;base64,{}", STANDARD.encode(png)))
    }
}

/// Launches a headless Chrome instance that respects the `docker` feature.
fn create_browser() -> Result<Browser, AppError> {
    #[cfg(feature = "docker")]
    {
        let options = headless_chrome::LaunchOptionsBuilder::default()
            .sandbox(false)
            .build()
            .map_err(|err| AppError::Processing(format!("Failed to launch Chrome: {err}")))?;
        Browser::new(options)
            .map_err(|err| AppError::Processing(format!("Failed to start Chrome: {err}")))
    }
    #[cfg(not(feature = "docker"))]
    {
        Browser::default()
            .map_err(|err| AppError::Processing(format!("Failed to start Chrome: {err}")))
    }
}

fn configure_tab(tab: &Tab, width: u32, height: u32) -> Result<(), AppError> {
    tab.call_method(Emulation::SetDefaultBackgroundColorOverride {
        color: Some(DOM::RGBA {
            r: 255,
            g: 255,
            b: 255,
            a: Some(1.0),
        }),
    })
    .map_err(|err| AppError::Processing(format!("Failed to set Chrome background: {err}")))?;

    tab.call_method(Emulation::SetDeviceMetricsOverride {
        width,
        height,
        device_scale_factor: 1.0,
        mobile: false,
        scale: None,
        screen_width: Some(width),
        screen_height: Some(height),
        position_x: None,
        position_y: None,
        dont_set_visible_size: Some(false),
        screen_orientation: None,
        viewport: None,
        display_feature: None,
        device_posture: None,
    })
    .map_err(|err| AppError::Processing(format!("Failed to set Chrome viewport: {err}")))?;

    Ok(())
}

fn capture_png(tab: &Tab) -> Result<Vec<u8>, AppError> {
    let screenshot = tab
        .call_method(Page::CaptureScreenshot {
            format: Some(Page::CaptureScreenshotFormatOption::Png),
            quality: None,
            clip: None,
            from_surface: Some(true),
            capture_beyond_viewport: Some(false),
            optimize_for_speed: Some(false),
        })
        .map_err(|err| AppError::Processing(format!("Failed to capture PDF page: {err}")))?;

    STANDARD
        .decode(screenshot.data)
        .map_err(|err| AppError::Processing(format!("Failed to decode PDF screenshot: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_viewport_follows_page_aspect_ratio() {
        let renderer = ChromeThumbnailRenderer::new(300);
        assert_eq!(renderer.viewport_height(842.0 / 595.0), 425);
        assert_eq!(renderer.viewport_height(0.0), 1);
    }

    #[test]
    fn test_unparseable_content_fails_before_launching_chrome() {
        let renderer = ChromeThumbnailRenderer::new(300);
        assert!(matches!(
            renderer.render(b"not a pdf"),
            Err(AppError::Processing(_))
        ));
    }
}
