use common::error::AppError;
use tracing::debug;

/// Extracts the text layer page by page, joining pages with a newline.
///
/// Blocking; call from `spawn_blocking` when on the async runtime.
pub fn extract_text(content: &[u8]) -> Result<String, AppError> {
    let pages = extract_pages(content)?;
    debug!(pages = pages.len(), "Extracted PDF text layer");
    Ok(pages.join("\n"))
}

/// Text of each page, in page order.
pub fn extract_pages(content: &[u8]) -> Result<Vec<String>, AppError> {
    pdf_extract::extract_text_from_mem_by_pages(content)
        .map(|pages| pages.into_iter().map(|page| page.trim().to_string()).collect())
        .map_err(|err| AppError::Processing(format!("Failed to extract text from PDF: {err}")))
}

/// Extracts the text on the async runtime without blocking it.
pub async fn extract_text_async(content: bytes::Bytes) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || extract_text(&content)).await?
}
