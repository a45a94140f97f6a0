use crate::config::ImageSource;
use crate::error::LoadError;
use crate::events::{ImageEvent, PreparedImage};
use anyhow::Result;
use std::io::Cursor;
use std::time::Duration;
use tokio::select;
use tokio::sync::mpsc::Sender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Decodes encoded image bytes to RGBA8, sniffing the format from content.
pub fn decode_rgba8(bytes: &[u8]) -> Result<image::RgbaImage, LoadError> {
    let img = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(image::ImageError::from)?
        .decode()?;
    Ok(img.to_rgba8())
}

/// Fetches the raw bytes behind `source`. No retries.
pub async fn fetch_bytes(source: &ImageSource, timeout: Duration) -> Result<Vec<u8>, LoadError> {
    match source {
        ImageSource::Url(url) => {
            let http = |source: reqwest::Error| LoadError::Http {
                url: url.clone(),
                source,
            };
            let client = reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .map_err(http)?;
            let response = client.get(url).send().await.map_err(http)?;
            let status = response.status();
            if !status.is_success() {
                return Err(LoadError::Status {
                    url: url.clone(),
                    status,
                });
            }
            let bytes = response.bytes().await.map_err(http)?;
            debug!(url = %url, len = bytes.len(), "fetched image");
            Ok(bytes.to_vec())
        }
        ImageSource::Path(path) => {
            tokio::fs::read(path)
                .await
                .map_err(|source| LoadError::Io {
                    path: path.clone(),
                    source,
                })
        }
    }
}

/// Fetches and decodes `source`; decoding runs on the blocking pool.
pub async fn load(source: &ImageSource, timeout: Duration) -> Result<PreparedImage, LoadError> {
    let bytes = fetch_bytes(source, timeout).await?;
    let rgba = tokio::task::spawn_blocking(move || decode_rgba8(&bytes)).await??;
    Ok(PreparedImage::from_rgba(source.clone(), rgba))
}

/// One-shot loader task: loads the image once and reports the outcome.
pub async fn run(
    source: ImageSource,
    timeout: Duration,
    to_viewer: Sender<ImageEvent>,
    cancel: CancellationToken,
) -> Result<()> {
    let event = select! {
        biased;
        _ = cancel.cancelled() => {
            debug!("loader cancelled before the image arrived");
            return Ok(());
        }
        res = load(&source, timeout) => match res {
            Ok(prepared) => {
                info!(
                    source = %prepared.source,
                    width = prepared.width,
                    height = prepared.height,
                    "image loaded"
                );
                ImageEvent::Loaded(prepared)
            }
            Err(err) => {
                let reason = format!("{:#}", anyhow::Error::from(err));
                warn!(source = %source, %reason, "image load failed");
                ImageEvent::Failed { source: source.clone(), reason }
            }
        },
    };
    if let Err(err) = to_viewer.send(event).await {
        debug!(source = %source, error = %err, "viewer gone; dropping image event");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn write_png(dir: &tempfile::TempDir, name: &str, w: u32, h: u32) -> std::path::PathBuf {
        let img = image::RgbaImage::from_pixel(w, h, image::Rgba([10, 20, 30, 255]));
        let path = dir.path().join(name);
        img.save(&path).unwrap();
        path
    }

    #[test]
    fn decodes_png_bytes() {
        let mut bytes = Vec::new();
        image::RgbaImage::from_pixel(3, 2, image::Rgba([1, 2, 3, 4]))
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        let img = decode_rgba8(&bytes).unwrap();
        assert_eq!(img.dimensions(), (3, 2));
        assert_eq!(img.get_pixel(2, 1).0, [1, 2, 3, 4]);
    }

    #[test]
    fn rejects_garbage_bytes() {
        let err = decode_rgba8(b"definitely not an image").unwrap_err();
        assert!(matches!(err, LoadError::Decode(_)));
    }

    #[tokio::test]
    async fn loads_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(&dir, "grad.png", 4, 3);
        let source = ImageSource::Path(path);
        let prepared = load(&source, Duration::from_secs(5)).await.unwrap();
        assert_eq!((prepared.width, prepared.height), (4, 3));
        assert_eq!(prepared.pixels.len(), 4 * 3 * 4);
        assert_eq!(prepared.source, source);
    }

    #[tokio::test]
    async fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = ImageSource::Path(dir.path().join("nope.png"));
        let err = load(&source, Duration::from_secs(5)).await.unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }

    #[tokio::test]
    async fn run_reports_failure_to_viewer() {
        let dir = tempfile::tempdir().unwrap();
        let source = ImageSource::Path(dir.path().join("missing.jpg"));
        let (tx, mut rx) = mpsc::channel(1);
        run(source.clone(), Duration::from_secs(5), tx, CancellationToken::new())
            .await
            .unwrap();
        match rx.recv().await.unwrap() {
            ImageEvent::Failed { source: failed, reason } => {
                assert_eq!(failed, source);
                assert!(reason.contains("missing.jpg"), "{reason}");
            }
            ImageEvent::Loaded(_) => panic!("expected failure"),
        }
    }

    #[tokio::test]
    async fn run_sends_loaded_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(&dir, "ok.png", 2, 2);
        let (tx, mut rx) = mpsc::channel(1);
        run(
            ImageSource::Path(path),
            Duration::from_secs(5),
            tx,
            CancellationToken::new(),
        )
        .await
        .unwrap();
        let Some(ImageEvent::Loaded(prepared)) = rx.recv().await else {
            panic!("expected loaded image");
        };
        let rgba = prepared.into_rgba().unwrap();
        assert_eq!(rgba.get_pixel(1, 1).0, [10, 20, 30, 255]);
    }

    #[tokio::test]
    async fn run_tolerates_a_closed_viewer() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(&dir, "late.png", 2, 2);
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        run(
            ImageSource::Path(path),
            Duration::from_secs(5),
            tx,
            CancellationToken::new(),
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn run_exits_quietly_when_cancelled() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let (tx, mut rx) = mpsc::channel(1);
        run(
            ImageSource::Url("http://127.0.0.1:9/never.png".into()),
            Duration::from_secs(5),
            tx,
            cancel,
        )
        .await
        .unwrap();
        assert!(rx.recv().await.is_none());
    }
}
