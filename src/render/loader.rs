//! Request-driven background image decoder.
//! Receives decode jobs (path + bounding size), decodes & downsizes
//! off-thread, and hands back RGBA8 frames without blocking the event loop.
use crossbeam_channel::Receiver;
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};

/// Message sent to the background loader thread.
#[derive(Debug, Clone)]
pub enum LoaderMsg {
    /// Decode this path so it fits within the given width/height.
    Decode(PathBuf, (u32, u32)),
    /// Stop the loader.
    Quit,
}

/// An image decoded on CPU and ready for GPU upload.
#[derive(Debug, Clone)]
pub struct PreparedImage {
    pub path: PathBuf,
    /// Pixel dimensions (width, height).
    pub size: (u32, u32),
    /// RGBA8 pixel buffer.
    pub pixels: Vec<u8>,
}

/// Spawn the loader. `deliver` returns `false` once nobody listens.
///
/// Only the newest queued request is decoded; older ones are stale by the
/// time the thread gets to them.
pub fn spawn_loader<F>(rx: Receiver<LoaderMsg>, deliver: F) -> std::io::Result<JoinHandle<()>>
where
    F: Fn(PreparedImage) -> bool + Send + 'static,
{
    thread::Builder::new()
        .name("image-loader".into())
        .spawn(move || {
            while let Ok(mut msg) = rx.recv() {
                while let Ok(newer) = rx.try_recv() {
                    if let LoaderMsg::Decode(stale, _) = &msg {
                        debug!(path = %stale.display(), "decode superseded");
                    }
                    msg = newer;
                }
                match msg {
                    LoaderMsg::Quit => break,
                    LoaderMsg::Decode(path, bounds) => match decode_within(&path, bounds) {
                        Ok(prepared) => {
                            if !deliver(prepared) {
                                break;
                            }
                        }
                        Err(err) => {
                            warn!(path = %path.display(), error = %err, "failed to decode image");
                        }
                    },
                }
            }
            debug!("loader exiting");
        })
}

/// Decode `path` to RGBA8, shrinking it to fit `bounds` when larger.
pub fn decode_within(path: &Path, bounds: (u32, u32)) -> image::ImageResult<PreparedImage> {
    let img = image::ImageReader::open(path)?
        .with_guessed_format()?
        .decode()?;
    let (max_w, max_h) = (bounds.0.max(1), bounds.1.max(1));
    let img = if img.width() > max_w || img.height() > max_h {
        img.resize(max_w, max_h, image::imageops::FilterType::Triangle)
    } else {
        img
    };
    let rgba = img.to_rgba8();
    Ok(PreparedImage {
        path: path.to_path_buf(),
        size: rgba.dimensions(),
        pixels: rgba.into_raw(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn large_images_are_shrunk_to_bounds() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("wide.png");
        image::RgbaImage::new(400, 200).save(&path).unwrap();

        let prepared = decode_within(&path, (100, 100)).unwrap();
        assert_eq!(prepared.size, (100, 50));
        assert_eq!(prepared.pixels.len(), 100 * 50 * 4);

        let small = decode_within(&path, (1000, 1000)).unwrap();
        assert_eq!(small.size, (400, 200));
    }

    #[test]
    fn loader_skips_broken_files_and_keeps_running() {
        let tmp = tempfile::tempdir().unwrap();
        let broken = tmp.path().join("broken.jpg");
        std::fs::write(&broken, b"not an image").unwrap();
        let good = tmp.path().join("good.png");
        image::RgbaImage::new(8, 8).save(&good).unwrap();

        let (req_tx, req_rx) = crossbeam_channel::unbounded();
        let (out_tx, out_rx) = crossbeam_channel::unbounded();
        let handle = spawn_loader(req_rx, move |img| out_tx.send(img).is_ok()).unwrap();

        req_tx.send(LoaderMsg::Decode(broken, (64, 64))).unwrap();
        let first = out_rx.recv_timeout(Duration::from_millis(200));
        assert!(first.is_err());

        req_tx.send(LoaderMsg::Decode(good.clone(), (64, 64))).unwrap();
        let ready = out_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(ready.path, good);

        req_tx.send(LoaderMsg::Quit).unwrap();
        handle.join().unwrap();
    }

    #[test]
    fn queued_requests_collapse_to_the_newest() {
        let tmp = tempfile::tempdir().unwrap();
        let older = tmp.path().join("older.png");
        let newer = tmp.path().join("newer.png");
        image::RgbaImage::new(4, 4).save(&older).unwrap();
        image::RgbaImage::new(6, 6).save(&newer).unwrap();

        let (req_tx, req_rx) = crossbeam_channel::unbounded();
        req_tx.send(LoaderMsg::Decode(older, (64, 64))).unwrap();
        req_tx.send(LoaderMsg::Decode(newer.clone(), (64, 64))).unwrap();

        let (out_tx, out_rx) = crossbeam_channel::unbounded();
        let handle = spawn_loader(req_rx, move |img| out_tx.send(img).is_ok()).unwrap();

        let ready = out_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(ready.path, newer);
        assert_eq!(ready.size, (6, 6));
        assert!(out_rx.recv_timeout(Duration::from_millis(200)).is_err());

        req_tx.send(LoaderMsg::Quit).unwrap();
        handle.join().unwrap();
    }
}
