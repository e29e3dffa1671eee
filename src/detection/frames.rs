//! Raw frame decoding through the ffmpeg command line tools

use serde::Deserialize;
use std::collections::HashMap;
use std::io::{ErrorKind, Read};
use std::path::Path;
use std::process::{Child, ChildStdout, Command, Stdio};
use tracing::{debug, warn};

use crate::error::DetectionError;

/// Display dimensions of a video in pixels, after any rotation metadata is
/// applied. These match the frames ffmpeg decodes, since it auto-rotates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoDimensions {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
    #[serde(default)]
    side_data_list: Vec<ProbeSideData>,
    #[serde(default)]
    tags: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct ProbeSideData {
    rotation: Option<f64>,
}

impl ProbeStream {
    /// Display matrix rotation first, then the legacy `rotate` tag
    fn rotation(&self) -> f64 {
        self.side_data_list
            .iter()
            .find_map(|side_data| side_data.rotation)
            .or_else(|| self.tags.get("rotate").and_then(|r| r.trim().parse().ok()))
            .unwrap_or(0.0)
    }
}

impl VideoDimensions {
    /// Probe the first video stream with ffprobe
    pub fn probe(video_path: &Path) -> Result<Self, DetectionError> {
        let output = Command::new("ffprobe")
            .args([
                "-v", "error",
                "-select_streams", "v:0",
                "-show_entries", "stream=width,height:stream_tags=rotate:stream_side_data=rotation",
                "-of", "json",
            ])
            .arg(video_path)
            .output()
            .map_err(|e| DetectionError::Decode(format!("Failed to run ffprobe: {}", e)))?;

        if !output.status.success() {
            return Err(DetectionError::Decode(format!(
                "ffprobe failed for {}: {}",
                video_path.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Self::parse(&stdout).ok_or_else(|| {
            DetectionError::Decode(format!(
                "No video stream found in {}",
                video_path.display()
            ))
        })
    }

    /// Parse ffprobe's JSON output, swapping the axes for quarter-turn rotations
    pub fn parse(output: &str) -> Option<Self> {
        let probe: ProbeOutput = serde_json::from_str(output).ok()?;
        let stream = probe.streams.into_iter().next()?;
        let (width, height) = (stream.width?, stream.height?);
        if width == 0 || height == 0 {
            return None;
        }

        let quarter_turns = (stream.rotation() / 90.0).round() as i64;
        if quarter_turns.rem_euclid(2) == 1 {
            debug!("Applying {}° rotation to {}x{}", stream.rotation(), width, height);
            Some(Self { width: height, height: width })
        } else {
            Some(Self { width, height })
        }
    }
}

/// Streams `rgb24` frames scaled to a square size from an ffmpeg child process.
///
/// Frames are read on demand; the decoder is killed when the reader is dropped.
pub struct FrameReader {
    child: Child,
    stdout: ChildStdout,
    frame_size: u32,
    frames_read: usize,
    finished: bool,
}

impl FrameReader {
    pub fn spawn(video_path: &Path, frame_size: u32) -> Result<Self, DetectionError> {
        let scale = format!("scale={}:{}", frame_size, frame_size);
        let mut child = Command::new("ffmpeg")
            .args(["-hide_banner", "-loglevel", "error", "-i"])
            .arg(video_path)
            .args([
                "-vf",
                scale.as_str(),
                "-pix_fmt",
                "rgb24",
                "-f",
                "rawvideo",
                "-",
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| DetectionError::Decode(format!("Failed to spawn ffmpeg: {}", e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| DetectionError::Decode("Failed to capture ffmpeg stdout".to_string()))?;

        debug!("Decoding {} at {}x{}", video_path.display(), frame_size, frame_size);

        Ok(Self {
            child,
            stdout,
            frame_size,
            frames_read: 0,
            finished: false,
        })
    }

    fn bytes_per_frame(&self) -> usize {
        (self.frame_size as usize) * (self.frame_size as usize) * 3
    }

    /// Read the next full frame, or `None` at end of stream
    pub fn next_frame(&mut self) -> Result<Option<Vec<u8>>, DetectionError> {
        if self.finished {
            return Ok(None);
        }

        let mut frame = vec![0u8; self.bytes_per_frame()];
        let mut filled = 0;
        while filled < frame.len() {
            match self.stdout.read(&mut frame[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        if filled == frame.len() {
            self.frames_read += 1;
            return Ok(Some(frame));
        }

        self.finished = true;
        if filled > 0 {
            warn!("Discarding truncated trailing frame ({} bytes)", filled);
        }

        let status = self.child.wait()?;
        if !status.success() {
            return Err(DetectionError::Decode(format!(
                "ffmpeg exited with {} after {} frames",
                status, self.frames_read
            )));
        }

        debug!("Decoded {} frames", self.frames_read);
        Ok(None)
    }
}

impl Drop for FrameReader {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}
