//! Encoder invoker.
//!
//! Wraps a single external ffmpeg run as an awaitable unit of work. The
//! pipeline talks to the [`Transcoder`] trait so tests can substitute a fake
//! implementation instead of invoking a real encoder.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

use crate::library::MANIFEST_NAME;

/// Fixed single-rendition HLS encoding profile.
///
/// One profile for the whole library; adaptive bitrate ladders are out of
/// scope.
#[derive(Debug, Clone)]
pub struct HlsProfile {
    /// Video codec (default: libx264).
    pub video_codec: String,
    /// Encoder speed preset (default: ultrafast).
    pub preset: String,
    /// Constant rate factor (default: 28).
    pub crf: u32,
    /// Output frame rate, also the keyframe cadence (default: 30).
    pub frame_rate: u32,
    /// Audio codec (default: aac).
    pub audio_codec: String,
    /// Audio bitrate (default: 128k).
    pub audio_bitrate: String,
    /// Threads handed to the encoder per invocation (default: 2).
    pub encoder_threads: u32,
    /// Output width; height follows the source aspect ratio (default: 1280).
    pub max_width: u32,
    /// Target segment duration in seconds (default: 2).
    pub segment_seconds: u32,
    /// Segment filename pattern inside the output directory.
    pub segment_pattern: String,
}

impl Default for HlsProfile {
    fn default() -> Self {
        Self {
            video_codec: "libx264".to_string(),
            preset: "ultrafast".to_string(),
            crf: 28,
            frame_rate: 30,
            audio_codec: "aac".to_string(),
            audio_bitrate: "128k".to_string(),
            encoder_threads: 2,
            max_width: 1280,
            segment_seconds: 2,
            segment_pattern: "segment%03d.ts".to_string(),
        }
    }
}

/// Errors from one encode invocation. Never fatal to the batch.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("encoder exited with {status}")]
    Failed { status: ExitStatus },
}

/// Capability interface for the conversion pipeline.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Convert `input` into a segmented HLS collection under `output_dir`.
    ///
    /// On success the output directory contains `playlist.m3u8` plus
    /// numbered segment files.
    async fn encode(&self, input: &Path, output_dir: &Path) -> Result<(), EncodeError>;
}

/// Real transcoder shelling out to ffmpeg.
pub struct FfmpegTranscoder {
    program: PathBuf,
    profile: HlsProfile,
}

impl FfmpegTranscoder {
    pub fn new(profile: HlsProfile) -> Self {
        Self {
            program: PathBuf::from("ffmpeg"),
            profile,
        }
    }

    /// Override the ffmpeg binary path (tests, unusual installs).
    pub fn with_program(program: PathBuf, profile: HlsProfile) -> Self {
        Self { program, profile }
    }

    fn build_args(&self, input: &Path, output_dir: &Path) -> Vec<String> {
        let p = &self.profile;
        vec![
            "-i".to_string(),
            input.to_string_lossy().to_string(),
            "-c:v".to_string(),
            p.video_codec.clone(),
            "-preset".to_string(),
            p.preset.clone(),
            "-crf".to_string(),
            p.crf.to_string(),
            // Keyframe every second at the constant output frame rate, so
            // segment boundaries land on keyframes.
            "-g".to_string(),
            p.frame_rate.to_string(),
            "-r".to_string(),
            p.frame_rate.to_string(),
            "-c:a".to_string(),
            p.audio_codec.clone(),
            "-b:a".to_string(),
            p.audio_bitrate.clone(),
            // Subtitle streams are not representable in MPEG-TS segments.
            "-sn".to_string(),
            "-threads".to_string(),
            p.encoder_threads.to_string(),
            "-vf".to_string(),
            format!("scale={}:-1", p.max_width),
            "-hls_time".to_string(),
            p.segment_seconds.to_string(),
            "-hls_playlist_type".to_string(),
            "vod".to_string(),
            "-hls_segment_filename".to_string(),
            output_dir.join(&p.segment_pattern).to_string_lossy().to_string(),
            "-f".to_string(),
            "hls".to_string(),
            // Overwrite leftovers from an interrupted run.
            "-y".to_string(),
            output_dir.join(MANIFEST_NAME).to_string_lossy().to_string(),
        ]
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn encode(&self, input: &Path, output_dir: &Path) -> Result<(), EncodeError> {
        let args = self.build_args(input, output_dir);
        debug!(input = %input.display(), "ffmpeg args: {:?}", args);

        let status = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|source| EncodeError::Spawn {
                program: self.program.to_string_lossy().to_string(),
                source,
            })?;

        if !status.success() {
            return Err(EncodeError::Failed { status });
        }

        Ok(())
    }
}
