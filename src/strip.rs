//! Removing the audio track from a processed video.
//!
//! The backend's output keeps whatever audio the upload had. Before the
//! video is embedded in the page it is re-encoded video-only: the best video
//! stream is decoded and encoded again with H.264 at the source frame rate,
//! and every other stream is dropped. This is roughly
//! `ffmpeg -i input.mp4 -an -c:v libx264 -r <source fps> output.mp4`.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use vehicount::{AudioStripper, FfmpegStripper};
//!
//! let input = Path::new("temp/out.mp4");
//! let output = vehicount::stripped_path(input);
//! let duration = FfmpegStripper::new().strip(input, &output)?;
//! println!("wrote {} ({duration:?})", output.display());
//! # Ok::<(), vehicount::VehicountError>(())
//! ```

use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use ffmpeg_next::{
    Dictionary, Packet, Rational,
    codec::{Id, context::Context as CodecContext},
    format::{Flags as FormatFlags, Pixel, context::Output},
    frame::Video as VideoFrame,
    media::Type,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
};

use crate::{
    error::VehicountError,
    ffmpeg,
    probe::MediaProbe,
    progress::{NoOpProgress, OperationType, ProgressCallback, ProgressTracker},
};

/// Suffix appended to the downloaded file name for the video-only copy.
pub const NO_AUDIO_SUFFIX: &str = "_no_audio.mp4";

/// Preferred encoder; the default H.264 encoder is used if it is missing.
const ENCODER_NAME: &str = "libx264";

/// Produces a video-only copy of a file.
///
/// The session calls this on a blocking thread, so implementations may do
/// synchronous I/O freely.
pub trait AudioStripper: Send + Sync {
    /// Write `input` without audio to `output` and return the new duration.
    ///
    /// # Errors
    ///
    /// Returns [`VehicountError::StripFailed`] on any failure.
    fn strip(&self, input: &Path, output: &Path) -> Result<Duration, VehicountError>;
}

/// Output path for the video-only copy of `input`.
///
/// `temp/out.mp4` becomes `temp/out.mp4_no_audio.mp4`.
pub fn stripped_path(input: &Path) -> PathBuf {
    let mut name = input
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(NO_AUDIO_SUFFIX);
    input.with_file_name(name)
}

/// [`AudioStripper`] backed by the FFmpeg libraries.
pub struct FfmpegStripper {
    preset: String,
    crf: u32,
    progress: Arc<dyn ProgressCallback>,
}

impl Default for FfmpegStripper {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegStripper {
    /// Create a stripper with x264's default quality (`medium`, CRF 23).
    pub fn new() -> Self {
        Self {
            preset: "medium".to_string(),
            crf: 23,
            progress: Arc::new(NoOpProgress),
        }
    }

    /// Set the x264 preset (e.g. `ultrafast`, `medium`, `slow`).
    #[must_use]
    pub fn with_preset(mut self, preset: impl Into<String>) -> Self {
        self.preset = preset.into();
        self
    }

    /// Set the Constant Rate Factor (0-51, lower is better). Clamped to 51.
    #[must_use]
    pub fn with_crf(mut self, crf: u32) -> Self {
        self.crf = crf.min(51);
        self
    }

    /// Report encoded frames to `callback`.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    fn reencode(&self, input: &Path, output: &Path) -> Result<Duration, VehicountError> {
        ffmpeg::init()?;
        let source = MediaProbe::probe(input)?;

        let mut input_context = ffmpeg_next::format::input(&input)?;
        let (video_stream_index, frame_rate, decoder) = {
            let stream = input_context
                .streams()
                .best(Type::Video)
                .ok_or_else(|| VehicountError::FfmpegError("no video stream found".to_string()))?;
            let frame_rate = source_frame_rate(&stream).ok_or_else(|| {
                VehicountError::FfmpegError("source frame rate is unknown".to_string())
            })?;
            let decoder = CodecContext::from_parameters(stream.parameters())?
                .decoder()
                .video()?;
            (stream.index(), frame_rate, decoder)
        };

        let mut output_context = ffmpeg_next::format::output(&output)?;
        let needs_global_header = output_context
            .format()
            .flags()
            .contains(FormatFlags::GLOBAL_HEADER);

        let codec = ffmpeg_next::encoder::find_by_name(ENCODER_NAME)
            .or_else(|| ffmpeg_next::encoder::find(Id::H264))
            .ok_or_else(|| {
                VehicountError::FfmpegError("no H.264 encoder available".to_string())
            })?;

        let mut stream = output_context.add_stream(codec)?;
        let output_stream_index = stream.index();
        let encoder_time_base = frame_rate.invert();

        let mut video_encoder = CodecContext::from_parameters(stream.parameters())?
            .encoder()
            .video()?;
        video_encoder.set_width(decoder.width());
        video_encoder.set_height(decoder.height());
        video_encoder.set_format(Pixel::YUV420P);
        video_encoder.set_time_base(encoder_time_base);
        video_encoder.set_frame_rate(Some(frame_rate));

        if needs_global_header {
            unsafe {
                (*video_encoder.as_mut_ptr()).flags |=
                    ffmpeg_sys_next::AV_CODEC_FLAG_GLOBAL_HEADER as i32;
            }
        }

        let mut options = Dictionary::new();
        options.set("preset", &self.preset);
        options.set("crf", &self.crf.to_string());
        let encoder = video_encoder.open_as_with(codec, options)?;

        stream.set_parameters(&encoder);
        stream.set_time_base(encoder_time_base);

        output_context.write_header()?;
        let output_time_base = output_context
            .stream(output_stream_index)
            .map(|stream| stream.time_base())
            .ok_or_else(|| VehicountError::FfmpegError("output stream vanished".to_string()))?;

        log::debug!(
            "Re-encoding {} at {}/{} fps with {}",
            input.display(),
            frame_rate.numerator(),
            frame_rate.denominator(),
            codec.name()
        );

        let mut reencoder = Reencoder {
            width: decoder.width(),
            height: decoder.height(),
            decoder,
            encoder,
            scaler: None,
            encoder_time_base,
            output_time_base,
            output_stream_index,
            frames_written: 0,
            tracker: ProgressTracker::new(
                self.progress.clone(),
                OperationType::AudioStrip,
                source.estimated_frames(),
                10,
            ),
        };

        // Audio and subtitle packets are never read past this point.
        for (stream, packet) in input_context.packets() {
            if stream.index() != video_stream_index {
                continue;
            }
            reencoder.decode(&packet, &mut output_context)?;
        }
        reencoder.finish(&mut output_context)?;
        output_context.write_trailer()?;
        drop(output_context);

        let frames_written = reencoder.frames_written;
        let duration = MediaProbe::probe(output)?.duration;
        if duration.is_zero() && frames_written > 0 {
            let seconds = frames_written as f64 * f64::from(frame_rate.denominator())
                / f64::from(frame_rate.numerator());
            return Ok(Duration::from_secs_f64(seconds));
        }
        Ok(duration)
    }
}

impl AudioStripper for FfmpegStripper {
    fn strip(&self, input: &Path, output: &Path) -> Result<Duration, VehicountError> {
        log::info!(
            "Removing audio from {} -> {}",
            input.display(),
            output.display()
        );

        match self.reencode(input, output) {
            Ok(duration) => {
                log::info!("Wrote {} ({duration:?})", output.display());
                Ok(duration)
            }
            Err(error @ VehicountError::StripFailed { .. }) => Err(error),
            Err(error) => Err(VehicountError::StripFailed {
                path: input.to_path_buf(),
                reason: error.to_string(),
            }),
        }
    }
}

/// Decode → scale → encode state for a single video stream.
struct Reencoder {
    width: u32,
    height: u32,
    decoder: ffmpeg_next::decoder::Video,
    encoder: ffmpeg_next::encoder::video::Encoder,
    scaler: Option<ScalingContext>,
    encoder_time_base: Rational,
    output_time_base: Rational,
    output_stream_index: usize,
    frames_written: i64,
    tracker: ProgressTracker,
}

impl Reencoder {
    fn decode(&mut self, packet: &Packet, output: &mut Output) -> Result<(), VehicountError> {
        self.decoder.send_packet(packet)?;
        self.drain_decoder(output)
    }

    fn finish(&mut self, output: &mut Output) -> Result<(), VehicountError> {
        self.decoder.send_eof()?;
        self.drain_decoder(output)?;
        self.encoder.send_eof()?;
        self.drain_encoder(output)?;
        self.tracker.finish();
        Ok(())
    }

    fn drain_decoder(&mut self, output: &mut Output) -> Result<(), VehicountError> {
        let mut decoded = VideoFrame::empty();
        while self.decoder.receive_frame(&mut decoded).is_ok() {
            let needs_scaling = decoded.format() != Pixel::YUV420P
                || decoded.width() != self.width
                || decoded.height() != self.height;

            if needs_scaling {
                if self.scaler.is_none() {
                    self.scaler = Some(ScalingContext::get(
                        decoded.format(),
                        decoded.width(),
                        decoded.height(),
                        Pixel::YUV420P,
                        self.width,
                        self.height,
                        ScalingFlags::BILINEAR,
                    )?);
                }
                let mut scaled = VideoFrame::empty();
                if let Some(scaler) = self.scaler.as_mut() {
                    scaler.run(&decoded, &mut scaled)?;
                }
                self.encode(&mut scaled, output)?;
            } else {
                self.encode(&mut decoded, output)?;
            }
        }
        Ok(())
    }

    fn encode(&mut self, frame: &mut VideoFrame, output: &mut Output) -> Result<(), VehicountError> {
        // Constant frame rate: one tick of the encoder time base per frame.
        frame.set_pts(Some(self.frames_written));
        frame.set_kind(ffmpeg_next::picture::Type::None);
        self.frames_written += 1;

        self.encoder.send_frame(frame)?;
        self.tracker.advance(1);
        self.drain_encoder(output)
    }

    fn drain_encoder(&mut self, output: &mut Output) -> Result<(), VehicountError> {
        let mut packet = Packet::empty();
        while self.encoder.receive_packet(&mut packet).is_ok() {
            packet.set_stream(self.output_stream_index);
            packet.rescale_ts(self.encoder_time_base, self.output_time_base);
            packet.write_interleaved(output)?;
        }
        Ok(())
    }
}

/// Source frame rate as a rational, preferring the average rate.
fn source_frame_rate(stream: &ffmpeg_next::Stream<'_>) -> Option<Rational> {
    [stream.avg_frame_rate(), stream.rate()]
        .into_iter()
        .find(|rate| rate.numerator() > 0 && rate.denominator() > 0)
}
