//! Lightweight media file probing.
//!
//! [`MediaProbe`] opens a file, reads its stream layout, and closes the
//! demuxer straight away. The stripper uses it to read the source frame
//! rate and to report the duration of the file it wrote.

use std::{path::Path, time::Duration};

use ffmpeg_next::{codec::context::Context as CodecContext, media::Type};

use crate::{
    error::VehicountError,
    ffmpeg,
    metadata::{MediaSummary, VideoSummary},
};

/// Lightweight media file probe.
///
/// # Example
///
/// ```no_run
/// use vehicount::MediaProbe;
///
/// let summary = MediaProbe::probe("temp/out.mp4_no_audio.mp4")?;
/// println!("{:?}, audio: {}", summary.duration, summary.has_audio());
/// # Ok::<(), vehicount::VehicountError>(())
/// ```
pub struct MediaProbe;

impl MediaProbe {
    /// Probe a media file.
    ///
    /// # Errors
    ///
    /// Returns [`VehicountError::FfmpegError`] if the file cannot be opened
    /// or its video codec parameters cannot be read.
    pub fn probe<P: AsRef<Path>>(path: P) -> Result<MediaSummary, VehicountError> {
        let path = path.as_ref();
        ffmpeg::init()?;

        let input_context = ffmpeg_next::format::input(&path).map_err(|error| {
            VehicountError::FfmpegError(format!("cannot open {}: {error}", path.display()))
        })?;

        let duration_microseconds = input_context.duration();
        let duration = if duration_microseconds > 0 {
            Duration::from_micros(duration_microseconds as u64)
        } else {
            Duration::ZERO
        };

        let audio_streams = input_context
            .streams()
            .filter(|stream| stream.parameters().medium() == Type::Audio)
            .count();

        let video = match input_context.streams().best(Type::Video) {
            Some(stream) => {
                let decoder = CodecContext::from_parameters(stream.parameters())?
                    .decoder()
                    .video()?;
                let codec = stream.parameters().id().name().to_string();

                Some(VideoSummary {
                    width: decoder.width(),
                    height: decoder.height(),
                    frames_per_second: frames_per_second(&stream),
                    codec,
                })
            }
            None => None,
        };

        Ok(MediaSummary {
            duration,
            format: input_context.format().name().to_string(),
            video,
            audio_streams,
        })
    }
}

/// Average frame rate of a stream, falling back to its real base rate.
pub(crate) fn frames_per_second(stream: &ffmpeg_next::Stream<'_>) -> f64 {
    let rational_to_f64 = |rate: ffmpeg_next::Rational| {
        if rate.numerator() > 0 && rate.denominator() > 0 {
            Some(rate.numerator() as f64 / rate.denominator() as f64)
        } else {
            None
        }
    };

    rational_to_f64(stream.avg_frame_rate())
        .or_else(|| rational_to_f64(stream.rate()))
        .unwrap_or(0.0)
}
