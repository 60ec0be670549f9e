//! Resolver and transcoder invocations.
//!
//! The resolver turns a watch-page URL into a direct media URL; the
//! transcoder cuts the annotated time range out of that stream and
//! re-encodes it. Both are built as argument lists for
//! [`capsnet_core::subprocess::run_command`].

use std::path::Path;
use std::time::Duration;

use capsnet_core::subprocess::CommandSpec;

/// Default resolver binary.
pub const DEFAULT_RESOLVER_BIN: &str = "youtube-dl";

/// Default transcoder binary.
pub const DEFAULT_TRANSCODER_BIN: &str = "ffmpeg";

/// Watch-page prefix the video id is appended to.
pub const DEFAULT_URL_BASE: &str = "https://www.youtube.com/watch?v=";

/// Stream format 18: 640x360 H.264 with AAC audio in one file.
pub const DEFAULT_FORMAT: &str = "18";

/// Default per-invocation resolver timeout.
pub const DEFAULT_RESOLVE_TIMEOUT: Duration = Duration::from_secs(60);

/// Default per-invocation transcoder timeout.
pub const DEFAULT_TRANSCODE_TIMEOUT: Duration = Duration::from_secs(600);

/// How to call the URL resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    pub program: String,
    pub url_base: String,
    pub format: String,
    pub timeout: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            program: DEFAULT_RESOLVER_BIN.to_string(),
            url_base: DEFAULT_URL_BASE.to_string(),
            format: DEFAULT_FORMAT.to_string(),
            timeout: DEFAULT_RESOLVE_TIMEOUT,
        }
    }
}

impl ResolverConfig {
    /// Watch-page URL for `video_id`.
    pub fn watch_url(&self, video_id: &str) -> String {
        format!("{}{video_id}", self.url_base)
    }

    /// `youtube-dl --quiet --no-warnings -f 18 --get-url <url>`
    pub fn command(&self, video_id: &str) -> CommandSpec {
        CommandSpec::new(&self.program, self.timeout)
            .args(["--quiet", "--no-warnings", "-f", self.format.as_str(), "--get-url"])
            .arg(self.watch_url(video_id))
    }
}

/// How to call the transcoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscoderConfig {
    pub program: String,
    pub video_codec: String,
    pub preset: String,
    pub audio_codec: String,
    pub threads: u32,
    pub log_level: String,
    pub timeout: Duration,
}

impl Default for TranscoderConfig {
    fn default() -> Self {
        Self {
            program: DEFAULT_TRANSCODER_BIN.to_string(),
            video_codec: "libx264".to_string(),
            preset: "ultrafast".to_string(),
            audio_codec: "aac".to_string(),
            threads: 1,
            log_level: "panic".to_string(),
            timeout: DEFAULT_TRANSCODE_TIMEOUT,
        }
    }
}

impl TranscoderConfig {
    /// `ffmpeg -ss <start> -t <duration> -i <url> -c:v libx264 -preset ultrafast
    /// -c:a aac -threads 1 -loglevel panic <output>`
    pub fn command(
        &self,
        direct_url: &str,
        start_time: f64,
        end_time: f64,
        output: &Path,
    ) -> CommandSpec {
        CommandSpec::new(&self.program, self.timeout)
            .arg("-ss")
            .arg(start_time.to_string())
            .arg("-t")
            .arg((end_time - start_time).to_string())
            .arg("-i")
            .arg(direct_url)
            .args(["-c:v", self.video_codec.as_str()])
            .args(["-preset", self.preset.as_str()])
            .args(["-c:a", self.audio_codec.as_str()])
            .arg("-threads")
            .arg(self.threads.to_string())
            .args(["-loglevel", self.log_level.as_str()])
            .arg(output)
    }
}
